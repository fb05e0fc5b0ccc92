pub mod config;
pub mod error;
pub mod hash;
pub mod io;
pub mod scheduler;
pub mod task;
pub mod types;
pub mod verify;

pub use error::{Result, WavectlError};
