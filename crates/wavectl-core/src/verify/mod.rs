pub mod cache;
mod decls;

pub use cache::{verify_with_cache, CacheEntry, ExportCache, FsCache, MemoryCache};
pub use decls::get_declarations;

use crate::error::Result;
use crate::types::DeclKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ExportRecord
// ---------------------------------------------------------------------------

/// One top-level declaration site. A name declared under two different
/// kinds (say, a type alias and a function) produces two records; the same
/// (name, kind) pair never repeats within a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub kind: DeclKind,
    pub exported: bool,
}

// ---------------------------------------------------------------------------
// Claim / VerificationResult
// ---------------------------------------------------------------------------

/// A caller-supplied expectation: `name` exists with declaration `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub name: String,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResult {
    pub name: String,
    pub kind: DeclKind,
    pub found: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub file: String,
    pub verified: bool,
    pub matches: Vec<ClaimResult>,
    /// Claimed names with no declaration of any kind in the file.
    pub missing: Vec<String>,
    /// Exported names present in the file but not claimed. Informational.
    pub extra: Vec<String>,
    pub errors: Vec<String>,
}

impl VerificationResult {
    fn unverified(path: &Path, error: String) -> Self {
        Self {
            file: path.display().to_string(),
            verified: false,
            matches: Vec::new(),
            missing: Vec::new(),
            extra: Vec::new(),
            errors: vec![error],
        }
    }
}

// ---------------------------------------------------------------------------
// verify_claims()
// ---------------------------------------------------------------------------

/// Check every expected (name, kind) pair against the declarations actually
/// present in `path`. A missing or unparseable file is a reported failure,
/// not a panic: the result comes back unverified with a descriptive error.
pub fn verify_claims(path: &Path, expected: &[Claim]) -> VerificationResult {
    let decls = match get_declarations(path) {
        Ok(d) => d,
        Err(e) => return VerificationResult::unverified(path, e.to_string()),
    };

    let mut matches = Vec::with_capacity(expected.len());
    let mut missing = Vec::new();
    let mut errors = Vec::new();

    for claim in expected {
        let exact = decls
            .iter()
            .find(|r| r.name == claim.name && r.kind == claim.kind);

        let found = match exact {
            Some(r) if r.exported => true,
            Some(_) => {
                errors.push(format!(
                    "'{}' exists as {} but is not exported",
                    claim.name, claim.kind
                ));
                false
            }
            None => {
                let other_kinds: Vec<&str> = decls
                    .iter()
                    .filter(|r| r.name == claim.name)
                    .map(|r| r.kind.as_str())
                    .collect();
                if other_kinds.is_empty() {
                    missing.push(claim.name.clone());
                    errors.push(format!("'{}' not found", claim.name));
                } else {
                    errors.push(format!(
                        "'{}' exists but as {}, not {}",
                        claim.name,
                        other_kinds.join(", "),
                        claim.kind
                    ));
                }
                false
            }
        };

        matches.push(ClaimResult {
            name: claim.name.clone(),
            kind: claim.kind,
            found,
        });
    }

    let claimed: BTreeSet<&str> = expected.iter().map(|c| c.name.as_str()).collect();
    let extra: Vec<String> = decls
        .iter()
        .filter(|r| r.exported && !claimed.contains(r.name.as_str()))
        .map(|r| r.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    VerificationResult {
        file: path.display().to_string(),
        verified: errors.is_empty(),
        matches,
        missing,
        extra,
        errors,
    }
}

// ---------------------------------------------------------------------------
// exists() / function_exists()
// ---------------------------------------------------------------------------

/// True if any exported declaration with `name` exists in `path`.
pub fn exists(path: &Path, name: &str) -> Result<bool> {
    let decls = get_declarations(path)?;
    Ok(decls.iter().any(|r| r.exported && r.name == name))
}

/// True if an exported function-shaped declaration with `name` exists —
/// declared functions and const/let bindings to function or arrow
/// expressions both count.
pub fn function_exists(path: &Path, name: &str) -> Result<bool> {
    let decls = get_declarations(path)?;
    Ok(decls
        .iter()
        .any(|r| r.exported && r.kind == DeclKind::Function && r.name == name))
}

// ---------------------------------------------------------------------------
// batch_verify()
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchClaim {
    pub file: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub file: String,
    pub name: String,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Apply `exists` to each claim independently. One unreadable file flags
/// its own entry and never aborts the rest of the batch.
pub fn batch_verify(claims: &[BatchClaim]) -> Vec<BatchResult> {
    claims
        .iter()
        .map(|claim| match exists(Path::new(&claim.file), &claim.name) {
            Ok(found) => BatchResult {
                file: claim.file.clone(),
                name: claim.name.clone(),
                exists: found,
                error: None,
            },
            Err(e) => BatchResult {
                file: claim.file.clone(),
                name: claim.name.clone(),
                exists: false,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
