use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use std::path::Path;
use std::str::FromStr;
use wavectl_core::hash::content_hash;
use wavectl_core::types::DeclKind;
use wavectl_core::verify::{
    self, cache::cache_key, Claim, ExportCache, FsCache, VerificationResult,
};

pub fn verify(root: &Path, file: &Path, no_cache: bool, json: bool) -> anyhow::Result<()> {
    let result = if no_cache {
        verify::verify_claims(file, &[])
    } else {
        let cache = FsCache::new(root);
        verify::verify_with_cache(file, &[], &cache)
    };
    report(&result, json)
}

pub fn check_export(file: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let found = verify::exists(file, name)
        .with_context(|| format!("failed to verify {}", file.display()))?;

    if json {
        print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "name": name,
            "exists": found,
        }))?;
    } else if found {
        println!("'{name}' is exported from {}", file.display());
    }
    if !found {
        bail!("no exported declaration '{name}' in {}", file.display());
    }
    Ok(())
}

pub fn check_function(file: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let found = verify::function_exists(file, name)
        .with_context(|| format!("failed to verify {}", file.display()))?;

    if json {
        print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "name": name,
            "exists": found,
        }))?;
    } else if found {
        println!("'{name}' is an exported function in {}", file.display());
    }
    if !found {
        bail!("no exported function '{name}' in {}", file.display());
    }
    Ok(())
}

pub fn check_types(file: &Path, raw_claims: &[String], json: bool) -> anyhow::Result<()> {
    let claims: Vec<Claim> = raw_claims
        .iter()
        .map(|raw| {
            let (name, kind) = raw
                .split_once(':')
                .with_context(|| format!("invalid claim '{raw}': expected name:kind"))?;
            let kind = DeclKind::from_str(kind).with_context(|| {
                format!("invalid claim '{raw}': kind must be one of {}", kind_list())
            })?;
            Ok(Claim {
                name: name.to_string(),
                kind,
            })
        })
        .collect::<anyhow::Result<_>>()?;

    let result = verify::verify_claims(file, &claims);
    report(&result, json)
}

fn kind_list() -> String {
    DeclKind::all()
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn types(file: &Path, json: bool) -> anyhow::Result<()> {
    let decls = verify::get_declarations(file)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    if json {
        print_json(&decls)?;
        return Ok(());
    }

    if decls.is_empty() {
        println!("No top-level declarations in {}.", file.display());
        return Ok(());
    }

    let rows: Vec<Vec<String>> = decls
        .iter()
        .map(|d| {
            vec![
                d.name.clone(),
                d.kind.to_string(),
                if d.exported { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "KIND", "EXPORTED"], rows);
    Ok(())
}

pub fn hash(file: &Path) -> anyhow::Result<()> {
    let digest =
        content_hash(file).with_context(|| format!("failed to hash {}", file.display()))?;
    println!("{digest}");
    Ok(())
}

pub fn clear_cache(root: &Path, file: Option<&Path>) -> anyhow::Result<()> {
    let cache = FsCache::new(root);
    match file {
        Some(f) => {
            cache.remove(&cache_key(f));
            println!("Cleared cache entry for {}", f.display());
        }
        None => {
            cache.clear();
            println!("Cleared verification cache");
        }
    }
    Ok(())
}

fn report(result: &VerificationResult, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(result)?;
    } else {
        println!(
            "{}: {}",
            result.file,
            if result.verified { "verified" } else { "FAILED" }
        );
        for m in &result.matches {
            let mark = if m.found { "ok" } else { "MISSING" };
            println!("  {} {}:{}", mark, m.name, m.kind);
        }
        if !result.extra.is_empty() {
            println!("  extra exports: {}", result.extra.join(", "));
        }
        for err in &result.errors {
            println!("  error: {err}");
        }
    }

    if !result.verified {
        bail!("verification failed for {}", result.file);
    }
    Ok(())
}
