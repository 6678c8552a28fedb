// src/ingest/terms.rs
//! Search-term lists kept in a file (TOML `terms = [...]` or a JSON array).

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Load search terms from an explicit path. Supports TOML or JSON formats.
pub fn load_terms_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading search terms from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_terms(&content, ext.as_str())
}

/// Split a comma-separated list (env style) and clean it.
pub fn parse_term_list(raw: &str) -> Vec<String> {
    clean_list(raw.split(',').map(str::to_string))
}

fn parse_terms(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("terms");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported search term list format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlTerms {
        terms: Vec<String>,
    }
    let v: TomlTerms = toml::from_str(s)?;
    Ok(clean_list(v.terms))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop blanks, drop case-insensitive repeats; first spelling wins.
fn clean_list<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_lowercase()) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"terms = [" Series A ", "", "first sales hire", "series a"]"#;
        let json = r#"["ICP", "  founding sales  ", ""]"#;
        assert_eq!(
            parse_toml(toml).unwrap(),
            vec!["Series A".to_string(), "first sales hire".to_string()]
        );
        assert_eq!(
            parse_json(json).unwrap(),
            vec!["ICP".to_string(), "founding sales".to_string()]
        );
    }

    #[test]
    fn comma_list_is_cleaned() {
        assert_eq!(
            parse_term_list("series a, ,B2B SaaS,b2b saas"),
            vec!["series a".to_string(), "B2B SaaS".to_string()]
        );
    }

    #[test]
    fn file_formats_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p_toml = dir.path().join("terms.toml");
        fs::write(&p_toml, "terms = [\"hiring sdr\"]\n").unwrap();
        assert_eq!(load_terms_from(&p_toml).unwrap(), vec!["hiring sdr"]);

        let p_json = dir.path().join("terms.json");
        fs::write(&p_json, r#"["vp sales"]"#).unwrap();
        assert_eq!(load_terms_from(&p_json).unwrap(), vec!["vp sales"]);

        let p_bad = dir.path().join("terms.txt");
        fs::write(&p_bad, "just words").unwrap();
        assert!(load_terms_from(&p_bad).is_err());
    }
}
