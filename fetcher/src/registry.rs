use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use url::Url;

/// One upstream service: a stable id and the URL of its OpenAPI/Swagger document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: String,
    pub url: String,
}

/// Load a service registry. `.json` files hold `[{"id", "url"}]`; anything else is
/// read as one `id url` (or bare `url`) per line with `#` comments.
pub fn load_registry(path: &Path) -> Result<Vec<ServiceEntry>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading registry {}", path.display()))?;
    let entries = if path.extension().and_then(|s| s.to_str()) == Some("json") {
        parse_json(&text)?
    } else {
        parse_lines(&text)?
    };
    if entries.is_empty() {
        return Err(anyhow!("no services in {}", path.display()));
    }
    Ok(entries)
}

pub fn parse_json(text: &str) -> Result<Vec<ServiceEntry>> {
    let entries: Vec<ServiceEntry> = serde_json::from_str(text).context("parsing registry json")?;
    check_unique(&entries)?;
    Ok(entries)
}

pub fn parse_lines(text: &str) -> Result<Vec<ServiceEntry>> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') { continue; }
        let mut fields = s.split_whitespace();
        let (id, raw_url) = match (fields.next(), fields.next()) {
            (Some(id), Some(u)) => (Some(id.to_string()), u),
            (Some(u), None) => (None, u),
            _ => continue,
        };
        let Some(url) = normalize_url(raw_url) else {
            tracing::warn!(line = lineno + 1, raw_url, "skipping registry line with invalid url");
            continue;
        };
        let id = match id.or_else(|| derive_id(&url)) {
            Some(id) => id,
            None => {
                tracing::warn!(line = lineno + 1, %url, "cannot derive service id");
                continue;
            }
        };
        entries.push(ServiceEntry { id, url: url.to_string() });
    }
    check_unique(&entries)?;
    Ok(entries)
}

fn normalize_url(s: &str) -> Option<Url> {
    Url::parse(s).or_else(|_| Url::parse(&format!("https://{}", s))).ok()
}

fn derive_id(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.replace('.', "-"))
}

fn check_unique(entries: &[ServiceEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for e in entries {
        if !seen.insert(e.id.as_str()) {
            bail!("duplicate service id '{}'", e.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_with_and_without_ids() {
        let text = "# services\n\npets https://petstore.io/v3/openapi.json\napi.stripe.com/openapi.json\n";
        let entries = parse_lines(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "pets");
        assert_eq!(entries[0].url, "https://petstore.io/v3/openapi.json");
        assert_eq!(entries[1].id, "api-stripe-com");
        assert_eq!(entries[1].url, "https://api.stripe.com/openapi.json");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = "a https://x.io/spec.json\na https://y.io/spec.json\n";
        assert!(parse_lines(text).is_err());
    }

    #[test]
    fn parses_json_registry() {
        let entries = parse_json(r#"[{"id": "pets", "url": "https://petstore.io/openapi.json"}]"#).unwrap();
        assert_eq!(entries, vec![ServiceEntry { id: "pets".into(), url: "https://petstore.io/openapi.json".into() }]);
    }

    #[test]
    fn loads_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("services.json");
        fs::write(&json_path, r#"[{"id": "a", "url": "https://a.io/spec.json"}]"#).unwrap();
        assert_eq!(load_registry(&json_path).unwrap()[0].id, "a");

        let txt_path = dir.path().join("services.txt");
        fs::write(&txt_path, "b https://b.io/spec.json\n").unwrap();
        assert_eq!(load_registry(&txt_path).unwrap()[0].id, "b");

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "# nothing\n").unwrap();
        assert!(load_registry(&empty).is_err());
    }
}
