//! Scrape config loading: `{"scraper": "Seek", "entries": {name: url, ...}}`.
//! `orgs` is accepted in place of `entries`.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::error::ScrapeError;
use crate::parser::validate::validate_name;
use crate::record::Target;
use crate::sites;

#[derive(Debug)]
pub struct ScrapeConfig {
    pub scraper: String,
    pub targets: Vec<Target>,
}

/// A config argument with no directory part and no extension is looked up in
/// `config_dir` as `<name>.json`.
pub fn resolve_path(arg: &str, config_dir: &Path) -> PathBuf {
    let path = Path::new(arg);
    if path.components().count() == 1 && path.extension().is_none() {
        config_dir.join(format!("{}.json", arg))
    } else {
        path.to_path_buf()
    }
}

pub fn load_config(path: &Path) -> Result<ScrapeConfig, ScrapeError> {
    if !path.exists() {
        return Err(ScrapeError::InvalidConfigFile(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let text = fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    info!(
        "Loaded {} targets for {} from {}",
        config.targets.len(),
        config.scraper,
        path.display()
    );
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<ScrapeConfig, ScrapeError> {
    let invalid = ScrapeError::InvalidConfigFile;

    let data: Value =
        serde_json::from_str(text).map_err(|e| invalid(format!("not valid JSON: {}", e)))?;
    let obj = data
        .as_object()
        .ok_or_else(|| invalid("top level must be an object".into()))?;

    let scraper = obj
        .get("scraper")
        .ok_or_else(|| invalid(r#"JSON is missing the "scraper" key"#.into()))?
        .as_str()
        .ok_or_else(|| invalid(r#"The JSON "scraper" value must be a string"#.into()))?;
    let site = sites::build(scraper)?;

    let entries = obj
        .get("entries")
        .or_else(|| obj.get("orgs"))
        .ok_or_else(|| invalid(r#"JSON is missing the "entries" key"#.into()))?
        .as_object()
        .ok_or_else(|| invalid(r#"The JSON "entries" value must be a mapping of name to URL"#.into()))?;

    let mut targets = Vec::with_capacity(entries.len());
    for (name, url) in entries {
        let url = url
            .as_str()
            .ok_or_else(|| invalid(format!("URL for {} must be a string", name)))?;
        validate_name(name)?;
        site.validators.validate_url(url)?;
        targets.push(Target {
            name: name.clone(),
            entry_url: url.to_string(),
        });
    }

    Ok(ScrapeConfig {
        scraper: scraper.to_string(),
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_keeps_order() {
        let cfg = parse_config(
            r#"{"scraper": "Seek", "entries": {
                "Woolworths": "https://www.seek.com.au/companies/woolworths-432620/reviews",
                "Kmart": "https://www.seek.com.au/companies/kmart-432302/reviews"
            }}"#,
        )
        .unwrap();
        assert_eq!(cfg.scraper, "Seek");
        let names: Vec<_> = cfg.targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Woolworths", "Kmart"]);
    }

    #[test]
    fn orgs_alias() {
        let cfg = parse_config(
            r#"{"scraper": "Seek", "orgs": {"Kmart": "https://www.seek.com.au/companies/kmart-432302/reviews"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.targets.len(), 1);
    }

    #[test]
    fn rejects_bad_configs() {
        let cases = [
            r#"{"entries": {}}"#,
            r#"{"scraper": "Seek"}"#,
            r#"{"scraper": 3, "entries": {}}"#,
            r#"{"scraper": "Glassdoor", "entries": {}}"#,
            r#"{"scraper": "Seek", "entries": ["a"]}"#,
            r#"{"scraper": "Seek", "entries": {"Bad<name>": "https://www.seek.com.au/companies/x/reviews"}}"#,
            r#"{"scraper": "Seek", "entries": {"Kmart": "https://www.indeed.com/cmp/Kmart/reviews"}}"#,
            r#"{"scraper": "Seek", "entries": {"Kmart": 7}}"#,
            "not json",
        ];
        for case in cases {
            assert!(
                matches!(parse_config(case), Err(ScrapeError::InvalidConfigFile(_))),
                "accepted {}",
                case
            );
        }
    }

    #[test]
    fn shipped_example_is_valid() {
        let cfg = parse_config(include_str!("../scrape_configs/example.json")).unwrap();
        assert_eq!(cfg.scraper, "Seek");
        assert_eq!(cfg.targets.len(), 2);
    }

    #[test]
    fn missing_file() {
        let err = load_config(Path::new("/nonexistent/cfg.json")).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidConfigFile(_)));
    }

    #[test]
    fn resolves_bare_names() {
        let dir = Path::new("scrape_configs");
        assert_eq!(resolve_path("retail", dir), dir.join("retail.json"));
        assert_eq!(resolve_path("my.json", dir), PathBuf::from("my.json"));
        assert_eq!(resolve_path("cfg/retail", dir), PathBuf::from("cfg/retail"));
    }
}
