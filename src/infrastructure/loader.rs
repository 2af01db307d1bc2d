// Infrastructure: input loader
// Reads raw catalog data from JSON or YAML. Validation happens when the data
// becomes an `EntityCatalog`.

use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::catalog::CatalogData;

/// Catalog file format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Yaml,
}

impl CatalogFormat {
    /// `.json` files are JSON, everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CatalogFormat::Json,
            _ => CatalogFormat::Yaml,
        }
    }
}

pub fn read_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read yaml file at {}", path.display()))?;
    serde_saphyr::from_str(&contents).context("failed to parse yaml")
}

pub fn parse_catalog(contents: &str, format: CatalogFormat) -> Result<CatalogData> {
    match format {
        CatalogFormat::Json => serde_json::from_str(contents).context("failed to parse json catalog"),
        CatalogFormat::Yaml => serde_saphyr::from_str(contents).context("failed to parse yaml catalog"),
    }
}

pub fn read_catalog(path: &Path) -> Result<CatalogData> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog at {}", path.display()))?;
    let data = parse_catalog(&contents, CatalogFormat::from_path(path))
        .with_context(|| format!("failed to load catalog at {}", path.display()))?;
    info!(
        "Loaded {} KDV(s), {} slot(s), {} resource(s), {} preference(s) from {}",
        data.kdvs.len(),
        data.slots.len(),
        data.resources.len(),
        data.preferences.len(),
        path.display()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EntityCatalog;

    const YAML: &str = "\
slots:
  - id: mon-am
    start: 2024-01-01T08:00:00
    end: 2024-01-01T12:00:00
    capacity: 2
  - id: mon-pm
    start: 2024-01-01T13:00:00
    end: 2024-01-01T17:00:00
resources:
  - id: alex
    available_slots: [mon-am, mon-pm]
    experience_months: 12
kdvs:
  - id: night-watch
    eligible_slots: [mon-am]
    eligible_resources: [alex]
  - id: audit
    duration: 1
    priority: 2.0
    eligible_slots: [mon-am, mon-pm]
    eligible_resources: [alex]
preferences:
  - kdv: audit
    slot: mon-pm
    weight: 3
";

    #[test]
    fn test_format_from_extension() {
        assert_eq!(CatalogFormat::from_path(Path::new("a/b.json")), CatalogFormat::Json);
        assert_eq!(CatalogFormat::from_path(Path::new("b.JSON")), CatalogFormat::Json);
        assert_eq!(CatalogFormat::from_path(Path::new("b.yaml")), CatalogFormat::Yaml);
        assert_eq!(CatalogFormat::from_path(Path::new("b")), CatalogFormat::Yaml);
    }

    #[test]
    fn test_parse_yaml_catalog() {
        let data = parse_catalog(YAML, CatalogFormat::Yaml).unwrap();
        assert_eq!(data.kdvs.len(), 2);
        assert_eq!(data.kdvs[0].duration, 1);
        assert_eq!(data.kdvs[1].priority, 2.0);
        assert_eq!(data.slots[0].capacity, 2);
        assert_eq!(data.slots[1].capacity, 1);
        assert_eq!(data.resources[0].experience_months, Some(12));
        assert_eq!(data.preferences[0].resource, None);

        let catalog = EntityCatalog::try_from(data).unwrap();
        assert_eq!(catalog.slots()[0].id, "mon-am");
    }

    #[test]
    fn test_parse_json_catalog() {
        let json = r#"{
            "slots": [{"id": "S0", "start": "2024-01-01T08:00:00", "end": "2024-01-01T09:00:00"}],
            "resources": [{"id": "R0", "available_slots": ["S0"]}],
            "kdvs": [{"id": "K0", "eligible_slots": ["S0"], "eligible_resources": ["R0"]}]
        }"#;
        let data = parse_catalog(json, CatalogFormat::Json).unwrap();
        assert!(data.preferences.is_empty());
        assert!(EntityCatalog::try_from(data).is_ok());
    }

    #[test]
    fn test_malformed_input_is_reported() {
        let err = parse_catalog("kdvs: [{duration: 2}]", CatalogFormat::Yaml).unwrap_err();
        assert!(err.to_string().contains("yaml"));
        assert!(parse_catalog("{", CatalogFormat::Json).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = read_catalog(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/catalog.yaml"));
    }
}
