use std::path::Path;

use outline_core::{OutlineConfig, Pipeline};

use crate::prelude::*;

/// Load the thresholds from `path`, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<OutlineConfig> {
    match path {
        Some(path) => {
            let config = OutlineConfig::from_file(path)
                .wrap_err_with(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("using configuration from {}", path.display());
            Ok(config)
        }
        None => Ok(OutlineConfig::default()),
    }
}

/// Build the shared pipeline for the global options.
pub fn pipeline(global: &crate::Global) -> Result<Pipeline> {
    let config = load_config(global.config.as_deref())?;
    Pipeline::new(config).wrap_err("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::HierarchyMode;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), OutlineConfig::default());
    }

    #[test]
    fn test_loads_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outline.toml");
        std::fs::write(&path, "hierarchy = \"promote\"\nmax_tiers = 4\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.hierarchy, HierarchyMode::Promote);
        assert_eq!(config.max_tiers, 4);
        assert_eq!(config.min_heading_length, 3);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "title_similarity = 1.5\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
