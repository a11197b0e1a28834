use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use bulle_config::Config;

/// Config from `path` (or defaults) with environment overrides on top
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::new());
    };

    let mut config = read_config_file(path)?;
    config.apply_env(|key| env::var(key).ok());
    Ok(config)
}

/// Read a JSON config file; missing fields take their defaults
pub fn read_config_file(path: &Path) -> anyhow::Result<Config> {
    tracing::info!("Loading config from {}", path.display());
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file {}", path.display()))?;
    let config = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use bulle_types::SourceLanguage;

    use super::*;

    fn scratch_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("bulle-{}-{}.json", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_config_file() {
        let path = scratch_file(
            "profile",
            r#"{ "capture": { "auto_interval_ms": 1500 }, "translator": { "source": "de" } }"#,
        );
        let config = read_config_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.capture.auto_interval_ms, Some(1500));
        assert_eq!(config.capture.stuck_threshold_ms, 5000);
        assert_eq!(config.translator.source, SourceLanguage::Code("de".into()));
    }

    #[test]
    fn test_missing_or_invalid_file_is_an_error() {
        assert!(read_config_file(Path::new("/nonexistent/bulle.json")).is_err());

        let path = scratch_file("broken", "{ not json");
        let result = read_config_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
