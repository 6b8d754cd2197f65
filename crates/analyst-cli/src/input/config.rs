use std::fs;
use std::path::Path;

use analyst_core::config::EngineConfig;

/// Load engine settings from a YAML (`.yaml`/`.yml`) or JSON file, or the
/// defaults when no path is given. The result is validated before use.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config = match path {
        None => EngineConfig::default(),
        Some(path) => {
            let contents = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config '{}': {}", path, e))?;
            let is_yaml = Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
            if is_yaml {
                serde_yaml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
            }
        }
    };
    config.validate()?;
    tracing::debug!(?config, "engine configuration loaded");
    Ok(config)
}
