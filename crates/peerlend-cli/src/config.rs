use peerlend_core::LendingConfig;
use std::path::Path;

use crate::input;

/// Load configuration from `path`, then `$PLEND_CONFIG`, else defaults.
/// Files ending in `.json` are JSON; anything else is read as YAML.
pub fn load(path: Option<&str>) -> Result<LendingConfig, Box<dyn std::error::Error>> {
    let path = match path.map(str::to_string).or_else(|| std::env::var("PLEND_CONFIG").ok()) {
        Some(p) => p,
        None => return Ok(LendingConfig::default()),
    };

    let contents = input::file::read_text(&path)?;
    let is_json = Path::new(&path)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let config: LendingConfig = if is_json {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
    } else {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
    };
    tracing::debug!(config = ?config, "Loaded configuration");
    Ok(config)
}
