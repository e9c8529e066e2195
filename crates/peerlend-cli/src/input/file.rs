use serde::de::DeserializeOwned;
use std::fs;
use std::path::PathBuf;

/// Parse a JSON file (loan records, schedule inputs, proposals) into `T`.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", path, e).into())
}

/// Whole file as text. Relative paths resolve against the working directory.
pub fn read_text(path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let full: PathBuf = std::env::current_dir()?.join(path);
    match fs::metadata(&full) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(format!("Not a file: {}", full.display()).into()),
        Err(_) => return Err(format!("File not found: {}", full.display()).into()),
    }
    fs::read_to_string(&full)
        .map_err(|e| format!("Failed to read '{}': {}", full.display(), e).into())
}
