use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Parse a JSON model input file. Relative paths resolve against the working directory.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn Error>> {
    let path = input_path(path)?;
    let contents = fs::read_to_string(&path)
        .map_err(|e| format!("cannot read input '{}': {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "read input file");
    let parsed = serde_json::from_str(&contents)
        .map_err(|e| format!("invalid model input in '{}': {}", path.display(), e))?;
    Ok(parsed)
}

fn input_path(path: &str) -> Result<PathBuf, Box<dyn Error>> {
    // joining an absolute path replaces the base
    let resolved = std::env::current_dir()?.join(path);
    if !resolved.is_file() {
        return Err(format!("input file not found: {}", resolved.display()).into());
    }
    Ok(resolved)
}
