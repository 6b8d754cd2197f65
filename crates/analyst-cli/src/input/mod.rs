pub mod config;
pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use std::error::Error;

/// Model input from `--input <file>`, falling back to piped stdin.
/// `None` when neither supplied anything.
pub fn read_model_input<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn Error>> {
    match path {
        Some(path) => file::read_json(path).map(Some),
        None => stdin::read_stdin(),
    }
}

/// Same as [`read_model_input`] for commands that have no flag-based fallback.
pub fn require_model_input<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn Error>> {
    read_model_input(path)?
        .ok_or_else(|| format!("`fa {command}` needs --input <file.json> or JSON on stdin").into())
}
