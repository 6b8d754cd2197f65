use serde::de::DeserializeOwned;
use std::error::Error;
use std::io::{self, Read};

/// Parse JSON piped on stdin. An interactive terminal or blank input yields `None`.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    let body = buffer.trim();
    if body.is_empty() {
        return Ok(None);
    }
    tracing::debug!(bytes = body.len(), "read input from stdin");

    let parsed = serde_json::from_str(body).map_err(|e| format!("invalid model input on stdin: {e}"))?;
    Ok(Some(parsed))
}
