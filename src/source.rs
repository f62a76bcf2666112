//! Dataset source detection (local path vs HTTP/HTTPS URL) and byte fetching.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DashError, Result};

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum InputSource {
    Local(PathBuf),
    Http(String),
}

/// Classifies the location as local or HTTP/HTTPS using string parsing only (no filesystem calls).
pub(crate) fn input_source(location: &str) -> InputSource {
    if let Some(after_scheme) = location.find("://") {
        let prefix = location[..after_scheme].to_lowercase();
        if prefix == "http" || prefix == "https" {
            return InputSource::Http(location.to_string());
        }
    }
    InputSource::Local(PathBuf::from(location))
}

/// Reads the whole dataset at `location` into memory.
/// Any failure is reported as `DataUnavailable` for `source_name`.
pub(crate) fn fetch_bytes(source_name: &str, location: &str, timeout: Duration) -> Result<Vec<u8>> {
    match input_source(location) {
        InputSource::Local(path) => std::fs::read(&path).map_err(|e| {
            DashError::data_unavailable(
                source_name,
                crate::error::user_message_from_io(&e, Some(&format!("({})", path.display()))),
            )
        }),
        InputSource::Http(url) => download(source_name, &url, timeout),
    }
}

fn download(source_name: &str, url: &str, timeout: Duration) -> Result<Vec<u8>> {
    tracing::info!(dataset = source_name, %url, "downloading dataset");
    let response = ureq::get(url).timeout(timeout).call().map_err(|e| match e {
        ureq::Error::Status(code, response) => DashError::data_unavailable(
            source_name,
            format!("server returned {} {} for {}", code, response.status_text(), url),
        ),
        ureq::Error::Transport(t) => DashError::data_unavailable(
            source_name,
            format!("download failed. Check the URL and your connection: {}", t),
        ),
    })?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| DashError::data_unavailable(source_name, format!("download interrupted: {}", e)))?;
    tracing::debug!(dataset = source_name, bytes = bytes.len(), "download complete");
    Ok(bytes)
}
