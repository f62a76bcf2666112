//! Error taxonomy and user-facing error message formatting.
//!
//! Uses typed error matching (PolarsError variants, io::ErrorKind) rather than
//! string parsing to produce actionable messages for the result regions.

use polars::prelude::PolarsError;
use std::io;
use thiserror::Error;

use crate::view::ComponentId;

pub type Result<T, E = DashError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DashError {
    /// A startup dataset could not be fetched or decoded. Fatal.
    #[error("{source_name} dataset unavailable: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("Column not found: {0}")]
    UnknownColumn(String),

    #[error("Could not read uploaded file: {0}")]
    UploadDecodeError(String),

    #[error("Error: {0}")]
    OutboundRequestError(String),

    #[error("Control '{0}' is not part of the current tab")]
    UnknownControl(ComponentId),

    #[error("Invalid value for '{id}': {reason}")]
    InvalidControlValue { id: ComponentId, reason: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl DashError {
    pub(crate) fn data_unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Message shown in an output region when a rule fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::Polars(e) => user_message_from_polars(e),
            other => other.to_string(),
        }
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Rows have differing field counts: {}", msg),
        PE::ComputeError(msg) => simplify_compute_message(msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Polars compute errors carry parser internals; keep only the first line.
fn simplify_compute_message(msg: &str) -> String {
    let first = msg.lines().next().unwrap_or(msg).trim();
    if first.is_empty() {
        "Could not parse the data.".to_string()
    } else {
        format!("Could not parse the data: {}", first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_error_is_prefixed() {
        let e = DashError::OutboundRequestError("404".to_string());
        assert_eq!(e.to_string(), "Error: 404");
    }

    #[test]
    fn data_unavailable_names_source() {
        let e = DashError::data_unavailable("penguins", "HTTP 500");
        assert_eq!(e.to_string(), "penguins dataset unavailable: HTTP 500");
    }

    #[test]
    fn polars_column_not_found_message() {
        let err = PolarsError::ColumnNotFound("body_mass".into());
        let e: DashError = err.into();
        assert!(e.user_message().starts_with("Column not found: body_mass"));
    }

    #[test]
    fn compute_error_keeps_first_line() {
        let msg = simplify_compute_message("bad row\nat offset 12\nhint: ...");
        assert_eq!(msg, "Could not parse the data: bad row");
    }

    #[test]
    fn io_not_found_with_context() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(
            user_message_from_io(&err, Some("(wine.csv)")),
            "File or directory not found. (wine.csv)"
        );
    }
}
