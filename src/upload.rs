//! Decoding of browser uploads (`data:<mime>;base64,<payload>`) into a table preview.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use polars::prelude::*;

use crate::error::{user_message_from_polars, DashError, Result};
use crate::table::TableData;
use crate::view::{SelectOption, UploadedFile};

/// What the upload rule writes back: the preview table and the download options.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPreview {
    pub table: TableData,
    pub options: Vec<SelectOption>,
}

/// Splits a data URL at its first comma and base64-decodes the payload.
pub fn decode_data_url(contents: &str) -> Result<Vec<u8>> {
    let (_content_type, payload) = contents
        .split_once(',')
        .ok_or_else(|| DashError::UploadDecodeError("contents are not a data URL".to_string()))?;
    STANDARD
        .decode(payload.trim())
        .map_err(|e| DashError::UploadDecodeError(format!("invalid base64 payload: {}", e)))
}

/// UTF-8 when valid, otherwise every byte is taken as a Latin-1 code point.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parses the uploaded contents as a CSV file with a header row.
pub fn parse_upload(contents: &str) -> Result<DataFrame> {
    let text = decode_text(&decode_data_url(contents)?);
    CsvReader::new(Cursor::new(text.into_bytes()))
        .with_options(CsvReadOptions::default().with_has_header(true))
        .finish()
        .map_err(|e| DashError::UploadDecodeError(user_message_from_polars(&e)))
}

/// First `rows` rows of the upload plus a single download option named after the file.
pub fn preview(file: &UploadedFile, rows: usize) -> Result<UploadPreview> {
    let df = parse_upload(&file.contents)?;
    let table = TableData::from_frame(&df.head(Some(rows)))?;
    tracing::info!(
        filename = %file.filename,
        rows = df.height(),
        columns = df.width(),
        "upload decoded"
    );
    Ok(UploadPreview {
        table,
        options: vec![SelectOption::same(&file.filename)],
    })
}

/// Like `preview`, but a failure becomes an error preview with no options.
pub fn preview_or_error(file: &UploadedFile, rows: usize) -> UploadPreview {
    preview(file, rows).unwrap_or_else(|e| {
        tracing::warn!(filename = %file.filename, error = %e, "upload rejected");
        UploadPreview {
            table: TableData::failed(e.user_message()),
            options: Vec::new(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_url(bytes: &[u8]) -> String {
        format!("data:text/csv;base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn missing_comma_is_rejected() {
        let err = decode_data_url("no-comma-here").unwrap_err();
        assert!(matches!(err, DashError::UploadDecodeError(_)));
    }

    #[test]
    fn bad_base64_is_rejected() {
        let err = decode_data_url("data:text/csv;base64,@@@").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn latin1_fallback() {
        assert_eq!(decode_text(&[b'n', 0xE9]), "né");
        assert_eq!(decode_text("né".as_bytes()), "né");
    }

    #[test]
    fn preview_takes_first_rows() {
        let csv = "a,b\n1,x\n2,y\n3,z\n";
        let file = UploadedFile {
            filename: "small.csv".into(),
            contents: data_url(csv.as_bytes()),
        };
        let result = preview(&file, 2).unwrap();
        assert_eq!(result.table.columns, vec!["a", "b"]);
        assert_eq!(result.table.row_count(), 2);
        assert_eq!(result.options, vec![SelectOption::same("small.csv")]);
    }

    #[test]
    fn preview_or_error_clears_options() {
        let file = UploadedFile {
            filename: "broken.csv".into(),
            contents: "garbage".into(),
        };
        let result = preview_or_error(&file, 5);
        assert!(result.options.is_empty());
        assert!(result.table.error.is_some());
    }
}
