//! CSV file contract shared by every stage.
//!
//! Files are UTF-8 with a byte-order mark, comma separated, with a header
//! row. The BOM is stripped on read and written back on every output so
//! spreadsheet tools keep rendering the Korean column names correctly.

use crate::error::{PreprocessingError, Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a stage input.
///
/// `null_tokens` are handed to the CSV parser as null markers for every
/// column. A missing file is reported as [`PreprocessingError::SourceNotFound`].
pub fn read_csv(path: &Path, null_tokens: &[String]) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PreprocessingError::SourceNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes).to_vec();

    let null_values = if null_tokens.is_empty() {
        None
    } else {
        Some(NullValues::AllColumns(
            null_tokens.iter().map(|t| t.as_str().into()).collect(),
        ))
    };

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(null_values),
        )
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()
        .context(format!("Failed to parse {}", path.display()))?;

    debug!("Read {}: {:?}", path.display(), df.shape());
    Ok(df)
}

/// Read a CSV with every column kept as text.
pub fn read_csv_as_text(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PreprocessingError::SourceNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes).to_vec();

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()
        .context(format!("Failed to parse {}", path.display()))
}

/// Write a stage output, replacing any previous file at `path`.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context(format!("Failed to write {}", path.display()))?;

    debug!("Wrote {}: {:?}", path.display(), df.shape());
    Ok(())
}
