//! CSV ingestion.
//!
//! Enforces the byte ceiling before anything is parsed, then loads the data
//! with progressively more forgiving strategies:
//!
//! 1. header + double-quote handling
//! 2. plain parse with default options
//! 3. in-memory pre-clean (collapsed doubled quotes, blank lines dropped)

use crate::config::IngestConfig;
use crate::error::{DataQualityError, Result};
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load a CSV file from disk.
pub fn read_csv_file(path: impl AsRef<Path>, config: &IngestConfig) -> Result<DataFrame> {
    let path = path.as_ref();
    validate(config)?;

    let size = fs::metadata(path)?.len();
    check_size(size, config)?;

    info!("Loading {} ({} bytes)", path.display(), size);
    let bytes = fs::read(path)?;
    parse_with_fallbacks(&bytes, config)
}

/// Load CSV data already held in memory (e.g. an upload body).
pub fn read_csv_bytes(bytes: &[u8], config: &IngestConfig) -> Result<DataFrame> {
    validate(config)?;
    check_size(bytes.len() as u64, config)?;
    parse_with_fallbacks(bytes, config)
}

fn validate(config: &IngestConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| DataQualityError::InvalidConfig(e.to_string()))
}

fn check_size(size: u64, config: &IngestConfig) -> Result<()> {
    if size > config.max_bytes {
        return Err(DataQualityError::InputTooLarge {
            size,
            limit: config.max_bytes,
        });
    }
    Ok(())
}

fn parse_with_fallbacks(bytes: &[u8], config: &IngestConfig) -> Result<DataFrame> {
    let infer = Some(config.infer_schema_length);

    match CsvReadOptions::default()
        .with_infer_schema_length(infer)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
    {
        Ok(df) => return finish(df),
        Err(e) => debug!("Quoted parse failed: {}", e),
    }

    match CsvReadOptions::default()
        .with_infer_schema_length(infer)
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
    {
        Ok(df) => return finish(df),
        Err(e) => debug!("Plain parse failed: {}", e),
    }

    warn!("Falling back to pre-cleaned CSV content");
    let cleaned = clean_csv_content(&String::from_utf8_lossy(bytes));
    CsvReadOptions::default()
        .with_infer_schema_length(infer)
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(cleaned.into_bytes()))
        .finish()
        .map_err(|e| DataQualityError::IngestFailed(e.to_string()))
        .and_then(finish)
}

fn finish(df: DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Err(DataQualityError::IngestFailed(
            "no columns found in input".to_string(),
        ));
    }
    info!("Loaded {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
