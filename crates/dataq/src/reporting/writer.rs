use crate::error::{DataQualityError, Result};
use crate::types::DataQualityReport;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_STEM: &str = "output";

/// Writes reports and cleaned datasets into a single directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `<stem>_report.json`.
    pub fn write_report(&self, report: &DataQualityReport, stem: &str) -> Result<PathBuf> {
        self.ensure_dir()?;

        let path = self.output_dir.join(format!("{stem}_report.json"));
        let json = serde_json::to_string_pretty(report)?;
        File::create(&path)
            .and_then(|mut file| file.write_all(json.as_bytes()))
            .map_err(|e| write_failed(&path, e))?;

        info!("Report saved: {}", path.display());
        Ok(path)
    }

    /// Write `<stem>_cleaned.csv`.
    pub fn write_cleaned(&self, df: &mut DataFrame, stem: &str) -> Result<PathBuf> {
        self.ensure_dir()?;

        let path = self.output_dir.join(format!("{stem}_cleaned.csv"));
        let mut file = File::create(&path).map_err(|e| write_failed(&path, e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)
            .map_err(|e| write_failed(&path, e))?;

        info!("Cleaned dataset saved: {}", path.display());
        Ok(path)
    }

    /// Write both files, returning `(report_path, csv_path)`.
    pub fn write_all(
        &self,
        report: &DataQualityReport,
        cleaned: &mut DataFrame,
        stem: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        Ok((
            self.write_report(report, stem)?,
            self.write_cleaned(cleaned, stem)?,
        ))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| write_failed(&self.output_dir, e))
    }
}

fn write_failed(path: &Path, err: impl std::fmt::Display) -> DataQualityError {
    DataQualityError::ReportWriteFailed(format!("{}: {err}", path.display()))
}

/// Base name used for exported files: the input's file stem, or `output`.
pub fn file_stem(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STEM)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use pretty_assertions::assert_eq;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dataq_{name}_{}", std::process::id()))
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("data/sales.csv"), "sales");
        assert_eq!(file_stem("archive.tar.csv"), "archive.tar");
        assert_eq!(file_stem(""), "output");
    }

    #[test]
    fn test_write_all() {
        let df = df![
            "amount" => [10.0, 12.0, 11.0, 13.0, 12.5],
            "region" => ["north", "south", "north", "east", "west"],
        ]
        .unwrap();
        let output = Pipeline::builder().build().unwrap().run(df).unwrap();
        let mut cleaned = output.cleaned;

        let dir = scratch_dir("writer");
        let writer = ReportWriter::new(&dir);
        let (report_path, csv_path) = writer
            .write_all(&output.report, &mut cleaned, "sales")
            .unwrap();

        assert_eq!(report_path, dir.join("sales_report.json"));
        assert_eq!(csv_path, dir.join("sales_cleaned.csv"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert!(json.get("quality_score").is_some());
        assert_eq!(json["summary"]["rows_original"], 5);

        let csv = fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("amount,region"));
        assert_eq!(csv.lines().count(), 6);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unwritable_directory() {
        let blocker = scratch_dir("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let writer = ReportWriter::new(blocker.join("nested"));
        let mut df = df!["a" => [1]].unwrap();
        let err = writer.write_cleaned(&mut df, "x").unwrap_err();
        assert_eq!(err.error_code(), "REPORT_WRITE_FAILED");

        fs::remove_file(&blocker).unwrap();
    }
}
