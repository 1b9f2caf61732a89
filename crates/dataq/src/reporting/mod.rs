//! Report export.
//!
//! Writes the combined quality report as pretty JSON and the cleaned dataset
//! as CSV next to each other in an output directory:
//!
//! ```text
//! outputs/
//! ├── sales_report.json
//! └── sales_cleaned.csv
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dataq::reporting::{ReportWriter, file_stem};
//!
//! let writer = ReportWriter::new("outputs");
//! let stem = file_stem("data/sales.csv");
//! let (report_path, csv_path) = writer.write_all(&output.report, &mut output.cleaned, &stem)?;
//! ```

mod writer;

pub use writer::{ReportWriter, file_stem};
