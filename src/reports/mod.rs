//! Spreadsheet and PDF reports of a quote series.

pub mod csv;
pub mod excel;
pub mod pdf;

use crate::core::forecast::{self, ForecastModel};
use crate::core::QuoteSeries;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Forecast days appended to every report.
pub const REPORT_FORECAST_DAYS: usize = 3;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Xlsx,
    Csv,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Csv => "csv",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ReportFormat::Xlsx),
            "csv" => Ok(ReportFormat::Csv),
            "pdf" => Ok(ReportFormat::Pdf),
            _ => Err(anyhow::anyhow!("Invalid report format: {}", s)),
        }
    }
}

/// `{folder}/{CURRENCY}_quotes_{YYYYmmdd_HHMMSS}.{ext}`
pub fn report_path(
    folder: &Path,
    currency: &str,
    format: ReportFormat,
    now: NaiveDateTime,
) -> PathBuf {
    folder.join(format!(
        "{}_quotes_{}.{}",
        currency,
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

/// Writes a report with the series and a short forecast, creating `folder`
/// when needed. Returns the path of the new file.
pub fn write_report(
    folder: &Path,
    series: &QuoteSeries,
    format: ReportFormat,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    std::fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create reports folder: {}", folder.display()))?;

    let predictions = forecast::forecast(series, REPORT_FORECAST_DAYS, ForecastModel::Linear)?;
    let path = report_path(folder, &series.currency, format, now);

    let written = match format {
        ReportFormat::Xlsx => excel::write(&path, series, &predictions),
        ReportFormat::Csv => csv::write(&path, series, &predictions),
        ReportFormat::Pdf => pdf::write(&path, series, &predictions),
    };
    written.with_context(|| format!("Failed to write {} report to {}", format, path.display()))?;

    info!("Wrote {} report to {}", format, path.display());
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 10)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_report_path() {
        let path = report_path(Path::new("reports"), "EUR", ReportFormat::Pdf, now());
        assert_eq!(path, PathBuf::from("reports/EUR_quotes_20240210_090507.pdf"));
    }

    #[test]
    fn test_write_report_creates_folder() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("nested").join("reports");
        let series = test_support::sample_series(5);

        for format in [ReportFormat::Xlsx, ReportFormat::Csv, ReportFormat::Pdf] {
            let path = write_report(&folder, &series, format, now()).unwrap();
            assert!(path.exists(), "{format} report missing");
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn test_write_report_for_empty_series_fails() {
        let dir = TempDir::new().unwrap();
        let series = test_support::sample_series(0);
        assert!(write_report(dir.path(), &series, ReportFormat::Csv, now()).is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("XLSX".parse::<ReportFormat>().unwrap(), ReportFormat::Xlsx);
        assert_eq!("excel".parse::<ReportFormat>().unwrap(), ReportFormat::Xlsx);
        assert!("docx".parse::<ReportFormat>().is_err());
    }
}
