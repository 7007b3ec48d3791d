use super::TIMESTAMP_FORMAT;
use crate::core::{ForecastPoint, QuoteSeries};
use anyhow::Result;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

pub fn write(path: &Path, series: &QuoteSeries, forecast: &[ForecastPoint]) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let number = Format::new().set_num_format("0.0000");

    let quotes = workbook.add_worksheet();
    quotes.set_name("Quotes")?;
    quotes.set_column_width(0, 20)?;
    quotes.write_string_with_format(0, 0, "timestamp", &bold)?;
    quotes.write_string_with_format(0, 1, "bid", &bold)?;
    for (i, quote) in series.quotes.iter().enumerate() {
        let row = i as u32 + 1;
        quotes.write_string(row, 0, quote.timestamp.format(TIMESTAMP_FORMAT).to_string())?;
        quotes.write_number_with_format(row, 1, quote.bid, &number)?;
    }

    let predictions = workbook.add_worksheet();
    predictions.set_name("Forecast")?;
    predictions.set_column_width(0, 20)?;
    for (col, title) in ["timestamp", "bid", "min", "max"].iter().enumerate() {
        predictions.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    for (i, point) in forecast.iter().enumerate() {
        let row = i as u32 + 1;
        predictions.write_string(row, 0, point.timestamp.format(TIMESTAMP_FORMAT).to_string())?;
        predictions.write_number_with_format(row, 1, point.bid, &number)?;
        predictions.write_number_with_format(row, 2, point.min, &number)?;
        predictions.write_number_with_format(row, 3, point.max, &number)?;
    }

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forecast::{self, ForecastModel};
    use crate::reports::test_support::sample_series;
    use tempfile::TempDir;

    #[test]
    fn test_writes_xlsx_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("USD.xlsx");
        let series = sample_series(7);
        let predictions = forecast::forecast(&series, 3, ForecastModel::Linear).unwrap();

        write(&path, &series, &predictions).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
