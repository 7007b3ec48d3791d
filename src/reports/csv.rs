use super::TIMESTAMP_FORMAT;
use crate::core::{ForecastPoint, QuoteSeries};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Row {
    kind: &'static str,
    timestamp: String,
    bid: f64,
    min: Option<f64>,
    max: Option<f64>,
}

pub fn write(path: &Path, series: &QuoteSeries, forecast: &[ForecastPoint]) -> Result<()> {
    let mut writer = ::csv::Writer::from_path(path)?;

    for quote in &series.quotes {
        writer.serialize(Row {
            kind: "history",
            timestamp: quote.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            bid: quote.bid,
            min: None,
            max: None,
        })?;
    }
    for point in forecast {
        writer.serialize(Row {
            kind: "forecast",
            timestamp: point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            bid: point.bid,
            min: Some(point.min),
            max: Some(point.max),
        })?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForecastPoint;
    use crate::reports::test_support::sample_series;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_writes_history_then_forecast() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("USD.csv");
        let series = sample_series(2);
        let predictions = vec![ForecastPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 2, 3, 18, 0, 0).unwrap(),
            bid: 4.92,
            min: 4.9,
            max: 4.94,
        }];

        write(&path, &series, &predictions).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "kind,timestamp,bid,min,max",
                "history,2024-02-01 18:00:00,4.9,,",
                "history,2024-02-02 18:00:00,4.91,,",
                "forecast,2024-02-03 18:00:00,4.92,4.9,4.94",
            ]
        );
    }
}
