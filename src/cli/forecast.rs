use super::{fetch_series, resolve_currency, ui};
use crate::core::config::AppConfig;
use crate::core::forecast::{self, ForecastModel, ForecastPoint};
use crate::core::{QuoteProvider, QuoteSeries};
use crate::store::KeyValueStore;
use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;

#[derive(Debug, Clone)]
pub struct ForecastArgs {
    pub currency: Option<String>,
    pub days: Option<u32>,
    pub horizon: usize,
    pub model: ForecastModel,
    pub target: Option<f64>,
}

impl Default for ForecastArgs {
    fn default() -> Self {
        Self {
            currency: None,
            days: None,
            horizon: 3,
            model: ForecastModel::default(),
            target: None,
        }
    }
}

pub async fn run(
    args: &ForecastArgs,
    config: &AppConfig,
    provider: &dyn QuoteProvider,
    store: &KeyValueStore,
) -> Result<()> {
    let currency = resolve_currency(args.currency.as_deref(), config)?;
    let days = args.days.unwrap_or(config.history_days);

    let series = fetch_series(provider, &currency, &config.reference_currency, days).await?;
    store.save_snapshot(&series).await?;

    let points = forecast::forecast(&series, args.horizon, args.model)?;
    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "Forecast {} ({} days, {}, from {} quotes)",
                series.pair(),
                points.len(),
                args.model,
                series.len()
            ),
            ui::StyleType::Title
        )
    );
    display_forecast(&series, &points);

    if let Some(target) = args.target {
        println!("{}", target_summary(&series.reference, target, &points));
    }
    Ok(())
}

pub(crate) fn target_summary(reference: &str, target: f64, points: &[ForecastPoint]) -> String {
    match forecast::days_to_target(points, target) {
        Some(days) => format!("Target {reference} {target:.2} reached in ~{days} day(s)"),
        None => format!(
            "Target {reference} {target:.2} not expected within the next {} days",
            points.len()
        ),
    }
}

/// Prints forecast points with their bounds and the change from the last
/// known bid.
pub(crate) fn display_forecast(series: &QuoteSeries, points: &[ForecastPoint]) {
    let last_bid = series.last().map(|q| q.bid);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell(&format!("Forecast ({})", series.reference)),
        ui::header_cell("Min"),
        ui::header_cell("Max"),
        ui::header_cell("vs Last"),
    ]);

    for point in points {
        let change = last_bid
            .filter(|last| *last != 0.0)
            .map(|last| (point.bid - last) / last * 100.0);
        table.add_row(vec![
            Cell::new(point.timestamp.with_timezone(&Local).format("%Y-%m-%d")),
            ui::number_cell(point.bid),
            ui::number_cell(point.min),
            ui::number_cell(point.max),
            change.map_or_else(ui::na_cell, ui::change_cell),
        ]);
    }

    println!("{table}");
}
