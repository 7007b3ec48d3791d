use super::{fetch_series, resolve_currency, ui};
use crate::cli::forecast::display_forecast;
use crate::core::config::AppConfig;
use crate::core::forecast::{self, ForecastModel};
use crate::core::{QuoteProvider, QuoteSeries};
use crate::store::KeyValueStore;
use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;

/// Days of forecast printed below the quote table.
pub const SHOW_FORECAST_DAYS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ShowArgs {
    pub currency: Option<String>,
    pub days: Option<u32>,
}

pub async fn run(
    args: &ShowArgs,
    config: &AppConfig,
    provider: &dyn QuoteProvider,
    store: &KeyValueStore,
) -> Result<()> {
    let currency = resolve_currency(args.currency.as_deref(), config)?;
    let days = args.days.unwrap_or(config.history_days);

    let series = fetch_series(provider, &currency, &config.reference_currency, days).await?;
    store.save_snapshot(&series).await?;

    println!(
        "\n{}",
        ui::style_text(&format!("Quotes {}", series.pair()), ui::StyleType::Title)
    );
    display_quotes(&series);
    display_stats(&series);

    let points = forecast::forecast(&series, SHOW_FORECAST_DAYS, ForecastModel::Linear)?;
    println!(
        "\n{}",
        ui::style_text(
            &format!("Forecast ({} days, {})", points.len(), ForecastModel::Linear),
            ui::StyleType::Title
        )
    );
    display_forecast(&series, &points);
    Ok(())
}

/// Percent change of each bid against the previous one.
pub(crate) fn daily_changes(series: &QuoteSeries) -> Vec<Option<f64>> {
    let mut previous: Option<f64> = None;
    series
        .quotes
        .iter()
        .map(|quote| {
            let change = previous
                .filter(|p| *p != 0.0)
                .map(|p| (quote.bid - p) / p * 100.0);
            previous = Some(quote.bid);
            change
        })
        .collect()
}

fn display_quotes(series: &QuoteSeries) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell(&format!("Bid ({})", series.reference)),
        ui::header_cell("Change"),
    ]);

    for (quote, change) in series.quotes.iter().zip(daily_changes(series)) {
        table.add_row(vec![
            Cell::new(
                quote
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M"),
            ),
            ui::number_cell(quote.bid),
            change.map_or_else(ui::na_cell, ui::change_cell),
        ]);
    }

    println!("{table}");
}

fn display_stats(series: &QuoteSeries) {
    let Some(stats) = series.stats() else {
        return;
    };
    let reference = &series.reference;
    for (label, value) in [
        ("Mean:", stats.mean),
        ("Min:", stats.min),
        ("Max:", stats.max),
        ("Last:", stats.last),
    ] {
        println!(
            "{:<6} {}",
            ui::style_text(label, ui::StyleType::Label),
            ui::style_text(&format!("{reference} {value:.4}"), ui::StyleType::Value)
        );
    }
}
