//! Short-horizon forecasting over a quote series.

use crate::core::quote::QuoteSeries;
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Two-sided 80% normal quantile.
const INTERVAL_Z: f64 = 1.2816;

/// Longest horizon accepted, in days.
pub const MAX_HORIZON_DAYS: usize = 3650;

const HOLT_ALPHA: f64 = 0.5;
const HOLT_BETA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastModel {
    /// Least-squares trend line over the quote index.
    #[default]
    Linear,
    /// Double exponential smoothing.
    Holt,
}

impl Display for ForecastModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ForecastModel::Linear => "linear",
                ForecastModel::Holt => "holt",
            }
        )
    }
}

impl FromStr for ForecastModel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(ForecastModel::Linear),
            "holt" => Ok(ForecastModel::Holt),
            _ => Err(anyhow!("Invalid forecast model: {}", s)),
        }
    }
}

/// A fitted model: point prediction and interval half-width for `step`
/// periods past the last observation (step starts at 1).
trait Fitted {
    fn predict(&self, step: usize) -> (f64, f64);
}

struct LinearFit {
    slope: f64,
    intercept: f64,
    n: f64,
    x_mean: f64,
    sxx: f64,
    std_err: f64,
}

impl LinearFit {
    fn fit(ys: &[f64]) -> Self {
        let n = ys.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = ys.iter().sum::<f64>() / n;

        let (sxy, sxx) = ys
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
                let dx = i as f64 - x_mean;
                (sxy + dx * (y - y_mean), sxx + dx * dx)
            });

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        let intercept = y_mean - slope * x_mean;

        let sse: f64 = ys
            .iter()
            .enumerate()
            .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
            .sum();
        let std_err = if ys.len() > 2 {
            (sse / (n - 2.0)).sqrt()
        } else {
            0.0
        };

        Self {
            slope,
            intercept,
            n,
            x_mean,
            sxx,
            std_err,
        }
    }
}

impl Fitted for LinearFit {
    fn predict(&self, step: usize) -> (f64, f64) {
        let x = self.n - 1.0 + step as f64;
        let bid = self.intercept + self.slope * x;
        let leverage = if self.sxx > 0.0 {
            (x - self.x_mean).powi(2) / self.sxx
        } else {
            0.0
        };
        let half = INTERVAL_Z * self.std_err * (1.0 + 1.0 / self.n + leverage).sqrt();
        (bid, half)
    }
}

struct HoltFit {
    level: f64,
    trend: f64,
    sigma: f64,
}

impl HoltFit {
    fn fit(ys: &[f64], alpha: f64, beta: f64) -> Self {
        let mut level = ys[0];
        let mut trend = ys[1] - ys[0];
        let mut sq_errors = 0.0;

        for y in &ys[1..] {
            let expected = level + trend;
            sq_errors += (y - expected).powi(2);

            let next_level = alpha * y + (1.0 - alpha) * expected;
            trend = beta * (next_level - level) + (1.0 - beta) * trend;
            level = next_level;
        }

        Self {
            level,
            trend,
            sigma: (sq_errors / (ys.len() - 1) as f64).sqrt(),
        }
    }
}

impl Fitted for HoltFit {
    fn predict(&self, step: usize) -> (f64, f64) {
        let bid = self.level + self.trend * step as f64;
        (bid, INTERVAL_Z * self.sigma * (step as f64).sqrt())
    }
}

/// Predicts one point per day for the `horizon` days following the last quote.
///
/// With a single quote there is nothing to fit; the last bid is repeated.
pub fn forecast(
    series: &QuoteSeries,
    horizon: usize,
    model: ForecastModel,
) -> Result<Vec<ForecastPoint>> {
    let last = series
        .last()
        .ok_or_else(|| anyhow!("Cannot forecast {} without quotes", series.pair()))?;

    if horizon == 0 {
        return Ok(Vec::new());
    }
    if horizon > MAX_HORIZON_DAYS {
        bail!(
            "Forecast horizon of {} days exceeds the maximum of {}",
            horizon,
            MAX_HORIZON_DAYS
        );
    }

    let future = |step: usize| last.timestamp + Duration::days(step as i64);

    if series.len() < 2 {
        debug!("Only one quote for {}, repeating last bid", series.pair());
        return Ok((1..=horizon)
            .map(|step| ForecastPoint {
                timestamp: future(step),
                bid: last.bid,
                min: last.bid,
                max: last.bid,
            })
            .collect());
    }

    let ys = series.bids();
    if ys.iter().any(|y| !y.is_finite()) {
        bail!("Quotes for {} contain non-finite values", series.pair());
    }

    let fitted: Box<dyn Fitted> = match model {
        ForecastModel::Linear => Box::new(LinearFit::fit(&ys)),
        ForecastModel::Holt => Box::new(HoltFit::fit(&ys, HOLT_ALPHA, HOLT_BETA)),
    };
    debug!(model = %model, quotes = ys.len(), horizon, "Fitted forecast model");

    Ok((1..=horizon)
        .map(|step| {
            let (bid, half) = fitted.predict(step);
            ForecastPoint {
                timestamp: future(step),
                bid,
                min: bid - half,
                max: bid + half,
            }
        })
        .collect())
}

/// Number of days (1-based) until the forecast first reaches `target`.
pub fn days_to_target(points: &[ForecastPoint], target: f64) -> Option<usize> {
    points
        .iter()
        .position(|p| p.bid >= target)
        .map(|index| index + 1)
}
