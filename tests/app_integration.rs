use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::{error, info};

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(pair: &str, days: u32, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/json/daily/{pair}/{days}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn daily_response(bids: &[f64]) -> String {
        let start = 1_709_164_800_i64;
        let items: Vec<String> = bids
            .iter()
            .enumerate()
            .rev()
            .map(|(i, bid)| {
                format!(
                    r#"{{"high": "6.0", "low": "4.0", "bid": "{bid}", "ask": "{bid}", "timestamp": "{}"}}"#,
                    start + i as i64 * 86_400
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }
}

fn write_config(dir: &Path, base_url: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
        currencies: ["USD", "EUR"]
        reference_currency: BRL
        history_days: 5
        providers:
          awesome_api:
            base_url: {}
        reports:
          folder: {}
        data_path: {}
    "#,
        base_url,
        dir.join("reports").display(),
        dir.join("data").display()
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().into_owned()
}

fn report_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.join("reports"))
        .map(|entries| {
            entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test_log::test(tokio::test)]
async fn test_show_then_export_from_snapshot() {
    let response = test_utils::daily_response(&[4.95, 4.96, 4.97, 4.99, 5.01]);
    let mock_server = test_utils::create_mock_server("USD-BRL", 5, &response).await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &mock_server.uri());

    let result = dashfin::run_command(
        dashfin::AppCommand::Show(dashfin::cli::show::ShowArgs::default()),
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Show failed with: {:?}", result.err());

    let result = dashfin::run_command(
        dashfin::AppCommand::Export(dashfin::cli::export::ExportArgs {
            currency: Some("USD".to_string()),
            format: dashfin::reports::ReportFormat::Csv,
            refresh: false,
            days: None,
        }),
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Export failed with: {:?}", result.err());

    let files = report_files(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("USD_quotes_") && files[0].ends_with(".csv"));

    let content = fs::read_to_string(dir.path().join("reports").join(&files[0])).unwrap();
    assert_eq!(content.lines().filter(|l| l.starts_with("history,")).count(), 5);
    assert_eq!(content.lines().filter(|l| l.starts_with("forecast,")).count(), 3);
}

#[test_log::test(tokio::test)]
async fn test_export_without_snapshot_fails() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), "http://127.0.0.1:9");

    let result = dashfin::run_command(
        dashfin::AppCommand::Export(dashfin::cli::export::ExportArgs {
            currency: Some("EUR".to_string()),
            format: dashfin::reports::ReportFormat::Pdf,
            refresh: false,
            days: None,
        }),
        Some(&config_path),
    )
    .await;

    let err = result.unwrap_err();
    assert!(
        err.to_string().contains("No stored quotes for EUR/BRL"),
        "unexpected error: {err}"
    );
    assert!(report_files(dir.path()).is_empty());
}

#[test_log::test(tokio::test)]
async fn test_forecast_with_holt_model() {
    let response = test_utils::daily_response(&[5.0, 5.1, 5.2, 5.3, 5.4, 5.5, 5.6]);
    let mock_server = test_utils::create_mock_server("EUR-BRL", 7, &response).await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &mock_server.uri());

    let result = dashfin::run_command(
        dashfin::AppCommand::Forecast(dashfin::cli::forecast::ForecastArgs {
            currency: Some("eur".to_string()),
            days: Some(7),
            horizon: 5,
            model: dashfin::core::ForecastModel::Holt,
            target: Some(6.0),
        }),
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Forecast failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_unknown_currency_is_reported() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(404).set_body_string(
            r#"{"status":404,"code":"CoinNotExists","message":"moeda nao encontrada XYZ-BRL"}"#,
        ))
        .mount(&mock_server)
        .await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &mock_server.uri());

    let result = dashfin::run_command(
        dashfin::AppCommand::Show(dashfin::cli::show::ShowArgs {
            currency: Some("XYZ".to_string()),
            days: None,
        }),
        Some(&config_path),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.to_string().starts_with("HTTP error: 404 Not Found for pair: XYZ-BRL"));
}

#[test_log::test(tokio::test)]
#[ignore = "requires network access"]
async fn test_real_awesome_api() {
    use dashfin::core::QuoteProvider;
    use dashfin::providers::awesome_api::AwesomeApiProvider;
    use dashfin::store::KeyValueStore;

    let store = KeyValueStore::in_memory();
    let provider = AwesomeApiProvider::new(
        "https://economia.awesomeapi.com.br",
        &store,
        std::time::Duration::from_secs(60),
    )
    .unwrap();

    info!("Fetching USD-BRL from AwesomeAPI");
    match provider.fetch_daily("USD", "BRL", 5).await {
        Ok(series) => {
            info!(?series, "Received quotes");
            assert!(!series.is_empty());
            assert!(series.bids().iter().all(|bid| *bid > 0.0));
        }
        Err(e) => {
            error!("API request failed: {e}\n{e:?}");
            panic!("API request failed: {e}");
        }
    }
}
