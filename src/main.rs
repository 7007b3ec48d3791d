use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use dashfin::AppCommand;
use dashfin::cli::export::ExportArgs;
use dashfin::cli::forecast::ForecastArgs;
use dashfin::cli::show::ShowArgs;
use dashfin::cli::watch::WatchArgs;
use dashfin::core::ForecastModel;
use dashfin::core::forecast::MAX_HORIZON_DAYS;
use dashfin::core::log::init_logging;
use dashfin::reports::ReportFormat;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Model {
    Linear,
    Holt,
}

impl From<Model> for ForecastModel {
    fn from(model: Model) -> Self {
        match model {
            Model::Linear => ForecastModel::Linear,
            Model::Holt => ForecastModel::Holt,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Xlsx,
    Csv,
    Pdf,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Xlsx => ReportFormat::Xlsx,
            Format::Csv => ReportFormat::Csv,
            Format::Pdf => ReportFormat::Pdf,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display recent quotes, statistics and a short forecast
    Show {
        /// Currency code, e.g. USD (defaults to the first configured one)
        currency: Option<String>,
        /// Days of history to fetch
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Forecast the next days
    Forecast {
        currency: Option<String>,
        #[arg(short, long)]
        days: Option<u32>,
        /// Days to forecast
        #[arg(
            long,
            default_value_t = 3,
            value_parser = clap::value_parser!(u16).range(0..=MAX_HORIZON_DAYS as i64)
        )]
        horizon: u16,
        #[arg(short, long, value_enum, default_value_t = Model::Linear)]
        model: Model,
        /// Report when the forecast reaches this value
        #[arg(short, long)]
        target: Option<f64>,
    },
    /// Export the last fetched quotes to a report file
    Export {
        currency: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Format::Xlsx)]
        format: Format,
        /// Fetch fresh quotes before exporting
        #[arg(short, long)]
        refresh: bool,
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Refresh periodically and send alerts until interrupted
    Watch {
        currency: Option<String>,
        #[arg(short, long)]
        days: Option<u32>,
        /// Seconds between refreshes
        #[arg(short, long)]
        interval: Option<u64>,
        /// Alert when the bid reaches this value
        #[arg(short, long)]
        target: Option<f64>,
        /// Minimum seconds between two alerts
        #[arg(long)]
        cooldown: Option<u64>,
        /// Alert by e-mail
        #[arg(long)]
        email: bool,
        /// Alert by WhatsApp
        #[arg(long)]
        whatsapp: bool,
        /// E-mail recipient, overriding the configured one
        #[arg(long)]
        email_to: Option<String>,
        /// WhatsApp recipient, e.g. whatsapp:+5511999999999
        #[arg(long)]
        whatsapp_to: Option<String>,
        /// Write XLSX and PDF reports on every refresh
        #[arg(long)]
        reports: bool,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Show { currency, days } => AppCommand::Show(ShowArgs { currency, days }),
            Commands::Forecast {
                currency,
                days,
                horizon,
                model,
                target,
            } => AppCommand::Forecast(ForecastArgs {
                currency,
                days,
                horizon: usize::from(horizon),
                model: model.into(),
                target,
            }),
            Commands::Export {
                currency,
                format,
                refresh,
                days,
            } => AppCommand::Export(ExportArgs {
                currency,
                format: format.into(),
                refresh,
                days,
            }),
            Commands::Watch {
                currency,
                days,
                interval,
                target,
                cooldown,
                email,
                whatsapp,
                email_to,
                whatsapp_to,
                reports,
            } => AppCommand::Watch(WatchArgs {
                currency,
                days,
                interval_secs: interval,
                target,
                cooldown_secs: cooldown,
                email,
                whatsapp,
                email_to,
                whatsapp_to,
                reports,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => dashfin::cli::setup::setup_at_path(path),
            None => dashfin::cli::setup::setup(),
        },
        Some(cmd) => dashfin::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
