//! dpe - DPE class and consumption prediction CLI
//!
//! Usage:
//!   dpe serve --model-dir models              # both endpoints (5001 / 5000)
//!   dpe serve --service classifier --port 8080
//!   dpe check --model-dir models              # load and smoke-test artifacts
//!   dpe predict --model-dir models -i flat.json

use clap::{Parser, Subcommand, ValueEnum};
use dpe_predict::encoding::{AlignMode, UnknownPolicy};
use dpe_predict::serving::LoadOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

use commands::serve::{ServerConfig, ServiceKind};
use commands::{check, predict, serve};

/// dpe - DPE energy label prediction
///
/// Serve, check and run the DPE class classifier and the consumption
/// regressor.
#[derive(Parser)]
#[command(name = "dpe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logs)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Labels outside the trained vocabularies
#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnknownCategory {
    /// Reject the request (422)
    Reject,
    /// Encode as "absent" and keep going
    Sentinel,
}

impl From<UnknownCategory> for UnknownPolicy {
    fn from(value: UnknownCategory) -> Self {
        match value {
            UnknownCategory::Reject => UnknownPolicy::Reject,
            UnknownCategory::Sentinel => UnknownPolicy::Sentinel,
        }
    }
}

#[derive(clap::Args)]
struct EncodingArgs {
    /// Report encoded columns missing from the training schema
    #[arg(long)]
    strict: bool,

    /// Handling of unrecognized categorical values [default: encoder config, else reject]
    #[arg(long, value_enum)]
    unknown_category: Option<UnknownCategory>,
}

impl EncodingArgs {
    fn load_options(&self) -> LoadOptions {
        let mode = if self.strict {
            AlignMode::Strict
        } else {
            AlignMode::Lenient
        };
        let options = LoadOptions::default().with_align_mode(mode);
        match self.unknown_category {
            Some(category) => options.with_unknown_policy(category.into()),
            None => options,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the prediction endpoints over HTTP
    Serve {
        /// Directory holding the model artifacts
        #[arg(long, env = "DPE_MODEL_DIR", default_value = "models")]
        model_dir: PathBuf,

        /// Which endpoints to run
        #[arg(long, value_enum, default_value = "both")]
        service: ServiceKind,

        /// Host to bind to
        #[arg(long, env = "DPE_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port for a single service (ignored with --service both)
        #[arg(short, long, env = "DPE_PORT")]
        port: Option<u16>,

        /// Port of the DPE class endpoint
        #[arg(long, default_value = "5001")]
        classifier_port: u16,

        /// Port of the consumption endpoint
        #[arg(long, default_value = "5000")]
        regressor_port: u16,

        /// Disable Prometheus metrics endpoint
        #[arg(long)]
        no_metrics: bool,

        #[command(flatten)]
        encoding: EncodingArgs,
    },

    /// Load every artifact and run smoke predictions
    Check {
        /// Directory holding the model artifacts
        #[arg(long, env = "DPE_MODEL_DIR", default_value = "models")]
        model_dir: PathBuf,

        #[command(flatten)]
        encoding: EncodingArgs,
    },

    /// Predict class and consumption for one JSON record
    Predict {
        /// Directory holding the model artifacts
        #[arg(long, env = "DPE_MODEL_DIR", default_value = "models")]
        model_dir: PathBuf,

        /// Record file (`-` for stdin)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        encoding: EncodingArgs,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "dpe=debug,dpe_predict=debug,tower_http=debug"
    } else {
        "dpe=info,dpe_predict=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Serve {
            model_dir,
            service,
            host,
            port,
            classifier_port,
            regressor_port,
            no_metrics,
            encoding,
        } => {
            let (classifier_port, regressor_port) = match (service, port) {
                (ServiceKind::Classifier, Some(p)) => (p, regressor_port),
                (ServiceKind::Regressor, Some(p)) => (classifier_port, p),
                (ServiceKind::Both, Some(p)) => {
                    tracing::warn!(port = p, "--port ignored when serving both endpoints");
                    (classifier_port, regressor_port)
                }
                (_, None) => (classifier_port, regressor_port),
            };
            let mut config = ServerConfig::default()
                .with_host(host)
                .with_ports(classifier_port, regressor_port)
                .with_strict(encoding.strict)
                .with_metrics(!no_metrics);
            if let Some(category) = encoding.unknown_category {
                config = config.with_unknown_policy(category.into());
            }
            serve::run(&model_dir, service, &config)
        }

        Commands::Check {
            model_dir,
            encoding,
        } => check::run(&model_dir, encoding.load_options(), cli.json),

        Commands::Predict {
            model_dir,
            input,
            encoding,
        } => predict::run(&model_dir, &input, encoding.load_options(), cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
