use anyhow::{Context, Result};
use clap::Parser;
use mathapi::api::{self, AppState, ErrorResponse, MathResponse};
use mathapi::client::MathClient;
use mathapi::config::Config;
use mathapi::error::Error;
use mathapi::math::Operation;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "mathapi",
    version,
    about = "Arithmetic service with validated add, subtract, multiply and divide"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Path to config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Bind address override, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,
    },

    /// Evaluate an operation locally and print the result as JSON
    Eval {
        /// add, subtract, multiply or divide
        operation: Operation,

        #[arg(allow_negative_numbers = true)]
        operand1: f64,

        #[arg(allow_negative_numbers = true)]
        operand2: f64,
    },

    /// Evaluate an operation against a running service
    Call {
        /// add, subtract, multiply or divide
        operation: Operation,

        #[arg(allow_negative_numbers = true)]
        operand1: f64,

        #[arg(allow_negative_numbers = true)]
        operand2: f64,

        /// Path to config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Service base URL override
        #[arg(long)]
        url: Option<String>,
    },
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    init_tracing(&config.logging.filter);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, bind } => {
            let mut cfg = load_config(&config)?;
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            cfg.validate()?;
            let addr = cfg.bind_addr()?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            api::serve(listener, Arc::new(AppState::new()), api::shutdown_signal()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Eval {
            operation,
            operand1,
            operand2,
        } => {
            init_tracing("mathapi=warn");
            match operation.apply(operand1, operand2) {
                Ok(result) => print_result(&MathResponse::new(result, operation.label())),
                Err(e) => print_error(&ErrorResponse::new(e.to_string(), 400)),
            }
        }
        Command::Call {
            operation,
            operand1,
            operand2,
            config,
            url,
        } => {
            let mut cfg = load_config(&config)?;
            if let Some(url) = url {
                cfg.client.base_url = url;
            }
            let client = MathClient::from_config(&cfg.client)?;
            info!(url = client.base_url(), %operation, "calling math service");
            match client.evaluate(operation, operand1, operand2).await {
                Ok(response) => print_result(&response),
                Err(Error::Api { status, message }) => {
                    print_error(&ErrorResponse::new(message, status))
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

fn print_result(response: &MathResponse) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(ExitCode::SUCCESS)
}

fn print_error(response: &ErrorResponse) -> Result<ExitCode> {
    eprintln!("{}", serde_json::to_string_pretty(response)?);
    Ok(ExitCode::FAILURE)
}
