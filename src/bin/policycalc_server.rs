//! PolicyCalc API Server binary
//!
//! HTTP REST API for formula registry updates, policy table processing,
//! artifact download and document extraction.

use std::path::PathBuf;

use clap::Parser;
use policycalc::api::{run_api_server, ApiConfig, AppState};
use policycalc::config::{ProcessingConfig, CONFIG_ENV};

#[derive(Parser, Debug)]
#[command(name = "policycalc-server")]
#[command(version)]
#[command(about = "PolicyCalc API Server - HTTP REST API for insurance formula processing")]
#[command(long_about = r#"
PolicyCalc API Server - HTTP REST API

Endpoints:
  - GET  /api/v1/formulas            - Active formula set and last run
  - POST /api/v1/formulas            - Replace the active formula set
  - POST /api/v1/process             - Apply formulas to a policy table
  - GET  /api/v1/download/:filename  - Download an output artifact
  - POST /api/v1/extract             - Suggest formulas from a document
  - GET  /api/v1/variables           - Variable vocabulary

Additional endpoints:
  - GET  /health                     - Health check
  - GET  /version                    - Server version info
  - GET  /                           - API documentation

Example usage:
  policycalc-server --formulas formulas.yaml
  policycalc-server --host 0.0.0.0 --port 3000 --config policycalc.yaml

  curl -X POST http://localhost:8080/api/v1/process \
    -H "Content-Type: application/json" \
    -d '{"file_path": "policies.csv"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "POLICYCALC_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "POLICYCALC_PORT")]
    port: u16,

    /// Processing config (YAML)
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Formula file to load at startup
    #[arg(short, long)]
    formulas: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let processing = ProcessingConfig::load(args.config.as_deref())?;
    let state = AppState::new(processing);
    if let Some(path) = &args.formulas {
        state.registry.load_file(path)?;
    }

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config, state).await
}
