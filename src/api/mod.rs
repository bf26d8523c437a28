//! PolicyCalc API server module
//!
//! HTTP REST API over the formula registry and table processor.
//! Run with `policycalc-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
