mod analysis_routes;
pub mod config;
mod error;
mod http_layers;
mod library_routes;
pub mod metrics;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http_layers::*;
pub use server::{make_app, run_server};
