mod app;
mod config;
mod registry;
mod room;
mod signaling;

pub use app::{build_router, serve, serve_with_listener};
pub use config::{ConfigError, ServerConfig};
pub use registry::*;
pub use room::*;
pub use signaling::*;
