mod signal_link;
mod ws_connector;

pub use signal_link::*;
pub use ws_connector::*;
