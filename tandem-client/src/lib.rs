mod candidate_buffer;
mod channel;
mod config;
mod error;
mod negotiator;
mod signaling;
mod supervisor;
mod transport;

#[cfg(test)]
mod testing;

pub use candidate_buffer::*;
pub use channel::*;
pub use config::{ClientConfig, DEFAULT_NEGOTIATION_TIMEOUT};
pub use error::NegotiationError;
pub use negotiator::*;
pub use signaling::*;
pub use supervisor::*;
pub use transport::*;
