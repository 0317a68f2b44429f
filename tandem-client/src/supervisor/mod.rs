mod client_event;
mod connection_supervisor;
mod supervisor_handle;

pub use client_event::*;
pub use connection_supervisor::*;
pub use supervisor_handle::*;
