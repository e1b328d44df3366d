pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod transport;

pub use config::{ConfigError, Configurable};
pub use transport::{AbstractTransport, Transport, TransportError};
