use thiserror::Error;
use xbind_config::{ConfigError, TransportError};

use crate::attrs::AttrError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Attribute error: {0}")]
    Attr(#[from] AttrError),
}
