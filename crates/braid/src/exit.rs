use std::fmt;

use braid_peer::PeerError;
use braid_transport::TransportError;

pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        let code = match err {
            TransportError::UnsupportedNetwork(_) => USAGE,
            _ => TRANSPORT_ERROR,
        };
        CliError::new(code, err.to_string())
    }
}

impl From<PeerError> for CliError {
    fn from(err: PeerError) -> Self {
        match err {
            PeerError::Transport(err) => err.into(),
            PeerError::HandlerNotSet | PeerError::FrameFnNotSet => {
                CliError::new(USAGE, err.to_string())
            }
            other => CliError::new(FAILURE, other.to_string()),
        }
    }
}
