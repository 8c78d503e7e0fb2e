use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("failed to launch emulator {}: {source}", .binary.display())]
    ProcessLaunchFailed {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no handshake from control script within {0:?}")]
    StartupTimeout(Duration),

    #[error("timeout waiting for response to `{0}`")]
    CommandTimeout(String),

    #[error("transport error during {context}: {source}")]
    TransportError {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to load state: {0:?}")]
    LoadStateFailed(String),

    #[error("failed to decode screen: {0}")]
    DecodeError(String),

    #[error("failed to encode screen: {0}")]
    EncodeError(String),

    #[error("unknown game phase: {0}")]
    UnknownPhase(String),

    #[error("malformed state record: {0}")]
    MalformedState(String),

    #[error("emulator channel is closed")]
    ChannelClosed,

    #[error("emulator did not exit within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0} environment variable is required, see README.md")]
    MissingSetting(&'static str),

    #[error("invalid value {value:?} for {name}")]
    InvalidSetting { name: &'static str, value: String },
}

impl Error {
    pub(crate) fn transport(context: impl Into<String>, source: io::Error) -> Self {
        Error::TransportError {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
