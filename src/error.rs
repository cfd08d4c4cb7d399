use std::{fmt, path::PathBuf};

use mirajazz::error::MirajazzError;
use thiserror::Error;
use tokio::sync::mpsc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Capacity of the shared error channel, sized for short bursts
pub const REPORT_CAPACITY: usize = 5;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("no control surface found with serial {0}")]
    DeviceNotFound(String),

    #[error("device error: {0}")]
    Device(#[from] MirajazzError),

    #[error("asset {name}_{state} is missing")]
    AssetMissing { name: &'static str, state: bool },

    #[error("failed to load asset {path}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },

    #[error("scene {0:?} is not in the scene list")]
    SceneNotFound(String),

    #[error("no scene in slot {0}")]
    SceneSlotEmpty(usize),

    #[error("remote call failed: {0}")]
    RemoteCall(#[source] BoxError),

    #[error("remote reported an error: {0}")]
    RemoteEvent(String),

    #[error("event stream of instance {0} closed")]
    EventStreamClosed(u8),

    #[error("failed to write key image: {0}")]
    DeviceWrite(#[source] BoxError),
}

impl BridgeError {
    /// Device errors other than malformed data mean the device is gone
    pub fn is_device_lost(&self) -> bool {
        match self {
            BridgeError::Device(err) => {
                !matches!(err, MirajazzError::ImageError(_) | MirajazzError::BadData)
            }
            _ => false,
        }
    }
}

impl From<obws::error::Error> for BridgeError {
    fn from(err: obws::error::Error) -> Self {
        BridgeError::RemoteCall(Box::new(err))
    }
}

/// Component an error was reported from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Remote(u8),
    Input,
    Device,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Remote(index) => write!(f, "instance {}", index),
            Origin::Input => write!(f, "input listener"),
            Origin::Device => write!(f, "device"),
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub origin: Origin,
    pub error: BridgeError,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.origin, self.error)
    }
}

/// Producer side of the shared error channel. Never blocks the caller.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: mpsc::Sender<Report>,
}

impl Reporter {
    pub fn channel() -> (Reporter, mpsc::Receiver<Report>) {
        let (tx, rx) = mpsc::channel(REPORT_CAPACITY);

        (Reporter { tx }, rx)
    }

    pub fn report(&self, origin: Origin, error: BridgeError) {
        let report = Report { origin, error };

        match self.tx.try_send(report) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(report)) => {
                log::warn!("Error channel is full, dropping: {}", report);
            }
            Err(mpsc::error::TrySendError::Closed(report)) => {
                log::debug!("Error channel closed, dropping: {}", report);
            }
        }
    }
}
