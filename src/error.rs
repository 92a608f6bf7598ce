use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    ConfigValue { key: &'static str, value: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("no microphone available")]
    NoInputDevice,

    #[error("microphone config unavailable: {0}")]
    InputConfig(#[from] rodio::cpal::DefaultStreamConfigError),

    #[error("failed to open microphone stream: {0}")]
    BuildStream(#[from] rodio::cpal::BuildStreamError),

    #[error("failed to start microphone stream: {0}")]
    PlayStream(#[from] rodio::cpal::PlayStreamError),

    #[error("unsupported microphone sample format {0}")]
    SampleFormat(String),

    #[error("audio output unavailable: {0}")]
    Output(#[from] rodio::StreamError),

    #[error("failed to create audio sink: {0}")]
    Sink(#[from] rodio::PlayError),
}
