//! Top-level CLI error type (§7 ERROR HANDLING DESIGN: "a top-level CLI
//! error that each lower layer converts into via `From` impls, never via
//! downcasting or `anyhow`-style type erasure").

use std::fmt;

/// Everything that can go wrong running the `enumctl` binary: engine
/// failures, config-file loading, and output-sink I/O.
#[derive(Debug)]
pub enum CliError {
    Engine(engine::EngineError),
    Config(ConfigErrorStruct),
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct ConfigErrorStruct {
    path: String,
    msg: String,
}

impl ConfigErrorStruct {
    pub fn new(path: impl Into<String>, msg: impl Into<String>) -> Self {
        ConfigErrorStruct { path: path.into(), msg: msg.into() }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Engine(e) => write!(f, "{e}"),
            CliError::Config(c) => write!(f, "error loading config file {}: {}", c.path, c.msg),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<engine::EngineError> for CliError {
    fn from(err: engine::EngineError) -> Self {
        CliError::Engine(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
