use std::any::Any;
use std::io;
use std::str::Utf8Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Invalid config: {reason}")]
    Invalid { reason: String },

    #[error("Failed to decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to start application (runtime): {source}")]
    Runtime { #[from] source: io::Error },

    #[error("Failed to start application (bluetooth): {source}")]
    Discovery { #[from] source: DiscoveryError },
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Error communicating with adapter (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No bluetooth adapter at index {index}")]
    NoAdapter { index: usize },
}

#[derive(Error, Debug)]
pub enum PermissionError {
    #[error("Error querying bluetooth permission (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },
}

pub fn readable_panic_error(error: &Box<dyn Any + Send + 'static>) -> String {
    let mut stringified = String::from("???");

    if let Some(s) = error.downcast_ref::<&str>() {
        stringified = s.to_string();
    }
    else if let Some(s) = error.downcast_ref::<String>() {
        stringified = s.clone();
    }

    format!("panic from task: [{}]", stringified)
}
