//! Error types shared across the server.

use std::path::PathBuf;

use thiserror::Error;
use tower_lsp::lsp_types::{Position, Url};

/// Errors raised by document handling, providers and configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// A request referenced a position that does not exist in the document.
    #[error("position {}:{} is outside of {uri}", position.line, position.character)]
    InvalidPosition {
        /// Document the position was resolved against.
        uri: Url,
        /// The offending position.
        position: Position,
    },

    /// The client failed to answer a `workspace/configuration` request.
    #[error("failed to fetch configuration for {uri}: {message}")]
    Configuration {
        /// Scope of the request.
        uri: Url,
        /// Message reported by the transport.
        message: String,
    },

    /// A settings section could not be decoded into its typed view.
    #[error("invalid settings for section '{section}': {source}")]
    Settings {
        /// Section name (`html`, `css`, `javascript`).
        section: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A settings file exists but could not be read.
    #[error("failed to read settings file '{}': {source}", path.display())]
    SettingsFile {
        /// Path of the file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A settings file could not be parsed.
    #[error("failed to parse settings file '{}': {source}", path.display())]
    SettingsParse {
        /// Path of the file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Crate-wide result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
