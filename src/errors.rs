//! Error types for the tagnotes application.
//!
//! This module defines custom error types that categorize different failures
//! that can occur during note management and tag suggestion.

use std::io;

use thiserror::Error;

/// The main error type for the tagnotes application.
#[derive(Error, Debug)]
pub enum NotesError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected user input (empty title, empty content).
    #[error("Validation failed: {message}")]
    ValidationError { message: String },

    /// The suggestion provider could not produce tags.
    #[error("Tag suggestion failed: {0}")]
    SuggestionFailed(#[from] SuggestionError),

    /// A suggestion is already pending for this session.
    #[error("A tag suggestion is already in progress")]
    SuggestionInFlight,

    /// Writing the notes blob failed. The in-memory state still holds the change.
    #[error("Failed to save notes under '{key}', changes may not have been saved: {message}")]
    PersistenceError { key: String, message: String },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// file not found
    #[error("File not found: {file_path}")]
    FileNotFound { file_path: String },

    #[error("{message}")]
    EditorError { message: String },
}

impl NotesError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        NotesError::ValidationError {
            message: message.into(),
        }
    }
}

/// Underlying cause of a failed tag suggestion.
#[derive(Error, Debug)]
pub enum SuggestionError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    /// The provider answered, but not with `{ "tags": [string] }`.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
}
