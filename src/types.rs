//! Shared data structures for the tagnotes application.
//!
//! This module contains the request/response types of the tag suggestion
//! boundary and the CLI subcommands.
use std::path::PathBuf;

use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::NotesError;

/// A specialized Result type for tagnotes operations.
pub type Result<T> = std::result::Result<T, NotesError>;

/// Input of a single tag suggestion call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSuggestionRequest {
    /// The content of the note
    pub note_content: String,
}

impl TagSuggestionRequest {
    pub fn new(note_content: impl Into<String>) -> Self {
        Self {
            note_content: note_content.into(),
        }
    }
}

/// Structured result the suggestion provider must return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSuggestionResponse {
    /// Suggested tags, in provider order
    pub tags: Vec<String>,
}

/// Available subcommands for the tagnotes application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: String,

        /// Content of the note
        #[clap(short, long)]
        content: Option<String>,

        /// Open content in editor before saving
        #[clap(short, long)]
        edit: bool,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Path to a file containing the note's content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Ask the suggestion service for tags
        #[clap(short, long)]
        suggest: bool,
    },

    /// View a note by ID
    View {
        /// ID of the note to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List notes in creation order
    List {
        /// Filter notes by tag
        #[clap(short, long)]
        tag: Option<String>,

        /// Limit the number of notes returned (0 means no limit)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show note IDs and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: String,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Open content in editor before saving
        #[clap(short, long)]
        edit: bool,

        /// Replace the note's tags (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Path to a file containing the new note content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Replace the note's tags with suggested ones
        #[clap(short, long)]
        suggest: bool,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Print suggested tags without saving anything
    Suggest {
        /// Content to suggest tags for
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Suggest tags for an existing note
        #[clap(long)]
        id: Option<String>,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,
    },
}
