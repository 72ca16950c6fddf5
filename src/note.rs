//! Core data structures for the tagnotes application.
//!
//! This module contains the persisted `Note` and the transient `Draft` the
//! user edits before committing.
use serde::{Deserialize, Serialize};

use crate::{generate_note_id, NotesError, Result};

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for the note
    pub id: String,
    /// Note title
    pub title: String,
    /// Note content
    pub content: String,
    /// Tags in the order they were suggested or entered
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    /// Creates a new note with a freshly generated ID.
    ///
    /// Fails with `ValidationError` if the title or content is empty.
    pub fn new(title: String, content: String, tags: Vec<String>) -> Result<Self> {
        validate_fields(&title, &content)?;

        Ok(Note {
            id: generate_note_id(),
            title,
            content,
            tags,
        })
    }
}

/// Checks the commit-time invariant: non-empty title and content.
pub fn validate_fields(title: &str, content: &str) -> Result<()> {
    match (title.trim().is_empty(), content.trim().is_empty()) {
        (true, true) => Err(NotesError::validation("Title and content are required")),
        (true, false) => Err(NotesError::validation("Title is required")),
        (false, true) => Err(NotesError::validation("Content is required")),
        (false, false) => Ok(()),
    }
}

/// Uncommitted note fields. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    /// `Some` when the draft edits an existing note
    pub editing_id: Option<String>,
}

impl Draft {
    /// Starts a draft pre-filled from an existing note
    pub fn from_note(note: &Note) -> Self {
        Draft {
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            editing_id: Some(note.id.clone()),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }
}
