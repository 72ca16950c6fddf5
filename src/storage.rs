use std::collections::HashSet;

use log::{debug, error, info, trace, warn};

use crate::{note::validate_fields, BlobStore, Note, NotesError, Result};

/// Default key the notes collection is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "notes";

/// Authoritative, ordered collection of notes backed by one blob.
///
/// Every successful mutation rewrites the whole blob. When that write fails
/// the mutation is kept in memory and `PersistenceError` is returned, so the
/// in-memory collection stays the source of truth for the session.
pub struct NoteStore<B: BlobStore> {
    /// Persistence collaborator
    blob: B,

    /// Key of the blob holding the serialized collection
    key: String,

    /// Notes in creation order
    notes: Vec<Note>,
}

impl<B: BlobStore> NoteStore<B> {
    /// Creates a store over `blob` and loads whatever is persisted under `key`.
    pub fn open(blob: B, key: impl Into<String>) -> Self {
        let mut store = Self {
            blob,
            key: key.into(),
            notes: Vec::new(),
        };
        store.load();
        store
    }

    /// Replaces the in-memory collection with the persisted one.
    ///
    /// Never fails: a missing, unreadable or unparseable blob yields an empty
    /// collection.
    ///
    /// # Returns
    ///
    /// The number of notes loaded
    pub fn load(&mut self) -> usize {
        self.notes = match self.blob.read(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Note>>(&raw) {
                Ok(notes) => dedup_ids(notes),
                Err(e) => {
                    warn!(
                        "Stored notes under '{}' could not be parsed, starting empty: {}",
                        self.key, e
                    );
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("No stored notes under '{}'", self.key);
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "Failed to read stored notes under '{}', starting empty: {}",
                    self.key, e
                );
                Vec::new()
            }
        };

        info!("Loaded {} notes from '{}'", self.notes.len(), self.key);
        self.notes.len()
    }

    /// Serializes the whole collection and overwrites the blob.
    pub fn save(&self) -> Result<()> {
        trace!("Serializing {} notes", self.notes.len());
        let json = serde_json::to_string_pretty(&self.notes).map_err(|e| {
            error!("Failed to serialize notes: {}", e);
            self.persistence_error(e)
        })?;

        self.blob.write(&self.key, &json).map_err(|e| {
            error!("Failed to write notes under '{}': {}", self.key, e);
            self.persistence_error(e)
        })?;

        debug!("Saved {} notes under '{}'", self.notes.len(), self.key);
        Ok(())
    }

    /// Appends a new note and persists the collection.
    pub fn create(&mut self, title: String, content: String, tags: Vec<String>) -> Result<Note> {
        let note = Note::new(title, content, tags).map_err(|e| {
            debug!("Rejected new note: {}", e);
            e
        })?;

        self.notes.push(note.clone());
        info!("Created note: {}", note.id);

        self.save()?;
        Ok(note)
    }

    /// Replaces title, content and tags of note `id` in place and persists.
    ///
    /// The note keeps its ID and its position in the list.
    pub fn update(
        &mut self,
        id: &str,
        title: String,
        content: String,
        tags: Vec<String>,
    ) -> Result<Note> {
        validate_fields(&title, &content)?;

        let note = match self.notes.iter_mut().find(|note| note.id == id) {
            Some(note) => note,
            None => {
                error!("Cannot update note {}: Note not found", id);
                return Err(NotesError::NoteNotFound { id: id.to_string() });
            }
        };

        note.title = title;
        note.content = content;
        note.tags = tags;
        let updated = note.clone();
        info!("Updated note: {}", id);

        self.save()?;
        Ok(updated)
    }

    /// Removes note `id` and persists.
    ///
    /// # Returns
    ///
    /// `false` when no such note exists; nothing is written in that case.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.notes.iter().position(|note| note.id == id) else {
            debug!("Delete of unknown note {} ignored", id);
            return Ok(false);
        };

        self.notes.remove(index);
        info!("Deleted note: {}", id);

        self.save()?;
        Ok(true)
    }

    /// Notes in creation order
    pub fn list(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Notes carrying `tag` (case-insensitive, surrounding whitespace ignored), in list order
    pub fn notes_with_tag(&self, tag: &str) -> Vec<&Note> {
        let search_tag = tag.trim().to_lowercase();

        self.notes
            .iter()
            .filter(|note| {
                note.tags
                    .iter()
                    .any(|t| t.trim().to_lowercase() == search_tag)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn persistence_error(&self, cause: impl std::fmt::Display) -> NotesError {
        NotesError::PersistenceError {
            key: self.key.clone(),
            message: cause.to_string(),
        }
    }
}

// A hand-edited blob could repeat an ID; the first occurrence wins.
fn dedup_ids(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    let total = notes.len();
    let unique: Vec<Note> = notes
        .into_iter()
        .filter(|note| seen.insert(note.id.clone()))
        .collect();

    if unique.len() != total {
        warn!("Dropped {} notes with duplicate IDs", total - unique.len());
    }
    unique
}
