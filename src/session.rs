//! One user's working session: the note store, the single draft and the tag
//! suggestion workflow around it.
//!
//! A suggestion runs in two phases so the draft stays editable while it is
//! pending: [`Session::begin_suggestion`] validates and hands out a
//! [`PendingSuggestion`], and [`Session::finish_suggestion`] applies the
//! outcome. Only one suggestion may be pending at a time; dropping the
//! ticket (or the `suggest_tags` future) releases the slot. Every reset or
//! re-target of the draft bumps its generation; a result that comes back for
//! an older generation is dropped.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info, warn};

use crate::{
    BlobStore, Draft, Note, NoteStore, NotesError, Result, SuggestionProvider,
    TagSuggestionRequest, TagSuggestionResponse, TagSuggestionService,
};

/// Clears the session's in-flight flag when dropped
#[derive(Debug)]
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Ticket for an outstanding suggestion call
#[derive(Debug)]
pub struct PendingSuggestion {
    generation: u64,
    request: TagSuggestionRequest,
    _in_flight: InFlightGuard,
}

impl PendingSuggestion {
    pub fn request(&self) -> &TagSuggestionRequest {
        &self.request
    }
}

pub struct Session<B: BlobStore, P: SuggestionProvider> {
    store: NoteStore<B>,
    suggester: Arc<TagSuggestionService<P>>,
    draft: Draft,
    generation: u64,
    suggestion_in_flight: Arc<AtomicBool>,
}

impl<B: BlobStore, P: SuggestionProvider> Session<B, P> {
    pub fn new(store: NoteStore<B>, suggester: TagSuggestionService<P>) -> Self {
        Self {
            store,
            suggester: Arc::new(suggester),
            draft: Draft::default(),
            generation: 0,
            suggestion_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &NoteStore<B> {
        &self.store
    }

    pub fn notes(&self) -> &[Note] {
        self.store.list()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Shared handle to the suggestion service, for running a pending
    /// suggestion on another task.
    pub fn suggester(&self) -> Arc<TagSuggestionService<P>> {
        Arc::clone(&self.suggester)
    }

    pub fn is_suggestion_in_flight(&self) -> bool {
        self.suggestion_in_flight.load(Ordering::Acquire)
    }

    /// Discards the draft and starts an empty one for a new note.
    pub fn new_draft(&mut self) {
        self.reset_draft(Draft::default());
    }

    /// Loads note `id` into the draft for editing.
    pub fn start_editing(&mut self, id: &str) -> Result<()> {
        let note = self
            .store
            .get(id)
            .ok_or_else(|| NotesError::NoteNotFound { id: id.to_string() })?;

        let draft = Draft::from_note(note);
        debug!("Editing note {}", id);
        self.reset_draft(draft);
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        if let Some(id) = &self.draft.editing_id {
            debug!("Cancelled edit of note {}", id);
        }
        self.new_draft();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.draft.tags = tags;
    }

    /// Validates the draft content and marks a suggestion as in flight.
    pub fn begin_suggestion(&mut self) -> Result<PendingSuggestion> {
        if self.draft.content.trim().is_empty() {
            return Err(NotesError::validation(
                "Please enter some content to suggest tags",
            ));
        }
        if self
            .suggestion_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(NotesError::SuggestionInFlight);
        }

        Ok(PendingSuggestion {
            generation: self.generation,
            request: TagSuggestionRequest::new(self.draft.content.clone()),
            _in_flight: InFlightGuard {
                flag: Arc::clone(&self.suggestion_in_flight),
            },
        })
    }

    /// Applies the outcome of a pending suggestion.
    ///
    /// On success the draft's tags are replaced, unless the draft was reset
    /// since the suggestion began (`Ok(false)`). On failure the draft is left
    /// untouched and the error is returned.
    pub fn finish_suggestion(
        &mut self,
        pending: PendingSuggestion,
        outcome: Result<TagSuggestionResponse>,
    ) -> Result<bool> {
        let generation = pending.generation;
        drop(pending);
        let response = outcome?;

        if generation != self.generation {
            warn!(
                "Discarding {} suggested tags for a draft that is no longer active",
                response.tags.len()
            );
            return Ok(false);
        }

        info!("Applied {} suggested tags to draft", response.tags.len());
        self.draft.tags = response.tags;
        Ok(true)
    }

    /// Runs a suggestion for the current draft and applies it.
    pub async fn suggest_tags(&mut self) -> Result<bool> {
        let pending = self.begin_suggestion()?;
        let suggester = self.suggester();
        let outcome = suggester.suggest(pending.request()).await;
        self.finish_suggestion(pending, outcome)
    }

    /// Commits the draft: creates a note, or updates the note being edited.
    ///
    /// The draft is reset once the store holds the change, including when
    /// only the blob write failed. Validation and not-found errors leave the
    /// draft as it was.
    pub fn commit(&mut self) -> Result<Note> {
        let Draft {
            title,
            content,
            tags,
            editing_id,
        } = self.draft.clone();

        let result = match editing_id {
            Some(id) => self.store.update(&id, title, content, tags),
            None => self.store.create(title, content, tags),
        };

        match result {
            Ok(note) => {
                self.new_draft();
                Ok(note)
            }
            Err(e @ NotesError::PersistenceError { .. }) => {
                self.new_draft();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes note `id`. A draft editing that note is discarded.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let result = self.store.delete(id);

        let removed = matches!(result, Ok(true) | Err(NotesError::PersistenceError { .. }));
        if removed && self.draft.editing_id.as_deref() == Some(id) {
            self.new_draft();
        }
        result
    }

    fn reset_draft(&mut self, draft: Draft) {
        self.draft = draft;
        self.generation += 1;
    }
}
