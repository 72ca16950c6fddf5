//! CLI module for the tagnotes application
//!
//! This module handles the command-line interface for interacting with the
//! note session.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info, warn};
use shell_words::split;
use tempfile::Builder;

use crate::{
    content_preview, parse_tags, Commands, Config, FileBlobStore, HttpSuggestionProvider, Note,
    NoteStore, NotesError, Result, Session, TagSuggestionRequest, TagSuggestionService,
};

const PREVIEW_CHARS: usize = 100;
const EDITOR_COMMENT: &str = "<!-- Write your note content below. Lines starting with <!-- are ignored. -->";

/// CLI Application handler - processes CLI commands against one session
pub struct App {
    /// The note session (store, draft, suggestions)
    session: Session<FileBlobStore, HttpSuggestionProvider>,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Opens the notes blob under `config.data_dir` and wires the suggestion provider
    pub fn from_config(config: Config, verbose: bool) -> Result<Self> {
        let blob = FileBlobStore::new(&config.data_dir);
        info!("Using notes directory {}", blob.dir().display());
        let store = NoteStore::open(blob, &config.storage_key);
        debug!("{} notes available under '{}'", store.len(), store.key());

        let provider = HttpSuggestionProvider::new(&config.suggestion)?;
        let session = Session::new(store, TagSuggestionService::new(provider));

        Ok(Self {
            session,
            config,
            verbose,
        })
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                content,
                edit,
                tags,
                file,
                suggest,
            } => {
                self.create_note(title, content, file, tags, edit, suggest)
                    .await?
            }

            Commands::View { id, json } => self.view_note(&id, json)?,

            Commands::List {
                tag,
                limit,
                json,
                brief,
            } => self.list_notes(tag, limit, json, brief)?,

            Commands::Edit {
                id,
                title,
                content,
                edit,
                tags,
                file,
                suggest,
            } => {
                self.handle_edit(id, title, content, file, tags, edit, suggest)
                    .await?
            }

            Commands::Delete { id, force } => self.handle_delete(id, force)?,

            Commands::Suggest { content, file, id } => {
                self.handle_suggest(content, file, id).await?
            }

            Commands::Config { show } => {
                if show || self.verbose {
                    println!("{}", serde_json::to_string_pretty(&self.config)?);
                } else {
                    println!("Use --show to print the effective configuration.");
                }
            }
        }

        Ok(())
    }

    async fn create_note(
        &mut self,
        title: String,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        open_editor: bool,
        suggest: bool,
    ) -> Result<()> {
        check_content_sources(content.is_some(), file.is_some(), open_editor)?;

        let note_content = match (content, file) {
            (Some(c), _) => c,
            (_, Some(file_path)) => self.read_content_from_file(&file_path)?,
            (None, None) => {
                if open_editor {
                    self.open_editor_with_content(&title, "")?
                } else {
                    return Err(NotesError::validation(
                        "Content is required (use --content, --file or --edit)",
                    ));
                }
            }
        };

        self.session.new_draft();
        self.session.set_title(title);
        self.session.set_content(note_content);
        self.session.set_tags(parse_tags(tags));

        if suggest {
            self.apply_suggestion().await;
        }

        let note = self.session.commit()?;
        println!("Note created with ID: {}", note.id);
        Ok(())
    }

    /// Asks for suggested tags for the draft. Failures are reported and the
    /// draft keeps its tags.
    async fn apply_suggestion(&mut self) {
        debug!(
            "Requesting tag suggestions from {}",
            self.session.suggester().provider().endpoint()
        );
        match self.session.suggest_tags().await {
            Ok(_) => {
                let tags = &self.session.draft().tags;
                if tags.is_empty() {
                    println!("No tags were suggested.");
                } else {
                    println!("Suggested tags: {}", format_tags(tags));
                }
            }
            Err(e) => {
                warn!("Keeping existing tags: {}", e);
                eprintln!("Could not suggest tags: {}", e);
            }
        }
    }

    fn view_note(&self, id: &str, json: bool) -> Result<()> {
        let note = self
            .session
            .store()
            .get(id)
            .ok_or_else(|| NotesError::NoteNotFound { id: id.to_string() })?;

        if json {
            println!("{}", serde_json::to_string_pretty(note)?);
        } else {
            print_note_header(note);
            println!("\n{}", note.content);
        }
        Ok(())
    }

    /// List notes in creation order, optionally filtered by tag
    fn list_notes(&self, tag: Option<String>, limit: usize, json: bool, brief: bool) -> Result<()> {
        let store = self.session.store();
        let mut notes: Vec<&Note> = match &tag {
            Some(tag) => store.notes_with_tag(tag),
            None => store.list().iter().collect(),
        };

        // 0 means no limit
        if limit > 0 && notes.len() > limit {
            notes.truncate(limit);
        }

        if notes.is_empty() {
            println!("No notes created yet.");
            return Ok(());
        }

        if json {
            self.display_notes_json(&notes, brief)?;
        } else {
            self.display_notes_text(&notes, brief);
            println!(
                "\nFound {} note{}",
                notes.len(),
                if notes.len() == 1 { "" } else { "s" }
            );
        }

        Ok(())
    }

    /// Display notes in JSON format
    fn display_notes_json(&self, notes: &[&Note], brief: bool) -> Result<()> {
        if brief {
            let simplified: Vec<serde_json::Value> = notes
                .iter()
                .map(|note| serde_json::json!({ "id": note.id, "title": note.title }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&simplified)?);
        } else {
            println!("{}", serde_json::to_string_pretty(notes)?);
        }
        Ok(())
    }

    /// Display notes in text format
    fn display_notes_text(&self, notes: &[&Note], brief: bool) {
        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if brief {
                println!("{}  {}", note.id, console::style(&note.title).bold());
                continue;
            }

            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            print_note_header(note);

            let preview = content_preview(&note.content, PREVIEW_CHARS.min(term_width));
            if !preview.is_empty() {
                println!("\n{}", preview);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_edit(
        &mut self,
        id: String,
        title: Option<String>,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        open_editor: bool,
        suggest: bool,
    ) -> Result<()> {
        check_content_sources(content.is_some(), file.is_some(), open_editor)?;

        self.session.start_editing(&id)?;

        if let Some(new_title) = title {
            self.session.set_title(new_title);
        }

        if let Some(new_content) = content {
            self.session.set_content(new_content);
        } else if let Some(file_path) = file {
            let new_content = self.read_content_from_file(&file_path)?;
            self.session.set_content(new_content);
            println!("Content updated from file: {}", file_path.display());
        } else if open_editor {
            let draft = self.session.draft();
            let new_content = self.open_editor_with_content(&draft.title, &draft.content)?;
            self.session.set_content(new_content);
            println!("Content updated from editor");
        }

        if tags.is_some() {
            self.session.set_tags(parse_tags(tags));
        }

        if suggest {
            self.apply_suggestion().await;
        }

        let note = self.session.commit()?;
        println!("Note {} updated successfully", note.id);
        Ok(())
    }

    fn handle_delete(&mut self, id: String, force: bool) -> Result<()> {
        // Step 1: Fetch the note to be deleted (to verify it exists and show details in the prompt)
        let note = match self.session.store().get(&id) {
            Some(note) => note.clone(),
            None => return Err(NotesError::NoteNotFound { id }),
        };

        // Step 2: Show note details and prompt for confirmation (unless force flag is set)
        if !force {
            println!("You are about to delete the following note:");
            print_note_header(&note);

            let preview = note.content.lines().take(2).collect::<Vec<_>>().join("\n");
            println!("\nContent preview:");
            println!(
                "{}{}",
                preview,
                if note.content.lines().count() > 2 {
                    "..."
                } else {
                    ""
                }
            );

            println!("\nThis action cannot be undone!");
            print!("Are you sure you want to delete this note? [y/N]: ");
            stdout().flush()?;

            let mut input = String::new();
            stdin().read_line(&mut input)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        // Step 3: Delete the note
        self.session.delete(&id)?;

        println!(
            "Note '{}' ({}) has been permanently deleted.",
            note.title, note.id
        );
        Ok(())
    }

    async fn handle_suggest(
        &self,
        content: Option<String>,
        file: Option<PathBuf>,
        id: Option<String>,
    ) -> Result<()> {
        let content = match (content, file, id) {
            (Some(c), None, None) => c,
            (None, Some(path), None) => self.read_content_from_file(&path)?,
            (None, None, Some(id)) => match self.session.store().get(&id) {
                Some(note) => note.content.clone(),
                None => return Err(NotesError::NoteNotFound { id }),
            },
            _ => {
                return Err(NotesError::validation(
                    "Give exactly one of --content, --file and --id",
                ))
            }
        };

        let response = self
            .session
            .suggester()
            .suggest(&TagSuggestionRequest::new(content))
            .await?;

        for tag in &response.tags {
            println!("{}", tag);
        }
        Ok(())
    }

    // Helper function for reading content from file
    fn read_content_from_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(NotesError::FileNotFound {
                file_path: path.display().to_string(),
            });
        }

        read_to_string(path).map_err(NotesError::Io)
    }

    fn open_editor_with_content(&self, title: &str, existing_content: &str) -> Result<String> {
        // Create a temporary file with .md extension
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        {
            let mut file = OpenOptions::new().write(true).open(&temp_path)?;
            writeln!(file, "<!-- {} -->", title)?;
            writeln!(file, "{}", EDITOR_COMMENT)?;
            write!(file, "{}", existing_content)?;
        }

        let editor_cmd = self.config.get_editor_command();
        info!("Opening editor to write note content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(strip_editor_comments(&content))
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        // Handle shell-like command parsing
        let args = split(editor_cmd).map_err(|e| NotesError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let Some((program, extra_args)) = args.split_first() else {
            return Err(NotesError::EditorError {
                message: "Empty editor command".to_string(),
            });
        };

        let status = Command::new(program)
            .args(extra_args)
            .arg(file_path)
            .status()?;

        if !status.success() {
            return Err(NotesError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }
}

/// At most one of `--content`, `--file` and `--edit` may be given
fn check_content_sources(content: bool, file: bool, open_editor: bool) -> Result<()> {
    let content_sources = [content, file, open_editor]
        .iter()
        .filter(|set| **set)
        .count();
    if content_sources > 1 {
        return Err(NotesError::validation(
            "Use only one of --content, --file and --edit",
        ));
    }
    Ok(())
}

fn print_note_header(note: &Note) {
    println!("ID: {}", note.id);
    println!("Title: {}", console::style(&note.title).bold());
    if !note.tags.is_empty() {
        println!("Tags: {}", console::style(format_tags(&note.tags)).cyan());
    }
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

// Remove HTML comment lines left by the editor template
fn strip_editor_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !(line.trim_start().starts_with("<!--") && line.trim_end().ends_with("-->")))
        .collect::<Vec<&str>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_comments_are_stripped() {
        let raw = "<!-- Groceries -->\n<!-- hint -->\nbuy milk\n\n<b>eggs</b>\n";
        assert_eq!(strip_editor_comments(raw), "buy milk\n\n<b>eggs</b>");
    }

    #[test]
    fn conflicting_content_sources_are_rejected() {
        assert!(check_content_sources(true, false, false).is_ok());
        assert!(check_content_sources(false, false, true).is_ok());
        assert!(check_content_sources(false, false, false).is_ok());

        for (content, file, open_editor) in [(true, true, false), (true, false, true), (false, true, true)] {
            assert!(matches!(
                check_content_sources(content, file, open_editor),
                Err(NotesError::ValidationError { .. })
            ));
        }
    }

    #[tokio::test]
    async fn create_with_content_and_file_saves_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let mut app = App::from_config(config, false).unwrap();

        let result = app
            .run(Commands::Create {
                title: "Groceries".to_string(),
                content: Some("buy milk".to_string()),
                edit: false,
                tags: None,
                file: Some(dir.path().join("body.txt")),
                suggest: false,
            })
            .await;

        assert!(matches!(result, Err(NotesError::ValidationError { .. })));
        assert!(app.session.notes().is_empty());
        assert!(!dir.path().join("notes.json").exists());
    }

    #[test]
    fn tags_render_as_hashtags() {
        assert_eq!(
            format_tags(&["shopping".to_string(), "food".to_string()]),
            "#shopping #food"
        );
    }
}
