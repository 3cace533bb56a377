//! Notekeeper - verbatim note store
//!
//! A local append-only store that lets a calling agent:
//! - Persist short text records, only after explicit user approval
//! - Retrieve them later by id, kind, or exact substring
//! - Never rewrite, summarize or reorder what was written

pub mod notes;
pub mod prompts;
pub mod protocol;
pub mod server;
pub mod tools;

pub use notes::{Entry, NoteStore};
pub use server::Server;
pub use tools::ToolRegistry;

use std::path::{Path, PathBuf};

/// Environment variable that overrides the notes file location
pub const NOTES_FILE_ENV: &str = "NOTEKEEPER_FILE";

/// Configuration for Notekeeper
#[derive(Debug, Clone)]
pub struct NotesConfig {
    /// Absolute path to the JSONL notes file
    pub notes_file: PathBuf,

    /// Whether to log at debug level
    pub verbose: bool,
}

impl NotesConfig {
    pub fn new(notes_file: PathBuf) -> Self {
        Self {
            notes_file,
            verbose: false,
        }
    }

    /// Resolve the notes file once from an explicit override, the
    /// `NOTEKEEPER_FILE` environment variable, or the per-user default.
    pub fn from_env(explicit: Option<PathBuf>) -> Result<Self> {
        let override_path = explicit.or_else(|| {
            std::env::var_os(NOTES_FILE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });
        let notes_file = resolve_path(
            override_path.as_deref(),
            std::env::current_dir,
            dirs::home_dir().as_deref(),
        )?;
        Ok(Self::new(notes_file))
    }

    pub fn with_notes_file(mut self, path: PathBuf) -> Self {
        self.notes_file = path;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Default log directive when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Pick the notes file: an override (made absolute against the working
/// directory) wins, otherwise `<home>/.notekeeper/notes.jsonl`.
///
/// `cwd` is only called for a relative override.
pub fn resolve_path<F>(override_path: Option<&Path>, cwd: F, home: Option<&Path>) -> Result<PathBuf>
where
    F: FnOnce() -> std::io::Result<PathBuf>,
{
    if let Some(path) = override_path {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        return Ok(cwd()?.join(path));
    }

    let home = home.ok_or_else(|| NotesError::Config("Could not find home directory".to_string()))?;
    Ok(home.join(".notekeeper").join("notes.jsonl"))
}

/// Result type for Notekeeper operations
pub type Result<T> = std::result::Result<T, NotesError>;

/// Errors that can occur in Notekeeper
#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("Not stored: approval is required before writing")]
    ApprovalDenied,

    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
