//! Tool surface exposed to the calling agent
//!
//! Write tools refuse to touch the store unless the caller passes
//! `approved: true`. Read tools never write. The echo tools hand the
//! question back exactly as received.

use crate::notes::{self, Entry, NoteStore, KIND_TEACH_NOTE, KIND_TEACH_REQUEST};
use crate::protocol::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::{NotesError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Returned instead of writing when `approved` is false
pub const APPROVAL_CAUTION: &str = "Not stored. Show the user the exact text that would be saved, \
ask them to confirm it word for word, then call this tool again with approved=true. \
Do not summarize or rephrase the text.";

pub const NO_NOTES_MESSAGE: &str = "No notes stored yet.";

/// A named operation of the tool surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    StoreNote,
    ListNotes,
    ListNotesByKind,
    GetNote,
    FindNotes,
    StoreTeachRequest,
    StoreTeachNote,
    EchoQuestion,
    EchoTeachQuestion,
}

impl Tool {
    pub const ALL: [Tool; 9] = [
        Tool::StoreNote,
        Tool::ListNotes,
        Tool::ListNotesByKind,
        Tool::GetNote,
        Tool::FindNotes,
        Tool::StoreTeachRequest,
        Tool::StoreTeachNote,
        Tool::EchoQuestion,
        Tool::EchoTeachQuestion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::StoreNote => "store_note",
            Self::ListNotes => "list_notes",
            Self::ListNotesByKind => "list_notes_by_kind",
            Self::GetNote => "get_note",
            Self::FindNotes => "find_notes",
            Self::StoreTeachRequest => "store_teach_request",
            Self::StoreTeachNote => "store_teach_note",
            Self::EchoQuestion => "echo_question",
            Self::EchoTeachQuestion => "echo_teach_question",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Whether the tool appends to the store (and so needs approval)
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::StoreNote | Self::StoreTeachRequest | Self::StoreTeachNote
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::StoreNote => {
                "Append a note exactly as the user wrote it. Requires approved=true after the user \
                 confirmed the verbatim text."
            }
            Self::ListNotes => "List every stored note in the order it was written.",
            Self::ListNotesByKind => "List stored notes whose kind matches exactly.",
            Self::GetNote => "Show one stored note by id.",
            Self::FindNotes => "List stored notes whose text contains the given string (case-sensitive).",
            Self::StoreTeachRequest => {
                "Store a question the user wants to be taught about (kind teach.request). \
                 Requires approved=true."
            }
            Self::StoreTeachNote => {
                "Store a lesson the user wants remembered (kind teach.note). Requires approved=true."
            }
            Self::EchoQuestion => "Return the question unchanged, so it can be shown to the user verbatim.",
            Self::EchoTeachQuestion => {
                "Return the teaching question unchanged, so it can be shown to the user verbatim."
            }
        }
    }

    pub fn input_schema(self) -> Value {
        let optional_file = json!({ "type": "string", "description": "Source file or location the note refers to" });
        let optional_timestamp = json!({ "type": "string", "description": "ISO-8601 timestamp; defaults to now" });
        let approved = json!({ "type": "boolean", "description": "True only after the user approved the exact text" });

        match self {
            Self::StoreNote => json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Verbatim note text" },
                    "approved": approved,
                    "file": optional_file,
                    "timestamp": optional_timestamp,
                    "kind": { "type": "string", "description": "Free-form category tag" }
                },
                "required": ["text", "approved"]
            }),
            Self::ListNotes => json!({ "type": "object", "properties": {} }),
            Self::ListNotesByKind => json!({
                "type": "object",
                "properties": { "kind": { "type": "string" } },
                "required": ["kind"]
            }),
            Self::GetNote => json!({
                "type": "object",
                "properties": { "id": { "type": "string" } },
                "required": ["id"]
            }),
            Self::FindNotes => json!({
                "type": "object",
                "properties": { "needle": { "type": "string", "description": "Case-sensitive substring" } },
                "required": ["needle"]
            }),
            Self::StoreTeachRequest => json!({
                "type": "object",
                "properties": {
                    "question": { "type": "string", "description": "Verbatim question" },
                    "approved": approved,
                    "file": optional_file,
                    "timestamp": optional_timestamp
                },
                "required": ["question", "approved"]
            }),
            Self::StoreTeachNote => json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Verbatim lesson text" },
                    "approved": approved,
                    "file": optional_file,
                    "timestamp": optional_timestamp
                },
                "required": ["text", "approved"]
            }),
            Self::EchoQuestion | Self::EchoTeachQuestion => json!({
                "type": "object",
                "properties": { "question": { "type": "string" } },
                "required": ["question"]
            }),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
            annotations: ToolAnnotations {
                read_only_hint: !self.is_write(),
                // Writes only ever append
                destructive_hint: false,
                idempotent_hint: !self.is_write(),
            },
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreNoteArgs {
    pub text: String,
    pub approved: bool,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreTeachRequestArgs {
    pub question: String,
    pub approved: bool,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreTeachNoteArgs {
    pub text: String,
    pub approved: bool,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct KindArgs {
    kind: String,
}

#[derive(Debug, Clone, Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FindArgs {
    needle: String,
}

#[derive(Debug, Clone, Deserialize)]
struct QuestionArgs {
    question: String,
}

/// Dispatches tool calls onto the note store
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    store: NoteStore,
}

impl ToolRegistry {
    pub fn new(store: NoteStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        Tool::ALL.into_iter().map(Tool::definition).collect()
    }

    /// Run a tool by name.
    ///
    /// Unknown tools and bad arguments are returned as `Err` (a protocol
    /// error). A refused write or a failing store becomes a tool result
    /// flagged `is_error`.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult> {
        let tool = Tool::from_name(name).ok_or_else(|| NotesError::UnknownTool(name.to_string()))?;
        debug!(tool = %tool, "Calling tool");

        match self.run(tool, arguments).await {
            Ok(text) => Ok(CallToolResult::text(text)),
            Err(NotesError::ApprovalDenied) => {
                info!(tool = %tool, "Write refused: not approved");
                Ok(CallToolResult::error(APPROVAL_CAUTION))
            }
            Err(e @ (NotesError::InvalidParams(_) | NotesError::UnknownTool(_))) => Err(e),
            Err(e) => {
                warn!(tool = %tool, error = %e, "Tool failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }

    async fn run(&self, tool: Tool, arguments: Option<Value>) -> Result<String> {
        match tool {
            Tool::StoreNote => {
                let entry = self.store_note(parse_args(arguments)?).await?;
                Ok(format!("Stored note {}.", entry.id))
            }
            Tool::ListNotes => self.list_notes().await,
            Tool::ListNotesByKind => {
                let args: KindArgs = parse_args(arguments)?;
                self.list_notes_by_kind(&args.kind).await
            }
            Tool::GetNote => {
                let args: IdArgs = parse_args(arguments)?;
                self.get_note(&args.id).await
            }
            Tool::FindNotes => {
                let args: FindArgs = parse_args(arguments)?;
                self.find_notes(&args.needle).await
            }
            Tool::StoreTeachRequest => {
                let entry = self.store_teach_request(parse_args(arguments)?).await?;
                Ok(notes::format_one(&entry))
            }
            Tool::StoreTeachNote => {
                let entry = self.store_teach_note(parse_args(arguments)?).await?;
                Ok(notes::format_one(&entry))
            }
            Tool::EchoQuestion | Tool::EchoTeachQuestion => {
                let args: QuestionArgs = parse_args(arguments)?;
                Ok(echo(args.question))
            }
        }
    }

    pub async fn store_note(&self, args: StoreNoteArgs) -> Result<Entry> {
        require_approval(args.approved)?;
        self.store
            .create(args.text, args.file, args.kind, args.timestamp)
            .await
    }

    pub async fn store_teach_request(&self, args: StoreTeachRequestArgs) -> Result<Entry> {
        require_approval(args.approved)?;
        self.store
            .create(
                args.question,
                args.file,
                Some(KIND_TEACH_REQUEST.to_string()),
                args.timestamp,
            )
            .await
    }

    pub async fn store_teach_note(&self, args: StoreTeachNoteArgs) -> Result<Entry> {
        require_approval(args.approved)?;
        self.store
            .create(
                args.text,
                args.file,
                Some(KIND_TEACH_NOTE.to_string()),
                args.timestamp,
            )
            .await
    }

    pub async fn list_notes(&self) -> Result<String> {
        let entries = self.store.load_all().await?;
        Ok(notes::format_many(&entries, NO_NOTES_MESSAGE))
    }

    pub async fn list_notes_by_kind(&self, kind: &str) -> Result<String> {
        let entries = self.store.load_all().await?;
        Ok(notes::format_many(
            notes::by_kind(&entries, kind),
            &format!("No notes found for kind {}.", kind),
        ))
    }

    /// A missing id is a normal answer, not an error.
    pub async fn get_note(&self, id: &str) -> Result<String> {
        let entries = self.store.load_all().await?;
        Ok(match notes::by_id(&entries, id) {
            Some(entry) => notes::format_one(entry),
            None => format!("No note found with id {}.", id),
        })
    }

    pub async fn find_notes(&self, needle: &str) -> Result<String> {
        let entries = self.store.load_all().await?;
        Ok(notes::format_many(
            notes::containing(&entries, needle),
            &format!("No notes contain \"{}\".", needle),
        ))
    }
}

/// Identity. The question is handed back exactly as received.
pub fn echo(question: String) -> String {
    question
}

fn require_approval(approved: bool) -> Result<()> {
    if approved {
        Ok(())
    } else {
        Err(NotesError::ApprovalDenied)
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T> {
    let value = arguments.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|e| NotesError::InvalidParams(e.to_string()))
}
