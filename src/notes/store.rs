//! Append-only JSONL note storage.
//!
//! The file is never rewritten. Every read is a full scan, every write is
//! exactly one line appended to the end:
//!   {notes_file}        one encoded `Entry` per line

use super::entry::{decode, encode, Entry};
use crate::{NotesError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Handle to the notes file. Holds only the path, so it is cheap to clone.
#[derive(Debug, Clone)]
pub struct NoteStore {
    path: PathBuf,
}

impl NoteStore {
    /// Create a store for an already-resolved path. Nothing is touched on
    /// disk until the first append.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every entry in file order.
    ///
    /// A missing file is an empty store. A single undecodable line fails the
    /// whole load; partial results are never returned.
    pub async fn load_all(&self) -> Result<Vec<Entry>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Notes file absent, store is empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (index, raw) in content.split(|b| *b == b'\n').enumerate() {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = std::str::from_utf8(raw).map_err(|e| NotesError::MalformedRecord {
                line: index + 1,
                reason: format!("invalid UTF-8: {}", e),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(decode(line, index + 1)?);
        }

        debug!(path = %self.path.display(), count = entries.len(), "Loaded notes");
        Ok(entries)
    }

    /// Append one entry as a single line. Existing content is never touched.
    pub async fn append(&self, entry: &Entry) -> Result<()> {
        ensure_directory(&self.path).await?;

        let mut line = encode(entry)?;
        line.push('\n');

        let mut options = fs::OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        info!(id = %entry.id, kind = ?entry.kind, "Appended note");
        Ok(())
    }

    /// Build a new entry with a fresh id and append it.
    pub async fn create(
        &self,
        text: impl Into<String>,
        file: Option<String>,
        kind: Option<String>,
        timestamp: Option<String>,
    ) -> Result<Entry> {
        let entry = Entry::create(text, file, kind, timestamp);
        self.append(&entry).await?;
        Ok(entry)
    }
}

/// Create the parent directory of `path` (and its ancestors) with
/// owner-only permissions. Succeeds if it already exists.
pub async fn ensure_directory(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(parent).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> NoteStore {
        NoteStore::new(dir.path().join("nested").join("notes.jsonl"))
    }

    #[tokio::test]
    async fn test_load_absent_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load_all().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_append_then_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut appended = Vec::new();
        for i in 0..5 {
            let kind = if i % 2 == 0 { Some("teach.note".to_string()) } else { None };
            appended.push(store.create(format!("note {}", i), None, kind, None).await.unwrap());
        }

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, appended);
    }

    #[tokio::test]
    async fn test_duplicate_text_is_kept() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create("same", None, None, None).await.unwrap();
        store.create("same", None, None, None).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_append_does_not_clobber_existing_content() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create("first", None, None, None).await.unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        store.create("second", None, None, None).await.unwrap();
        let after = std::fs::read_to_string(store.path()).unwrap();

        assert!(after.starts_with(&before));
        assert_eq!(after.lines().count(), 2);
        assert!(after.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_load_handles_crlf_and_blank_lines() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        ensure_directory(store.path()).await.unwrap();
        std::fs::write(
            store.path(),
            "{\"id\":\"a\",\"timestamp\":\"t1\",\"text\":\"one\"}\r\n\r\n\n{\"id\":\"b\",\"timestamp\":\"t2\",\"text\":\"two\"}\r\n",
        )
        .unwrap();

        let entries = store.load_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "one");
        assert_eq!(entries[1].id, "b");
    }

    #[tokio::test]
    async fn test_corrupt_line_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create("good", None, None, None).await.unwrap();

        let mut content = std::fs::read_to_string(store.path()).unwrap();
        content.push_str("this is not json\n");
        std::fs::write(store.path(), content).unwrap();
        store.create("also good", None, None, None).await.unwrap();

        match store.load_all().await {
            Err(NotesError::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_malformed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create("good", None, None, None).await.unwrap();

        let mut content = std::fs::read(store.path()).unwrap();
        content.extend_from_slice(b"{\"id\":\"x\",\"timestamp\":\"t\",\"text\":\"\xff\xfe\"}\n");
        std::fs::write(store.path(), content).unwrap();

        match store.load_all().await {
            Err(NotesError::MalformedRecord { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("invalid UTF-8"));
            }
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ensure_directory_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("notes.jsonl");
        ensure_directory(&path).await.unwrap();
        ensure_directory(&path).await.unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_created_directory_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("private").join("notes.jsonl");
        ensure_directory(&path).await.unwrap();

        let mode = std::fs::metadata(path.parent().unwrap()).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}
