//! Read-only views over a loaded list of entries.

use super::entry::Entry;

/// First entry with this exact id, in insertion order.
pub fn by_id<'a>(entries: &'a [Entry], id: &str) -> Option<&'a Entry> {
    entries.iter().find(|e| e.id == id)
}

/// Entries whose kind equals `kind` exactly. Entries without a kind never match.
pub fn by_kind<'a>(entries: &'a [Entry], kind: &str) -> Vec<&'a Entry> {
    entries
        .iter()
        .filter(|e| e.kind.as_deref() == Some(kind))
        .collect()
}

/// Entries whose text contains `needle` (case-sensitive).
pub fn containing<'a>(entries: &'a [Entry], needle: &str) -> Vec<&'a Entry> {
    entries.iter().filter(|e| e.text.contains(needle)).collect()
}

/// Render one entry. The text goes last, untouched.
pub fn format_one(entry: &Entry) -> String {
    let mut out = format!("id: {}\ntimestamp: {}\n", entry.id, entry.timestamp);
    if let Some(kind) = &entry.kind {
        out.push_str(&format!("kind: {}\n", kind));
    }
    if let Some(file) = &entry.file {
        out.push_str(&format!("file: {}\n", file));
    }
    out.push_str("text:\n");
    out.push_str(&entry.text);
    out
}

/// Render several entries separated by a blank line, or `empty_message`
/// when there are none.
pub fn format_many<'a, I>(entries: I, empty_message: &str) -> String
where
    I: IntoIterator<Item = &'a Entry>,
{
    let rendered: Vec<String> = entries.into_iter().map(format_one).collect();
    if rendered.is_empty() {
        return empty_message.to_string();
    }
    rendered.join("\n\n")
}
