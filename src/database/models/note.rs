//! Tagged group notes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("tag regex"));

/// Normalize a user-supplied tag: strip a leading `#`, validate, lowercase.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.strip_prefix('#').unwrap_or(raw);
    TAG_RE.is_match(tag).then(|| tag.to_lowercase())
}

/// What a note holds. A note has exactly one body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteBody {
    /// Plain text stored inline.
    Content(String),
    /// Id of the archived message in the repo chat.
    MessageRef(i32),
}

/// A note keyed by `(group_id, tag)` (stored in `group_notes`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNote", into = "RawNote")]
pub struct GroupNote {
    pub group_id: i64,
    pub tag: String,
    pub body: NoteBody,
}

/// A stored note with both or neither body field set.
#[derive(Debug, thiserror::Error)]
#[error("note '{tag}' in group {group_id} must have exactly one of content or message_id")]
pub struct AmbiguousNote {
    pub group_id: i64,
    pub tag: String,
}

/// Document shape of a note.
#[derive(Serialize, Deserialize)]
struct RawNote {
    group_id: i64,
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_id: Option<i32>,
}

impl TryFrom<RawNote> for GroupNote {
    type Error = AmbiguousNote;

    fn try_from(raw: RawNote) -> Result<Self, Self::Error> {
        let body = match (raw.content, raw.message_id) {
            (Some(content), None) => NoteBody::Content(content),
            (None, Some(id)) => NoteBody::MessageRef(id),
            _ => {
                return Err(AmbiguousNote {
                    group_id: raw.group_id,
                    tag: raw.tag,
                })
            }
        };
        Ok(Self {
            group_id: raw.group_id,
            tag: raw.tag,
            body,
        })
    }
}

impl From<GroupNote> for RawNote {
    fn from(note: GroupNote) -> Self {
        let (content, message_id) = match note.body {
            NoteBody::Content(content) => (Some(content), None),
            NoteBody::MessageRef(id) => (None, Some(id)),
        };
        Self {
            group_id: note.group_id,
            tag: note.tag,
            content,
            message_id,
        }
    }
}
