//! Database models.

mod member;
mod note;
mod points;

pub use member::GroupMember;
pub use note::{normalize_tag, AmbiguousNote, GroupNote, NoteBody};
pub use points::PointBalance;
