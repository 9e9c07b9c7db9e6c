//! Records with a stable identity.

use core::fmt;

/// A persisted record addressed by a typed id.
///
/// Stores key their tables by `Id` (ordered, so listings are deterministic)
/// and use `KIND` when reporting a missing record.
pub trait Entity {
    /// Human-readable record kind, e.g. `"kit"`.
    const KIND: &'static str;

    type Id: Copy + Ord + fmt::Debug + fmt::Display;

    fn id(&self) -> Self::Id;

    /// `"<kind> <id>"`, for log and error messages.
    fn label(&self) -> String {
        format!("{} {}", Self::KIND, self.id())
    }
}
