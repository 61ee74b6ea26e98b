//! LibraryStore trait definition.

use super::models::{EntryId, LibraryEntry, LibraryEntryPatch, NewLibraryEntry, OwnerId};
use anyhow::Result;

/// Trait for library storage backends.
pub trait LibraryStore: Send + Sync {
    /// All entries of an owner, newest first.
    fn list(&self, owner: &OwnerId) -> Result<Vec<LibraryEntry>>;

    fn get(&self, id: &EntryId) -> Result<Option<LibraryEntry>>;

    /// Stores a new entry with a freshly generated id.
    ///
    /// Fails with a [`super::LibraryError::Validation`] when title or artist
    /// is blank or metadata is not a JSON object.
    fn create(&self, owner: &OwnerId, entry: NewLibraryEntry) -> Result<LibraryEntry>;

    /// Applies a partial update and refreshes `updated_at`.
    /// Returns `None` if the entry does not exist.
    fn update(&self, id: &EntryId, patch: LibraryEntryPatch) -> Result<Option<LibraryEntry>>;

    /// Returns whether an entry was deleted.
    fn delete(&self, id: &EntryId) -> Result<bool>;

    fn count(&self, owner: &OwnerId) -> Result<usize>;
}
