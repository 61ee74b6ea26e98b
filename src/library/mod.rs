mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    EntryId, LibraryEntry, LibraryEntryPatch, LibraryError, NewLibraryEntry, OwnerId,
};
pub use store::SqliteLibraryStore;
pub use trait_def::LibraryStore;
