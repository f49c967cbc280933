//! cloudshelf - hierarchical file and folder metadata store.
//!
//! Users own a tree of files and folders. Folder sizes are live aggregates
//! of their contents, items move through trash before permanent deletion,
//! and private items can be shared with other users. File content lives in
//! an external blob store addressed by opaque locators.

pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod item;
pub mod logging;

pub use blob::{BlobReclaimer, BlobStore, LocalBlobStore, MemoryBlobStore, ReclaimStats};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository, UserSummary};
pub use error::{ErrorCode, Result, ShelfError};
pub use item::{
    CountSummary, DeleteOutcome, Item, ItemEdit, ItemEntry, ItemFilter, ItemInfo, ItemQuery,
    ItemService, Lifecycle, MediaType, NewFile, NewFolder, ShareOutcome,
};
