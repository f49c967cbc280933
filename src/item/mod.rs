//! Item module for cloudshelf.
//!
//! This module provides the hierarchical item store:
//! - Files and folders owned by users, nested in a per-owner tree
//! - Folder sizes aggregated from their children
//! - Trash, restore and permanent delete of whole subtrees
//! - Private items shared with other users
//! - Listings, filtered queries and counts

mod aggregate;
mod lifecycle;
mod query;
mod repository;
mod service;
mod sharing;
mod types;

pub use aggregate::{SizeAggregator, SizeMismatch};
pub use query::{CountEntry, CountSummary, ItemFilter, ItemQuery, ListingEngine};
pub use repository::ItemRepository;
pub use service::ItemService;
pub use sharing::SharingEngine;
pub use types::{
    generate_preview_token, DeleteOutcome, Item, ItemEdit, ItemEntry, ItemInfo, Lifecycle,
    LifecycleEvent, MediaType, NewFile, NewFolder, ShareGrant, ShareOutcome,
};
