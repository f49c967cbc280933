//! Item types for cloudshelf.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use validator::{Validate, ValidationError};

use crate::db::UserSummary;
use crate::{Result, ShelfError};

/// Number of random bytes behind a preview token.
const PREVIEW_TOKEN_BYTES: usize = 12;

/// Media type of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Pdf,
    Image,
    Video,
    Office,
    #[default]
    Unknown,
}

impl MediaType {
    /// Convert media type to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "PDF",
            MediaType::Image => "IMAGE",
            MediaType::Video => "VIDEO",
            MediaType::Office => "OFFICE",
            MediaType::Unknown => "UNKNOWN",
        }
    }

    /// Map a caller-supplied media type, falling back to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(MediaType::Unknown)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PDF" => Ok(MediaType::Pdf),
            "IMAGE" => Ok(MediaType::Image),
            "VIDEO" => Ok(MediaType::Video),
            "OFFICE" => Ok(MediaType::Office),
            "UNKNOWN" => Ok(MediaType::Unknown),
            _ => Err(format!("unknown media type: {s}")),
        }
    }
}

impl TryFrom<String> for MediaType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Lifecycle state of an item.
///
/// `Deleted` is terminal: a deleted item no longer has a row, so it never
/// comes back from the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Active,
    Trashed,
    Deleted,
}

/// Events that move an item between lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Trash,
    Restore,
    Purge,
}

impl Lifecycle {
    /// Convert state to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Active => "active",
            Lifecycle::Trashed => "trashed",
            Lifecycle::Deleted => "deleted",
        }
    }

    /// Compute the state reached by applying `event`, if the transition exists.
    pub fn next(self, event: LifecycleEvent) -> Option<Lifecycle> {
        match (self, event) {
            (Lifecycle::Active, LifecycleEvent::Trash) => Some(Lifecycle::Trashed),
            (Lifecycle::Trashed, LifecycleEvent::Restore) => Some(Lifecycle::Active),
            (Lifecycle::Trashed, LifecycleEvent::Purge) => Some(Lifecycle::Deleted),
            _ => None,
        }
    }
}

impl LifecycleEvent {
    /// The state an item must be in for this event to apply.
    pub fn required_state(&self) -> Lifecycle {
        match self {
            LifecycleEvent::Trash => Lifecycle::Active,
            LifecycleEvent::Restore | LifecycleEvent::Purge => Lifecycle::Trashed,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Lifecycle {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(Lifecycle::Active),
            "trashed" => Ok(Lifecycle::Trashed),
            _ => Err(format!("unknown lifecycle state: {value}")),
        }
    }
}

/// A file or folder.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Item {
    /// Unique item ID.
    pub id: String,
    /// Owner user ID.
    pub owner_id: String,
    /// Parent folder ID (None for root items).
    pub parent_id: Option<String>,
    /// Whether this item is a folder.
    pub is_folder: bool,
    /// Display name.
    pub name: String,
    /// Blob locator (None for folders).
    pub media: Option<String>,
    /// Media type (meaningless for folders).
    #[sqlx(try_from = "String")]
    pub media_type: MediaType,
    /// Size in bytes; the aggregate of direct children for folders.
    pub size: i64,
    /// Preview token, assigned once at creation.
    pub preview_url: String,
    /// Private items may be shared with other users.
    pub is_private: bool,
    /// Starred by the owner.
    pub is_starred: bool,
    /// Lifecycle state.
    #[sqlx(rename = "state", try_from = "String")]
    pub lifecycle: Lifecycle,
    /// When the item was created.
    pub created_at: String,
    /// When the item was last modified.
    pub updated_at: String,
}

impl Item {
    /// Check if the item is active.
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    /// Check if the given user owns this item.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// An item annotated for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ItemEntry {
    #[serde(flatten)]
    pub item: Item,
    /// Owner's public profile.
    pub owner: UserSummary,
    /// Number of direct children (always 0 for files).
    pub child_count: i64,
}

// Owner columns are aliased because `users.name` collides with `items.name`.
impl<'r> FromRow<'r, SqliteRow> for ItemEntry {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            item: Item::from_row(row)?,
            owner: UserSummary {
                email: row.try_get("owner_email")?,
                name: row.try_get("owner_name")?,
                image: row.try_get("owner_image")?,
            },
            child_count: row.try_get("child_count")?,
        })
    }
}

/// A sharing grant with the grantee's public profile.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShareGrant {
    /// Grant ID.
    pub id: String,
    /// Grantee user ID.
    pub user_id: String,
    /// Grantee profile.
    #[sqlx(flatten)]
    pub user: UserSummary,
    /// When the grant was created.
    pub created_at: String,
}

/// Detailed view of a single item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemInfo {
    #[serde(flatten)]
    pub item: Item,
    /// Users the item is shared with.
    pub shared_with: Vec<ShareGrant>,
}

/// Names must be non-blank and free of control characters.
fn valid_name(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_empty_trimmed").with_message("is required".into()));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(ValidationError::new("no_control_chars")
            .with_message("must not contain control characters".into()));
    }
    Ok(())
}

/// Reject blank blob locators.
fn locator_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("locator_not_blank").with_message("is required".into()));
    }
    Ok(())
}

/// Validate a name against the configured maximum length.
pub(crate) fn check_name_length(name: &str, max: usize) -> Result<()> {
    if name.chars().count() > max {
        return Err(ShelfError::Validation(format!(
            "name: must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Data for creating a new file.
#[derive(Debug, Clone, Validate)]
pub struct NewFile {
    /// Parent folder ID (None for root).
    pub parent_id: Option<String>,
    /// File name.
    #[validate(custom(function = "valid_name"))]
    pub name: String,
    /// Blob locator of the uploaded content.
    #[validate(custom(function = "locator_not_blank"))]
    pub media: String,
    /// Media type.
    pub media_type: MediaType,
    /// Size in bytes.
    pub size: u64,
    /// Privacy; inherits the parent folder's when unset.
    pub is_private: Option<bool>,
}

impl NewFile {
    /// Create a new NewFile at the root.
    pub fn new(
        name: impl Into<String>,
        media: impl Into<String>,
        media_type: MediaType,
        size: u64,
    ) -> Self {
        Self {
            parent_id: None,
            name: name.into(),
            media: media.into(),
            media_type,
            size,
            is_private: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the privacy flag.
    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = Some(is_private);
        self
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone, Validate)]
pub struct NewFolder {
    /// Parent folder ID (None for root).
    pub parent_id: Option<String>,
    /// Folder name.
    #[validate(custom(function = "valid_name"))]
    pub name: String,
    /// Privacy; inherits the parent folder's when unset.
    pub is_private: Option<bool>,
}

impl NewFolder {
    /// Create a new NewFolder at the root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parent_id: None,
            name: name.into(),
            is_private: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the privacy flag.
    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = Some(is_private);
        self
    }
}

/// Edit of an item's name and privacy.
#[derive(Debug, Clone, Validate)]
pub struct ItemEdit {
    /// New name (required).
    #[validate(custom(function = "valid_name"))]
    pub name: String,
    /// New privacy flag; unchanged when unset.
    pub is_private: Option<bool>,
}

impl ItemEdit {
    /// Create an edit that renames the item.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_private: None,
        }
    }

    /// Set the privacy flag.
    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = Some(is_private);
        self
    }
}

/// Result of a share toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareOutcome {
    Shared,
    Unshared,
}

/// Result of a permanent delete.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteOutcome {
    /// IDs of every removed item (the target and its descendants).
    pub deleted_ids: Vec<String>,
    /// Blob locators of the removed files, handed to the reclaimer.
    pub released: Vec<String>,
}

/// Generate a preview token: 12 random bytes as lowercase hex.
pub fn generate_preview_token() -> String {
    let mut bytes = [0u8; PREVIEW_TOKEN_BYTES];
    rand::rng().fill(&mut bytes[..]);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
