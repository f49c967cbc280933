//! Database schema and migrations for cloudshelf.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script executed in order. The schema_version
/// table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users table
    r#"
-- Users referenced by items and grants. Credentials belong to the auth layer.
CREATE TABLE users (
    id              TEXT PRIMARY KEY,
    email           TEXT NOT NULL,
    name            TEXT NOT NULL,
    password_hash   TEXT,
    image           TEXT,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX idx_users_email_nocase ON users(email COLLATE NOCASE);
"#,
    // v2: Items table
    r#"
-- Files and folders. Folder size is the sum of its direct children's sizes.
CREATE TABLE items (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    parent_id   TEXT REFERENCES items(id) ON DELETE CASCADE,
    is_folder   INTEGER NOT NULL DEFAULT 0,
    name        TEXT NOT NULL,
    media       TEXT,                                   -- blob locator, NULL for folders
    media_type  TEXT NOT NULL DEFAULT 'UNKNOWN',        -- PDF, IMAGE, VIDEO, OFFICE, UNKNOWN
    size        INTEGER NOT NULL DEFAULT 0 CHECK (typeof(size) = 'integer' AND size >= 0),
    preview_url TEXT NOT NULL UNIQUE,
    is_private  INTEGER NOT NULL DEFAULT 0,
    is_starred  INTEGER NOT NULL DEFAULT 0,
    state       TEXT NOT NULL DEFAULT 'active' CHECK (state IN ('active', 'trashed')),
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_items_owner_parent ON items(owner_id, parent_id);
CREATE INDEX idx_items_parent_id ON items(parent_id);
CREATE INDEX idx_items_owner_name ON items(owner_id, name);
CREATE INDEX idx_items_owner_state ON items(owner_id, state);
"#,
    // v3: Shared items (grants)
    r#"
-- Grants making a private item visible to another user.
CREATE TABLE shared_items (
    id          TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    item_id     TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(item_id, user_id)
);

CREATE INDEX idx_shared_items_user_id ON shared_items(user_id);
CREATE INDEX idx_shared_items_owner_id ON shared_items(owner_id);
"#,
];
