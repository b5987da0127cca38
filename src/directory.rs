//! Local directory of rooms and users, keyed by XMPP JID.
//!
//! The snapshot is read through: callers try [`DirectoryCache::load`] and fall
//! back to [`DirectoryCache::rebuild`] when nothing usable is on disk. There is
//! no staleness check; deleting the file is the only way to force a refresh.
//! Concurrent invocations may race to rewrite the file, and nothing guards
//! against that.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::{ApiError, PageSource};
use crate::pager::traverse;

pub const ROOMS_PATH: &str = "room?max-results=1000&expand=items";
pub const USERS_PATH: &str = "user?max-results=1000&expand=items";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DirectoryEntry {
    Room {
        topic: String,
        privacy: String,
        name: String,
        owner: Option<String>,
        created: Option<String>,
        id: i64,
        is_archived: bool,
        last_active: Option<String>,
    },
    User {
        name: String,
        mention_name: String,
        id: i64,
    },
}

impl DirectoryEntry {
    pub fn display_name(&self) -> &str {
        match self {
            DirectoryEntry::Room { name, .. } | DirectoryEntry::User { name, .. } => name,
        }
    }

    /// Path of this conversation's history, relative to the API root.
    pub fn history_path(&self) -> String {
        match self {
            DirectoryEntry::Room { id, .. } => format!("room/{id}/history/latest"),
            DirectoryEntry::User { id, .. } => format!("user/{id}/history/latest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(rename = "data")]
    entries: HashMap<String, DirectoryEntry>,
    timestamp: i64,
}

impl Directory {
    pub fn new(entries: HashMap<String, DirectoryEntry>) -> Self {
        Self {
            entries,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&DirectoryEntry> {
        self.entries.get(key)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of (rooms, users).
    pub fn counts(&self) -> (usize, usize) {
        self.entries
            .values()
            .fold((0, 0), |(rooms, users), entry| match entry {
                DirectoryEntry::Room { .. } => (rooms + 1, users),
                DirectoryEntry::User { .. } => (rooms, users + 1),
            })
    }
}

#[derive(Debug, Deserialize)]
struct RoomItem {
    xmpp_jid: Option<String>,
    id: i64,
    name: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    privacy: Option<String>,
    #[serde(default)]
    owner: Option<Owner>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    last_active: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserItem {
    xmpp_jid: Option<String>,
    id: i64,
    name: String,
    #[serde(default)]
    mention_name: Option<String>,
}

impl RoomItem {
    fn into_entry(self) -> Option<(String, DirectoryEntry)> {
        let key = self.xmpp_jid?;
        let entry = DirectoryEntry::Room {
            topic: self.topic.unwrap_or_default(),
            privacy: self.privacy.unwrap_or_default(),
            name: self.name,
            owner: self.owner.map(|owner| owner.name),
            created: self.created,
            id: self.id,
            is_archived: self.is_archived,
            last_active: self.last_active,
        };
        Some((key, entry))
    }
}

impl UserItem {
    fn into_entry(self) -> Option<(String, DirectoryEntry)> {
        let key = self.xmpp_jid?;
        let entry = DirectoryEntry::User {
            name: self.name,
            mention_name: self.mention_name.unwrap_or_default(),
            id: self.id,
        };
        Some((key, entry))
    }
}

pub struct DirectoryCache {
    path: PathBuf,
}

impl DirectoryCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` whenever the snapshot cannot be read or parsed.
    pub fn load(&self) -> Option<Directory> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no directory cache");
                return None;
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "unreadable directory cache");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(directory) => Some(directory),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "corrupt directory cache");
                None
            }
        }
    }

    pub fn save(&self, directory: &Directory) -> Result<(), DirectoryError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let payload = serde_json::to_string_pretty(directory)?;
        fs::write(&self.path, payload)?;
        set_file_permissions(&self.path, 0o600)?;
        Ok(())
    }

    /// Pulls every room and then every user, so users win on a key clash,
    /// and persists the result.
    pub fn rebuild<S: PageSource + ?Sized>(&self, source: &S) -> Result<Directory, DirectoryError> {
        let mut entries = HashMap::new();

        for item in traverse(source, ROOMS_PATH) {
            if let Some((key, entry)) = project::<RoomItem>(item?).and_then(RoomItem::into_entry) {
                entries.insert(key, entry);
            }
        }
        for item in traverse(source, USERS_PATH) {
            if let Some((key, entry)) = project::<UserItem>(item?).and_then(UserItem::into_entry) {
                entries.insert(key, entry);
            }
        }

        let directory = Directory::new(entries);
        tracing::debug!(entries = directory.len(), "rebuilt directory");
        self.save(&directory)?;
        Ok(directory)
    }

    pub fn load_or_rebuild<S: PageSource + ?Sized>(&self, source: &S) -> Result<Directory, DirectoryError> {
        match self.load() {
            Some(directory) => Ok(directory),
            None => self.rebuild(source),
        }
    }
}

// Items without a key or with an unexpected shape are skipped, not fatal.
fn project<T: for<'de> Deserialize<'de>>(item: Value) -> Option<T> {
    let id = item.get("id").cloned().unwrap_or_default();
    if item.get("xmpp_jid").is_none_or(Value::is_null) {
        tracing::debug!(%id, "skipping item without xmpp_jid");
        return None;
    }
    match serde_json::from_value(item) {
        Ok(projected) => Some(projected),
        Err(err) => {
            tracing::debug!(%id, %err, "skipping malformed directory item");
            None
        }
    }
}

fn ensure_dir(path: &Path) -> Result<(), io::Error> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    set_dir_permissions(path, 0o700)?;
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}
