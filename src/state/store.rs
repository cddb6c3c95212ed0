//! File-backed persistent store.
//!
//! Five independently addressable collections live as JSON documents under
//! one data directory: `users.json`, `channels.json`, `logins.json`,
//! `messages.json`, `publications.json`. Each mutation saves the touched
//! collections before returning, so a request is only acknowledged once
//! its effect is durable. A missing or corrupt file loads as an empty
//! collection; corruption is treated as absence, not failure.
//!
//! Collections grow monotonically: nothing in scope ever deletes a user,
//! channel, or log entry, and replication merges only add.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const USERS_FILE: &str = "users.json";
const CHANNELS_FILE: &str = "channels.json";
const LOGINS_FILE: &str = "logins.json";
const MESSAGES_FILE: &str = "messages.json";
const PUBLICATIONS_FILE: &str = "publications.json";

/// Persistence errors. Reads never produce these; only writes do.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only login audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub user: String,
    pub timestamp: f64,
}

/// One routed direct message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub src: String,
    pub dst: String,
    pub message: String,
    pub timestamp: f64,
}

/// One routed channel post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub user: String,
    pub channel: String,
    pub message: String,
    pub timestamp: f64,
}

/// The node's durable collections plus their data directory.
///
/// The store itself is not synchronized; the node wraps it in one
/// `tokio::sync::Mutex` so every mutation-plus-save runs as a single
/// critical section.
pub struct Store {
    dir: PathBuf,
    users: Vec<String>,
    channels: Vec<String>,
    logins: Vec<LoginRecord>,
    messages: Vec<MessageRecord>,
    publications: Vec<PublicationRecord>,
}

impl Store {
    /// Opens the store, loading all five collections from `dir`.
    ///
    /// Fails only if the directory cannot be created; unreadable or
    /// corrupt collection files load as empty with a warning.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            users: load(&dir, USERS_FILE),
            channels: load(&dir, CHANNELS_FILE),
            logins: load(&dir, LOGINS_FILE),
            messages: load(&dir, MESSAGES_FILE),
            publications: load(&dir, PUBLICATIONS_FILE),
            dir,
        })
    }

    /// All registered users, in registration order.
    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// All created channels, in creation order.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// The login audit log.
    pub fn logins(&self) -> &[LoginRecord] {
        &self.logins
    }

    /// All routed direct messages.
    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    /// All routed channel posts.
    pub fn publications(&self) -> &[PublicationRecord] {
        &self.publications
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.users.iter().any(|u| u == user)
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    /// Registers a user and appends the login audit entry.
    ///
    /// The caller checks uniqueness first; this only appends and saves.
    pub fn add_user(&mut self, user: &str, timestamp: f64) -> Result<(), StoreError> {
        self.users.push(user.to_string());
        self.logins.push(LoginRecord {
            user: user.to_string(),
            timestamp,
        });
        self.save(USERS_FILE, &self.users)?;
        self.save(LOGINS_FILE, &self.logins)
    }

    /// Creates a channel. The caller checks uniqueness first.
    pub fn add_channel(&mut self, channel: &str) -> Result<(), StoreError> {
        self.channels.push(channel.to_string());
        self.save(CHANNELS_FILE, &self.channels)
    }

    /// Records a routed direct message.
    pub fn append_message(&mut self, record: MessageRecord) -> Result<(), StoreError> {
        self.messages.push(record);
        self.save(MESSAGES_FILE, &self.messages)
    }

    /// Records a routed channel post.
    pub fn append_publication(&mut self, record: PublicationRecord) -> Result<(), StoreError> {
        self.publications.push(record);
        self.save(PUBLICATIONS_FILE, &self.publications)
    }

    /// Set-union merge of a remote snapshot into users and channels.
    ///
    /// Adds every remote entry absent locally and persists only the
    /// collections that changed. Idempotent and commutative: re-merging
    /// an identical snapshot is a no-op and merge order cannot affect the
    /// final sets. Returns `(users_added, channels_added)`.
    pub fn merge(&mut self, users: &[String], channels: &[String]) -> Result<(usize, usize), StoreError> {
        let mut users_added = 0;
        for user in users {
            if !self.has_user(user) {
                self.users.push(user.clone());
                users_added += 1;
            }
        }
        let mut channels_added = 0;
        for channel in channels {
            if !self.has_channel(channel) {
                self.channels.push(channel.clone());
                channels_added += 1;
            }
        }
        if users_added > 0 {
            self.save(USERS_FILE, &self.users)?;
        }
        if channels_added > 0 {
            self.save(CHANNELS_FILE, &self.channels)?;
        }
        Ok((users_added, channels_added))
    }

    fn save<T: Serialize>(&self, name: &str, collection: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(collection)?;
        std::fs::write(self.dir.join(name), bytes)?;
        Ok(())
    }
}

fn load<T: DeserializeOwned + Default>(dir: &Path, name: &str) -> T {
    let path = dir.join(name);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(file = name, error = %e, "unreadable collection, starting empty");
            return T::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(file = name, error = %e, "corrupt collection, starting empty");
            T::default()
        }
    }
}
