//! Scratch-file identifiers.
//!
//! Each request derives both of its scratch filenames from one identifier, so
//! the generator is what keeps concurrent requests apart. It is injected as a
//! trait object so tests can use predictable names.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of per-request identifiers.
///
/// Identifiers must be unique for the lifetime of the scratch directory and
/// safe to use as a filename stem (no separators, no dots).
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDv7 in 32-character hex form.
///
/// Lexical order of the ids follows creation time, so a directory listing
/// of leftover scratch files sorts oldest first.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn next_id(&self) -> String {
        Uuid::now_v7().simple().to_string()
    }
}

/// `<prefix>0`, `<prefix>1`, and so on: deterministic ids for tests.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}
