//! Identifier Generation
//!
//! Connection, message and request identifiers. None of these are
//! cryptographically strong; they only need to be collision-free within a
//! single process uptime.

use dashmap::DashSet;
use rand::Rng;
use uuid::Uuid;

/// Alphabet for short gateway identifiers
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random part of a short identifier, before the trailing `=`
const SHORT_ID_LEN: usize = 12;

/// Generate a short gateway identifier: 12 alphanumeric characters
/// followed by a literal `=`.
///
/// Used for message identifiers and as the raw material for connection
/// identifiers.
pub fn short_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id: String = (0..SHORT_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();
    id.push('=');
    id
}

/// Generate a UUID-v4-shaped request identifier.
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Connection identifier generator.
///
/// Remembers every identifier it has handed out so that no connection id is
/// reused within a process uptime, living or dead.
#[derive(Debug, Default)]
pub struct ConnectionIdGenerator {
    issued: DashSet<String>,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh connection identifier, unique for this process.
    pub fn generate(&self) -> String {
        loop {
            let id = short_id();
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}
