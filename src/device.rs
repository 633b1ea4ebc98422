//! Persistent device identity
//!
//! A short identifier generated once per browser profile and kept in the
//! durable store, useful for telling devices apart during an event.
//! Displaying it is the host page's business; this module only guarantees
//! the identifier exists and stays stable.

use crate::{
    constants::device::{ID_LENGTH, KEY},
    store::KeyValueStore,
};

/// Characters used in generated identifiers (uppercase base 36)
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Returns the stored device identifier, generating one on first use
pub fn ensure_device_id(store: &mut impl KeyValueStore) -> String {
    if let Some(existing) = store.get(KEY) {
        if !existing.is_empty() {
            return existing;
        }
    }
    let id: String = (0..ID_LENGTH)
        .map(|_| ALPHABET[fastrand::usize(..ALPHABET.len())] as char)
        .collect();
    store.set(KEY, &id);
    id
}
