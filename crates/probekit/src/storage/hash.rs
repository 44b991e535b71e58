//! Call-site identity.
//!
//! A bundle key is hashed once; the registry maps the hash back to the key
//! for reports. Aliases let a hash that was produced elsewhere, for example
//! loaded from a previous run, resolve to a registered key.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{LazyLock, RwLock};

static HASH_IDS: LazyLock<RwLock<HashMap<u64, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));
static HASH_ALIASES: LazyLock<RwLock<HashMap<u64, u64>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

#[inline]
pub fn hash_key(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Hashes `key` and registers it for reverse lookup.
pub fn add_hash_id(key: &str) -> u64 {
    let hash = hash_key(key);
    let known = HASH_IDS
        .read()
        .map(|ids| ids.contains_key(&hash))
        .unwrap_or(false);
    if !known {
        let mut ids = HASH_IDS.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.entry(hash).or_insert_with(|| key.to_string());
    }
    hash
}

/// Makes `alias` resolve to whatever `target` resolves to.
pub fn add_hash_alias(alias: u64, target: u64) {
    if alias == target {
        return;
    }
    let mut aliases = HASH_ALIASES
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    aliases.insert(alias, target);
}

pub fn hash_identifier(hash: u64) -> Option<String> {
    let ids = HASH_IDS.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(key) = ids.get(&hash) {
        return Some(key.clone());
    }
    let aliases = HASH_ALIASES
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    aliases
        .get(&hash)
        .and_then(|target| ids.get(target))
        .cloned()
}

/// Key for `hash`, or the hash in hex when it was never registered.
pub(crate) fn display_key(hash: u64) -> String {
    hash_identifier(hash).unwrap_or_else(|| format!("{:#018x}", hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_keys_resolve() {
        let hash = add_hash_id("hash::tests::registered");
        assert_eq!(hash, hash_key("hash::tests::registered"));
        assert_eq!(
            hash_identifier(hash).as_deref(),
            Some("hash::tests::registered")
        );
    }

    #[test]
    fn aliases_resolve_to_target() {
        let target = add_hash_id("hash::tests::target");
        add_hash_alias(42, target);
        assert_eq!(hash_identifier(42).as_deref(), Some("hash::tests::target"));
        assert!(display_key(43).starts_with("0x"));
    }
}
