//! Cache key derivation.
//!
//! A cache key is the form-urlencoded query string of a request joined to the
//! source file's base name with an underscore:
//!
//! ```text
//! r=cover&w=100&h=100_photo.jpg
//! ```
//!
//! The key is used verbatim as a file name inside the cache directory, so it is
//! checked for path separators and traversal components before use. Encoding
//! already escapes `/` and `\` in query values; the checks catch anything that
//! slips through (e.g. an odd base name).
//!
//! Only the base name of the source takes part, so `2024/photo.jpg` and
//! `2025/photo.jpg` requested with the same query share one cache entry.
//! Deployments that reuse file names across directories need one cache
//! directory per source tree.
//!
//! # Ordering
//!
//! With [`KeyPolicy::Raw`] the parameters keep the order they arrived in, so
//! `?w=1&h=2` and `?h=2&w=1` land in different cache files. That matches how
//! existing caches were populated. [`KeyPolicy::Canonical`] sorts the pairs
//! first and lets both spellings share one entry.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::error::KeyError;

/// Keys longer than this are shortened by hashing the query part.
pub const MAX_KEY_LEN: usize = 200;

/// Hard limit on a single file name on common filesystems.
const MAX_FILE_NAME_LEN: usize = 255;

/// Ordering policy for query parameters in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Keep parameters in the order received
    #[default]
    Raw,
    /// Sort parameters by name, then value
    Canonical,
}

/// File-name-safe identifier of one cached transformation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key as a file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an already derived key, applying the file-name safety checks.
    pub fn from_file_name(name: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        check_file_name(&name)?;
        Ok(Self(name))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for CacheKey {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Derive the cache key for a source image and its raw query pairs.
///
/// # Errors
///
/// Returns [`KeyError`] if the source path has no base name or the resulting
/// key is not a safe single path component.
pub fn derive_key(
    source: &Path,
    pairs: &[(String, String)],
    policy: KeyPolicy,
) -> Result<CacheKey, KeyError> {
    let basename = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| KeyError(source.display().to_string()))?;

    let query = encode_query(pairs, policy);

    let mut key = format!("{}_{}", query, basename);
    if key.len() > MAX_KEY_LEN {
        let digest = hex::encode(Sha256::digest(query.as_bytes()));
        key = format!("{}_{}", digest, basename);
    }

    CacheKey::from_file_name(key)
}

/// Form-urlencode the pairs according to the ordering policy.
pub fn encode_query(pairs: &[(String, String)], policy: KeyPolicy) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    match policy {
        KeyPolicy::Raw => {
            serializer.extend_pairs(pairs);
        }
        KeyPolicy::Canonical => {
            let mut sorted: Vec<_> = pairs.iter().collect();
            sorted.sort();
            serializer.extend_pairs(sorted);
        }
    }

    serializer.finish()
}

fn check_file_name(name: &str) -> Result<(), KeyError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.len() > MAX_FILE_NAME_LEN
        || name.contains(['/', '\\', '\0']);

    if unsafe_name {
        return Err(KeyError(name.to_string()));
    }
    Ok(())
}
