//! Row key derivation.
//!
//! A row key has the shape `<salt>!<reversed-domain><path>`:
//!
//! - `salt` is one hex digit taken from the MD5 digest of the full URL, so
//!   rows of one site are spread over 16 key ranges.
//! - `reversed-domain` is the host with its labels reversed
//!   (`www.example.com` becomes `com.example.www`), so within a salt bucket
//!   every page of a site, and of its subdomains, sorts contiguously.
//! - `path` is everything after `scheme://host`, or `/` when there is none.
//!
//! `!` is the reserved separator and is rejected anywhere in the host or path.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use std::fmt;
use std::str::FromStr;

/// Symbols a salt can take, indexed by `hash mod 16`.
pub const SALT_ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Separator between the salt and the rest of the key.
pub const SEPARATOR: char = '!';

const SCHEME_DELIMITER: &str = "://";

/// The store's primary sort key for one page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    raw: String,
    path_start: usize,
}

impl RowKey {
    /// Parse a stored row key back into its parts.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let salt = chars
            .next()
            .ok_or_else(|| Error::malformed_key(raw, "empty row key"))?;
        if !matches!(salt, '0'..='9' | 'a'..='f') {
            return Err(Error::malformed_key(raw, "salt is not a hex digit"));
        }
        if chars.next() != Some(SEPARATOR) {
            return Err(Error::malformed_key(raw, "missing '!' after salt"));
        }

        let path_start = raw[2..]
            .find('/')
            .map(|i| i + 2)
            .ok_or_else(|| Error::malformed_key(raw, "missing path"))?;
        if path_start == 2 {
            return Err(Error::malformed_key(raw, "empty domain"));
        }

        Ok(Self {
            raw: raw.to_string(),
            path_start,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn salt(&self) -> char {
        self.raw.as_bytes()[0] as char
    }

    pub fn reversed_domain(&self) -> &str {
        &self.raw[2..self.path_start]
    }

    pub fn path(&self) -> &str {
        &self.raw[self.path_start..]
    }

    /// The host this key was derived from, labels back in their usual order.
    pub fn site(&self) -> String {
        reverse_domain(self.reversed_domain())
    }

    /// `<salt>!<reversed-domain>`, the prefix shared by every page of this
    /// site that landed in the same salt bucket.
    pub fn bucket_prefix(&self) -> &str {
        &self.raw[..self.path_start]
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for RowKey {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl FromStr for RowKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Derive the row key of `url`.
pub fn derive_key(url: &str) -> Result<RowKey> {
    let (host, path) = split_host_path(url)?;

    if host.contains(SEPARATOR) || path.contains(SEPARATOR) {
        return Err(Error::malformed(url, "contains the reserved '!' separator"));
    }

    let salt = SALT_ALPHABET[hash_alphabet_index(url)] as char;
    let reversed = reverse_domain(host);
    let path = if path.is_empty() { "/" } else { path };

    let mut raw = String::with_capacity(2 + reversed.len() + path.len());
    raw.push(salt);
    raw.push(SEPARATOR);
    raw.push_str(&reversed);
    let path_start = raw.len();
    raw.push_str(path);

    Ok(RowKey { raw, path_start })
}

/// Index into [`SALT_ALPHABET`] for `url`: the MD5 digest read as a
/// big-endian integer, modulo 16.
pub fn hash_alphabet_index(url: &str) -> usize {
    let digest = Md5::digest(url.as_bytes());
    (digest[digest.len() - 1] & 0x0f) as usize
}

/// Reverse the dot-separated labels of a host. Applying it twice gives the
/// input back.
pub fn reverse_domain(host: &str) -> String {
    host.rsplit('.').collect::<Vec<_>>().join(".")
}

/// The 16 key prefixes that together cover every row of `host`.
pub fn site_prefixes(host: &str) -> Vec<String> {
    let reversed = reverse_domain(host);
    SALT_ALPHABET
        .iter()
        .map(|&salt| format!("{}{}{}", salt as char, SEPARATOR, reversed))
        .collect()
}

/// Split `scheme://host[:port]/path` into host and path. The path keeps
/// its leading `/` and is empty when the URL has none.
fn split_host_path(url: &str) -> Result<(&str, &str)> {
    let scheme_end = url
        .find(SCHEME_DELIMITER)
        .ok_or_else(|| Error::malformed(url, "missing '://' scheme separator"))?;
    if scheme_end == 0 {
        return Err(Error::malformed(url, "empty scheme"));
    }

    let rest = &url[scheme_end + SCHEME_DELIMITER.len()..];
    let (host, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    if host.is_empty() {
        return Err(Error::malformed(url, "empty host"));
    }

    Ok((host, path))
}
