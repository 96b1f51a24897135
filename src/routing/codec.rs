//! Name Codec
//!
//! Embeds a bucket assignment in the object name so later lookups can skip hashing:
//!
//! ```text
//! <version><bucket c0><bucket c1>...<bucket cN>_<original name>
//!     1ch      2ch        2ch           2ch
//! ```
//!
//! Every field is a left-padded base-62 number over [`ALPHABET`].

use super::event::BucketMap;
use crate::config::Cluster;
use crate::error::{Result, RouterError};

pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const BASE: usize = 62;
pub const SEPARATOR: char = '_';
/// Names starting with this are reserved for node-local endpoints (`_status`, `_list`, ...).
pub const RESERVED_PREFIX: char = '_';
pub const VERSION: usize = 0;

const VERSION_WIDTH: usize = 1;
const FIELD_WIDTH: usize = 2;

pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RouterError::NameFormat("name must not be empty".to_string()));
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(RouterError::NameFormat(format!(
            "name {:?} must not start with '{}'",
            name, RESERVED_PREFIX
        )));
    }
    Ok(())
}

/// Fixed-width base-62 rendering. `None` if `value` does not fit in `width` digits.
pub fn encode_number(mut value: usize, width: usize) -> Option<String> {
    let mut digits = vec![ALPHABET[0]; width];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[value % BASE];
        value /= BASE;
    }
    if value != 0 {
        return None;
    }
    String::from_utf8(digits).ok()
}

fn digit_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as usize),
        b'a'..=b'z' => Some((byte - b'a') as usize + 10),
        b'A'..=b'Z' => Some((byte - b'A') as usize + 36),
        _ => None,
    }
}

pub fn decode_number(digits: &[u8]) -> Option<usize> {
    digits
        .iter()
        .try_fold(0usize, |acc, &byte| Some(acc * BASE + digit_value(byte)?))
}

/// Prefixes `name` with the encoded bucket assignment.
pub fn encode(buckets: &BucketMap, name: &str) -> Result<String> {
    let mut prefix = encode_number(VERSION, VERSION_WIDTH).unwrap_or_default();

    for (&cluster, &bucket) in buckets.iter() {
        let field = encode_number(bucket, FIELD_WIDTH).ok_or_else(|| {
            RouterError::NameFormat(format!(
                "bucket {} of cluster {} does not fit in an encoded name",
                bucket, cluster
            ))
        })?;
        prefix.push_str(&field);
    }

    Ok(format!("{}{}{}", prefix, SEPARATOR, name))
}

/// Splits an encoded name into its bucket assignment and original tail.
///
/// Each decoded bucket is bounds-checked against `clusters`; the field count must match
/// the number of clusters.
pub fn decode<'a>(name: &'a str, clusters: &[Cluster]) -> Result<(BucketMap, &'a str)> {
    let (prefix, tail) = name.split_once(SEPARATOR).ok_or_else(|| {
        RouterError::NameFormat(format!("encoded name {:?} has no '{}'", name, SEPARATOR))
    })?;

    let fields_len = prefix.len().saturating_sub(VERSION_WIDTH);
    if fields_len == 0 || fields_len % FIELD_WIDTH != 0 {
        return Err(RouterError::NameFormat(format!(
            "encoded prefix {:?} of {:?} has invalid length {}",
            prefix,
            name,
            prefix.len()
        )));
    }

    let bytes = prefix.as_bytes();
    let version = decode_number(&bytes[..VERSION_WIDTH]).ok_or_else(|| {
        RouterError::NameFormat(format!("invalid version digit in {:?}", name))
    })?;
    if version != VERSION {
        return Err(RouterError::NameFormat(format!(
            "unsupported encoding version {} in {:?}",
            version, name
        )));
    }

    let fields = bytes[VERSION_WIDTH..].chunks(FIELD_WIDTH);
    if fields.len() != clusters.len() {
        return Err(RouterError::NameFormat(format!(
            "{:?} encodes {} clusters, topology has {}",
            name,
            fields.len(),
            clusters.len()
        )));
    }

    let mut buckets = BucketMap::new();
    for (cluster_index, (field, cluster)) in fields.zip(clusters.iter()).enumerate() {
        let bucket = decode_number(field).ok_or_else(|| {
            RouterError::NameFormat(format!("invalid digits in encoded prefix of {:?}", name))
        })?;
        if bucket >= cluster.len() {
            return Err(RouterError::BucketRange {
                value: bucket,
                name: name.to_string(),
            });
        }
        buckets.insert(cluster_index, bucket);
    }

    Ok((buckets, tail))
}
