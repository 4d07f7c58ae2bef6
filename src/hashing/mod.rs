use blake3::Hasher;

/// Hex characters kept from a BLAKE3 digest when naming files and directories.
pub const PATH_HASH_HEX_LEN: usize = 32;

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Used for log fields and in-memory fingerprints only. A collision here never
/// merges two entries: every stored record carries its full key and is compared
/// against the requested key on read.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Fingerprint of a user id, safe to emit in logs.
#[inline]
pub fn hash_user_id(user_id: &str) -> u64 {
    hash_to_u64(user_id.as_bytes())
}

/// Directory name for a user's namespace.
#[inline]
pub fn user_dir_name(user_id: &str) -> String {
    path_hash(&[b"user", user_id.as_bytes()])
}

/// File stem for an item inside a `(user, data_type)` directory.
#[inline]
pub fn item_file_stem(item_id: &str) -> String {
    path_hash(&[b"item", item_id.as_bytes()])
}

/// Directory segment for a data-type label.
///
/// Plain labels are kept readable; anything that is not `[a-z0-9_-]` (or is long)
/// is hashed so a label can never escape the storage root.
pub fn data_type_segment(label: &str) -> String {
    let plain = !label.is_empty()
        && label.len() <= 64
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if plain {
        label.to_string()
    } else {
        format!("x-{}", path_hash(&[b"type", label.as_bytes()]))
    }
}

fn path_hash(parts: &[&[u8]]) -> String {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().to_hex()[..PATH_HASH_HEX_LEN].to_string()
}
