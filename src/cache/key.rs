//! User-scoped cache keys.
//!
//! A [`CacheKey`] cannot be built without a user id, so every lookup is confined to
//! one user's namespace. Two users asking for the same `(data_type, item_id)` get
//! two distinct keys.

use std::fmt;

use crate::hashing::hash_user_id;
use crate::ttl::DataType;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    user_id: String,
    data_type: DataType,
    item_id: String,
}

impl CacheKey {
    pub fn new(
        user_id: impl Into<String>,
        data_type: DataType,
        item_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            data_type,
            item_id: item_id.into(),
        }
    }

    #[inline]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[inline]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    #[inline]
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Returns `true` if this key lives in `user_id`'s namespace and, when given,
    /// has the requested data type.
    #[inline]
    pub fn belongs_to(&self, user_id: &str, data_type: Option<&DataType>) -> bool {
        self.user_id == user_id && data_type.is_none_or(|dt| &self.data_type == dt)
    }

    /// Log-safe fingerprint of the owning user.
    #[inline]
    pub fn user_fingerprint(&self) -> u64 {
        hash_user_id(&self.user_id)
    }
}

/// Renders without the raw user id.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user:{:016x}:{}:{}",
            self.user_fingerprint(),
            self.data_type,
            self.item_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_of_distinct_users_differ() {
        let a = CacheKey::new("u1", DataType::Playlist, "p1");
        let b = CacheKey::new("u2", DataType::Playlist, "p1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_belongs_to() {
        let key = CacheKey::new("u1", DataType::Playlist, "p1");

        assert!(key.belongs_to("u1", None));
        assert!(key.belongs_to("u1", Some(&DataType::Playlist)));
        assert!(!key.belongs_to("u1", Some(&DataType::TrackDetails)));
        assert!(!key.belongs_to("u2", None));
    }

    #[test]
    fn test_display_hides_user_id() {
        let key = CacheKey::new("secret-user", DataType::TrackDetails, "t1");
        let rendered = key.to_string();

        assert!(!rendered.contains("secret-user"));
        assert!(rendered.ends_with(":track_details:t1"));
    }
}
