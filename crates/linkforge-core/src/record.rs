use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// A stored mapping from a short code to its original URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Normalized unique key. Never changes once created.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// Set once at creation.
    pub created_at: Timestamp,
    /// When the record expires, if ever.
    pub expires_at: Option<Timestamp>,
}

impl MappingRecord {
    /// A record is expired once its expiry lies strictly before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    pub fn is_active_at(&self, now: Timestamp) -> bool {
        !self.is_expired_at(now)
    }

    /// Returns a copy with `patch` applied. Key and creation time are kept.
    pub fn patched(&self, patch: &MappingPatch) -> Self {
        Self {
            short_code: self.short_code.clone(),
            original_url: patch
                .original_url
                .clone()
                .unwrap_or_else(|| self.original_url.clone()),
            created_at: self.created_at,
            expires_at: match patch.expires_at {
                ExpiryPatch::Keep => self.expires_at,
                ExpiryPatch::Clear => None,
                ExpiryPatch::Set(at) => Some(at),
            },
        }
    }
}

/// How an edit treats the expiry of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryPatch {
    /// Leave the current expiry untouched.
    #[default]
    Keep,
    /// Remove the expiry; the record never expires.
    Clear,
    /// Replace the expiry.
    Set(Timestamp),
}

impl From<Option<Timestamp>> for ExpiryPatch {
    /// `None` keeps the current value.
    fn from(value: Option<Timestamp>) -> Self {
        value.map_or(Self::Keep, Self::Set)
    }
}

/// A partial update of a mapping. Omitted fields keep their prior values.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder)]
pub struct MappingPatch {
    #[builder(default, setter(strip_option, into))]
    pub original_url: Option<String>,
    #[builder(default, setter(into))]
    pub expires_at: ExpiryPatch,
}

impl MappingPatch {
    pub fn is_empty(&self) -> bool {
        self.original_url.is_none() && self.expires_at == ExpiryPatch::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn record(expires_at: Option<Timestamp>) -> MappingRecord {
        MappingRecord {
            short_code: ShortCode::normalize("abc"),
            original_url: "https://example.com".to_string(),
            created_at: Timestamp::from_second(1_000).unwrap(),
            expires_at,
        }
    }

    #[test]
    fn no_expiry_is_always_active() {
        let now = Timestamp::now();
        assert!(record(None).is_active_at(now));
        assert!(!record(None).is_expired_at(now));
    }

    #[test]
    fn expiry_before_now_is_expired() {
        let now = Timestamp::from_second(10_000).unwrap();
        let rec = record(Some(now - SignedDuration::from_secs(1)));
        assert!(rec.is_expired_at(now));
        assert!(!rec.is_active_at(now));
    }

    #[test]
    fn expiry_equal_to_now_is_still_active() {
        let now = Timestamp::from_second(10_000).unwrap();
        assert!(record(Some(now)).is_active_at(now));
    }

    #[test]
    fn patch_keeps_omitted_fields() {
        let expiry = Timestamp::from_second(5_000).unwrap();
        let original = record(Some(expiry));

        let patched = original.patched(&MappingPatch::builder().original_url("https://new.example").build());
        assert_eq!(patched.original_url, "https://new.example");
        assert_eq!(patched.expires_at, Some(expiry));
        assert_eq!(patched.created_at, original.created_at);
        assert_eq!(patched.short_code, original.short_code);
    }

    #[test]
    fn patch_can_clear_or_set_expiry() {
        let expiry = Timestamp::from_second(5_000).unwrap();
        let original = record(Some(expiry));

        let cleared = original.patched(&MappingPatch::builder().expires_at(ExpiryPatch::Clear).build());
        assert_eq!(cleared.expires_at, None);
        assert_eq!(cleared.original_url, original.original_url);

        let later = Timestamp::from_second(9_000).unwrap();
        let moved = original.patched(&MappingPatch::builder().expires_at(Some(later)).build());
        assert_eq!(moved.expires_at, Some(later));
    }

    #[test]
    fn empty_patch() {
        assert!(MappingPatch::default().is_empty());
        assert!(!MappingPatch::builder().expires_at(ExpiryPatch::Clear).build().is_empty());
    }
}
