use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// The unique key of a mapping, always stored in normalized (lowercase) form.
///
/// Construction never validates: custom aliases go through
/// [`AliasPolicy`](crate::alias::AliasPolicy) first, generated codes come from a
/// trusted [`Generator`](crate::generator::Generator).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ShortCode(SmolStr);

impl ShortCode {
    /// Lowercases `raw` with a locale-independent fold.
    ///
    /// # Examples
    ///
    /// ```
    /// use linkforge_core::ShortCode;
    ///
    /// assert_eq!(ShortCode::normalize("My-Code").as_str(), "my-code");
    /// ```
    pub fn normalize(raw: &str) -> Self {
        if raw.chars().any(char::is_uppercase) {
            Self(SmolStr::new(raw.to_lowercase()))
        } else {
            Self(SmolStr::new(raw))
        }
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ShortCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = SmolStr::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}
