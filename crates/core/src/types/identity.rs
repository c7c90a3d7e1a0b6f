//! Signed-in principal identity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Identity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The input is empty or only whitespace.
    #[error("identity cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("identity must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a path separator.
    #[error("identity cannot contain '/'")]
    PathSeparator,
}

/// The authenticated principal a profile request is scoped to.
///
/// An opaque key (in practice the customer's email address) that addresses
/// the customer's document in the order store. The value is trimmed on parse
/// and never changes for the lifetime of a request.
///
/// ## Constraints
///
/// - Length: 1-254 characters after trimming
/// - Must not contain `/` (it is used as a single document path segment)
///
/// ## Examples
///
/// ```
/// use modern_shop_core::Identity;
///
/// assert!(Identity::parse("shopper@example.com").is_ok());
/// assert!(Identity::parse("  user-42 ").is_ok());
///
/// assert!(Identity::parse("").is_err());
/// assert!(Identity::parse("   ").is_err());
/// assert!(Identity::parse("users/evil").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Maximum length of an identity key.
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Identity` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than 254
    /// characters, or contains a `/`.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(IdentityError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed.contains('/') {
            return Err(IdentityError::PathSeparator);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A form safe to write to logs: the first character of the local part,
    /// then the domain.
    ///
    /// ```
    /// use modern_shop_core::Identity;
    ///
    /// let identity = Identity::parse("shopper@example.com").unwrap();
    /// assert_eq!(identity.redacted(), "s***@example.com");
    /// ```
    #[must_use]
    pub fn redacted(&self) -> String {
        let (local, domain) = self
            .0
            .split_once('@')
            .map_or((self.0.as_str(), None), |(local, domain)| (local, Some(domain)));
        let first = local.chars().next().unwrap_or('*');

        match domain {
            Some(domain) => format!("{first}***@{domain}"),
            None => format!("{first}***"),
        }
    }

    /// Consumes the `Identity` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let identity = Identity::parse("  shopper@example.com\n").unwrap();
        assert_eq!(identity.as_str(), "shopper@example.com");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Identity::parse(""), Err(IdentityError::Empty));
        assert_eq!(Identity::parse(" \t "), Err(IdentityError::Empty));
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = "a".repeat(Identity::MAX_LENGTH + 1);
        assert_eq!(
            Identity::parse(&long),
            Err(IdentityError::TooLong {
                max: Identity::MAX_LENGTH
            })
        );

        let max = "a".repeat(Identity::MAX_LENGTH);
        assert!(Identity::parse(&max).is_ok());
    }

    #[test]
    fn test_parse_rejects_path_separator() {
        assert_eq!(
            Identity::parse("users/other@example.com"),
            Err(IdentityError::PathSeparator)
        );
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let identity: Identity = serde_json::from_str("\"user@example.com\"").unwrap();
        assert_eq!(identity.to_string(), "user@example.com");

        let result: Result<Identity, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_redacted_hides_local_part() {
        let identity = Identity::parse("jane.doe+shop@example.com").unwrap();
        let redacted = identity.redacted();

        assert_eq!(redacted, "j***@example.com");
        assert!(!redacted.contains("doe"));
        assert_eq!(Identity::parse("user-42").unwrap().redacted(), "u***");
    }
}
