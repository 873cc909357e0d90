//! Identifier types for kazi-entitlements.
//!
//! This module provides strongly-typed identifiers for accounts, entitlement
//! records, and checkout drafts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::validate;

/// An account email address (the foreign key into the identity collaborator).
///
/// Emails are normalized to lowercase on construction so lookups are
/// case-insensitive. The identity service owns account lifecycles; this
/// subsystem only ever reads them.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountEmail(String);

impl AccountEmail {
    /// Parse and normalize an email address.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidEmail` if the input is not a well-formed
    /// email address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
        let normalized = raw.as_ref().trim().to_ascii_lowercase();
        if !validate::is_well_formed_email(&normalized) {
            return Err(IdError::InvalidEmail);
        }
        Ok(Self(normalized))
    }

    /// Return the email as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the email bytes (used for storage keys).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for AccountEmail {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for AccountEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountEmail({})", self.0)
    }
}

impl fmt::Display for AccountEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AccountEmail {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountEmail> for String {
    fn from(email: AccountEmail) -> Self {
        email.0
    }
}

/// An entitlement record identifier using ULID for time-ordering.
///
/// Record ids are time-ordered so a per-account history scan returns records
/// in activation order without a secondary sort.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntitlementId(Ulid);

impl EntitlementId {
    /// Create an `EntitlementId` from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Generate a new `EntitlementId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Return the bytes of the ULID (16 bytes).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes()
    }

    /// Create an `EntitlementId` from bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Ulid::from_bytes(bytes))
    }
}

impl FromStr for EntitlementId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for EntitlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntitlementId({})", self.0)
    }
}

impl fmt::Display for EntitlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for EntitlementId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntitlementId> for String {
    fn from(id: EntitlementId) -> Self {
        id.0.to_string()
    }
}

/// A checkout draft identifier (UUID v4).
///
/// Drafts are ephemeral and in-memory only, so the id has no ordering
/// requirement.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DraftId(uuid::Uuid);

impl DraftId {
    /// Generate a new random `DraftId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl FromStr for DraftId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
        Ok(Self(uuid))
    }
}

impl fmt::Debug for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DraftId({})", self.0)
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DraftId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DraftId> for String {
    fn from(id: DraftId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a well-formed email address.
    #[error("invalid email address")]
    InvalidEmail,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,

    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let email = AccountEmail::new("  A@X.Com ").unwrap();
        assert_eq!(email.as_str(), "a@x.com");
    }

    #[test]
    fn email_rejects_malformed_input() {
        assert_eq!(AccountEmail::new("not-an-email"), Err(IdError::InvalidEmail));
        assert_eq!(AccountEmail::new("a@b"), Err(IdError::InvalidEmail));
        assert_eq!(AccountEmail::new(""), Err(IdError::InvalidEmail));
    }

    #[test]
    fn email_serde_roundtrip() {
        let email = AccountEmail::new("a@x.com").unwrap();
        let json = serde_json::to_string(&email).unwrap();
        let parsed: AccountEmail = serde_json::from_str(&json).unwrap();
        assert_eq!(email, parsed);
    }

    #[test]
    fn entitlement_id_roundtrip() {
        let id = EntitlementId::generate();
        let parsed = EntitlementId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);

        let from_bytes = EntitlementId::from_bytes(id.to_bytes());
        assert_eq!(id, from_bytes);
    }

    #[test]
    fn draft_id_roundtrip() {
        let id = DraftId::generate();
        let parsed = DraftId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
