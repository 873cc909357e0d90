//! Key encoding utilities for `RocksDB`.
//!
//! Emails are variable-length, so composite keys separate the email from
//! the fixed-size tail with a `0x00` byte (emails are ASCII and never
//! contain NUL).

use kazi_core::{AccountEmail, EntitlementId, PlanId};

const SEPARATOR: u8 = 0x00;

/// Create an entitlement key from a record id.
#[must_use]
pub fn entitlement_key(id: &EntitlementId) -> Vec<u8> {
    id.to_bytes().to_vec()
}

/// Create an account-entitlement index key.
///
/// Format: `email || 0x00 || entitlement_id (16 bytes)`
///
/// Since ULIDs are time-ordered, an account's records sort by activation
/// time within the prefix.
#[must_use]
pub fn account_entitlement_key(email: &AccountEmail, id: &EntitlementId) -> Vec<u8> {
    let mut key = Vec::with_capacity(email.as_bytes().len() + 17);
    key.extend_from_slice(email.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(&id.to_bytes());
    key
}

/// Create a prefix for iterating all of an account's entitlements.
#[must_use]
pub fn account_entitlements_prefix(email: &AccountEmail) -> Vec<u8> {
    let mut key = Vec::with_capacity(email.as_bytes().len() + 1);
    key.extend_from_slice(email.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Extract the entitlement id from an account-entitlement index key.
///
/// # Panics
///
/// Panics if the key does not end in 16 ULID bytes.
#[must_use]
pub fn extract_entitlement_id(key: &[u8]) -> EntitlementId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[key.len() - 16..]);
    EntitlementId::from_bytes(bytes)
}

/// Create a trial-ledger key for an `(email, plan)` pair.
#[must_use]
pub fn trial_ledger_key(email: &AccountEmail, plan: PlanId) -> Vec<u8> {
    let plan = plan.as_str().as_bytes();
    let mut key = Vec::with_capacity(email.as_bytes().len() + 1 + plan.len());
    key.extend_from_slice(email.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(plan);
    key
}

/// Create a projection key from an email.
#[must_use]
pub fn projection_key(email: &AccountEmail) -> Vec<u8> {
    email.as_bytes().to_vec()
}

/// Create a preference key from an email.
#[must_use]
pub fn preference_key(email: &AccountEmail) -> Vec<u8> {
    email.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> AccountEmail {
        "a@x.com".parse().unwrap()
    }

    #[test]
    fn account_entitlement_key_format() {
        let id = EntitlementId::generate();
        let key = account_entitlement_key(&email(), &id);

        assert!(key.starts_with(b"a@x.com\x00"));
        assert_eq!(&key[8..], id.to_bytes());
    }

    #[test]
    fn prefix_matches_index_keys() {
        let id = EntitlementId::generate();
        let key = account_entitlement_key(&email(), &id);
        let prefix = account_entitlements_prefix(&email());

        assert!(key.starts_with(&prefix));

        // A longer email must not collide with the prefix.
        let other: AccountEmail = "a@x.comm".parse().unwrap();
        let other_key = account_entitlement_key(&other, &id);
        assert!(!other_key.starts_with(&prefix));
    }

    #[test]
    fn extract_entitlement_id_roundtrip() {
        let id = EntitlementId::generate();
        let key = account_entitlement_key(&email(), &id);

        assert_eq!(extract_entitlement_id(&key), id);
    }

    #[test]
    fn ledger_keys_differ_per_plan() {
        let basic = trial_ledger_key(&email(), PlanId::HandymanBasic);
        let pro = trial_ledger_key(&email(), PlanId::HandymanPro);
        assert_ne!(basic, pro);
    }
}
