//! The in-memory checkout draft registry.
//!
//! Drafts are ephemeral by design: they exist only in this map until
//! settlement succeeds (the entitlement is persisted and the draft is
//! destroyed) or the user cancels or walks away. Nothing here survives a
//! restart, and raw payment fields never reach disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kazi_core::{AccountEmail, CheckoutDraft, DraftId};

/// Shared registry of open checkout drafts.
#[derive(Clone, Default)]
pub struct DraftRegistry {
    inner: Arc<Mutex<HashMap<DraftId, CheckoutDraft>>>,
}

impl DraftRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly opened draft.
    pub fn insert(&self, draft: CheckoutDraft) {
        self.lock().insert(draft.id, draft);
    }

    /// Run a closure against the caller's draft under the lock.
    ///
    /// A draft owned by a different account reads as absent; draft ids are
    /// not a capability to another user's checkout.
    pub fn with_draft<T>(
        &self,
        id: &DraftId,
        owner: &AccountEmail,
        f: impl FnOnce(&mut CheckoutDraft) -> T,
    ) -> Option<T> {
        let mut drafts = self.lock();
        let draft = drafts
            .get_mut(id)
            .filter(|draft| draft.account_email == *owner)?;
        Some(f(draft))
    }

    /// Remove the caller's draft (success, cancel, or navigation away).
    pub fn remove(&self, id: &DraftId, owner: &AccountEmail) -> Option<CheckoutDraft> {
        let mut drafts = self.lock();
        if drafts.get(id).is_some_and(|d| d.account_email == *owner) {
            drafts.remove(id)
        } else {
            None
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DraftId, CheckoutDraft>> {
        // A poisoned lock means a panic mid-mutation; drafts are ephemeral
        // form state, so continuing with them is safe.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kazi_core::PlanId;

    fn email(s: &str) -> AccountEmail {
        s.parse().unwrap()
    }

    #[test]
    fn drafts_are_scoped_to_their_owner() {
        let registry = DraftRegistry::new();
        let owner = email("a@x.com");
        let draft = CheckoutDraft::new(owner.clone(), PlanId::ClientPro, Utc::now());
        let id = draft.id;
        registry.insert(draft);

        assert!(registry.with_draft(&id, &owner, |d| d.plan_id).is_some());
        assert!(registry
            .with_draft(&id, &email("b@x.com"), |d| d.plan_id)
            .is_none());

        assert!(registry.remove(&id, &email("b@x.com")).is_none());
        assert!(registry.remove(&id, &owner).is_some());
        assert!(registry.with_draft(&id, &owner, |_| ()).is_none());
    }
}
