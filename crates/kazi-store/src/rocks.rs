//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use kazi_core::{
    AccountEmail, AccountProjection, BillingCycle, Entitlement, EntitlementId, PlanId,
    TrialLedgerEntry,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Load an account's records in activation (ULID) order.
    ///
    /// A record that fails to decode is skipped with a warning: one corrupt
    /// entry must not take down the account's other records, and the safest
    /// reading of a record we cannot parse is that it grants nothing.
    fn load_account_records(&self, email: &AccountEmail) -> Result<Vec<Entitlement>> {
        let cf_index = self.cf(cf::ENTITLEMENTS_BY_ACCOUNT)?;
        let prefix = keys::account_entitlements_prefix(email);

        let iter = self.db.iterator_cf(
            &cf_index,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut records = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }

            let id = keys::extract_entitlement_id(&key);
            match self.get_entitlement_raw(&id) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    tracing::warn!(account = %email, id = %id, "dangling entitlement index entry");
                }
                Err(StoreError::Serialization(msg)) => {
                    tracing::warn!(
                        account = %email,
                        id = %id,
                        error = %msg,
                        "skipping unparsable entitlement record"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(records)
    }

    /// Fetch a single record by id, propagating decode failures.
    fn get_entitlement_raw(&self, id: &EntitlementId) -> Result<Option<Entitlement>> {
        let cf_records = self.cf(cf::ENTITLEMENTS)?;
        self.db
            .get_cf(&cf_records, keys::entitlement_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Stage a record write (record + account index) into a batch.
    fn stage_record(
        &self,
        batch: &mut WriteBatch,
        record: &Entitlement,
    ) -> Result<()> {
        let cf_records = self.cf(cf::ENTITLEMENTS)?;
        let cf_index = self.cf(cf::ENTITLEMENTS_BY_ACCOUNT)?;

        let value = Self::serialize(record)?;
        batch.put_cf(&cf_records, keys::entitlement_key(&record.id), value);
        batch.put_cf(
            &cf_index,
            keys::account_entitlement_key(&record.account_email, &record.id),
            [],
        );
        Ok(())
    }

    /// Stage a projection refresh into a batch.
    fn stage_projection(
        &self,
        batch: &mut WriteBatch,
        email: &AccountEmail,
        active: Option<&Entitlement>,
    ) -> Result<()> {
        let cf_proj = self.cf(cf::PROJECTIONS)?;
        let projection = AccountProjection::of(email.clone(), active);
        let value = Self::serialize(&projection)?;
        batch.put_cf(&cf_proj, keys::projection_key(email), value);
        Ok(())
    }

    /// Stage the deactivation of every currently-active record for an
    /// account, plus the new record and its projection. The shared body of
    /// `activate_entitlement` and `start_trial`.
    fn stage_activation(&self, batch: &mut WriteBatch, record: &Entitlement) -> Result<()> {
        for mut prior in self.load_account_records(&record.account_email)? {
            if prior.active && prior.id != record.id {
                prior.deactivate();
                self.stage_record(batch, &prior)?;
            }
        }

        self.stage_record(batch, record)?;
        self.stage_projection(batch, &record.account_email, Some(record))?;
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Entitlement Operations
    // =========================================================================

    fn get_active_entitlement(&self, email: &AccountEmail) -> Result<Option<Entitlement>> {
        // At most one record is active; take the newest just in case an
        // interrupted write left two.
        Ok(self
            .load_account_records(email)?
            .into_iter()
            .rev()
            .find(|r| r.active))
    }

    fn list_entitlements(&self, email: &AccountEmail) -> Result<Vec<Entitlement>> {
        let mut records = self.load_account_records(email)?;
        records.reverse();
        Ok(records)
    }

    fn activate_entitlement(&self, record: &Entitlement) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_activation(&mut batch, record)?;
        self.write(batch)
    }

    fn start_trial(&self, record: &Entitlement, ledger: &TrialLedgerEntry) -> Result<()> {
        if self.has_used_trial(&ledger.email, ledger.plan_id)? {
            return Err(StoreError::TrialAlreadyUsed {
                email: ledger.email.to_string(),
                plan: ledger.plan_id.to_string(),
            });
        }

        let cf_ledger = self.cf(cf::TRIAL_LEDGER)?;
        let mut batch = WriteBatch::default();
        self.stage_activation(&mut batch, record)?;
        batch.put_cf(
            &cf_ledger,
            keys::trial_ledger_key(&ledger.email, ledger.plan_id),
            Self::serialize(ledger)?,
        );
        self.write(batch)
    }

    fn expire_entitlement(
        &self,
        id: &EntitlementId,
        now: DateTime<Utc>,
    ) -> Result<Option<Entitlement>> {
        let mut record = self.get_entitlement_raw(id)?.ok_or(StoreError::NotFound)?;

        // Idempotent: a second expiry pass sees an inactive record and
        // writes nothing.
        if !record.active {
            return Ok(None);
        }

        record.expire(now);

        let mut batch = WriteBatch::default();
        self.stage_record(&mut batch, &record)?;
        self.stage_projection(&mut batch, &record.account_email, None)?;
        self.write(batch)?;

        Ok(Some(record))
    }

    fn cancel_entitlement(&self, email: &AccountEmail) -> Result<Option<Entitlement>> {
        let Some(mut record) = self.get_active_entitlement(email)? else {
            return Ok(None);
        };

        record.deactivate();

        let mut batch = WriteBatch::default();
        self.stage_record(&mut batch, &record)?;
        self.stage_projection(&mut batch, email, None)?;
        self.write(batch)?;

        Ok(Some(record))
    }

    fn list_active_trials(&self) -> Result<Vec<Entitlement>> {
        let cf_records = self.cf(cf::ENTITLEMENTS)?;
        let mut trials = Vec::new();

        for item in self.db.iterator_cf(&cf_records, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            match Self::deserialize::<Entitlement>(&value) {
                Ok(record) => {
                    if record.active && record.is_trial {
                        trials.push(record);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        key = ?key,
                        error = %e,
                        "skipping unparsable entitlement record in trial sweep"
                    );
                }
            }
        }

        Ok(trials)
    }

    // =========================================================================
    // Trial Ledger Operations
    // =========================================================================

    fn has_used_trial(&self, email: &AccountEmail, plan: PlanId) -> Result<bool> {
        let cf_ledger = self.cf(cf::TRIAL_LEDGER)?;
        let exists = self
            .db
            .get_cf(&cf_ledger, keys::trial_ledger_key(email, plan))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        Ok(exists)
    }

    fn list_trial_ledger(&self, email: &AccountEmail) -> Result<Vec<TrialLedgerEntry>> {
        let cf_ledger = self.cf(cf::TRIAL_LEDGER)?;
        let prefix = keys::account_entitlements_prefix(email);

        let iter = self.db.iterator_cf(
            &cf_ledger,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            match Self::deserialize(&value) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(account = %email, error = %e, "skipping unparsable ledger entry");
                }
            }
        }

        Ok(entries)
    }

    // =========================================================================
    // Projection & Preference Operations
    // =========================================================================

    fn get_projection(&self, email: &AccountEmail) -> Result<Option<AccountProjection>> {
        let cf_proj = self.cf(cf::PROJECTIONS)?;
        self.db
            .get_cf(&cf_proj, keys::projection_key(email))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_billing_cycle(&self, email: &AccountEmail) -> Result<Option<BillingCycle>> {
        let cf_prefs = self.cf(cf::PREFERENCES)?;
        self.db
            .get_cf(&cf_prefs, keys::preference_key(email))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_billing_cycle(&self, email: &AccountEmail, cycle: BillingCycle) -> Result<()> {
        let cf_prefs = self.cf(cf::PREFERENCES)?;
        self.db
            .put_cf(
                &cf_prefs,
                keys::preference_key(email),
                Self::serialize(&cycle)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
