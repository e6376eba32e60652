//! RocksDB-backed persistent account store.
//!
//! Implements [`AccountStore`] with one column family per account map
//! (`principal`, `frozen_rate`, `last_update`) and a `metadata` family for
//! the global rate and total supply. Keys are the 32 raw account bytes;
//! values are little-endian `u64`s, except total supply which is a
//! little-endian `u128`. Every [`StoreWrite`] becomes a single
//! [`WriteBatch`], and reads go through a snapshot so an account's three
//! fields are always observed together.

use std::path::Path;

use parking_lot::Mutex;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use tracing::info;

use accrue_core::error::LedgerError;
use accrue_core::traits::{AccountStore, StoreWrite};
use accrue_core::types::{AccountId, AccountState};

use crate::memory::adjust_supply;

// --- Column family names ---

const CF_PRINCIPAL: &str = "principal";
const CF_FROZEN_RATE: &str = "frozen_rate";
const CF_LAST_UPDATE: &str = "last_update";
const CF_METADATA: &str = "metadata";

/// All column family names.
const ALL_CFS: &[&str] = &[CF_PRINCIPAL, CF_FROZEN_RATE, CF_LAST_UPDATE, CF_METADATA];

// --- Metadata keys ---

const META_GLOBAL_RATE: &[u8] = b"global_rate";
const META_TOTAL_SUPPLY: &[u8] = b"total_supply";

fn storage_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn decode_u64(bytes: &[u8]) -> Result<u64, LedgerError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::Storage(format!("invalid value length: {}", bytes.len())))?;
    Ok(u64::from_le_bytes(arr))
}

fn decode_u128(bytes: &[u8]) -> Result<u128, LedgerError> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| LedgerError::Storage(format!("invalid supply length: {}", bytes.len())))?;
    Ok(u128::from_le_bytes(arr))
}

fn decode_account_id(bytes: &[u8]) -> Result<AccountId, LedgerError> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| LedgerError::Storage(format!("invalid account key length: {}", bytes.len())))?;
    Ok(AccountId(arr))
}

/// Persistent [`AccountStore`] on RocksDB.
pub struct RocksStore {
    db: DB,
    /// Serializes read-modify-write of total supply across accounts.
    commit_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a database at `path`, creating missing column families.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(storage_err)?;
        info!(path = %path.as_ref().display(), "opened account store");

        Ok(Self {
            db,
            commit_lock: Mutex::new(()),
        })
    }

    /// Flush all in-memory buffers to disk.
    pub fn flush(&self) -> Result<(), LedgerError> {
        self.db.flush().map_err(storage_err)
    }

    // --- Internal helpers ---

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, LedgerError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Storage(format!("missing column family: {name}")))
    }

    fn get_meta_u64(&self, key: &[u8]) -> Result<Option<u64>, LedgerError> {
        let cf = self.cf_handle(CF_METADATA)?;
        self.db
            .get_cf(cf, key)
            .map_err(storage_err)?
            .map(|bytes| decode_u64(&bytes))
            .transpose()
    }
}

impl AccountStore for RocksStore {
    fn get_account(&self, id: &AccountId) -> Result<Option<AccountState>, LedgerError> {
        let snapshot = self.db.snapshot();
        let mut fields = [0u64; 3];
        for (i, name) in [CF_PRINCIPAL, CF_FROZEN_RATE, CF_LAST_UPDATE].iter().enumerate() {
            let cf = self.cf_handle(name)?;
            match snapshot.get_cf(cf, id.as_bytes()).map_err(storage_err)? {
                Some(bytes) => fields[i] = decode_u64(&bytes)?,
                None if i == 0 => return Ok(None),
                None => {
                    return Err(LedgerError::Storage(format!(
                        "incomplete record for {id}: missing {name}"
                    )));
                }
            }
        }
        Ok(Some(AccountState {
            principal: fields[0],
            frozen_rate: fields[1],
            last_update: fields[2],
        }))
    }

    fn global_rate(&self) -> Result<Option<u64>, LedgerError> {
        self.get_meta_u64(META_GLOBAL_RATE)
    }

    fn total_supply(&self) -> Result<u128, LedgerError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self.db.get_cf(cf, META_TOTAL_SUPPLY).map_err(storage_err)? {
            Some(bytes) => decode_u128(&bytes),
            None => Ok(0),
        }
    }

    fn commit(&self, write: &StoreWrite) -> Result<(), LedgerError> {
        let _guard = self.commit_lock.lock();
        let mut batch = WriteBatch::default();

        if let Some((id, state)) = &write.account {
            let key = id.as_bytes();
            batch.put_cf(self.cf_handle(CF_PRINCIPAL)?, key, state.principal.to_le_bytes());
            batch.put_cf(self.cf_handle(CF_FROZEN_RATE)?, key, state.frozen_rate.to_le_bytes());
            batch.put_cf(self.cf_handle(CF_LAST_UPDATE)?, key, state.last_update.to_le_bytes());
        }

        let cf_meta = self.cf_handle(CF_METADATA)?;
        if let Some(rate) = write.global_rate {
            batch.put_cf(cf_meta, META_GLOBAL_RATE, rate.to_le_bytes());
        }
        if write.minted != 0 || write.burned != 0 {
            let supply = adjust_supply(self.total_supply()?, write)?;
            batch.put_cf(cf_meta, META_TOTAL_SUPPLY, supply.to_le_bytes());
        }

        self.db.write(batch).map_err(storage_err)
    }

    fn iter_accounts(&self) -> Result<Vec<(AccountId, AccountState)>, LedgerError> {
        let snapshot = self.db.snapshot();
        let cf_principal = self.cf_handle(CF_PRINCIPAL)?;
        let cf_rate = self.cf_handle(CF_FROZEN_RATE)?;
        let cf_update = self.cf_handle(CF_LAST_UPDATE)?;

        let mut all = Vec::new();
        for item in snapshot.iterator_cf(cf_principal, IteratorMode::Start) {
            let (key, value) = item.map_err(storage_err)?;
            let id = decode_account_id(&key)?;
            let read = |cf: &rocksdb::ColumnFamily| -> Result<u64, LedgerError> {
                match snapshot.get_cf(cf, &key).map_err(storage_err)? {
                    Some(bytes) => decode_u64(&bytes),
                    None => Err(LedgerError::Storage(format!("incomplete record for {id}"))),
                }
            };
            all.push((
                id,
                AccountState {
                    principal: decode_u64(&value)?,
                    frozen_rate: read(cf_rate)?,
                    last_update: read(cf_update)?,
                },
            ));
        }
        Ok(all)
    }
}
