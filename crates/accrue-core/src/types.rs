//! Core ledger types: account identifiers, account records, events.
//!
//! All amounts, rates and timestamps are `u64`. Rates are fixed-point over
//! [`PRECISION`](crate::constants::PRECISION); timestamps are Unix seconds.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AccountIdError;

/// Domain separation context for name-derived account identifiers.
const ACCOUNT_ID_CONTEXT: &str = "accrue 2024 account id from label";

/// A 32-byte opaque account identifier.
///
/// The ledger performs no identity verification; callers supply whatever
/// fixed-width identifier their outer layer uses. Serializes as lowercase hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The all-zero identifier.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an AccountId from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a stable identifier from a human-readable label.
    ///
    /// Uses BLAKE3 key derivation so that labels never collide with raw
    /// identifiers chosen by an outer layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use accrue_core::types::AccountId;
    /// assert_eq!(AccountId::from_label("alice"), AccountId::from_label("alice"));
    /// assert_ne!(AccountId::from_label("alice"), AccountId::from_label("bob"));
    /// ```
    pub fn from_label(label: &str) -> Self {
        Self(blake3::derive_key(ACCOUNT_ID_CONTEXT, label.as_bytes()))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| AccountIdError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AccountIdError::InvalidLength { got: bytes.len() })?;
        Ok(Self(arr))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Persisted state of a single account.
///
/// The default value is the state of an account that has never been touched:
/// zero principal, zero frozen rate, last update at time zero.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AccountState {
    /// Materialized tokens, excluding interest accrued since `last_update`.
    pub principal: u64,
    /// Global rate captured at the account's most recent deposit.
    pub frozen_rate: u64,
    /// Unix seconds of the last materialization.
    pub last_update: u64,
}

impl AccountState {
    /// Whether this record is indistinguishable from an untouched account.
    pub fn is_uninitialized(&self) -> bool {
        *self == Self::default()
    }
}

/// Notification emitted by the ledger after a committed state change.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// The global rate was lowered (or set to the same value).
    GlobalRateChanged { old: u64, new: u64 },
    /// Accrued interest was folded into an account's principal.
    InterestMaterialized { account: AccountId, amount: u64 },
    /// Principal was credited by a deposit.
    Deposited { account: AccountId, amount: u64 },
    /// Principal was debited by a withdrawal.
    Withdrawn { account: AccountId, amount: u64 },
}

impl LedgerEvent {
    /// The account this event concerns, if any.
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            Self::GlobalRateChanged { .. } => None,
            Self::InterestMaterialized { account, .. }
            | Self::Deposited { account, .. }
            | Self::Withdrawn { account, .. } => Some(account),
        }
    }
}
