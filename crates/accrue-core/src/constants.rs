//! Ledger constants. All rates are fixed-point values over [`PRECISION`].

/// Fixed-point denominator for interest rates (10^18).
///
/// A rate of `PRECISION` means one unit of interest per unit of principal
/// per second.
pub const PRECISION: u64 = 1_000_000_000_000_000_000;

/// Sentinel amount for "withdraw everything".
///
/// Passing this to a withdrawal resolves the amount to the account's full
/// current balance at call time.
pub const WITHDRAW_ALL: u64 = u64::MAX;

/// Global rate used by a freshly initialised ledger unless configured.
pub const DEFAULT_INITIAL_GLOBAL_RATE: u64 = 0;

/// Default log filter for binaries.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable prefix for layered configuration.
pub const CONFIG_ENV_PREFIX: &str = "ACCRUE";
