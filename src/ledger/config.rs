//! Ledger runtime options.

/// Ledger options. Risk parameters come from the `ConfigProvider`, not from here.
#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Capacity of the in-memory `EventLog`. Past it, the oldest events are
    /// drained first; `Ledger::events` only ever returns the newest
    /// `max_events`.
    pub max_events: usize,
    /// Also log the full payload of every audit event as it is recorded, at
    /// `debug` level under the `ledger` target. The regular `info`/`warn`
    /// lines are emitted either way; this adds nothing else and does not
    /// change what is kept in the `EventLog`.
    pub verbose: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            verbose: false,
        }
    }
}
