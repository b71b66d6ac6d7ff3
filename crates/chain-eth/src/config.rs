use std::time::Duration;

/// Tunables for the EVM strategy's bounded waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmConfig {
    /// Extra `eth_chainId` polls after the first while a switch is pending.
    pub switch_retries: u32,
    pub switch_retry_delay: Duration,
    /// How many renewed "already pending" answers a poll loop tolerates.
    pub pending_renewals: u32,
    pub receipt_poll_interval: Duration,
    pub receipt_poll_limit: u32,
    /// Applied to `eth_gasPrice` for contract calls, in percent.
    pub gas_price_markup_percent: u64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            switch_retries: 3,
            switch_retry_delay: Duration::from_secs(1),
            pending_renewals: 10,
            receipt_poll_interval: Duration::from_secs(1),
            receipt_poll_limit: 300,
            gas_price_markup_percent: 120,
        }
    }
}
