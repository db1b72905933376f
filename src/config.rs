//! # Pump Configuration
//!
//! Configuration, state, and statistics types for the decode pump.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decode pump configuration.
///
/// Controls poll timeouts, idle backoff, and sink write chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Maximum wait for a single decoder poll (input or output).
    ///
    /// Every poll is bounded by this value so the control loop stays
    /// responsive and terminable. Must be non-zero; a zero wait would turn
    /// the loop into a pure busy-spin.
    ///
    /// Default: 10 ms.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: Duration,

    /// Sleep applied after an iteration in which neither phase made progress.
    ///
    /// Trades a little latency for not burning a core while the decoder is
    /// busy on both sides.
    ///
    /// Default: 1 ms.
    #[serde(default = "default_idle_backoff")]
    pub idle_backoff: Duration,

    /// Largest slice handed to the sink in one write call (in bytes).
    ///
    /// Decoded units larger than this are delivered in consecutive slices.
    ///
    /// Default: 64 KB.
    #[serde(default = "default_max_write_chunk")]
    pub max_write_chunk: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            poll_timeout: default_poll_timeout(),
            idle_backoff: default_idle_backoff(),
            max_write_chunk: default_max_write_chunk(),
        }
    }
}

impl PumpConfig {
    /// Create a configuration optimized for low latency.
    ///
    /// - Short polls (1 ms)
    /// - No idle backoff
    /// - Small write slices
    pub fn low_latency() -> Self {
        Self {
            poll_timeout: Duration::from_millis(1),
            idle_backoff: Duration::ZERO,
            max_write_chunk: 8 * 1024,
        }
    }

    /// Create a configuration optimized for throughput.
    ///
    /// - Longer polls (25 ms)
    /// - Larger write slices for fewer sink calls
    pub fn high_throughput() -> Self {
        Self {
            poll_timeout: Duration::from_millis(25),
            idle_backoff: Duration::from_millis(5),
            max_write_chunk: 256 * 1024,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_timeout.is_zero() {
            return Err("poll_timeout must be > 0".to_string());
        }

        if self.max_write_chunk == 0 {
            return Err("max_write_chunk must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_poll_timeout() -> Duration {
    Duration::from_millis(10)
}

fn default_idle_backoff() -> Duration {
    Duration::from_millis(1)
}

fn default_max_write_chunk() -> usize {
    64 * 1024
}

// ============================================================================
// Pump State
// ============================================================================

/// Current phase of a decode pump run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Submitting compressed access units to the decoder.
    Feeding,
    /// Draining decoded units from the decoder.
    Draining,
    /// End of input signaled to the decoder; only draining remains.
    EndOfInput,
    /// Input end signaled and decoder output end drained.
    Finished,
}

impl PumpState {
    /// Returns `true` if the pump may still submit input.
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::Feeding | Self::Draining)
    }

    /// Returns `true` if the run has completed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Statistics about a decode pump run.
#[derive(Debug, Clone, Default)]
pub struct PumpStats {
    /// Access units submitted to the decoder, terminal unit included.
    pub units_submitted: usize,
    /// Compressed bytes submitted to the decoder.
    pub bytes_submitted: u64,
    /// Nonzero-size decoded units forwarded to the sink.
    pub units_delivered: usize,
    /// Decoded bytes forwarded to the sink.
    pub bytes_delivered: u64,
    /// Input polls that returned no free slot.
    pub input_stalls: usize,
    /// Output polls that produced nothing.
    pub output_stalls: usize,
    /// Output format changes observed.
    pub format_changes: usize,
    /// Output slot-set refreshes performed.
    pub output_set_refreshes: usize,
}

impl PumpStats {
    /// Units submitted but not yet matched by a drained decoded unit.
    ///
    /// The terminal input and output units are excluded from neither side, so
    /// this reaches zero again once the decoder has flushed.
    pub fn units_in_flight(&self) -> usize {
        self.units_submitted.saturating_sub(self.units_delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PumpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_timeout, Duration::from_millis(10));
        assert_eq!(config.max_write_chunk, 64 * 1024);
    }

    #[test]
    fn test_low_latency_config() {
        let config = PumpConfig::low_latency();
        assert!(config.validate().is_ok());
        assert!(config.poll_timeout < PumpConfig::default().poll_timeout);
        assert!(config.max_write_chunk < PumpConfig::default().max_write_chunk);
    }

    #[test]
    fn test_high_throughput_config() {
        let config = PumpConfig::high_throughput();
        assert!(config.validate().is_ok());
        assert!(config.poll_timeout > PumpConfig::default().poll_timeout);
        assert!(config.max_write_chunk > PumpConfig::default().max_write_chunk);
    }

    #[test]
    fn test_config_validation() {
        let mut config = PumpConfig::default();
        assert!(config.validate().is_ok());

        // Invalid: unbounded-spin poll
        config.poll_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.poll_timeout = Duration::from_millis(10);

        // Invalid: zero write chunk
        config.max_write_chunk = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: PumpConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.poll_timeout, Duration::from_millis(10));
        assert_eq!(config.idle_backoff, Duration::from_millis(1));
        assert_eq!(config.max_write_chunk, 64 * 1024);
    }

    #[test]
    fn test_pump_state() {
        assert!(PumpState::Feeding.accepts_input());
        assert!(PumpState::Draining.accepts_input());
        assert!(!PumpState::EndOfInput.accepts_input());
        assert!(!PumpState::Finished.accepts_input());

        assert!(PumpState::Finished.is_terminal());
        assert!(!PumpState::EndOfInput.is_terminal());
    }

    #[test]
    fn test_pump_stats() {
        let mut stats = PumpStats::default();
        stats.units_submitted = 5;
        stats.units_delivered = 3;
        assert_eq!(stats.units_in_flight(), 2);

        stats.units_delivered = 5;
        assert_eq!(stats.units_in_flight(), 0);
    }
}
