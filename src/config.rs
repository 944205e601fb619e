//! Refund-window policy configuration
//!
//! The responder's CheckLockTimeVerify deadline must expire strictly before
//! the initiator's, leaving the initiator a full window to redeem before the
//! responder could reclaim its bail output.

use serde::Deserialize;

use crate::error::{SwapError, SwapResult};

const DEFAULT_RESPONDER_REFUND_SECS: i64 = 24 * 60 * 60;
const DEFAULT_INITIATOR_REFUND_SECS: i64 = 2 * 24 * 60 * 60;

/// Policy constants applied when a responder accepts a swap request
#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfig {
    /// Seconds from acceptance until the responder may refund its bail output
    #[serde(default = "default_responder_refund_secs")]
    pub responder_refund_secs: i64,
    /// Seconds from acceptance until the initiator may refund its bail output
    #[serde(default = "default_initiator_refund_secs")]
    pub initiator_refund_secs: i64,
}

fn default_responder_refund_secs() -> i64 {
    DEFAULT_RESPONDER_REFUND_SECS
}

fn default_initiator_refund_secs() -> i64 {
    DEFAULT_INITIATOR_REFUND_SECS
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            responder_refund_secs: DEFAULT_RESPONDER_REFUND_SECS,
            initiator_refund_secs: DEFAULT_INITIATOR_REFUND_SECS,
        }
    }
}

impl SwapConfig {
    /// Validate the refund-window ordering invariant
    pub fn validate(&self) -> SwapResult<()> {
        if self.responder_refund_secs <= 0 {
            return Err(SwapError::Config(
                "responder refund window must be positive".to_string(),
            ));
        }
        if self.responder_refund_secs >= self.initiator_refund_secs {
            return Err(SwapError::Config(format!(
                "responder refund window ({}s) must end before the initiator's ({}s)",
                self.responder_refund_secs, self.initiator_refund_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SwapConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.responder_refund_secs < config.initiator_refund_secs);
    }

    #[test]
    fn inverted_refund_windows_rejected() {
        let config = SwapConfig {
            responder_refund_secs: 172_800,
            initiator_refund_secs: 86_400,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn equal_refund_windows_rejected() {
        let config = SwapConfig {
            responder_refund_secs: 86_400,
            initiator_refund_secs: 86_400,
        };
        assert!(config.validate().is_err());
    }
}
