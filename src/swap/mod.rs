//! Swap entity - the persistent record of one trade's lifecycle

use serde::{Deserialize, Serialize};

use crate::error::{SwapError, SwapResult};

/// Lifecycle states of a swap, in transition order.
///
/// State only moves forward along this sequence; every transition is applied
/// exactly once by the engine bound to the swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SwapState {
    /// Initiator created the swap and sent the request out of band
    Requested,
    /// Responder accepted; refund deadlines and responder keys are fixed
    Responded,
    /// Initiator's bail transaction is on-chain
    InitiatorBailed,
    /// Responder's bail transaction was observed on-chain
    ResponderBailed,
    /// Initiator spent the responder's bail output, revealing the secret
    InitiatorRedeemed,
    /// Responder spent the initiator's bail output; the swap is complete
    ResponderRedeemed,
}

/// The negotiated parameters and current state of one atomic swap.
///
/// Mutated exclusively by the one engine instance bound to its id and
/// persisted after every state transition. The `*_tx` fields are opaque
/// chain-serialized blobs, each written once when the corresponding
/// transaction first exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swap {
    pub id: String,
    pub initiator: bool,
    pub state: SwapState,

    pub initiator_coin_code: String,
    pub responder_coin_code: String,
    pub rate: f64,
    /// Amount the initiator pays, as decimal text
    pub initiator_amount: String,

    pub initiator_redeem_pkh: Vec<u8>,
    pub initiator_redeem_pk_id: String,
    pub initiator_refund_pkh: Vec<u8>,
    pub initiator_refund_pk_id: String,
    /// CheckLockTimeVerify threshold for the initiator's refund branch (UNIX seconds)
    pub initiator_refund_time: i64,

    /// Random 32-byte preimage, known only to the initiator until redeemed on-chain
    pub secret: Vec<u8>,
    /// SHA-256 of the secret; embedded in both bail scripts
    pub secret_hash: Vec<u8>,

    pub responder_redeem_pkh: Vec<u8>,
    pub responder_redeem_pk_id: String,
    pub responder_refund_pkh: Vec<u8>,
    pub responder_refund_pk_id: String,
    pub responder_refund_time: i64,

    pub initiator_bail_tx: Vec<u8>,
    pub responder_bail_tx: Vec<u8>,
    pub initiator_redeem_tx: Vec<u8>,
}

impl Swap {
    /// Create an empty record with the given id and role
    pub fn new(id: impl Into<String>, initiator: bool) -> Self {
        Self {
            id: id.into(),
            initiator,
            state: SwapState::Requested,
            initiator_coin_code: String::new(),
            responder_coin_code: String::new(),
            rate: 0.0,
            initiator_amount: "0".to_string(),
            initiator_redeem_pkh: Vec::new(),
            initiator_redeem_pk_id: String::new(),
            initiator_refund_pkh: Vec::new(),
            initiator_refund_pk_id: String::new(),
            initiator_refund_time: 0,
            secret: Vec::new(),
            secret_hash: Vec::new(),
            responder_redeem_pkh: Vec::new(),
            responder_redeem_pk_id: String::new(),
            responder_refund_pkh: Vec::new(),
            responder_refund_pk_id: String::new(),
            responder_refund_time: 0,
            initiator_bail_tx: Vec::new(),
            responder_bail_tx: Vec::new(),
            initiator_redeem_tx: Vec::new(),
        }
    }

    /// Amount the responder pays, derived as `initiator_amount / rate`
    pub fn responder_amount(&self) -> SwapResult<String> {
        let amount: f64 = self
            .initiator_amount
            .parse()
            .map_err(|_| SwapError::InvalidAmount(self.initiator_amount.clone()))?;
        if self.rate <= 0.0 {
            return Err(SwapError::InvalidAmount(format!("rate {}", self.rate)));
        }
        Ok(format!("{}", amount / self.rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responder_amount_derived_from_rate() {
        let mut swap = Swap::new("s1", true);
        swap.initiator_amount = "0.5".to_string();
        swap.rate = 0.25;
        assert_eq!(swap.responder_amount().unwrap(), "2");
    }

    #[test]
    fn responder_amount_rejects_zero_rate() {
        let mut swap = Swap::new("s1", true);
        swap.initiator_amount = "1".to_string();
        swap.rate = 0.0;
        assert!(swap.responder_amount().is_err());
    }

    #[test]
    fn responder_amount_rejects_garbage_amount() {
        let mut swap = Swap::new("s1", true);
        swap.initiator_amount = "not-a-number".to_string();
        swap.rate = 1.0;
        assert!(swap.responder_amount().is_err());
    }

    #[test]
    fn state_ordering_matches_transition_graph() {
        assert!(SwapState::Requested < SwapState::Responded);
        assert!(SwapState::Responded < SwapState::InitiatorBailed);
        assert!(SwapState::InitiatorBailed < SwapState::ResponderBailed);
        assert!(SwapState::ResponderBailed < SwapState::InitiatorRedeemed);
        assert!(SwapState::InitiatorRedeemed < SwapState::ResponderRedeemed);
    }

    #[test]
    fn swap_round_trips_through_json() {
        let mut swap = Swap::new("s1", false);
        swap.state = SwapState::ResponderBailed;
        swap.secret_hash = vec![0xf7, 0xe8];
        swap.responder_bail_tx = vec![1, 2, 3];

        let row = serde_json::to_string(&swap).unwrap();
        let restored: Swap = serde_json::from_str(&row).unwrap();
        assert_eq!(restored.id, "s1");
        assert_eq!(restored.state, SwapState::ResponderBailed);
        assert_eq!(restored.secret_hash, swap.secret_hash);
        assert_eq!(restored.responder_bail_tx, swap.responder_bail_tx);
    }
}
