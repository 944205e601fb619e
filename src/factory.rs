//! Swap factory: coin-code registry, swap record creation, engine wiring

use chrono::Utc;
use dashmap::DashMap;
use rand::RngCore;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::chain::{script, SwapChain};
use crate::config::SwapConfig;
use crate::engine::{SwapInitiator, SwapResponder};
use crate::error::{SwapError, SwapResult};
use crate::store::SwapStore;
use crate::swap::{Swap, SwapState};

/// Instantiates the chain capability for one coin.
///
/// Registered per coin code; `create` may be called once per engine build, so
/// implementations typically hand out clones of a shared wallet kit.
pub trait SwapChainCreator: Send + Sync {
    fn create(&self) -> SwapResult<Arc<dyn SwapChain>>;
}

/// Resolves coin codes to chains, creates swap records for either role, and
/// constructs the protocol engines bound to a swap's chains and storage
pub struct SwapFactory {
    store: Arc<dyn SwapStore>,
    config: SwapConfig,
    creators: DashMap<String, Arc<dyn SwapChainCreator>>,
}

impl SwapFactory {
    pub fn new(store: Arc<dyn SwapStore>, config: SwapConfig) -> Self {
        Self {
            store,
            config,
            creators: DashMap::new(),
        }
    }

    /// Register a chain creator for a coin code. Last registration wins.
    pub fn register_chain(&self, coin_code: &str, creator: Arc<dyn SwapChainCreator>) {
        self.creators.insert(coin_code.to_string(), creator);
    }

    /// Backing store shared with the engines
    pub(crate) fn store(&self) -> &Arc<dyn SwapStore> {
        &self.store
    }

    /// Coin codes with a registered chain creator
    pub fn supported_coins(&self) -> Vec<String> {
        self.creators.iter().map(|e| e.key().clone()).collect()
    }

    /// Instantiate the chain capability for a coin code
    pub fn resolve_chain(&self, coin_code: &str) -> SwapResult<Arc<dyn SwapChain>> {
        let creator = self
            .creators
            .get(coin_code)
            .ok_or_else(|| SwapError::UnsupportedCoin(coin_code.to_string()))?;
        creator.create()
    }

    /// Create a new swap in the initiator role: fresh id, fresh secret, state
    /// `Requested`, persisted before returning
    pub async fn create_swap(
        &self,
        initiator_coin_code: &str,
        responder_coin_code: &str,
        rate: f64,
        amount: &str,
    ) -> SwapResult<Swap> {
        validate_terms(rate, amount)?;

        let initiator_chain = self.resolve_chain(initiator_coin_code)?;
        let responder_chain = self.resolve_chain(responder_coin_code)?;

        // We redeem on the responder's chain and refund on our own
        let redeem_key = responder_chain.redeem_public_key().await?;
        let refund_key = initiator_chain.refund_public_key().await?;

        let mut secret = vec![0u8; script::SECRET_SIZE];
        rand::thread_rng().fill_bytes(&mut secret);

        let mut swap = Swap::new(Uuid::new_v4().to_string(), true);
        swap.initiator_coin_code = initiator_coin_code.to_string();
        swap.responder_coin_code = responder_coin_code.to_string();
        swap.rate = rate;
        swap.initiator_amount = amount.to_string();
        swap.initiator_redeem_pkh = redeem_key.hash;
        swap.initiator_redeem_pk_id = redeem_key.key_path;
        swap.initiator_refund_pkh = refund_key.hash;
        swap.initiator_refund_pk_id = refund_key.key_path;
        swap.secret_hash = script::sha256(&secret);
        swap.secret = secret;

        self.store.save(&swap).await?;
        info!(swap_id = %swap.id, "created swap request {}→{}", initiator_coin_code, responder_coin_code);

        Ok(swap)
    }

    /// Create the responder-side record for an incoming request: this side's
    /// keys, refund deadlines from policy, state `Responded`, persisted
    #[allow(clippy::too_many_arguments)]
    pub async fn create_swap_as_responder(
        &self,
        id: &str,
        initiator_coin_code: &str,
        responder_coin_code: &str,
        rate: f64,
        amount: &str,
        initiator_refund_pkh: Vec<u8>,
        initiator_redeem_pkh: Vec<u8>,
        secret_hash: Vec<u8>,
    ) -> SwapResult<Swap> {
        // A request is attacker-controlled input: reject unworkable terms
        // before anything is persisted or any engine can run
        validate_terms(rate, amount)?;

        let initiator_chain = self.resolve_chain(initiator_coin_code)?;
        let responder_chain = self.resolve_chain(responder_coin_code)?;

        // We redeem on the initiator's chain and refund on our own
        let redeem_key = initiator_chain.redeem_public_key().await?;
        let refund_key = responder_chain.refund_public_key().await?;

        let now = Utc::now().timestamp();

        let mut swap = Swap::new(id, false);
        swap.state = SwapState::Responded;
        swap.initiator_coin_code = initiator_coin_code.to_string();
        swap.responder_coin_code = responder_coin_code.to_string();
        swap.rate = rate;
        swap.initiator_amount = amount.to_string();
        swap.initiator_redeem_pkh = initiator_redeem_pkh;
        swap.initiator_refund_pkh = initiator_refund_pkh;
        swap.secret_hash = secret_hash;
        swap.responder_redeem_pkh = redeem_key.hash;
        swap.responder_redeem_pk_id = redeem_key.key_path;
        swap.responder_refund_pkh = refund_key.hash;
        swap.responder_refund_pk_id = refund_key.key_path;
        swap.responder_refund_time = now + self.config.responder_refund_secs;
        swap.initiator_refund_time = now + self.config.initiator_refund_secs;

        self.store.save(&swap).await?;
        info!(swap_id = %swap.id, "accepted swap as responder");

        Ok(swap)
    }

    /// Fill the responder-supplied fields into an existing initiator record.
    /// State advancement is the engine's job, not the factory's.
    pub async fn complete_swap_for_initiator(
        &self,
        id: &str,
        responder_redeem_pkh: Vec<u8>,
        responder_refund_pkh: Vec<u8>,
        responder_refund_time: i64,
        initiator_refund_time: i64,
    ) -> SwapResult<Swap> {
        let mut swap = self.store.load(id).await?;

        swap.responder_redeem_pkh = responder_redeem_pkh;
        swap.responder_refund_pkh = responder_refund_pkh;
        swap.responder_refund_time = responder_refund_time;
        swap.initiator_refund_time = initiator_refund_time;

        self.store.save(&swap).await?;

        Ok(swap)
    }

    /// Wire an initiator engine to the swap's two chains and the store
    pub fn build_initiator(&self, swap: Swap) -> SwapResult<Arc<SwapInitiator>> {
        let sending_chain = self.resolve_chain(&swap.initiator_coin_code)?;
        let receiving_chain = self.resolve_chain(&swap.responder_coin_code)?;
        Ok(SwapInitiator::new(
            sending_chain,
            receiving_chain,
            swap,
            self.store.clone(),
        ))
    }

    /// Wire a responder engine to the swap's two chains and the store
    pub fn build_responder(&self, swap: Swap) -> SwapResult<Arc<SwapResponder>> {
        let initiator_chain = self.resolve_chain(&swap.initiator_coin_code)?;
        let responder_chain = self.resolve_chain(&swap.responder_coin_code)?;
        Ok(SwapResponder::new(
            initiator_chain,
            responder_chain,
            swap,
            self.store.clone(),
        ))
    }
}

/// Swap terms must yield a payable responder amount, so both creation paths
/// enforce them up front
fn validate_terms(rate: f64, amount: &str) -> SwapResult<()> {
    if rate <= 0.0 || !rate.is_finite() {
        return Err(SwapError::InvalidAmount(format!("rate {}", rate)));
    }
    amount
        .parse::<f64>()
        .map_err(|_| SwapError::InvalidAmount(amount.to_string()))?;
    Ok(())
}
