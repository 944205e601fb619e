//! Process-wide swap orchestrator
//!
//! Owns the registry of active engines keyed by swap id, reloads persisted
//! swaps on `restore`, and exposes the three handshake operations plus the
//! `process_next` sweep. The registry maps are the single source of truth for
//! id→engine; a responder created from an incoming message can race the sweep,
//! so both maps are concurrent.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::SwapConfig;
use crate::engine::{SwapInitiator, SwapResponder};
use crate::error::SwapResult;
use crate::factory::{SwapChainCreator, SwapFactory};
use crate::handshake::{SwapRequest, SwapResponse};
use crate::store::SwapStore;

/// Registry of active initiator/responder engines plus the factory they are
/// built from
pub struct SwapKit {
    factory: SwapFactory,
    initiators: DashMap<String, Arc<SwapInitiator>>,
    responders: DashMap<String, Arc<SwapResponder>>,
}

impl SwapKit {
    /// Create a kit over the given store. Chains must be registered and
    /// [`restore`](Self::restore) called before any handshake or sweep.
    pub fn new(store: Arc<dyn SwapStore>, config: SwapConfig) -> SwapResult<Self> {
        config.validate()?;
        Ok(Self {
            factory: SwapFactory::new(store, config),
            initiators: DashMap::new(),
            responders: DashMap::new(),
        })
    }

    /// Register a chain capability creator for a coin code
    pub fn register_chain(&self, coin_code: &str, creator: Arc<dyn SwapChainCreator>) {
        self.factory.register_chain(coin_code, creator);
    }

    /// Coin codes with a registered chain
    pub fn supported_coins(&self) -> Vec<String> {
        self.factory.supported_coins()
    }

    /// Rebuild an engine for every persisted swap.
    ///
    /// Must run after all chains are registered and before any handshake or
    /// sweep. Does not advance any swap; call [`process_next`](Self::process_next)
    /// once wiring is complete to resume.
    pub async fn restore(&self) -> SwapResult<()> {
        let swaps = self.factory.store().load_all().await?;
        info!("restoring {} persisted swaps", swaps.len());

        // One unbuildable swap (say its chain is not registered yet) must not
        // block the rest from coming back
        for swap in swaps {
            let id = swap.id.clone();
            if swap.initiator {
                match self.factory.build_initiator(swap) {
                    Ok(engine) => {
                        self.initiators.insert(id, engine);
                    }
                    Err(e) => error!(swap_id = %id, "skipping unrestorable initiator: {}", e),
                }
            } else {
                match self.factory.build_responder(swap) {
                    Ok(engine) => {
                        self.responders.insert(id, engine);
                    }
                    Err(e) => error!(swap_id = %id, "skipping unrestorable responder: {}", e),
                }
            }
        }

        Ok(())
    }

    /// Sweep every registered engine once. Per-engine failures are logged and
    /// never stop the sweep; retryable ones resolve on a later pass.
    pub async fn process_next(&self) {
        let initiators: Vec<_> = self.initiators.iter().map(|e| e.value().clone()).collect();
        for engine in initiators {
            if let Err(e) = engine.process_next().await {
                if e.is_retryable() {
                    warn!(swap_id = %engine.id(), "initiator step failed, will retry: {}", e);
                } else {
                    error!(swap_id = %engine.id(), "initiator step failed: {}", e);
                }
            }
        }

        let responders: Vec<_> = self.responders.iter().map(|e| e.value().clone()).collect();
        for engine in responders {
            if let Err(e) = engine.process_next().await {
                if e.is_retryable() {
                    warn!(swap_id = %engine.id(), "responder step failed, will retry: {}", e);
                } else {
                    error!(swap_id = %engine.id(), "responder step failed: {}", e);
                }
            }
        }
    }

    /// Create a new swap in the initiator role and return the request message
    /// to hand to the counterparty out of band
    pub async fn create_swap_request(
        &self,
        initiator_coin_code: &str,
        responder_coin_code: &str,
        rate: f64,
        amount: &str,
    ) -> SwapResult<SwapRequest> {
        let swap = self
            .factory
            .create_swap(initiator_coin_code, responder_coin_code, rate, amount)
            .await?;
        Ok(SwapRequest::from_swap(&swap))
    }

    /// Accept an incoming request: create the responder record, start its
    /// engine, and return the response message for the initiator
    pub async fn create_swap_response(&self, request: SwapRequest) -> SwapResult<SwapResponse> {
        let swap = self
            .factory
            .create_swap_as_responder(
                &request.id,
                &request.initiator_coin_code,
                &request.responder_coin_code,
                request.rate,
                &request.initiator_amount,
                request.initiator_refund_pkh,
                request.initiator_redeem_pkh,
                request.secret_hash,
            )
            .await?;

        let response = SwapResponse::from_swap(&swap);

        // Register before starting: a chain hiccup on the first step must not
        // orphan the engine, the next sweep retries it
        let engine = self.factory.build_responder(swap)?;
        self.responders.insert(engine.id().to_string(), engine.clone());
        if let Err(e) = engine.start().await {
            warn!(swap_id = %engine.id(), "responder start failed, will retry: {}", e);
        }

        Ok(response)
    }

    /// Complete the handshake on the initiator side and start its engine
    pub async fn initiate_swap(&self, response: SwapResponse) -> SwapResult<()> {
        let swap = self
            .factory
            .complete_swap_for_initiator(
                &response.id,
                response.responder_redeem_pkh,
                response.responder_refund_pkh,
                response.responder_refund_time,
                response.initiator_refund_time,
            )
            .await?;

        let engine = self.factory.build_initiator(swap)?;
        self.initiators.insert(engine.id().to_string(), engine.clone());
        if let Err(e) = engine.start().await {
            warn!(swap_id = %engine.id(), "initiator start failed, will retry: {}", e);
        }

        Ok(())
    }

    /// Engine lookup for embedders that surface per-swap status
    pub fn initiator(&self, id: &str) -> Option<Arc<SwapInitiator>> {
        self.initiators.get(id).map(|e| e.value().clone())
    }

    /// Engine lookup for embedders that surface per-swap status
    pub fn responder(&self, id: &str) -> Option<Arc<SwapResponder>> {
        self.responders.get(id).map(|e| e.value().clone())
    }
}
