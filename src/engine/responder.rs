//! Responder-side swap engine

use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chain::{BailTx, BailTxListener, RedeemTx, RedeemTxListener, SwapChain};
use crate::error::SwapResult;
use crate::store::SwapStore;
use crate::swap::{Swap, SwapState};

/// Drives the happy path for the counterparty: watch for the initiator's
/// bail, bail in turn, watch for the initiator's redeem (which reveals the
/// secret), then redeem the initiator's bail output with it.
pub struct SwapResponder {
    /// Chain the initiator pays with; the responder redeems here
    initiator_chain: Arc<dyn SwapChain>,
    /// Chain the responder pays with
    responder_chain: Arc<dyn SwapChain>,
    swap: Mutex<Swap>,
    store: Arc<dyn SwapStore>,
    id: String,
    this: Weak<SwapResponder>,
}

impl SwapResponder {
    pub fn new(
        initiator_chain: Arc<dyn SwapChain>,
        responder_chain: Arc<dyn SwapChain>,
        swap: Swap,
        store: Arc<dyn SwapStore>,
    ) -> Arc<Self> {
        let id = swap.id.clone();
        Arc::new_cyclic(|this| Self {
            initiator_chain,
            responder_chain,
            swap: Mutex::new(swap),
            store,
            id,
            this: this.clone(),
        })
    }

    /// Swap id this engine is bound to
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the current swap record
    pub async fn snapshot(&self) -> Swap {
        self.swap.lock().await.clone()
    }

    /// Accept the swap and begin watching for the initiator's bail
    pub async fn start(&self) -> SwapResult<()> {
        let mut swap = self.swap.lock().await;
        info!(swap_id = %self.id, "starting responder engine");

        if swap.state == SwapState::Requested {
            swap.state = SwapState::Responded;
            self.store.save(&swap).await?;
        }

        self.step(&mut swap).await
    }

    /// Idempotent re-entry point: resumes the swap from its persisted state
    pub async fn process_next(&self) -> SwapResult<()> {
        let mut swap = self.swap.lock().await;
        debug!(swap_id = %self.id, state = ?swap.state, "responder sweep");
        self.step(&mut swap).await
    }

    async fn step(&self, swap: &mut Swap) -> SwapResult<()> {
        match swap.state {
            SwapState::Requested => {
                swap.state = SwapState::Responded;
                self.store.save(swap).await?;
                self.watch_initiator_bail(swap).await;
                Ok(())
            }
            SwapState::Responded => {
                self.watch_initiator_bail(swap).await;
                Ok(())
            }
            SwapState::InitiatorBailed => {
                self.bail(swap).await?;
                self.watch_initiator_redeem(swap).await
            }
            SwapState::ResponderBailed => self.watch_initiator_redeem(swap).await,
            SwapState::InitiatorRedeemed => self.redeem(swap).await,
            SwapState::ResponderRedeemed => Ok(()),
        }
    }

    /// Watch the initiator's paying chain for the bail output it is expected
    /// to fund
    async fn watch_initiator_bail(&self, swap: &Swap) {
        if let Some(listener) = self.this.upgrade() {
            self.initiator_chain
                .watch_bail_tx(
                    listener,
                    &swap.responder_redeem_pkh,
                    &swap.secret_hash,
                    &swap.initiator_refund_pkh,
                    swap.initiator_refund_time,
                )
                .await;
        }
    }

    /// Fund our side of the trade, `initiator_amount / rate`, once the
    /// initiator's bail has been observed
    async fn bail(&self, swap: &mut Swap) -> SwapResult<()> {
        if swap.state != SwapState::InitiatorBailed {
            return Ok(());
        }

        let amount = swap.responder_amount()?;

        let bail_tx = self
            .responder_chain
            .send_bail_tx(
                &swap.initiator_redeem_pkh,
                &swap.secret_hash,
                &swap.responder_refund_pkh,
                swap.responder_refund_time,
                &amount,
            )
            .await?;

        swap.responder_bail_tx = self.responder_chain.serialize_bail_tx(&bail_tx);
        swap.state = SwapState::ResponderBailed;
        self.store.save(swap).await?;
        info!(swap_id = %self.id, tx = %hex::encode(&bail_tx.tx_hash), "sent responder bail tx");

        Ok(())
    }

    /// Watch our own bail output for the spend that reveals the secret
    async fn watch_initiator_redeem(&self, swap: &Swap) -> SwapResult<()> {
        if swap.state != SwapState::ResponderBailed {
            return Ok(());
        }

        let bail_tx = self
            .responder_chain
            .deserialize_bail_tx(&swap.responder_bail_tx)?;

        if let Some(listener) = self.this.upgrade() {
            self.responder_chain.watch_redeem_tx(listener, &bail_tx).await;
        }

        Ok(())
    }

    /// Spend the initiator's bail output with the now-public secret
    async fn redeem(&self, swap: &mut Swap) -> SwapResult<()> {
        let initiator_redeem_tx = self
            .responder_chain
            .deserialize_redeem_tx(&swap.initiator_redeem_tx)?;
        let initiator_bail_tx = self
            .initiator_chain
            .deserialize_bail_tx(&swap.initiator_bail_tx)?;

        let redeem_tx = self
            .initiator_chain
            .send_redeem_tx(
                &swap.responder_redeem_pkh,
                &swap.responder_redeem_pk_id,
                &initiator_redeem_tx.secret,
                &swap.secret_hash,
                &swap.initiator_refund_pkh,
                swap.initiator_refund_time,
                &initiator_bail_tx,
            )
            .await?;

        swap.state = SwapState::ResponderRedeemed;
        self.store.save(swap).await?;
        info!(swap_id = %self.id, tx = %hex::encode(&redeem_tx.tx_hash), "sent responder redeem tx, swap complete");

        Ok(())
    }
}

#[async_trait]
impl BailTxListener for SwapResponder {
    async fn on_bail_transaction_seen(&self, bail_tx: BailTx) {
        let mut swap = self.swap.lock().await;

        if swap.state != SwapState::Responded {
            debug!(swap_id = %self.id, state = ?swap.state, "dropping stale bail notification");
            return;
        }

        info!(swap_id = %self.id, "initiator bail transaction seen");
        swap.initiator_bail_tx = self.initiator_chain.serialize_bail_tx(&bail_tx);
        swap.state = SwapState::InitiatorBailed;

        if let Err(e) = self.store.save(&swap).await {
            error!(swap_id = %self.id, "failed to persist initiator bail: {}", e);
            return;
        }

        if let Err(e) = self.bail(&mut swap).await {
            warn!(swap_id = %self.id, "responder bail failed, will retry on next sweep: {}", e);
            return;
        }
        if let Err(e) = self.watch_initiator_redeem(&swap).await {
            warn!(swap_id = %self.id, "redeem watch failed, will retry on next sweep: {}", e);
        }
    }
}

#[async_trait]
impl RedeemTxListener for SwapResponder {
    async fn on_redeem_transaction_seen(&self, redeem_tx: RedeemTx) {
        let mut swap = self.swap.lock().await;

        if swap.state != SwapState::ResponderBailed {
            debug!(swap_id = %self.id, state = ?swap.state, "dropping stale redeem notification");
            return;
        }

        info!(swap_id = %self.id, "initiator redeem transaction seen, secret revealed");
        swap.initiator_redeem_tx = self.responder_chain.serialize_redeem_tx(&redeem_tx);
        swap.state = SwapState::InitiatorRedeemed;

        if let Err(e) = self.store.save(&swap).await {
            error!(swap_id = %self.id, "failed to persist initiator redeem: {}", e);
            return;
        }

        if let Err(e) = self.redeem(&mut swap).await {
            warn!(swap_id = %self.id, "responder redeem failed, will retry on next sweep: {}", e);
        }
    }
}
