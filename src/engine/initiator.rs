//! Initiator-side swap engine

use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chain::{BailTx, BailTxListener, SwapChain};
use crate::error::SwapResult;
use crate::store::SwapStore;
use crate::swap::{Swap, SwapState};

/// Drives the happy path for the party originating the trade: bail on the
/// paying chain, watch for the responder's bail, redeem it with the secret.
///
/// All mutation funnels through the per-swap mutex, so a chain callback racing
/// with a `process_next` sweep cannot double-apply a transition; duplicate
/// notifications are dropped by the state guard in the callback.
pub struct SwapInitiator {
    /// Chain the initiator pays with
    sending_chain: Arc<dyn SwapChain>,
    /// Chain the initiator receives on
    receiving_chain: Arc<dyn SwapChain>,
    swap: Mutex<Swap>,
    store: Arc<dyn SwapStore>,
    id: String,
    this: Weak<SwapInitiator>,
}

impl SwapInitiator {
    pub fn new(
        sending_chain: Arc<dyn SwapChain>,
        receiving_chain: Arc<dyn SwapChain>,
        swap: Swap,
        store: Arc<dyn SwapStore>,
    ) -> Arc<Self> {
        let id = swap.id.clone();
        Arc::new_cyclic(|this| Self {
            sending_chain,
            receiving_chain,
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

    /// Begin the protocol after the handshake response arrived: advances
    /// `Requested` to `Responded` and proceeds from there
    pub async fn start(&self) -> SwapResult<()> {
        let mut swap = self.swap.lock().await;
        info!(swap_id = %self.id, "starting initiator engine");

        if swap.state == SwapState::Requested {
            swap.state = SwapState::Responded;
            self.store.save(&swap).await?;
        }

        self.step(&mut swap).await
    }

    /// Idempotent re-entry point: resumes the swap from its persisted state.
    /// No-op while waiting on the counterparty or once terminal.
    pub async fn process_next(&self) -> SwapResult<()> {
        let mut swap = self.swap.lock().await;
        self.step(&mut swap).await
    }

    async fn step(&self, swap: &mut Swap) -> SwapResult<()> {
        match swap.state {
            SwapState::Responded => self.bail(swap).await,
            SwapState::InitiatorBailed => {
                self.watch_responder_bail(swap).await;
                Ok(())
            }
            SwapState::ResponderBailed => self.redeem(swap).await,
            // Requested: handshake still in flight. Redeemed states: nothing
            // left to do on this side.
            SwapState::Requested
            | SwapState::InitiatorRedeemed
            | SwapState::ResponderRedeemed => Ok(()),
        }
    }

    /// Fund the HTLC on the paying chain. On failure the state is untouched
    /// and the next sweep retries.
    async fn bail(&self, swap: &mut Swap) -> SwapResult<()> {
        let bail_tx = self
            .sending_chain
            .send_bail_tx(
                &swap.responder_redeem_pkh,
                &swap.secret_hash,
                &swap.initiator_refund_pkh,
                swap.initiator_refund_time,
                &swap.initiator_amount,
            )
            .await?;

        swap.state = SwapState::InitiatorBailed;
        self.store.save(swap).await?;
        info!(swap_id = %self.id, tx = %hex::encode(&bail_tx.tx_hash), "sent initiator bail tx");

        self.watch_responder_bail(swap).await;
        Ok(())
    }

    /// Watch the receiving chain for the bail output the responder is
    /// expected to fund. Non-blocking; the callback fires from the chain's
    /// observation task.
    async fn watch_responder_bail(&self, swap: &Swap) {
        if let Some(listener) = self.this.upgrade() {
            self.receiving_chain
                .watch_bail_tx(
                    listener,
                    &swap.initiator_redeem_pkh,
                    &swap.secret_hash,
                    &swap.responder_refund_pkh,
                    swap.responder_refund_time,
                )
                .await;
        }
    }

    /// Spend the responder's bail output, revealing the secret on-chain
    async fn redeem(&self, swap: &mut Swap) -> SwapResult<()> {
        let responder_bail_tx = self
            .receiving_chain
            .deserialize_bail_tx(&swap.responder_bail_tx)?;

        let redeem_tx = self
            .receiving_chain
            .send_redeem_tx(
                &swap.initiator_redeem_pkh,
                &swap.initiator_redeem_pk_id,
                &swap.secret,
                &swap.secret_hash,
                &swap.responder_refund_pkh,
                swap.responder_refund_time,
                &responder_bail_tx,
            )
            .await?;

        swap.state = SwapState::InitiatorRedeemed;
        self.store.save(swap).await?;
        info!(swap_id = %self.id, tx = %hex::encode(&redeem_tx.tx_hash), "sent initiator redeem tx");

        Ok(())
    }
}

#[async_trait]
impl BailTxListener for SwapInitiator {
    async fn on_bail_transaction_seen(&self, bail_tx: BailTx) {
        let mut swap = self.swap.lock().await;

        // Exactly-once guard: watcher re-delivery and sweep races both land here
        if swap.state != SwapState::InitiatorBailed {
            debug!(swap_id = %self.id, state = ?swap.state, "dropping stale bail notification");
            return;
        }

        info!(swap_id = %self.id, "responder bail transaction seen");
        swap.responder_bail_tx = self.receiving_chain.serialize_bail_tx(&bail_tx);
        swap.state = SwapState::ResponderBailed;

        if let Err(e) = self.store.save(&swap).await {
            error!(swap_id = %self.id, "failed to persist responder bail: {}", e);
            return;
        }

        if let Err(e) = self.redeem(&mut swap).await {
            warn!(swap_id = %self.id, "redeem failed, will retry on next sweep: {}", e);
        }
    }
}
