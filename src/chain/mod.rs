//! Per-coin chain capability consumed by the swap engines
//!
//! Implementations wrap a wallet/node kit for one Bitcoin-family coin: they
//! build and broadcast HTLC bail outputs, watch the chain for matching bail
//! and redeem transactions, and spend bail outputs with the secret preimage.
//! The engines stay chain-agnostic and only ever hold `Arc<dyn SwapChain>`.

pub mod script;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a chain capability
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("broadcast rejected: {0}")]
    Broadcast(String),

    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: String, need: String },

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("transaction decode error: {0}")]
    TxDecode(String),
}

/// A wallet-derived public key: its hash for script use plus the derivation
/// path id needed to later produce a signature from the same key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPublicKey {
    pub hash: Vec<u8>,
    pub key_path: String,
}

/// Handle to an on-chain bail (funding) transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BailTx {
    pub tx_hash: Vec<u8>,
    pub output_index: u32,
    /// Output value in the chain's base unit
    pub amount: u64,
    pub locking_script: Vec<u8>,
    /// HASH160 of the HTLC script the output pays to
    pub script_hash: Vec<u8>,
}

/// Handle to an on-chain redeem transaction, carrying the revealed secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemTx {
    pub tx_hash: Vec<u8>,
    pub secret: Vec<u8>,
}

/// Callback fired when a watched bail transaction appears on-chain.
///
/// May be invoked from the chain's own watcher task, possibly more than once
/// for the same transaction (reconnect re-delivery); the receiver is expected
/// to deduplicate.
#[async_trait]
pub trait BailTxListener: Send + Sync {
    async fn on_bail_transaction_seen(&self, bail_tx: BailTx);
}

/// Callback fired when a watched bail output is spent
#[async_trait]
pub trait RedeemTxListener: Send + Sync {
    async fn on_redeem_transaction_seen(&self, redeem_tx: RedeemTx);
}

/// Operations the swap engines need from one coin's wallet/node kit
#[async_trait]
pub trait SwapChain: Send + Sync {
    /// Coin symbol this capability serves, e.g. "BTC"
    fn coin_code(&self) -> &str;

    /// Fresh receive key for the redeem side of an HTLC
    async fn redeem_public_key(&self) -> Result<ChainPublicKey, ChainError>;

    /// Fresh change key for the refund branch of an HTLC
    async fn refund_public_key(&self) -> Result<ChainPublicKey, ChainError>;

    /// Build, sign, and broadcast a bail transaction locking `amount` into the
    /// HTLC script parameterized by the partner's redeem key, the shared
    /// secret hash, and our own refund key and deadline
    async fn send_bail_tx(
        &self,
        partner_redeem_pkh: &[u8],
        secret_hash: &[u8],
        my_refund_pkh: &[u8],
        my_refund_time: i64,
        amount: &str,
    ) -> Result<BailTx, ChainError>;

    /// Register a watch for a bail transaction paying to the HTLC script with
    /// the given parameters. Non-blocking; the listener fires asynchronously
    /// from the chain's observation task.
    async fn watch_bail_tx(
        &self,
        listener: Arc<dyn BailTxListener>,
        my_redeem_pkh: &[u8],
        secret_hash: &[u8],
        partner_refund_pkh: &[u8],
        partner_refund_time: i64,
    );

    /// Spend a bail output through the secret-reveal branch, signing with the
    /// wallet key identified by `my_redeem_pk_id`
    #[allow(clippy::too_many_arguments)]
    async fn send_redeem_tx(
        &self,
        my_redeem_pkh: &[u8],
        my_redeem_pk_id: &str,
        secret: &[u8],
        secret_hash: &[u8],
        partner_refund_pkh: &[u8],
        partner_refund_time: i64,
        bail_tx: &BailTx,
    ) -> Result<RedeemTx, ChainError>;

    /// Register a watch for any spend of the given bail output
    async fn watch_redeem_tx(&self, listener: Arc<dyn RedeemTxListener>, bail_tx: &BailTx);

    fn serialize_bail_tx(&self, bail_tx: &BailTx) -> Vec<u8>;

    fn deserialize_bail_tx(&self, data: &[u8]) -> Result<BailTx, ChainError>;

    fn serialize_redeem_tx(&self, redeem_tx: &RedeemTx) -> Vec<u8>;

    fn deserialize_redeem_tx(&self, data: &[u8]) -> Result<RedeemTx, ChainError>;
}
