//! Shared test doubles: an in-process mock chain with manual event delivery
//! and a store that counts writes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tokio::sync::Mutex;

use swapkit::chain::script;
use swapkit::{
    BailTx, BailTxListener, ChainError, ChainPublicKey, MemoryStore, RedeemTx, RedeemTxListener,
    Swap, SwapChain, SwapChainCreator, SwapResult, SwapStore,
};

static TRACING: Once = Once::new();

/// Route engine logs through the test writer; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Simulated chain for one coin.
///
/// Broadcasts are recorded instead of sent; a test drives observation by
/// calling [`deliver_bails`](Self::deliver_bails) and
/// [`deliver_redeems`](Self::deliver_redeems), which replay every recorded
/// transaction to every matching watcher. Replaying twice is the easy way to
/// exercise duplicate-notification handling.
pub struct MockChain {
    coin: String,
    counter: AtomicU64,
    fail_bail: AtomicBool,
    bail_watches: Mutex<Vec<(Arc<dyn BailTxListener>, Vec<u8>)>>,
    redeem_watches: Mutex<Vec<(Arc<dyn RedeemTxListener>, Vec<u8>)>>,
    sent_bails: Mutex<Vec<BailTx>>,
    sent_redeems: Mutex<Vec<(Vec<u8>, RedeemTx)>>,
}

impl MockChain {
    pub fn new(coin: &str) -> Arc<Self> {
        Arc::new(Self {
            coin: coin.to_string(),
            counter: AtomicU64::new(0),
            fail_bail: AtomicBool::new(false),
            bail_watches: Mutex::new(Vec::new()),
            redeem_watches: Mutex::new(Vec::new()),
            sent_bails: Mutex::new(Vec::new()),
            sent_redeems: Mutex::new(Vec::new()),
        })
    }

    /// Make every subsequent `send_bail_tx` fail with a broadcast error
    pub fn set_fail_bail(&self, fail: bool) {
        self.fail_bail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent_bail_count(&self) -> usize {
        self.sent_bails.lock().await.len()
    }

    pub async fn sent_redeems(&self) -> Vec<RedeemTx> {
        self.sent_redeems
            .lock()
            .await
            .iter()
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    /// Replay every recorded bail transaction to every watcher whose expected
    /// script hash matches
    pub async fn deliver_bails(&self) {
        let bails = self.sent_bails.lock().await.clone();
        let watches = self.bail_watches.lock().await.clone();
        for bail in &bails {
            for (listener, script_hash) in &watches {
                if *script_hash == bail.script_hash {
                    listener.on_bail_transaction_seen(bail.clone()).await;
                }
            }
        }
    }

    /// Replay every recorded redeem transaction to every watcher of the bail
    /// output it spent
    pub async fn deliver_redeems(&self) {
        let redeems = self.sent_redeems.lock().await.clone();
        let watches = self.redeem_watches.lock().await.clone();
        for (spent_bail_hash, redeem) in &redeems {
            for (listener, bail_hash) in &watches {
                if bail_hash == spent_bail_hash {
                    listener.on_redeem_transaction_seen(redeem.clone()).await;
                }
            }
        }
    }

    fn next_hash(&self) -> Vec<u8> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        script::sha256(format!("{}-tx-{}", self.coin, n).as_bytes())
    }

    fn next_key(&self, kind: &str) -> ChainPublicKey {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        ChainPublicKey {
            hash: script::hash160(format!("{}-{}-{}", self.coin, kind, n).as_bytes()),
            key_path: format!("m/44'/0'/{}", n),
        }
    }
}

#[async_trait]
impl SwapChain for MockChain {
    fn coin_code(&self) -> &str {
        &self.coin
    }

    async fn redeem_public_key(&self) -> Result<ChainPublicKey, ChainError> {
        Ok(self.next_key("redeem"))
    }

    async fn refund_public_key(&self) -> Result<ChainPublicKey, ChainError> {
        Ok(self.next_key("refund"))
    }

    async fn send_bail_tx(
        &self,
        partner_redeem_pkh: &[u8],
        secret_hash: &[u8],
        my_refund_pkh: &[u8],
        my_refund_time: i64,
        amount: &str,
    ) -> Result<BailTx, ChainError> {
        if self.fail_bail.load(Ordering::SeqCst) {
            return Err(ChainError::Broadcast("mock node unreachable".to_string()));
        }

        let coins: f64 = amount
            .parse()
            .map_err(|_| ChainError::Wallet(format!("bad amount {}", amount)))?;
        let locking_script =
            script::bail_script(partner_redeem_pkh, secret_hash, my_refund_pkh, my_refund_time);
        let script_hash = script::hash160(&locking_script);

        let bail_tx = BailTx {
            tx_hash: self.next_hash(),
            output_index: 0,
            amount: (coins * 100_000_000.0).round() as u64,
            locking_script,
            script_hash,
        };
        self.sent_bails.lock().await.push(bail_tx.clone());
        Ok(bail_tx)
    }

    async fn watch_bail_tx(
        &self,
        listener: Arc<dyn BailTxListener>,
        my_redeem_pkh: &[u8],
        secret_hash: &[u8],
        partner_refund_pkh: &[u8],
        partner_refund_time: i64,
    ) {
        let script_hash = script::bail_script_hash(
            my_redeem_pkh,
            secret_hash,
            partner_refund_pkh,
            partner_refund_time,
        );
        self.bail_watches.lock().await.push((listener, script_hash));
    }

    async fn send_redeem_tx(
        &self,
        _my_redeem_pkh: &[u8],
        _my_redeem_pk_id: &str,
        secret: &[u8],
        secret_hash: &[u8],
        _partner_refund_pkh: &[u8],
        _partner_refund_time: i64,
        bail_tx: &BailTx,
    ) -> Result<RedeemTx, ChainError> {
        if script::sha256(secret) != secret_hash {
            return Err(ChainError::Wallet("secret does not match hash".to_string()));
        }

        let redeem_tx = RedeemTx {
            tx_hash: self.next_hash(),
            secret: secret.to_vec(),
        };
        self.sent_redeems
            .lock()
            .await
            .push((bail_tx.tx_hash.clone(), redeem_tx.clone()));
        Ok(redeem_tx)
    }

    async fn watch_redeem_tx(&self, listener: Arc<dyn RedeemTxListener>, bail_tx: &BailTx) {
        self.redeem_watches
            .lock()
            .await
            .push((listener, bail_tx.tx_hash.clone()));
    }

    fn serialize_bail_tx(&self, bail_tx: &BailTx) -> Vec<u8> {
        serde_json::to_vec(bail_tx).unwrap()
    }

    fn deserialize_bail_tx(&self, data: &[u8]) -> Result<BailTx, ChainError> {
        serde_json::from_slice(data).map_err(|e| ChainError::TxDecode(e.to_string()))
    }

    fn serialize_redeem_tx(&self, redeem_tx: &RedeemTx) -> Vec<u8> {
        serde_json::to_vec(redeem_tx).unwrap()
    }

    fn deserialize_redeem_tx(&self, data: &[u8]) -> Result<RedeemTx, ChainError> {
        serde_json::from_slice(data).map_err(|e| ChainError::TxDecode(e.to_string()))
    }
}

/// Creator handing out clones of one shared mock chain, so two parties in a
/// test observe the same simulated network
pub struct SharedChainCreator {
    chain: Arc<MockChain>,
}

impl SharedChainCreator {
    pub fn new(chain: Arc<MockChain>) -> Arc<Self> {
        Arc::new(Self { chain })
    }
}

impl SwapChainCreator for SharedChainCreator {
    fn create(&self) -> SwapResult<Arc<dyn SwapChain>> {
        Ok(self.chain.clone())
    }
}

/// Store wrapper that counts `save` calls
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    saves: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwapStore for CountingStore {
    async fn save(&self, swap: &Swap) -> SwapResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(swap).await
    }

    async fn load(&self, id: &str) -> SwapResult<Swap> {
        self.inner.load(id).await
    }

    async fn load_all(&self) -> SwapResult<Vec<Swap>> {
        self.inner.load_all().await
    }
}
