//! Swapkit - Chain-agnostic HTLC atomic swap protocol engine
//!
//! Drives the bail/redeem transaction sequence of a hashed-timelock atomic
//! swap between two parties trading different coins, without a trusted third
//! party. The crate owns the swap state machine, the exactly-once transition
//! guarantees, and the out-of-band handshake wire format; signing,
//! broadcasting, and chain watching are delegated to per-coin [`chain::SwapChain`]
//! capabilities, and persistence to a [`store::SwapStore`] capability.

pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod handshake;
pub mod kit;
pub mod store;
pub mod swap;

pub use chain::{
    BailTx, BailTxListener, ChainError, ChainPublicKey, RedeemTx, RedeemTxListener, SwapChain,
};
pub use config::SwapConfig;
pub use engine::{SwapInitiator, SwapResponder};
pub use error::{SwapError, SwapResult};
pub use factory::{SwapChainCreator, SwapFactory};
pub use handshake::{SwapRequest, SwapResponse};
pub use kit::SwapKit;
pub use store::{MemoryStore, SwapStore};
pub use swap::{Swap, SwapState};
