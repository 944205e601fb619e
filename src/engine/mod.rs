//! Swap protocol engines
//!
//! One engine instance per swap id drives that swap's side of the protocol:
//! [`SwapInitiator`] for the party that originated the trade, [`SwapResponder`]
//! for the counterparty. Engines are the single writer of their bound swap
//! record; every transition happens under the per-swap mutex and is persisted
//! before the engine moves on.

mod initiator;
mod responder;

pub use initiator::SwapInitiator;
pub use responder::SwapResponder;
