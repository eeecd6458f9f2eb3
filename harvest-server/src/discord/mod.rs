//! Discord chat channel
//!
//! Members order through slash commands delivered as signed HTTP
//! interactions. The channel keeps its own accounts and order ledger and
//! never touches catalog stock.

pub mod commands;
pub mod interaction;
pub mod verify;

pub use commands::dispatch;
pub use interaction::{Interaction, InteractionResponse};
pub use verify::InteractionVerifier;
