//! Per-client rate limiting
//!
//! A [`ClientRegistry`] maps each client identity to a [`TokenBucket`]; the
//! [`IdleReaper`] periodically drops clients that stopped sending requests.

mod reaper;
mod registry;
mod token_bucket;

pub use reaper::IdleReaper;
pub use registry::{ClientRegistry, ClientState};
pub use token_bucket::TokenBucket;
