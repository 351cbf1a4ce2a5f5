//! HTTP middleware

mod admission;

pub use admission::{admission, client_identity, split_host_port};
