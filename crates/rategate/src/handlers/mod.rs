//! Request handlers

pub mod ping;

pub use ping::endpoint;
