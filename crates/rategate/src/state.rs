//! Shared state for the admission middleware

use crate::config::AdmissionMode;
use crate::limiter::ClientRegistry;
use std::sync::Arc;

/// State injected into the admission middleware
#[derive(Clone)]
pub struct AdmissionState {
    /// Per-client bucket registry, shared with the idle reaper
    pub registry: Arc<ClientRegistry>,
    pub mode: AdmissionMode,
}

impl AdmissionState {
    pub fn new(registry: Arc<ClientRegistry>, mode: AdmissionMode) -> Self {
        Self { registry, mode }
    }
}
