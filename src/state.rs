// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    integrations::{files::PhotoStorage, gateway::PaymentGateway, notifier::Notifier},
    services::{allocator::IdAllocator, payment::PaymentVerifier},
    store::DynStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Config,
    pub verifier: PaymentVerifier,
    pub allocator: IdAllocator,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub photos: PhotoStorage,
}

impl AppState {
    /// Wires the core services from `config` around the given collaborators.
    pub fn new(
        config: Config,
        store: DynStore,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            verifier: PaymentVerifier::new(config.pricing.clone(), config.payment.key_secret.clone()),
            allocator: IdAllocator::new(&config.registration),
            photos: PhotoStorage::new(&config.uploads),
            store,
            config,
            gateway,
            notifier,
        }
    }
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
