//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and middleware via the `State`
//! extractor. The filter is stateless apart from its rule configuration,
//! which never changes after startup and is shared through `Arc`.

use std::sync::Arc;

use crate::config::GateConfig;

/// Clone is required by Axum; the inner config is Arc-wrapped.
#[derive(Clone, Debug)]
pub struct AppState {
    pub gate: Arc<GateConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(gate: GateConfig) -> Self {
        Self { gate: Arc::new(gate) }
    }
}
