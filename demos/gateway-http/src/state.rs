//! Shared server state: the provider registry and gateway-wide settings
//! every handler reads from.

use std::sync::Arc;

use filegate::callback::CallbackSigner;
use filegate::registry::ProviderRegistry;
use filegate::Settings;

/// Everything every handler needs, cheaply `Clone`-able per Axum's `State`
/// extractor convention.
#[derive(Clone)]
pub struct AppState {
    /// Every backend this deployment can build a provider for.
    pub registry: Arc<ProviderRegistry>,
    /// Gateway-wide tunables shared by every provider construction.
    pub gateway_settings: Arc<Settings>,
    /// `None` when no HMAC secret is configured — callbacks are disabled.
    pub signer: Arc<Option<CallbackSigner>>,
}

impl AppState {
    /// Builds the signer from `gateway_settings` and wraps everything for
    /// cheap sharing across requests.
    pub fn new(registry: ProviderRegistry, gateway_settings: Settings) -> Self {
        let signer = CallbackSigner::from_settings(&gateway_settings);
        AppState {
            registry: Arc::new(registry),
            gateway_settings: Arc::new(gateway_settings),
            signer: Arc::new(signer),
        }
    }
}
