/*!
 * Backend adapters for the different translation services.
 *
 * This module contains one adapter per provider type:
 * - Gemini: Google Generative Language API
 * - Simulated: stand-ins for DeepL and Microsoft that fabricate output
 * - Mock: scripted behaviours for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{BackendDescriptor, DispatchConfig, ProviderType, TranslationDomain, TranslationSettings};
use crate::errors::ProviderError;

pub mod gemini;
pub mod mock;
pub mod simulated;

pub use self::gemini::GeminiBackend;
pub use self::simulated::SimulatedBackend;

/// Language and style context for one adapter call
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub source_language: String,
    pub target_language: String,
    pub domain: TranslationDomain,
    pub custom_instructions: String,
}

impl From<&TranslationSettings> for TranslationRequest {
    fn from(settings: &TranslationSettings) -> Self {
        Self {
            source_language: settings.source_language.clone(),
            target_language: settings.target_language.clone(),
            domain: settings.domain,
            custom_instructions: settings.custom_instructions.clone(),
        }
    }
}

/// Common trait for all translation backends
///
/// Lanes only ever talk to this trait, so any provider can be bound to a lane.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Translate `texts` in order.
    ///
    /// The result should have the same length as the input. Callers map by
    /// index and must cope with fewer or more entries. Implementations do not
    /// retry.
    async fn translate(
        &self,
        texts: &[String],
        request: &TranslationRequest,
    ) -> Result<Vec<String>, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Settings that shape how adapters are built
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub request_timeout: Duration,
    pub simulated_delay: Duration,
}

impl From<&DispatchConfig> for BackendSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            simulated_delay: config.simulated_delay(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

/// Builds the adapter for a descriptor
pub fn create_backend(descriptor: &BackendDescriptor, settings: &BackendSettings) -> Arc<dyn TranslationBackend> {
    match descriptor.provider_type {
        ProviderType::Gemini => {
            let mut backend = GeminiBackend::new(descriptor.api_key.clone(), settings.request_timeout);
            if let Some(model) = descriptor.model.as_deref().filter(|m| !m.trim().is_empty()) {
                backend = backend.with_model(model);
            }
            if let Some(endpoint) = descriptor.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
                backend = backend.with_endpoint(endpoint);
            }
            Arc::new(backend)
        }
        provider @ (ProviderType::DeepL | ProviderType::Microsoft) => {
            Arc::new(SimulatedBackend::new(provider, settings.simulated_delay))
        }
    }
}
