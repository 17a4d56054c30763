/*!
 * Simulated backends.
 *
 * DeepL and Microsoft are not wired to their real APIs. They wait for a fixed
 * delay and echo each line with a provider tag, which is enough to exercise
 * multi-lane dispatching without credentials.
 */

use async_trait::async_trait;
use std::time::Duration;

use crate::app_config::ProviderType;
use crate::errors::ProviderError;
use crate::providers::{TranslationBackend, TranslationRequest};

/// Deterministic stand-in for a provider
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    provider: ProviderType,
    delay: Duration,
    name: String,
}

impl SimulatedBackend {
    pub fn new(provider: ProviderType, delay: Duration) -> Self {
        Self {
            provider,
            delay,
            name: provider.to_string(),
        }
    }

    /// Output for one line
    pub fn fabricate(provider: ProviderType, text: &str) -> String {
        format!("[MOCK {}] {}", provider.tag(), text)
    }
}

#[async_trait]
impl TranslationBackend for SimulatedBackend {
    async fn translate(
        &self,
        texts: &[String],
        _request: &TranslationRequest,
    ) -> Result<Vec<String>, ProviderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(texts
            .iter()
            .map(|text| Self::fabricate(self.provider, text))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
