/*!
 * Mock backend for testing the dispatcher without credentials.
 *
 * This module provides a mock backend that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::short_by_one()` - Succeeds but drops the last entry
 * - `MockProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{TranslationBackend, TranslationRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Succeeds but returns one entry fewer than requested
    ShortByOne,
    /// Succeeds with one extra entry
    Surplus,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Always answers with HTTP 429
    RateLimited,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
    /// Panics inside the call
    Panicking,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every batch of texts received, in call order
    received: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock whose answers miss the last entry
    pub fn short_by_one() -> Self {
        Self::new(MockBehavior::ShortByOne)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a slow but working mock provider
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Number of calls made so far, across clones
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every batch received so far
    pub fn received(&self) -> Vec<Vec<String>> {
        self.received.lock().clone()
    }

    /// Translation produced for `text` by working behaviours
    pub fn translated(text: &str, target_language: &str) -> String {
        format!("[TRANSLATED to {}] {}", target_language, text)
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            received: Arc::clone(&self.received),
        }
    }
}

#[async_trait]
impl TranslationBackend for MockProvider {
    async fn translate(
        &self,
        texts: &[String],
        request: &TranslationRequest,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(texts.to_vec());

        let translate_all = || {
            texts
                .iter()
                .map(|text| Self::translated(text, &request.target_language))
                .collect::<Vec<_>>()
        };

        match self.behavior {
            MockBehavior::Working => Ok(translate_all()),

            MockBehavior::ShortByOne => {
                let mut out = translate_all();
                out.pop();
                Ok(out)
            }

            MockBehavior::Surplus => {
                let mut out = translate_all();
                out.push("[EXTRA]".to_string());
                Ok(out)
            }

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(translate_all())
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::RateLimited => Err(ProviderError::RateLimitExceeded(
                "Simulated quota exhaustion".to_string(),
            )),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(translate_all())
            }

            MockBehavior::Panicking => panic!("mock backend panicked on request #{}", count + 1),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
