/*!
 * Error types for the polysub application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::subtitle_processor::UnitState;

/// Errors that can occur when a translation backend is invoked.
///
/// Every adapter reports its failures through this one type so a lane can
/// treat them uniformly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Missing or rejected credential
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether the provider asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded(_) | Self::ApiError { status_code: 429, .. }
        )
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A unit was asked to move to a state it cannot reach from its current one
    #[error("Unit {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: u64,
        from: UnitState,
        to: UnitState,
    },
}

/// Configuration errors that stop a run before it starts.
///
/// None of these leave any state behind: the dispatcher checks them all
/// before touching units, statuses or statistics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No active APIs configured or missing keys")]
    NoEligibleBackend,

    #[error("No pending subtitles to translate")]
    NoPendingUnits,

    #[error("Batch size must be a positive integer, got {0}")]
    InvalidBatchSize(usize),

    #[error("A translation run is already in progress")]
    AlreadyRunning,
}
