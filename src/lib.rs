/*!
 * # polysub - multi-backend subtitle translation
 *
 * A Rust library for translating SRT subtitles by spreading fixed-size
 * batches over several translation backends at once.
 *
 * ## Features
 *
 * - Parse and export SRT documents, falling back to the original text for
 *   lines that were not translated
 * - Translate with several backends concurrently, one worker lane each:
 *   - Gemini (Google Generative Language API)
 *   - DeepL and Microsoft (simulated)
 * - Per-batch failure isolation with a fixed cooldown
 * - Cooperative cancellation and live progress statistics
 * - Domain presets (wuxia, technical, movie, modern) for the system prompt
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Units, SRT parsing and export
 * - `translation`: Batching, worker lanes and the dispatcher
 * - `providers`: Backend adapters
 * - `app_controller`: Load, translate and export a file with progress output
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{BackendDescriptor, Config, ProviderType, TranslationDomain, TranslationSettings};
pub use errors::{DispatchError, ProviderError, SubtitleError};
pub use providers::{TranslationBackend, TranslationRequest};
pub use subtitle_processor::{generate_srt, parse_srt, SubtitleCollection, Unit, UnitState};
pub use translation::{Dispatcher, RunContext, RunReport};
