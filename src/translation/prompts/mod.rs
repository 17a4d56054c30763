/*!
 * Prompt construction for batch translation.
 *
 * This module provides:
 * - The base system prompt template
 * - Domain instruction fragments
 * - A builder that assembles the final system instruction
 */

pub mod templates;

// Re-export main types
pub use templates::{domain_context, PromptTemplate, SystemInstructionBuilder};
