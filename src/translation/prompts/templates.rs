/*!
 * Prompt templates for batch subtitle translation.
 *
 * The backend receives a JSON array of strings and must answer with a JSON
 * array of the same length. The system instruction is assembled from a base
 * template, a domain fragment and the user's own instructions.
 */

use crate::app_config::TranslationDomain;
use crate::providers::TranslationRequest;

/// System prompt template for subtitle translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for batch subtitle translation.
    pub const SUBTITLE_TRANSLATOR: &'static str = "You are a professional subtitle translator. Translate the following array of text strings from {source_language} to {target_language}.";

    /// Output contract appended last so nothing can override it.
    pub const OUTPUT_CONTRACT: &'static str = "CRITICAL: Return ONLY a JSON array of strings. The length of the output array MUST match the input array length exactly. Do not merge or split lines.";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default subtitle translator template.
    pub fn subtitle_translator() -> Self {
        Self::new(Self::SUBTITLE_TRANSLATOR)
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::subtitle_translator()
    }
}

/// Instruction fragment for a domain, `None` for general content
pub fn domain_context(domain: TranslationDomain) -> Option<&'static str> {
    match domain {
        TranslationDomain::General => None,
        TranslationDomain::Xianxia => Some(
            "Context: Wuxia/Xianxia (Tu Tien). Use appropriate Sino-Vietnamese terminology (Hán Việt) for cultivation terms, ranks, and martial arts. Tone: Ancient, epic, formal.",
        ),
        TranslationDomain::Technical => Some(
            "Context: Technical/Academic. Be precise, use standard terminology, and maintain a formal tone.",
        ),
        TranslationDomain::Modern => Some(
            "Context: Modern Life/Slang. Use natural, conversational language suitable for contemporary settings.",
        ),
        TranslationDomain::Movie => Some(
            "Context: Movie/Drama. Focus on emotional nuance and brevity suitable for subtitles.",
        ),
    }
}

/// Builder for the system instruction sent with every batch.
#[derive(Debug, Clone)]
pub struct SystemInstructionBuilder {
    template: PromptTemplate,
    source_language: String,
    target_language: String,
    domain: TranslationDomain,
    custom_instructions: Option<String>,
}

impl SystemInstructionBuilder {
    /// Create a new builder.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            template: PromptTemplate::default(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            domain: TranslationDomain::General,
            custom_instructions: None,
        }
    }

    /// Builder seeded from a request
    pub fn from_request(request: &TranslationRequest) -> Self {
        Self::new(&request.source_language, &request.target_language)
            .with_domain(request.domain)
            .with_custom_instructions(&request.custom_instructions)
    }

    /// Replace the base template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_domain(mut self, domain: TranslationDomain) -> Self {
        self.domain = domain;
        self
    }

    /// Blank instructions are ignored.
    pub fn with_custom_instructions(mut self, instructions: &str) -> Self {
        let trimmed = instructions.trim();
        self.custom_instructions = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Build the system instruction.
    pub fn build(&self) -> String {
        let mut instruction = self.template.render(&self.source_language, &self.target_language);

        if let Some(context) = domain_context(self.domain) {
            instruction.push(' ');
            instruction.push_str(context);
        }

        if let Some(custom) = &self.custom_instructions {
            instruction.push_str(" Additional Instructions: ");
            instruction.push_str(custom);
        }

        instruction.push('\n');
        instruction.push_str(PromptTemplate::OUTPUT_CONTRACT);
        instruction
    }
}
