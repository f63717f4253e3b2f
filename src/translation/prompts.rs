/*!
 * Prompt templates for chunk translation.
 *
 * The system instruction is fixed for a whole job. The user payload carries
 * the chunk and, when there is one, the digest of the previous translation.
 */

/// Header of the optional context section in the user payload
pub const CONTEXT_HEADER: &str = "[Previous translation excerpt (reference only)]:";

/// Header of the section holding the text to translate
pub const SOURCE_HEADER: &str = "[Text to translate]:";

/// System prompt template for document translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for document translation.
    pub const DOCUMENT_TRANSLATOR: &'static str = "You are a professional document translator. \
Translate the text you are given from {source_language} into {target_language}.

Keep the translation coherent with what came before. If an excerpt of the previous translation is supplied, \
use it only as background to keep context, names and terminology consistent. Never translate, repeat or continue the excerpt itself.

Output only the translation. Do not add greetings, explanations, notes or phrases such as \"Here is the translation\".";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default document translator template.
    pub fn document_translator() -> Self {
        Self::new(Self::DOCUMENT_TRANSLATOR)
    }

    /// Render the template. A `None` source language lets the model detect it.
    pub fn render(&self, source_language: Option<&str>, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language.unwrap_or("the original language"))
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::document_translator()
    }
}

/// Builder for the user payload of one translation call.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder<'a> {
    chunk: &'a str,
    context: Option<&'a str>,
}

impl<'a> TranslationPromptBuilder<'a> {
    /// Start a payload for `chunk`.
    pub fn new(chunk: &'a str) -> Self {
        Self {
            chunk,
            context: None,
        }
    }

    /// Attach the context digest. An empty digest adds nothing.
    pub fn with_context(mut self, digest: &'a str) -> Self {
        self.context = if digest.is_empty() { None } else { Some(digest) };
        self
    }

    /// Assemble the payload.
    pub fn build(&self) -> String {
        let source = format!("{}\n{}\n", SOURCE_HEADER, self.chunk);

        match self.context {
            Some(digest) => format!("{}\n...{}\n\n{}", CONTEXT_HEADER, digest, source),
            None => source,
        }
    }
}

/// Recover the chunk text from a payload produced by [`TranslationPromptBuilder`].
pub fn source_text_of(payload: &str) -> &str {
    let body = if payload.starts_with(CONTEXT_HEADER) {
        let marker = format!("\n\n{}\n", SOURCE_HEADER);
        match payload.find(&marker) {
            Some(pos) => &payload[pos + marker.len()..],
            None => payload,
        }
    } else {
        payload
            .strip_prefix(SOURCE_HEADER)
            .and_then(|rest| rest.strip_prefix('\n'))
            .unwrap_or(payload)
    };

    body.strip_suffix('\n').unwrap_or(body)
}
