/*!
 * Prompt templates for contextual translation.
 *
 * The context block is appended to the backend's system prompt. It lists
 * earlier translations of the same entry and translations of similar entries
 * so that the backend keeps terminology consistent across variants.
 */

use crate::translation::context::{EntryContext, HistoricalTranslation, SimilarTranslation};

/// Builder for the consistency section of a system prompt.
#[derive(Debug, Clone, Default)]
pub struct ContextPromptBuilder {
    history: Vec<HistoricalTranslation>,
    similar: Vec<SimilarTranslation>,
}

impl ContextPromptBuilder {
    /// Heading of the same-entry section.
    pub const HISTORY_HEADER: &'static str =
        "This text has been translated before in other versions. Stay consistent with these translations unless the source changed meaning:";

    /// Heading of the similar-entry section.
    pub const SIMILAR_HEADER: &'static str =
        "Similar texts have been translated as follows. Reuse their terminology:";

    /// Closing instruction.
    pub const FOOTER: &'static str =
        "Only return the translated text, without quotes or explanations.";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, history: &[HistoricalTranslation]) -> Self {
        self.history = history.to_vec();
        self
    }

    pub fn with_similar(mut self, similar: &[SimilarTranslation]) -> Self {
        self.similar = similar.to_vec();
        self
    }

    pub fn from_context(context: &EntryContext) -> Self {
        Self::new()
            .with_history(&context.history)
            .with_similar(&context.similar)
    }

    /// Render the section; empty when there is nothing to show.
    pub fn build(&self) -> String {
        if self.history.is_empty() && self.similar.is_empty() {
            return String::new();
        }

        let mut sections = Vec::new();

        if !self.history.is_empty() {
            let mut section = String::from(Self::HISTORY_HEADER);
            for item in &self.history {
                section.push_str(&format!(
                    "\n- [{}] {} => {}",
                    item.variant,
                    quote(&item.raw),
                    quote(&item.translation)
                ));
            }
            sections.push(section);
        }

        if !self.similar.is_empty() {
            let mut section = String::from(Self::SIMILAR_HEADER);
            for item in &self.similar {
                section.push_str(&format!("\n- {} => {}", quote(&item.raw), quote(&item.translation)));
            }
            sections.push(section);
        }

        sections.push(Self::FOOTER.to_string());
        sections.join("\n\n")
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\n', "\\n"))
}
