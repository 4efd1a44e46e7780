/*!
 * Prompt construction for contextual translation requests.
 */

pub mod templates;

pub use templates::ContextPromptBuilder;

use crate::translation::context::EntryContext;

/// Render the consistency section for one entry
pub fn render_context(context: &EntryContext) -> String {
    ContextPromptBuilder::from_context(context).build()
}
