/*!
 * Translation memory engine.
 *
 * - `client`: rate-limited, retrying `Translator` around one backend
 * - `rate_limit`: `N/s|m|h` budgets and the sliding request window
 * - `memory`: the persisted TOML memory format
 * - `reuse`: change detection against remembered source texts
 * - `context`: cross-variant history and similar-entry lookup
 * - `prompts`: rendering of that context into system prompts
 */

pub use self::client::{TranslationClient, TranslationOutcome, Translator};
pub use self::context::{AuxiliaryContext, ContextAssembler, EntryContext};
pub use self::reuse::{ReuseDecision, RetranslateReason};

pub mod client;
pub mod context;
pub mod memory;
pub mod prompts;
pub mod rate_limit;
pub mod reuse;
