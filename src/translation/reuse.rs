/*!
 * Change detection against the translation memory.
 *
 * A remembered translation is reused only when the source text is unchanged
 * and that language did not fall back to the source text last time.
 */

use std::borrow::Cow;
use std::fmt;

use crate::record_table::Entry;

/// Replace non-breaking spaces so that editor noise does not count as a change
pub fn normalize_raw(text: &str) -> Cow<'_, str> {
    if text.contains('\u{a0}') {
        Cow::Owned(text.replace('\u{a0}', " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// Whether two source texts are the same after normalization
pub fn same_raw(a: &str, b: &str) -> bool {
    normalize_raw(a) == normalize_raw(b)
}

/// Why an entry has to be sent to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetranslateReason {
    /// No remembered record for the key
    Cold,
    /// The source text changed
    Changed,
    /// The record has no value for this language
    MissingLanguage,
    /// The remembered value is a fallback from a failed attempt
    PreviouslyFailed,
}

impl fmt::Display for RetranslateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Cold => "not in memory",
            Self::Changed => "source changed",
            Self::MissingLanguage => "language missing",
            Self::PreviouslyFailed => "failed last time",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReuseDecision {
    Reuse(String),
    Translate(RetranslateReason),
}

/// Decide whether `language` of an entry with source `raw` can come from memory
pub fn decide(raw: &str, remembered: Option<&Entry>, language: &str) -> ReuseDecision {
    let Some(record) = remembered else {
        return ReuseDecision::Translate(RetranslateReason::Cold);
    };
    if !same_raw(raw, &record.raw) {
        return ReuseDecision::Translate(RetranslateReason::Changed);
    }
    if record.failed_languages.contains(language) {
        return ReuseDecision::Translate(RetranslateReason::PreviouslyFailed);
    }
    match record.translations.get(language) {
        Some(text) => ReuseDecision::Reuse(text.clone()),
        None => ReuseDecision::Translate(RetranslateReason::MissingLanguage),
    }
}
