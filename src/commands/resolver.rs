//! Transcript → action resolution.
//!
//! Matching is plain substring containment on the normalised transcript:
//!
//! 1. custom overrides, in insertion order;
//! 2. the built-in [`PHRASE_TABLE`], in declared order, across every locale
//!    (or only the active one when the resolver is locale-restricted).
//!
//! The first hit wins.  Containment tolerates filler words around the
//! command ("could you please pause it") at the price of order sensitivity,
//! which the table layout accounts for.

use super::action::ActionId;
use super::overrides::CustomOverrides;
use super::phrases::{Locale, PhraseEntry, PHRASE_TABLE};

/// Lower-case and trim a transcript.
pub fn normalize(transcript: &str) -> String {
    transcript.trim().to_lowercase()
}

/// Resolves transcripts against a phrase table.
#[derive(Debug, Clone, Copy)]
pub struct CommandResolver {
    table: &'static [PhraseEntry],
    only: Option<Locale>,
}

impl Default for CommandResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandResolver {
    /// Resolver over the built-in table, matching every locale.
    pub fn new() -> Self {
        Self {
            table: PHRASE_TABLE,
            only: None,
        }
    }

    /// Only match built-in phrases of `locale`.  Overrides are unaffected.
    pub fn restricted_to(locale: Locale) -> Self {
        Self {
            table: PHRASE_TABLE,
            only: Some(locale),
        }
    }

    /// Build the resolver a locale tag and the `restrict_to_locale` setting
    /// ask for.  An unrecognised tag falls back to matching every locale.
    pub fn for_locale_tag(tag: &str, restrict: bool) -> Self {
        match (restrict, Locale::from_tag(tag)) {
            (true, Some(locale)) => Self::restricted_to(locale),
            (true, None) => {
                log::warn!("resolver: no phrases for locale {tag:?}; matching all locales");
                Self::new()
            }
            (false, _) => Self::new(),
        }
    }

    /// Resolve `transcript` to at most one action.
    pub fn resolve(&self, transcript: &str, overrides: &CustomOverrides) -> Option<ActionId> {
        let text = normalize(transcript);
        if text.is_empty() {
            return None;
        }

        if let Some((action, phrase)) = overrides
            .iter()
            .find(|(_, phrase)| !phrase.is_empty() && text.contains(phrase))
        {
            log::debug!("resolver: {text:?} matched custom phrase {phrase:?} -> {action}");
            return Some(action);
        }

        let hit = self.table.iter().find_map(|entry| {
            entry
                .phrases
                .iter()
                .filter(|p| self.only.map_or(true, |l| p.locale == l))
                .find(|p| text.contains(p.text))
                .map(|p| (entry.action, p.text))
        });

        match hit {
            Some((action, phrase)) => {
                log::debug!("resolver: {text:?} matched {phrase:?} -> {action}");
                Some(action)
            }
            None => {
                log::debug!("resolver: no command in {text:?}");
                None
            }
        }
    }
}
