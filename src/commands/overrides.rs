//! User-defined trigger phrases.
//!
//! [`CustomOverrides`] maps an action to a single phrase chosen by the user.
//! It is persisted in the [`KeyValueStore`] under [`CUSTOM_COMMANDS_KEY`] as
//! a JSON object (`{"play": "go go go", "pause": "freeze"}`) and iterated in
//! insertion order, which is also the order the object is written in.

use serde_json::{Map, Value};

use crate::store::{KeyValueStore, StoreError};

use super::action::ActionId;

/// Store key holding the JSON-encoded override object.
pub const CUSTOM_COMMANDS_KEY: &str = "customVoiceCommands";

/// Ordered `action -> phrase` overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomOverrides {
    entries: Vec<(ActionId, String)>,
}

impl CustomOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the overrides saved in `store`.
    ///
    /// A missing key yields an empty set.  Entries with an unknown action id or
    /// a non-string value are skipped with a warning rather than failing the
    /// whole load.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, StoreError> {
        let Some(raw) = store.get(CUSTOM_COMMANDS_KEY)? else {
            return Ok(Self::default());
        };
        let object: Map<String, Value> = serde_json::from_str(&raw)?;

        let mut overrides = Self::default();
        for (key, value) in object {
            let action = match key.parse::<ActionId>() {
                Ok(action) => action,
                Err(e) => {
                    log::warn!("overrides: skipping stored entry: {e}");
                    continue;
                }
            };
            match value.as_str() {
                Some(phrase) => overrides.set(action, phrase),
                None => log::warn!("overrides: phrase for {action} is not a string"),
            }
        }
        Ok(overrides)
    }

    /// Write the overrides to `store` as a JSON object.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.set(CUSTOM_COMMANDS_KEY, &self.to_json())
    }

    /// Set the phrase for `action`.
    ///
    /// The phrase is lower-cased and trimmed.  An existing override keeps its
    /// position; a new one is appended.  An empty phrase removes the override
    /// (it would otherwise match every transcript).
    pub fn set(&mut self, action: ActionId, phrase: &str) {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            self.remove(action);
            return;
        }
        match self.entries.iter_mut().find(|(a, _)| *a == action) {
            Some(entry) => entry.1 = phrase,
            None => self.entries.push((action, phrase)),
        }
    }

    pub fn remove(&mut self, action: ActionId) -> Option<String> {
        let idx = self.entries.iter().position(|(a, _)| *a == action)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, action: ActionId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, p)| p.as_str())
    }

    /// Overrides in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &str)> {
        self.entries.iter().map(|(a, p)| (*a, p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_json(&self) -> String {
        let object: Map<String, Value> = self
            .entries
            .iter()
            .map(|(a, p)| (a.as_str().to_string(), Value::String(p.clone())))
            .collect();
        Value::Object(object).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn set_normalises_phrase() {
        let mut o = CustomOverrides::new();
        o.set(ActionId::Play, "  Go Go GO ");
        assert_eq!(o.get(ActionId::Play), Some("go go go"));
    }

    #[test]
    fn set_existing_keeps_position() {
        let mut o = CustomOverrides::new();
        o.set(ActionId::Pause, "freeze");
        o.set(ActionId::Play, "go");
        o.set(ActionId::Pause, "hold it");

        let order: Vec<_> = o.iter().collect();
        assert_eq!(
            order,
            vec![(ActionId::Pause, "hold it"), (ActionId::Play, "go")]
        );
    }

    #[test]
    fn empty_phrase_removes() {
        let mut o = CustomOverrides::new();
        o.set(ActionId::Mute, "shh");
        o.set(ActionId::Mute, "   ");
        assert!(o.is_empty());
    }

    #[test]
    fn load_missing_key_is_empty() {
        let store = MemoryStore::new();
        let o = CustomOverrides::load(&store).unwrap();
        assert!(o.is_empty());
    }

    #[test]
    fn save_then_load_preserves_insertion_order() {
        let store = MemoryStore::new();
        let mut o = CustomOverrides::new();
        o.set(ActionId::VolumeUp, "crank it");
        o.set(ActionId::Bookmark, "remember");
        o.set(ActionId::Forward10, "skip");
        o.save(&store).unwrap();

        let loaded = CustomOverrides::load(&store).unwrap();
        assert_eq!(loaded, o);

        let raw = store.get(CUSTOM_COMMANDS_KEY).unwrap().unwrap();
        assert_eq!(
            raw,
            r#"{"volumeUp":"crank it","bookmark":"remember","forward10":"skip"}"#
        );
    }

    #[test]
    fn load_skips_unknown_and_non_string_entries() {
        let store = MemoryStore::new();
        store
            .set(
                CUSTOM_COMMANDS_KEY,
                r#"{"teleport":"beam me","play":"go","pause":42}"#,
            )
            .unwrap();

        let o = CustomOverrides::load(&store).unwrap();
        assert_eq!(o.len(), 1);
        assert_eq!(o.get(ActionId::Play), Some("go"));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let store = MemoryStore::new();
        store.set(CUSTOM_COMMANDS_KEY, "[1, 2").unwrap();
        assert!(matches!(
            CustomOverrides::load(&store),
            Err(StoreError::Json(_))
        ));
    }
}
