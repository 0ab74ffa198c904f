//! Emoji palettes offered for insertion.
//!
//! Palettes are an editor concept and never part of a document. A
//! [`PaletteStore`] always holds at least one palette, so index-based lookups
//! clamp instead of failing.

use serde::{Deserialize, Serialize};

use crate::emoji::{emoji_only, removing_duplicates};
use crate::error::{CoreResult, EmojiArtError};

/// Palettes a fresh store starts with.
const DEFAULT_PALETTES: &[(&str, &str)] = &[
    ("Vehicles", "🚙🚗🚘🚕🚖🏎🚚🛻🚛🚐🚓🚔🚑🚒🚀✈️🛫🛬🛩🚁🛸🚲🏍🛶⛵️🚤🛥🛳⛴🚢🚂🚝🚅🚆🚊🚉🚇🛺🚜"),
    ("Sports", "🏈⚾️🏀⚽️🎾🏐🥏🏓⛳️🥅🥌🏂⛷🎳"),
    ("Music", "🎼🎤🎹🪘🥁🎺🪗🪕🎻"),
    ("Animals", "🐥🐣🐂🐄🐎🐖🐏🐑🦙🐐🐓🐁🐀🐒🦆🦅🦉🦇🐢🐍🦎🦖🦕🐅🐆🦓🦍🦧🦣🐘🦛🦏🐪🐫🦒🦘🦬🐃🦙🐐🦌🐕🐩🦮🐈🦤🦢🦩🕊🦝🦨🦡🦫🦦🦥🐿🦔"),
    ("Animal Faces", "🐵🙈🙊🙉🐶🐱🐭🐹🐰🦊🐻🐼🐻‍❄️🐨🐯🦁🐮🐷🐸🐲"),
    ("Flora", "🌲🌴🌿☘️🍀🍁🍄🌾💐🌷🌹🥀🌺🌸🌼🌻"),
    ("Weather", "☀️🌤⛅️🌥☁️🌦🌧⛈🌩🌨❄️💨☔️💧💦🌊☂️🌫🌪"),
    ("Faces", "😀😃😄😁😆😅😂🤣🥲☺️😊😇🙂🙃😉😌😍🥰😘😗😙😚😋😛😝😜🤪🤨🧐🤓😎🥸🤩🥳😏😞😔😟😕🙁☹️😣😖😫😩🥺😢😭😤😠😡🤯😳🥶😥😓🤗🤔🤭🤫🤥😬🙄😯😧🥱😴🤮😷🤧🤒🤠"),
];

/// A named, ordered, duplicate-free string of emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    name: String,
    emojis: String,
    id: u32,
}

impl Palette {
    fn new(name: impl Into<String>, emojis: &str, id: u32) -> Self {
        Self {
            name: name.into(),
            emojis: removing_duplicates(&emoji_only(emojis)),
            id,
        }
    }

    /// Unique identifier within the store.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The emoji, in display order.
    #[must_use]
    pub fn emojis(&self) -> &str {
        &self.emojis
    }
}

/// Ordered, never-empty collection of palettes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteStore {
    name: String,
    palettes: Vec<Palette>,
}

impl PaletteStore {
    /// Create a store seeded with the default palettes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let palettes = DEFAULT_PALETTES
            .iter()
            .zip(1..)
            .map(|(&(name, emojis), id)| Palette::new(name, emojis, id))
            .collect();
        Self {
            name: name.into(),
            palettes,
        }
    }

    /// Create a store from existing palettes, falling back to the defaults if
    /// there are none.
    #[must_use]
    pub fn with_palettes(name: impl Into<String>, palettes: Vec<Palette>) -> Self {
        if palettes.is_empty() {
            return Self::new(name);
        }
        Self {
            name: name.into(),
            palettes,
        }
    }

    /// The store's name, used as its persistence key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All palettes in order.
    #[must_use]
    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    /// Number of palettes; at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    /// Always `false`; a store is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// The palette at `index`, clamped into range.
    #[must_use]
    pub fn palette(&self, index: usize) -> &Palette {
        &self.palettes[self.clamp(index)]
    }

    /// Index of the palette shown after `index` when cycling.
    #[must_use]
    pub fn next_index(&self, index: usize) -> usize {
        (self.clamp(index) + 1) % self.palettes.len()
    }

    /// Position of the palette with `id`.
    #[must_use]
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.palettes.iter().position(|p| p.id == id)
    }

    /// Insert a new palette at `index` (clamped to the end). Non-emoji and
    /// repeated emoji are dropped. Returns the new palette's id.
    pub fn insert_palette(&mut self, name: impl Into<String>, emojis: &str, index: usize) -> u32 {
        let id = self.palettes.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let index = index.min(self.palettes.len());
        self.palettes.insert(index, Palette::new(name, emojis, id));
        id
    }

    /// Remove the palette at `index`, unless it is the last one left.
    /// Returns the index to show next.
    pub fn remove_palette(&mut self, index: usize) -> usize {
        if self.palettes.len() > 1 && index < self.palettes.len() {
            let removed = self.palettes.remove(index);
            tracing::debug!("Removed palette {}", removed.name);
        }
        index % self.palettes.len()
    }

    /// Rename the palette at `index` (clamped).
    pub fn rename(&mut self, index: usize, name: impl Into<String>) {
        let index = self.clamp(index);
        self.palettes[index].name = name.into();
    }

    /// Put new emoji at the front of the palette at `index` (clamped).
    pub fn add_emojis(&mut self, index: usize, emojis: &str) {
        let index = self.clamp(index);
        let palette = &mut self.palettes[index];
        let combined = format!("{emojis}{}", palette.emojis);
        palette.emojis = removing_duplicates(&emoji_only(&combined));
    }

    /// Remove every occurrence of `emoji` from the palette at `index` (clamped).
    pub fn remove_emoji(&mut self, index: usize, emoji: &str) {
        let index = self.clamp(index);
        let palette = &mut self.palettes[index];
        palette.emojis = crate::emoji::graphemes(&palette.emojis)
            .into_iter()
            .filter(|g| *g != emoji)
            .collect();
    }

    /// Serialize the palettes for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(&self.palettes).map_err(EmojiArtError::from)
    }

    /// Restore a store from persisted palettes.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(name: impl Into<String>, json: &str) -> CoreResult<Self> {
        let palettes: Vec<Palette> = serde_json::from_str(json)?;
        Ok(Self::with_palettes(name, palettes))
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.palettes.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = PaletteStore::new("Default");
        assert_eq!(store.len(), DEFAULT_PALETTES.len());
        assert_eq!(store.palette(0).name(), "Vehicles");
        assert_eq!(store.palette(999).name(), "Faces");
    }

    #[test]
    fn test_default_palettes_are_deduplicated() {
        let store = PaletteStore::new("Default");
        let animals = store.palette(3).emojis();
        assert_eq!(crate::emoji::removing_duplicates(animals), animals);
    }

    #[test]
    fn test_insert_palette_ids_and_clamp() {
        let mut store = PaletteStore::new("Default");
        let id = store.insert_palette("New", "a🍕b🍕🍔", 1);
        assert_eq!(id, DEFAULT_PALETTES.len() as u32 + 1);
        assert_eq!(store.palette(1).name(), "New");
        assert_eq!(store.palette(1).emojis(), "🍕🍔");

        store.insert_palette("End", "", 500);
        assert_eq!(store.palettes().last().map(Palette::name), Some("End"));
    }

    #[test]
    fn test_remove_keeps_last_palette() {
        let mut store = PaletteStore::with_palettes("Test", Vec::new());
        while store.len() > 1 {
            store.remove_palette(0);
        }
        let only = store.palette(0).clone();
        assert_eq!(store.remove_palette(0), 0);
        assert_eq!(store.palette(0), &only);
    }

    #[test]
    fn test_remove_returns_next_index() {
        let mut store = PaletteStore::new("Default");
        let last = store.len() - 1;
        assert_eq!(store.remove_palette(last), 0);
        assert_eq!(store.remove_palette(2), 2);
    }

    #[test]
    fn test_edit_emojis() {
        let mut store = PaletteStore::new("Default");
        let index = store.len();
        store.insert_palette("Food", "🍕", index);
        let index = store.len() - 1;

        store.add_emojis(index, "🍔🍕x");
        assert_eq!(store.palette(index).emojis(), "🍔🍕");
        store.remove_emoji(index, "🍕");
        assert_eq!(store.palette(index).emojis(), "🍔");
        store.rename(index, "Fast Food");
        assert_eq!(store.palette(index).name(), "Fast Food");
    }

    #[test]
    fn test_next_index_wraps() {
        let store = PaletteStore::new("Default");
        assert_eq!(store.next_index(store.len() - 1), 0);
        assert_eq!(store.next_index(0), 1);
    }

    #[test]
    fn test_json_round_trip() {
        let mut store = PaletteStore::new("Default");
        store.insert_palette("Food", "🍕🍔", 0);
        let json = store.to_json().expect("serialize");
        let restored = PaletteStore::from_json("Default", &json).expect("deserialize");
        assert_eq!(restored, store);
        assert_eq!(restored.index_of(store.palette(0).id()), Some(0));
    }

    #[test]
    fn test_empty_json_repairs_to_defaults() {
        let store = PaletteStore::from_json("Default", "[]").expect("deserialize");
        assert_eq!(store.len(), DEFAULT_PALETTES.len());
    }
}
