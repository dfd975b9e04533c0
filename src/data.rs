use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response wrapper used by every upstream endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub status: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub number: u16,
    pub name: String,
    pub english_name: String,
    #[serde(default)]
    pub english_name_translation: String,
    pub number_of_ayahs: u32,
    #[serde(default)]
    pub revelation_type: String,
}

impl Chapter {
    /// Label used by chapter pickers, e.g. `1. Al-Faatiha (سُورَةُ ٱلْفَاتِحَةِ)`.
    pub fn label(&self) -> String {
        format!("{}. {} ({})", self.number, self.english_name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    #[serde(default)]
    pub number: u32,
    pub text: String,
    #[serde(default)]
    pub number_in_surah: u32,
}

/// One edition of a chapter: metadata plus its ordered verses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterText {
    pub number: u16,
    pub name: String,
    pub english_name: String,
    #[serde(default)]
    pub english_name_translation: String,
    #[serde(default)]
    pub revelation_type: String,
    #[serde(default)]
    pub number_of_ayahs: u32,
    #[serde(default)]
    pub ayahs: Vec<Verse>,
}

impl ChapterText {
    pub fn verse_count(&self) -> usize {
        self.ayahs.len()
    }
}

/// Payload of `/api/surah/:number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterBundle {
    pub surah: ChapterText,
    pub translation: ChapterText,
    #[serde(rename = "wordByWord", default)]
    pub word_by_word: Value,
}

impl ChapterBundle {
    /// Translated text of the verse at zero-based `index`, empty when absent.
    pub fn translation_at(&self, index: usize) -> &str {
        self.translation
            .ayahs
            .get(index)
            .map(|verse| verse.text.as_str())
            .unwrap_or("")
    }
}
