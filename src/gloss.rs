use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-word annotation source.
///
/// `index` is the zero-based position of the word within its verse.
/// Implementations must never fail: a miss returns a placeholder.
pub trait AnnotationProvider {
    fn transliteration(&self, word: &str, index: usize) -> String;
    fn meaning(&self, word: &str, index: usize) -> String;
    fn grammar(&self, word: &str, index: usize) -> String;
}

struct GlossEntry {
    transliteration: &'static str,
    meaning: &'static str,
    grammar: &'static str,
}

const GLOSSARY_ROWS: &[(&str, GlossEntry)] = &[
    (
        "بِسْمِ",
        GlossEntry {
            transliteration: "bismi",
            meaning: "In the name of",
            grammar: "Noun, genitive case with preposition",
        },
    ),
    (
        "اللَّهِ",
        GlossEntry {
            transliteration: "allahi",
            meaning: "Allah",
            grammar: "Proper noun, genitive case",
        },
    ),
    (
        "الرَّحْمَٰنِ",
        GlossEntry {
            transliteration: "ar-rahmani",
            meaning: "The Most Gracious",
            grammar: "Adjective, genitive case",
        },
    ),
    (
        "الرَّحِيمِ",
        GlossEntry {
            transliteration: "ar-raheem",
            meaning: "The Most Merciful",
            grammar: "Adjective, genitive case",
        },
    ),
    (
        "الْحَمْدُ",
        GlossEntry {
            transliteration: "alhamdu",
            meaning: "All praise",
            grammar: "Noun, nominative case",
        },
    ),
    (
        "لِلَّهِ",
        GlossEntry {
            transliteration: "lillahi",
            meaning: "to Allah",
            grammar: "Prepositional phrase",
        },
    ),
    (
        "رَبِّ",
        GlossEntry {
            transliteration: "rabbi",
            meaning: "Lord of",
            grammar: "Noun, genitive case (mudaf)",
        },
    ),
    (
        "الْعَالَمِينَ",
        GlossEntry {
            transliteration: "al-alameen",
            meaning: "the worlds",
            grammar: "Noun, genitive case (mudaf ilayh)",
        },
    ),
];

static GLOSSARY: Lazy<HashMap<&'static str, &'static GlossEntry>> = Lazy::new(|| {
    GLOSSARY_ROWS
        .iter()
        .map(|(word, entry)| (*word, entry))
        .collect()
});

pub const TRANSLITERATION_PLACEHOLDER: &str = "transliteration";
pub const GRAMMAR_PLACEHOLDER: &str = "Grammar analysis";
pub const EMPTY_DESCRIPTION: &str = "Word analysis";

/// Built-in demonstration glossary covering the opening words of Al-Fatiha.
///
/// Lookups are exact string matches on fully vocalized text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticGlossary;

impl StaticGlossary {
    pub fn len(&self) -> usize {
        GLOSSARY.len()
    }

    pub fn is_empty(&self) -> bool {
        GLOSSARY.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        GLOSSARY.contains_key(word)
    }
}

impl AnnotationProvider for StaticGlossary {
    fn transliteration(&self, word: &str, _index: usize) -> String {
        GLOSSARY
            .get(word)
            .map(|entry| entry.transliteration)
            .unwrap_or(TRANSLITERATION_PLACEHOLDER)
            .to_string()
    }

    fn meaning(&self, word: &str, index: usize) -> String {
        GLOSSARY
            .get(word)
            .map(|entry| entry.meaning.to_string())
            .unwrap_or_else(|| format!("meaning of word {}", index + 1))
    }

    fn grammar(&self, word: &str, _index: usize) -> String {
        GLOSSARY
            .get(word)
            .map(|entry| entry.grammar)
            .unwrap_or(GRAMMAR_PLACEHOLDER)
            .to_string()
    }
}

/// Positional stand-ins served by the verse endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAnnotations;

impl AnnotationProvider for PlaceholderAnnotations {
    fn transliteration(&self, _word: &str, index: usize) -> String {
        format!("word{}", index + 1)
    }

    fn meaning(&self, _word: &str, index: usize) -> String {
        format!("meaning{}", index + 1)
    }

    fn grammar(&self, _word: &str, index: usize) -> String {
        format!("grammar{}", index + 1)
    }
}

/// Which annotation lines to include for each word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionFlags {
    pub transliteration: bool,
    pub translation: bool,
    pub grammar: bool,
}

impl InclusionFlags {
    pub const ALL: Self = Self {
        transliteration: true,
        translation: true,
        grammar: true,
    };

    pub fn any(&self) -> bool {
        self.transliteration || self.translation || self.grammar
    }
}

/// Builds the description cell for one word.
///
/// Each enabled flag contributes one line; with every flag off the result is
/// [`EMPTY_DESCRIPTION`].
pub fn describe_word<P>(provider: &P, word: &str, index: usize, flags: InclusionFlags) -> String
where
    P: AnnotationProvider + ?Sized,
{
    if !flags.any() {
        return EMPTY_DESCRIPTION.to_string();
    }
    let mut lines = Vec::with_capacity(3);
    if flags.transliteration {
        lines.push(format!(
            "Transliteration: {}",
            provider.transliteration(word, index)
        ));
    }
    if flags.translation {
        lines.push(format!("Meaning: {}", provider.meaning(word, index)));
    }
    if flags.grammar {
        lines.push(format!("Grammar: {}", provider.grammar(word, index)));
    }
    lines.join("\n")
}

/// One synthesized word entry of the verse endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordBreakdown {
    pub arabic: String,
    pub transliteration: String,
    pub translation: String,
    pub grammar: String,
    pub source: AnnotationSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationSource {
    Placeholder,
    Glossary,
}

/// Synthesizes the placeholder breakdown for already segmented words.
pub fn placeholder_breakdown<S: AsRef<str>>(words: &[S]) -> Vec<WordBreakdown> {
    let placeholders = PlaceholderAnnotations;
    words
        .iter()
        .enumerate()
        .map(|(index, word)| WordBreakdown {
            arabic: word.as_ref().to_string(),
            transliteration: placeholders.transliteration(word.as_ref(), index),
            translation: placeholders.meaning(word.as_ref(), index),
            grammar: placeholders.grammar(word.as_ref(), index),
            source: AnnotationSource::Placeholder,
        })
        .collect()
}
