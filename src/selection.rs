use crate::data::{Chapter, ChapterBundle, Verse};
use crate::gloss::{AnnotationProvider, InclusionFlags, describe_word};
use crate::text::parse_verse_words;
use serde::{Deserialize, Serialize};

/// User-entered verse bounds. Missing or zero values take the chapter defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl VerseRange {
    pub fn new(start: Option<u32>, end: Option<u32>) -> Self {
        Self { start, end }
    }

    /// Resolves the bounds against a chapter with `verse_count` verses.
    ///
    /// The returned bounds are the ones shown to the user; they are not
    /// clamped, so `start` may exceed the verse count.
    pub fn resolve(&self, verse_count: usize) -> ResolvedRange {
        let start = self.start.filter(|&v| v > 0).unwrap_or(1);
        let end = self
            .end
            .filter(|&v| v > 0)
            .unwrap_or(u32::try_from(verse_count).unwrap_or(u32::MAX));
        ResolvedRange { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub start: u32,
    pub end: u32,
}

impl ResolvedRange {
    /// Zero-based slice bounds into a verse list of length `len`.
    pub fn slice_bounds(&self, len: usize) -> (usize, usize) {
        let from = (self.start as usize).saturating_sub(1).min(len);
        let to = (self.end as usize).min(len).max(from);
        (from, to)
    }

    pub fn select<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let (from, to) = self.slice_bounds(items.len());
        &items[from..to]
    }
}

/// One annotated word of a selected verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedWord {
    pub text: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedVerse {
    pub number: u32,
    pub translation: String,
    pub words: Vec<AnnotatedWord>,
}

/// Verses of one chapter narrowed to a range, segmented and annotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub chapter_number: u16,
    pub chapter_name: String,
    pub english_name: String,
    pub total_verses: u32,
    pub range: ResolvedRange,
    pub flags: InclusionFlags,
    pub verses: Vec<SelectedVerse>,
}

impl Selection {
    pub fn build<P>(
        bundle: &ChapterBundle,
        range: VerseRange,
        flags: InclusionFlags,
        provider: &P,
    ) -> Self
    where
        P: AnnotationProvider + ?Sized,
    {
        let ayahs: &[Verse] = &bundle.surah.ayahs;
        let resolved = range.resolve(ayahs.len());
        let (offset, _) = resolved.slice_bounds(ayahs.len());
        let verses = resolved
            .select(ayahs)
            .iter()
            .enumerate()
            .map(|(index, verse)| {
                let words = parse_verse_words(&verse.text)
                    .into_iter()
                    .enumerate()
                    .map(|(word_index, text)| {
                        let description = describe_word(provider, &text, word_index, flags);
                        AnnotatedWord { text, description }
                    })
                    .collect();
                SelectedVerse {
                    number: resolved.start + index as u32,
                    translation: bundle.translation_at(offset + index).to_string(),
                    words,
                }
            })
            .collect();

        let total_verses = if bundle.surah.number_of_ayahs > 0 {
            bundle.surah.number_of_ayahs
        } else {
            ayahs.len() as u32
        };
        Self {
            chapter_number: bundle.surah.number,
            chapter_name: bundle.surah.name.clone(),
            english_name: bundle.surah.english_name.clone(),
            total_verses,
            range: resolved,
            flags,
            verses,
        }
    }

    pub fn word_count(&self) -> usize {
        self.verses.iter().map(|verse| verse.words.len()).sum()
    }
}

/// Client-side application state: the chapter list and the chapter currently
/// loaded for preview/export.
#[derive(Debug, Clone, Default)]
pub struct ReaderState {
    chapters: Vec<Chapter>,
    current: Option<ChapterBundle>,
}

impl ReaderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Makes `bundle` the current chapter and returns it.
    pub fn load(&mut self, bundle: ChapterBundle) -> &ChapterBundle {
        self.current.insert(bundle)
    }
}
