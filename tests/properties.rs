use proptest::prelude::*;
use quran_wbw_rs::gloss::{EMPTY_DESCRIPTION, InclusionFlags, TRANSLITERATION_PLACEHOLDER};
use quran_wbw_rs::{
    AnnotationProvider, StaticGlossary, VerseRange, decode_escapes, decode_unicode_text,
    describe_word, parse_verse_words, segment_words,
};

fn escaped(text: &str) -> String {
    text.encode_utf16()
        .map(|unit| format!("\\u{unit:04x}"))
        .collect()
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}

fn count_runs(text: &str) -> usize {
    let mut runs = 0;
    let mut inside = false;
    for ch in text.chars() {
        let sep = is_separator(ch);
        if !sep && !inside {
            runs += 1;
        }
        inside = !sep;
    }
    runs
}

proptest! {
    /// Text without a backslash has nothing to decode.
    #[test]
    fn text_without_escapes_is_unchanged(text in "[^\\\\]{0,64}") {
        let decoded = decode_escapes(&text);
        prop_assert!(!decoded.is_fallback());
        prop_assert_eq!(decoded.text, text);
    }

    /// Fully escaped text round-trips, and decoding the result again changes nothing.
    /// Backslashes are excluded: an escaped backslash can spell a fresh escape,
    /// which a single pass leaves for the next one.
    #[test]
    fn escaped_text_decodes_and_is_stable(text in "[^\\\\]{0,32}") {
        let once = decode_unicode_text(&escaped(&text));
        prop_assert_eq!(&once, &text);
        prop_assert_eq!(decode_unicode_text(&once), once);
    }

    #[test]
    fn segmentation_matches_non_whitespace_runs(text in "[ \\t\\n\u{feff}\u{0627}-\u{064a}a-z]{0,48}") {
        let words = segment_words(&text);
        prop_assert_eq!(words.len(), count_runs(&text));
        for word in &words {
            prop_assert!(!word.is_empty());
            prop_assert!(!word.chars().any(is_separator));
        }
    }

    #[test]
    fn unknown_words_get_placeholders(word in "[a-z]{1,12}", index in 0usize..500) {
        let glossary = StaticGlossary;
        prop_assert!(!glossary.contains(&word));
        prop_assert_eq!(
            glossary.transliteration(&word, index),
            TRANSLITERATION_PLACEHOLDER
        );
        prop_assert_eq!(glossary.meaning(&word, index), format!("meaning of word {}", index + 1));
    }

    /// Each enabled flag contributes exactly one line.
    #[test]
    fn description_has_one_line_per_flag(
        transliteration in any::<bool>(),
        translation in any::<bool>(),
        grammar in any::<bool>(),
        index in 0usize..50,
    ) {
        let flags = InclusionFlags { transliteration, translation, grammar };
        let description = describe_word(&StaticGlossary, "رَبِّ", index, flags);
        let enabled = [transliteration, translation, grammar].iter().filter(|on| **on).count();
        if enabled == 0 {
            prop_assert_eq!(description, EMPTY_DESCRIPTION);
        } else {
            prop_assert_eq!(description.lines().count(), enabled);
        }
    }

    #[test]
    fn in_bounds_ranges_select_inclusive_slice(count in 1usize..300, a in 1u32..300, b in 1u32..300) {
        let verses: Vec<usize> = (1..=count).collect();
        let (start, end) = (a.min(b), a.max(b));
        prop_assume!((end as usize) <= count);
        let resolved = VerseRange::new(Some(start), Some(end)).resolve(count);
        let selected = resolved.select(&verses);
        prop_assert_eq!(selected.len(), (end - start + 1) as usize);
        prop_assert_eq!(selected[0], start as usize);
    }
}

#[test]
fn basmala_segments_into_four_glossed_words() {
    let raw = escaped("بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ");
    let words = parse_verse_words(&raw);
    assert_eq!(words, ["بِسْمِ", "اللَّهِ", "الرَّحْمَٰنِ", "الرَّحِيمِ"]);
    let glossary = StaticGlossary;
    assert!(words.iter().all(|word| glossary.contains(word)));
    assert_eq!(glossary.transliteration(&words[0], 0), "bismi");
}
