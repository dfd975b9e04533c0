use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;
use std::fmt;
use tracing::warn;

static ESCAPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\u[0-9A-Fa-f]{4}").expect("valid escape pattern"));

/// Result of [`decode_escapes`].
///
/// Decoding never fails. When the input contains an escape that cannot be
/// turned into a character (an unpaired UTF-16 surrogate), the original text
/// is kept verbatim and `fallback` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub fallback: Option<DecodeFault>,
}

impl Decoded {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeFault {
    /// Byte offset of the offending escape in the input.
    pub offset: usize,
    pub code_unit: u16,
}

impl fmt::Display for DecodeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unpaired surrogate \\u{:04x} at byte {}",
            self.code_unit, self.offset
        )
    }
}

/// Replaces every literal `\uXXXX` sequence with the character it names.
///
/// Adjacent high/low surrogate escapes are combined into one character.
/// Text without escapes is returned unchanged.
pub fn decode_escapes(input: &str) -> Decoded {
    match try_decode(input) {
        Ok(text) => Decoded {
            text,
            fallback: None,
        },
        Err(fault) => {
            warn!(%fault, "failed to decode unicode escapes; keeping original text");
            Decoded {
                text: input.to_string(),
                fallback: Some(fault),
            }
        }
    }
}

/// Convenience wrapper around [`decode_escapes`] that drops the fallback flag.
pub fn decode_unicode_text(input: &str) -> String {
    decode_escapes(input).into_string()
}

fn try_decode(input: &str) -> Result<String, DecodeFault> {
    if !input.contains("\\u") {
        return Ok(input.to_string());
    }
    let units: Vec<(usize, usize, u16)> = ESCAPE_PATTERN
        .find_iter(input)
        .map(|m| {
            let value = u16::from_str_radix(&m.as_str()[2..], 16).unwrap_or_default();
            (m.start(), m.end(), value)
        })
        .collect();

    let mut output = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let mut idx = 0usize;
    while idx < units.len() {
        let (start, end, unit) = units[idx];
        output.push_str(&input[cursor..start]);
        cursor = end;
        idx += 1;

        if let Some(ch) = char::from_u32(u32::from(unit)) {
            output.push(ch);
            continue;
        }
        let is_high = (0xD800..=0xDBFF).contains(&unit);
        let low = units
            .get(idx)
            .filter(|(next_start, _, next)| {
                *next_start == end && (0xDC00..=0xDFFF).contains(next)
            })
            .copied();
        match low {
            Some((_, low_end, low_unit)) if is_high => {
                let scalar = 0x10000
                    + ((u32::from(unit) - 0xD800) << 10)
                    + (u32::from(low_unit) - 0xDC00);
                let ch = char::from_u32(scalar).ok_or(DecodeFault {
                    offset: start,
                    code_unit: unit,
                })?;
                output.push(ch);
                cursor = low_end;
                idx += 1;
            }
            _ => {
                return Err(DecodeFault {
                    offset: start,
                    code_unit: unit,
                });
            }
        }
    }
    output.push_str(&input[cursor..]);
    Ok(output)
}

/// Decodes every string inside a JSON value in place.
///
/// Returns how many strings fell back to their original text.
pub fn decode_json_strings(value: &mut Value) -> usize {
    match value {
        Value::String(text) => {
            let decoded = decode_escapes(text);
            let fallback = usize::from(decoded.is_fallback());
            *text = decoded.text;
            fallback
        }
        Value::Array(items) => items.iter_mut().map(decode_json_strings).sum(),
        Value::Object(map) => map.values_mut().map(decode_json_strings).sum(),
        _ => 0,
    }
}

fn is_word_separator(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}

/// Splits decoded text into whitespace-delimited words, left to right.
///
/// Empty fragments are discarded; no other normalization happens.
pub fn segment_words(text: &str) -> Vec<&str> {
    text.split(is_word_separator)
        .filter(|word| !word.is_empty())
        .collect()
}

/// Decodes escapes in raw verse text, then segments it into owned words.
pub fn parse_verse_words(raw: &str) -> Vec<String> {
    let decoded = decode_unicode_text(raw);
    segment_words(&decoded)
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn escaped(text: &str) -> String {
        text.encode_utf16()
            .map(|unit| format!("\\u{unit:04x}"))
            .collect()
    }

    #[test]
    fn decodes_arabic_escapes() {
        let decoded = decode_escapes(&escaped("بِسْمِ"));
        assert_eq!(decoded.text, "بِسْمِ");
        assert!(!decoded.is_fallback());
    }

    #[test]
    fn hex_digits_are_case_insensitive() {
        let input = format!("{}{}", "\\u00e9", "\\u00C9");
        assert_eq!(decode_unicode_text(&input), "éÉ");
    }

    #[test]
    fn mixed_text_keeps_surroundings() {
        let input = format!("verse: {} end", escaped("ال"));
        assert_eq!(decode_unicode_text(&input), "verse: ال end");
    }

    #[test]
    fn short_escape_passes_through() {
        let input = "\\u06 and \\uZZZZ";
        assert_eq!(decode_unicode_text(input), input);
    }

    #[test]
    fn surrogate_pair_combines() {
        let input = escaped("😀");
        assert_eq!(input.len(), 12);
        assert_eq!(decode_unicode_text(&input), "😀");
    }

    #[test]
    fn lone_surrogate_falls_back_to_original() {
        let input = format!("ب {} tail", "\\ud800");
        let decoded = decode_escapes(&input);
        assert_eq!(decoded.text, input);
        let fault = decoded.fallback.expect("fallback recorded");
        assert_eq!(fault.code_unit, 0xD800);
        assert_eq!(fault.offset, "ب ".len());
    }

    #[test]
    fn already_decoded_text_is_untouched() {
        let text = "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ";
        assert_eq!(decode_unicode_text(text), text);
    }

    /// Decoding is a single pass: an escaped backslash that spells out a new
    /// escape is left for a second pass, so decoding is not idempotent here.
    #[test]
    fn escaped_backslash_yields_a_new_escape() {
        let input = format!("{}{}", "\\u005c", "u0041");
        let once = decode_unicode_text(&input);
        assert_eq!(once, "\\u0041");
        assert_eq!(decode_unicode_text(&once), "A");
    }

    #[test]
    fn json_walker_decodes_nested_strings() {
        let mut value = json!({
            "number": 1,
            "ayahs": [{ "text": escaped("ب"), "numberInSurah": 1 }],
            "name": escaped("سُورَةُ"),
            "bad": "\\udc00",
        });
        let fallbacks = decode_json_strings(&mut value);
        assert_eq!(fallbacks, 1);
        assert_eq!(value["ayahs"][0]["text"], "ب");
        assert_eq!(value["name"], "سُورَةُ");
        assert_eq!(value["number"], 1);
        assert_eq!(value["bad"], "\\udc00");
    }

    #[test]
    fn segments_basmala_prefix() {
        assert_eq!(segment_words("بِسْمِ اللَّهِ"), vec!["بِسْمِ", "اللَّهِ"]);
    }

    #[test]
    fn segmentation_drops_edge_whitespace() {
        let text = format!("  \tرَبِّ\n{}الْعَالَمِينَ {}", '\u{00A0}', '\u{FEFF}');
        assert_eq!(segment_words(&text), vec!["رَبِّ", "الْعَالَمِينَ"]);
        assert!(segment_words("   ").is_empty());
        assert!(segment_words("").is_empty());
    }

    #[test]
    fn diacritic_only_runs_survive() {
        let fatha = '\u{064E}'.to_string();
        let text = format!("{fatha} ب");
        assert_eq!(segment_words(&text), vec![fatha.as_str(), "ب"]);
    }

    #[test]
    fn parse_verse_words_decodes_first() {
        let raw = format!("{} {}", escaped("بِسْمِ"), escaped("اللَّهِ"));
        let words = parse_verse_words(&raw);
        assert_eq!(words, vec!["بِسْمِ".to_string(), "اللَّهِ".to_string()]);
    }
}
