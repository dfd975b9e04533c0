use crate::export::{NOTE_COLUMN_TITLE, WORD_COLUMN_TITLE};
use crate::selection::Selection;
use std::fmt::Write;

fn heading(selection: &Selection) -> (String, String) {
    (
        format!("{} ({})", selection.english_name, selection.chapter_name),
        format!(
            "Verses {} to {} of {}",
            selection.range.start, selection.range.end, selection.total_verses
        ),
    )
}

/// Markdown rendition of the preview, one table per verse.
pub fn render_markdown(selection: &Selection) -> String {
    let (title, range) = heading(selection);
    let mut out = String::new();
    let _ = writeln!(out, "## {title}\n\n{range}\n");
    for verse in &selection.verses {
        let _ = writeln!(out, "### Verse {}\n", verse.number);
        if !verse.translation.is_empty() {
            let _ = writeln!(out, "*{}*\n", escape_cell(&verse.translation));
        }
        let _ = writeln!(out, "|{WORD_COLUMN_TITLE}|{NOTE_COLUMN_TITLE}|");
        let _ = writeln!(out, "|-:|:-|");
        for word in &verse.words {
            let note = word
                .description
                .lines()
                .map(escape_cell)
                .collect::<Vec<_>>()
                .join(" · ");
            let _ = writeln!(out, "|{}|{}|", escape_cell(&word.text), note);
        }
        out.push('\n');
    }
    out
}

/// Plain-text rendition for non-terminal output.
pub fn render_plain(selection: &Selection) -> String {
    let (title, range) = heading(selection);
    let mut out = String::new();
    let _ = writeln!(out, "{title}\n{range}");
    for verse in &selection.verses {
        let _ = writeln!(out, "\nVerse {}", verse.number);
        if !verse.translation.is_empty() {
            let _ = writeln!(out, "  {}", verse.translation);
        }
        let width = verse
            .words
            .iter()
            .map(|word| word.text.chars().count())
            .max()
            .unwrap_or(0)
            .max(WORD_COLUMN_TITLE.len());
        let _ = writeln!(out, "{:>width$}  {}", WORD_COLUMN_TITLE, NOTE_COLUMN_TITLE);
        let _ = writeln!(out, "{:->width$}  {}", "", "-".repeat(NOTE_COLUMN_TITLE.len()));
        for word in &verse.words {
            let mut lines = word.description.lines();
            let first = lines.next().unwrap_or("");
            let pad = width.saturating_sub(word.text.chars().count());
            let _ = writeln!(out, "{}{}  {}", " ".repeat(pad), word.text, first);
            for line in lines {
                let _ = writeln!(out, "{:width$}  {}", "", line);
            }
        }
    }
    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
