//! Paragraph search and text-to-run span resolution.
//!
//! Formatting runs split text wherever the formatting changes, so a phrase the
//! user sees as one unit is routinely spread over several runs. The functions
//! here translate between paragraph-text offsets and run coordinates.

use std::ops::Range;

use crate::model::{Container, Document, Paragraph};

/// How a search string is compared against a paragraph's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Trimmed paragraph text equals the trimmed search text.
    Exact,
    /// Search text (or its trimmed form) occurs somewhere in the paragraph.
    Partial,
}

/// Whether `paragraph_text` matches `needle` under `mode`. A blank needle
/// never matches.
pub fn paragraph_matches(paragraph_text: &str, needle: &str, mode: MatchMode) -> bool {
    let trimmed = needle.trim();
    if trimmed.is_empty() {
        return false;
    }
    match mode {
        MatchMode::Exact => paragraph_text.trim() == trimmed,
        MatchMode::Partial => paragraph_text.contains(needle) || paragraph_text.contains(trimmed),
    }
}

/// Paragraphs of `container` matching `text`: its own paragraphs first, then
/// those of its table cells, the same order as [`Document::paragraphs`].
pub fn find_paragraphs<'a>(container: &'a Container, text: &str, mode: MatchMode) -> Vec<&'a Paragraph> {
    let mut found: Vec<&Paragraph> = container
        .paragraphs()
        .filter(|paragraph| paragraph_matches(&paragraph.text(), text, mode))
        .collect();
    for table in container.tables() {
        for cell in table.cells() {
            found.extend(find_paragraphs(&cell.content, text, mode));
        }
    }
    found
}

/// Document-order ordinals of every paragraph matching `text`, headers and
/// footers included. Ordinals index [`Document::paragraphs`] and
/// [`Document::paragraphs_mut`].
pub fn find_paragraph_ordinals(document: &Document, text: &str, mode: MatchMode) -> Vec<usize> {
    document
        .paragraphs()
        .iter()
        .enumerate()
        .filter(|(_, paragraph)| paragraph_matches(&paragraph.text(), text, mode))
        .map(|(ordinal, _)| ordinal)
        .collect()
}

/// Physical location of a match inside a paragraph's runs. Offsets are byte
/// offsets into the run texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSpan {
    /// The match lies inside one run.
    Single { run: usize, offset: usize, len: usize },
    /// The match starts in `first_run` and ends in `last_run`.
    Multi {
        first_run: usize,
        offset_in_first: usize,
        last_run: usize,
        end_in_last: usize,
    },
}

impl RunSpan {
    pub fn first_run(&self) -> usize {
        match *self {
            RunSpan::Single { run, .. } => run,
            RunSpan::Multi { first_run, .. } => first_run,
        }
    }
}

/// A resolved match: paragraph-text byte range plus its run coordinates.
/// Only valid until the paragraph's runs change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedSpan {
    pub start: usize,
    pub end: usize,
    pub span: RunSpan,
}

/// First occurrence of `needle` in the paragraph.
pub fn locate_run_span(paragraph: &Paragraph, needle: &str) -> Option<LocatedSpan> {
    locate_run_span_from(paragraph, needle, 0)
}

/// First occurrence of `needle` starting at byte offset `from` of the
/// paragraph text.
pub fn locate_run_span_from(paragraph: &Paragraph, needle: &str, from: usize) -> Option<LocatedSpan> {
    if needle.is_empty() {
        return None;
    }

    let mut layout = Vec::with_capacity(paragraph.runs.len());
    let mut full_text = String::new();
    for run in &paragraph.runs {
        layout.push((full_text.len(), run.text.len()));
        full_text.push_str(&run.text);
    }

    let tail = full_text.get(from..)?;
    let start = from + tail.find(needle)?;
    let end = start + needle.len();

    // A match inside a single run is edited in place.
    for (index, &(run_start, run_len)) in layout.iter().enumerate() {
        if run_start <= start && end <= run_start + run_len {
            return Some(LocatedSpan {
                start,
                end,
                span: RunSpan::Single {
                    run: index,
                    offset: start - run_start,
                    len: needle.len(),
                },
            });
        }
    }

    let first_run = layout
        .iter()
        .position(|&(run_start, run_len)| run_start <= start && start < run_start + run_len)?;
    let last_run = layout
        .iter()
        .rposition(|&(run_start, run_len)| run_start < end && end <= run_start + run_len)?;
    let (first_start, _) = layout[first_run];
    let (last_start, _) = layout[last_run];

    Some(LocatedSpan {
        start,
        end,
        span: RunSpan::Multi {
            first_run,
            offset_in_first: start - first_start,
            last_run,
            end_in_last: end - last_start,
        },
    })
}

/// Locate `search_text` as a contiguous sequence of whitespace-delimited words
/// in `full_text`. Returns the half-open range of word indices.
pub fn find_word_span(full_text: &str, search_text: &str) -> Option<Range<usize>> {
    let words: Vec<&str> = full_text.split_whitespace().collect();
    let needle: Vec<&str> = search_text.split_whitespace().collect();
    if needle.is_empty() || needle.len() > words.len() {
        return None;
    }
    words
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map(|start| start..start + needle.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Run, RunFormat};
    use rstest::rstest;

    fn split_paragraph(parts: &[&str]) -> Paragraph {
        Paragraph::new().with_runs(parts.iter().map(|part| Run::new(*part)).collect())
    }

    #[rstest]
    #[case("  Устаревший пункт ", "Устаревший пункт", MatchMode::Exact, true)]
    #[case("Устаревший пункт 2", "Устаревший пункт", MatchMode::Exact, false)]
    #[case("Устаревший пункт 2", "Устаревший пункт", MatchMode::Partial, true)]
    #[case("see clause 4", " clause 4 ", MatchMode::Partial, true)]
    #[case("anything", "   ", MatchMode::Partial, false)]
    fn test_paragraph_matches(
        #[case] text: &str,
        #[case] needle: &str,
        #[case] mode: MatchMode,
        #[case] expected: bool,
    ) {
        assert_eq!(paragraph_matches(text, needle, mode), expected);
    }

    #[test]
    fn test_single_run_match_resolves_to_fast_path() {
        let paragraph = split_paragraph(&["Цена: ", "100", " руб."]);
        let located = locate_run_span(&paragraph, "100").unwrap();
        assert_eq!(
            located.span,
            RunSpan::Single {
                run: 1,
                offset: 0,
                len: 3
            }
        );
        assert_eq!(&paragraph.text()[located.start..located.end], "100");
    }

    #[test]
    fn test_match_across_runs_resolves_to_multi_span() {
        let paragraph = split_paragraph(&["Ис", "ходные да", "нные"]);
        let located = locate_run_span(&paragraph, "ходные данные").unwrap();
        assert_eq!(
            located.span,
            RunSpan::Multi {
                first_run: 1,
                offset_in_first: 0,
                last_run: 2,
                end_in_last: "нные".len(),
            }
        );
    }

    #[test]
    fn test_first_occurrence_straddling_runs_is_preferred() {
        // "ab" first appears across runs 0/1, later inside run 2.
        let paragraph = split_paragraph(&["xa", "b-", "ab"]);
        let located = locate_run_span(&paragraph, "ab").unwrap();
        assert_eq!(located.start, 1);
        assert!(matches!(located.span, RunSpan::Multi { first_run: 0, last_run: 1, .. }));
    }

    #[test]
    fn test_search_resumes_from_offset() {
        let paragraph = split_paragraph(&["one two ", "one"]);
        let located = locate_run_span_from(&paragraph, "one", 1).unwrap();
        assert_eq!(located.start, 8);
        assert_eq!(
            located.span,
            RunSpan::Single {
                run: 1,
                offset: 0,
                len: 3
            }
        );
    }

    #[test]
    fn test_empty_runs_between_matched_runs_are_skipped() {
        let paragraph = split_paragraph(&["ab", "", "cd"]);
        let located = locate_run_span(&paragraph, "bc").unwrap();
        assert_eq!(
            located.span,
            RunSpan::Multi {
                first_run: 0,
                offset_in_first: 1,
                last_run: 2,
                end_in_last: 1,
            }
        );
    }

    #[test]
    fn test_not_found() {
        let paragraph = split_paragraph(&["abc"]);
        assert_eq!(locate_run_span(&paragraph, "xyz"), None);
        assert_eq!(locate_run_span(&paragraph, ""), None);
        assert_eq!(locate_run_span_from(&paragraph, "abc", 10), None);
    }

    #[test]
    fn test_find_paragraphs_respects_mode() {
        let container = crate::model::Container::from_paragraphs(vec![
            Paragraph::from_text("Устаревший пункт"),
            Paragraph::new().with_runs(vec![
                Run::new("Устаревший").with_format(RunFormat::bold()),
                Run::new(" пункт 3"),
            ]),
        ]);
        assert_eq!(find_paragraphs(&container, "Устаревший пункт", MatchMode::Exact).len(), 1);
        assert_eq!(find_paragraphs(&container, "Устаревший пункт", MatchMode::Partial).len(), 2);
    }

    #[test]
    fn test_find_paragraphs_descends_into_cells() {
        let mut container = crate::model::Container::new();
        container.push_table(crate::model::Table::from_texts(&[vec!["Итого", "100"]]));
        container.push_paragraph(Paragraph::from_text("Итого по разделу"));

        let found: Vec<String> = find_paragraphs(&container, "Итого", MatchMode::Partial)
            .iter()
            .map(|p| p.text())
            .collect();
        assert_eq!(found, vec!["Итого по разделу", "Итого"]);
    }

    #[test]
    fn test_paragraph_ordinals_cover_headers() {
        let document = Document::with_body(crate::model::Container::from_paragraphs(vec![
            Paragraph::from_text("ООО «Ромашка»"),
            Paragraph::from_text("текст"),
        ]))
        .with_section(crate::model::Section {
            header: crate::model::Container::from_paragraphs(vec![Paragraph::from_text("ООО «Ромашка»")]),
            footer: crate::model::Container::new(),
        });

        assert_eq!(find_paragraph_ordinals(&document, "Ромашка", MatchMode::Partial), vec![0, 2]);
        assert_eq!(find_paragraph_ordinals(&document, "текст", MatchMode::Exact), vec![1]);
        assert!(find_paragraph_ordinals(&document, "нет", MatchMode::Partial).is_empty());
    }

    #[test]
    fn test_find_word_span() {
        let text = "The   quick brown\nfox jumps";
        assert_eq!(find_word_span(text, "brown fox"), Some(2..4));
        assert_eq!(find_word_span(text, "quick  brown"), Some(1..3));
        assert_eq!(find_word_span(text, "fox quick"), None);
        assert_eq!(find_word_span(text, ""), None);
    }
}
