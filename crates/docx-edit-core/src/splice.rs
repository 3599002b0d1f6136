//! Minimal run rewrites.
//!
//! A splice replaces the text covered by a [`RunSpan`] with new text. Text
//! outside the span keeps the run, and therefore the formatting, it had
//! before. Intermediate runs emptied by a multi-run splice stay in place.

use crate::locate::RunSpan;
use crate::model::{Paragraph, RunFormat};

/// Replace the span's text with `new_text`, rendered in the style of the
/// span's first run. Returns the index of the run now holding `new_text`,
/// or `None` if the span does not fit the paragraph's current runs.
pub fn splice(paragraph: &mut Paragraph, span: RunSpan, new_text: &str) -> Option<usize> {
    splice_with(paragraph, span, new_text, |_| None)
}

/// Like [`splice`], but `restyle` may return a format for `new_text`. The
/// callback receives the first run's format. When it returns `Some`, the new
/// text is carved into a run of its own carrying that format; when it returns
/// `None`, the new text joins the first run.
pub fn splice_with<F>(paragraph: &mut Paragraph, span: RunSpan, new_text: &str, restyle: F) -> Option<usize>
where
    F: FnOnce(&RunFormat) -> Option<RunFormat>,
{
    if !fits(paragraph, span) {
        return None;
    }
    let runs = &mut paragraph.runs;
    let restyled = restyle(&runs[span.first_run()].format);

    match span {
        RunSpan::Single { run, offset, len } => {
            let Some(format) = restyled else {
                runs[run].text.replace_range(offset..offset + len, new_text);
                return Some(run);
            };
            let mut original = std::mem::take(&mut runs[run]);
            let suffix = original.text.split_off(offset + len);
            original.text.truncate(offset);
            let has_prefix = !original.text.is_empty();

            let mut pieces = Vec::with_capacity(3);
            if has_prefix {
                pieces.push(original.sibling(original.text.as_str(), original.format.clone()));
            }
            pieces.push(original.sibling(new_text, format));
            // The original run goes last so an inline object it holds survives.
            if !suffix.is_empty() || original.is_inline() {
                original.text = suffix;
                pieces.push(original);
            }
            runs.splice(run..=run, pieces);
            Some(run + usize::from(has_prefix))
        }
        RunSpan::Multi {
            first_run,
            offset_in_first,
            last_run,
            end_in_last,
        } => {
            for middle in &mut runs[first_run + 1..last_run] {
                middle.text.clear();
            }
            runs[last_run].text.replace_range(..end_in_last, "");

            runs[first_run].text.truncate(offset_in_first);
            match restyled {
                None => {
                    runs[first_run].text.push_str(new_text);
                    Some(first_run)
                }
                Some(format) if offset_in_first == 0 => {
                    let first = &mut runs[first_run];
                    first.text.push_str(new_text);
                    first.format = format;
                    Some(first_run)
                }
                Some(format) => {
                    let piece = runs[first_run].sibling(new_text, format);
                    runs.insert(first_run + 1, piece);
                    Some(first_run + 1)
                }
            }
        }
    }
}

fn fits(paragraph: &Paragraph, span: RunSpan) -> bool {
    let runs = &paragraph.runs;
    match span {
        RunSpan::Single { run, offset, len } => runs.get(run).is_some_and(|r| {
            offset + len <= r.text.len()
                && r.text.is_char_boundary(offset)
                && r.text.is_char_boundary(offset + len)
        }),
        RunSpan::Multi {
            first_run,
            offset_in_first,
            last_run,
            end_in_last,
        } => {
            first_run < last_run
                && runs.get(first_run).is_some_and(|r| {
                    offset_in_first <= r.text.len() && r.text.is_char_boundary(offset_in_first)
                })
                && runs.get(last_run).is_some_and(|r| {
                    end_in_last <= r.text.len() && r.text.is_char_boundary(end_in_last)
                })
        }
    }
}
