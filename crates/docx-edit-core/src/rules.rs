//! Formatting rules.
//!
//! Rules arrive as loose `{style, value}` pairs. They are validated into
//! [`StyleChange`]s before any handler touches the document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::EditError;
use crate::model::{Alignment, HighlightColor, Paragraph, RunFormat};

/// Wire form of one formatting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattingRule {
    pub style: String,
    #[serde(default)]
    pub value: Value,
}

impl FormattingRule {
    pub fn new(style: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            style: style.into(),
            value: value.into(),
        }
    }
}

/// A validated formatting change.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleChange {
    Bold(bool),
    Italic(bool),
    Underline(bool),
    FontSize(f32),
    FontName(String),
    /// Six uppercase hex digits.
    Color(String),
    /// `None` clears the highlight.
    Highlight(Option<HighlightColor>),
    Alignment(Alignment),
}

impl TryFrom<&FormattingRule> for StyleChange {
    type Error = EditError;

    fn try_from(rule: &FormattingRule) -> Result<Self, Self::Error> {
        let value = &rule.value;
        let change = match rule.style.as_str() {
            "bold" => StyleChange::Bold(truthy(value)),
            "italic" => StyleChange::Italic(truthy(value)),
            "underline" => StyleChange::Underline(truthy(value)),
            "font_size" => match value.as_f64() {
                Some(size) if size > 0.0 => StyleChange::FontSize(size as f32),
                _ => return Err(invalid(rule, "expected a positive number of points")),
            },
            "font_name" => match value.as_str().map(str::trim) {
                Some(name) if !name.is_empty() => StyleChange::FontName(name.to_string()),
                _ => return Err(invalid(rule, "expected a font name")),
            },
            "font_color_rgb" => {
                let raw = value.as_str().unwrap_or_default().trim().trim_start_matches('#');
                if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(invalid(rule, "expected an RRGGBB hex color"));
                }
                StyleChange::Color(raw.to_ascii_uppercase())
            }
            "highlight_color" => {
                let raw = value.as_str().unwrap_or_default();
                if raw.eq_ignore_ascii_case("none") {
                    StyleChange::Highlight(None)
                } else {
                    let color = raw
                        .parse::<HighlightColor>()
                        .map_err(|reason| invalid(rule, &reason))?;
                    StyleChange::Highlight(Some(color))
                }
            }
            "alignment" => {
                let raw = value.as_str().unwrap_or_default();
                let alignment = raw.parse::<Alignment>().map_err(|reason| invalid(rule, &reason))?;
                StyleChange::Alignment(alignment)
            }
            other => {
                return Err(EditError::malformed(format!("unsupported formatting style '{other}'")));
            }
        };
        Ok(change)
    }
}

impl StyleChange {
    /// Whether the change targets the paragraph rather than its runs.
    pub fn is_paragraph_level(&self) -> bool {
        matches!(self, StyleChange::Alignment(_))
    }

    /// Overlay the change onto a run format. Paragraph-level changes are
    /// ignored and reported as not applied.
    pub fn apply_to_run(&self, format: &mut RunFormat) -> bool {
        match self {
            StyleChange::Bold(on) => format.bold = Some(*on),
            StyleChange::Italic(on) => format.italic = Some(*on),
            StyleChange::Underline(on) => format.underline = Some(*on),
            StyleChange::FontSize(size) => format.font_size = Some(*size),
            StyleChange::FontName(name) => format.font_name = Some(name.clone()),
            StyleChange::Color(color) => format.color = Some(color.clone()),
            StyleChange::Highlight(color) => format.highlight = *color,
            StyleChange::Alignment(_) => return false,
        }
        true
    }

    /// Apply to a whole paragraph: alignment on the paragraph itself, every
    /// other change on each of its runs.
    pub fn apply_to_paragraph(&self, paragraph: &mut Paragraph) -> bool {
        if let StyleChange::Alignment(alignment) = self {
            paragraph.alignment = Some(*alignment);
            return true;
        }
        let mut applied = false;
        for run in &mut paragraph.runs {
            applied |= self.apply_to_run(&mut run.format);
        }
        applied
    }
}

/// Validate rules, dropping the unusable ones with a warning.
pub(crate) fn parse_rules(rules: &[FormattingRule]) -> Vec<StyleChange> {
    rules
        .iter()
        .filter_map(|rule| match StyleChange::try_from(rule) {
            Ok(change) => Some(change),
            Err(e) => {
                warn!("Skipping formatting rule {:?}: {}", rule, e);
                None
            }
        })
        .collect()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "false" | "0" | "no" | "off"),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn invalid(rule: &FormattingRule, reason: &str) -> EditError {
    EditError::malformed(format!("invalid value {} for style '{}': {}", rule.value, rule.style, reason))
}
