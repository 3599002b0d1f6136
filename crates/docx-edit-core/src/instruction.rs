//! Structured instructions.
//!
//! [`Instruction`] is the wire form produced upstream: an `operation_type`
//! tag plus loose `target_description` and `parameters` objects. Parsing it
//! yields an [`Operation`], a closed enum with one validated payload per
//! operation kind, so a handler never sees a missing required field.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{EditError, EditResult};
use crate::rules::{parse_rules, FormattingRule, StyleChange};

/// Operation kinds, spelled as they appear in `operation_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    ReplaceText,
    InsertText,
    ApplyTextFormatting,
    ApplyParagraphFormatting,
    DeleteElement,
    TableModifyCell,
    TableAddRow,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::ReplaceText,
        OperationKind::InsertText,
        OperationKind::ApplyTextFormatting,
        OperationKind::ApplyParagraphFormatting,
        OperationKind::DeleteElement,
        OperationKind::TableModifyCell,
        OperationKind::TableAddRow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ReplaceText => "REPLACE_TEXT",
            OperationKind::InsertText => "INSERT_TEXT",
            OperationKind::ApplyTextFormatting => "APPLY_TEXT_FORMATTING",
            OperationKind::ApplyParagraphFormatting => "APPLY_PARAGRAPH_FORMATTING",
            OperationKind::DeleteElement => "DELETE_ELEMENT",
            OperationKind::TableModifyCell => "TABLE_MODIFY_CELL",
            OperationKind::TableAddRow => "TABLE_ADD_ROW",
        }
    }
}

impl FromStr for OperationKind {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EditError::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row/column of a table cell, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCoords {
    pub row: usize,
    pub col: usize,
}

/// Where an instruction applies. Not unique: may match zero, one or many
/// elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_to_find: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_coords: Option<TableCoords>,
    /// Template placeholder; stands in for `old_text` when that is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl TargetDescription {
    fn text(&self) -> Option<&str> {
        non_blank(self.text_to_find.as_deref())
    }
}

/// Wire form of one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub operation_type: String,
    #[serde(default)]
    pub target_description: Value,
    #[serde(default)]
    pub parameters: Value,
}

impl Instruction {
    pub fn new(kind: OperationKind, target_description: Value, parameters: Value) -> Self {
        Self {
            operation_type: kind.as_str().to_string(),
            target_description,
            parameters,
        }
    }

    /// Validate into a typed operation.
    pub fn parse(&self) -> EditResult<Operation> {
        let kind: OperationKind = self.operation_type.parse()?;
        let target: TargetDescription = decode(&self.target_description, "target_description")?;

        let operation = match kind {
            OperationKind::ReplaceText => {
                let params: ReplaceTextParams = decode(&self.parameters, "parameters")?;
                let old_text = params
                    .old_text
                    .filter(|text| !text.is_empty())
                    .or_else(|| target.placeholder.clone().filter(|text| !text.is_empty()))
                    .ok_or_else(|| EditError::malformed("REPLACE_TEXT requires 'old_text' or 'placeholder'"))?;
                Operation::ReplaceText(ReplaceText {
                    context: target.text().map(str::to_string),
                    old_text,
                    new_text: params.new_text.unwrap_or_default(),
                })
            }
            OperationKind::InsertText => {
                let params: InsertTextParams = decode(&self.parameters, "parameters")?;
                let anchor = target
                    .text()
                    .ok_or_else(|| EditError::malformed("INSERT_TEXT requires 'text_to_find'"))?;
                let text = non_blank(params.text_to_insert.as_deref())
                    .ok_or_else(|| EditError::malformed("INSERT_TEXT requires 'text_to_insert'"))?;
                let position = params
                    .position
                    .as_deref()
                    .ok_or_else(|| EditError::malformed("INSERT_TEXT requires 'position'"))?
                    .parse()?;
                Operation::InsertText(InsertText {
                    anchor: anchor.to_string(),
                    text: text.to_string(),
                    position,
                })
            }
            OperationKind::ApplyTextFormatting => {
                let params: TextFormattingParams = decode(&self.parameters, "parameters")?;
                let segment = non_blank(params.apply_to_text_segment.as_deref())
                    .ok_or_else(|| EditError::malformed("APPLY_TEXT_FORMATTING requires 'apply_to_text_segment'"))?;
                let rules: Vec<StyleChange> = parse_rules(&params.formatting_rules)
                    .into_iter()
                    .filter(|change| {
                        let run_level = !change.is_paragraph_level();
                        if !run_level {
                            warn!("APPLY_TEXT_FORMATTING ignores paragraph-level rule {:?}", change);
                        }
                        run_level
                    })
                    .collect();
                if rules.is_empty() {
                    return Err(EditError::malformed("APPLY_TEXT_FORMATTING has no usable 'formatting_rules'"));
                }
                Operation::ApplyTextFormatting(TextFormatting {
                    segment: segment.to_string(),
                    rules,
                })
            }
            OperationKind::ApplyParagraphFormatting => {
                let params: ParagraphFormattingParams = decode(&self.parameters, "parameters")?;
                let text = target
                    .text()
                    .ok_or_else(|| EditError::malformed("APPLY_PARAGRAPH_FORMATTING requires 'text_to_find'"))?;
                let rules = parse_rules(&params.formatting_rules);
                if rules.is_empty() {
                    return Err(EditError::malformed(
                        "APPLY_PARAGRAPH_FORMATTING has no usable 'formatting_rules'",
                    ));
                }
                Operation::ApplyParagraphFormatting(ParagraphFormatting {
                    text: text.to_string(),
                    rules,
                })
            }
            OperationKind::DeleteElement => {
                let element_type = non_blank(target.element_type.as_deref())
                    .ok_or_else(|| EditError::malformed("DELETE_ELEMENT requires 'element_type'"))?;
                let what = match element_type {
                    "paragraph" => DeleteTarget::Paragraph(
                        target
                            .text()
                            .ok_or_else(|| EditError::malformed("DELETE_ELEMENT of a paragraph requires 'text_to_find'"))?
                            .to_string(),
                    ),
                    "table" => DeleteTarget::Table(TableSelector::from_target(&target)?),
                    other => {
                        return Err(EditError::malformed(format!("unsupported element_type '{other}'")));
                    }
                };
                Operation::DeleteElement(DeleteElement { target: what })
            }
            OperationKind::TableModifyCell => {
                let params: ModifyCellParams = decode(&self.parameters, "parameters")?;
                let coords = target
                    .table_coords
                    .ok_or_else(|| EditError::malformed("TABLE_MODIFY_CELL requires 'table_coords'"))?;
                let text = params
                    .new_cell_text
                    .ok_or_else(|| EditError::malformed("TABLE_MODIFY_CELL requires 'new_cell_text'"))?;
                Operation::TableModifyCell(TableModifyCell {
                    table: TableSelector::from_target(&target)?,
                    coords,
                    text: scalar_text(&text),
                })
            }
            OperationKind::TableAddRow => {
                let params: AddRowParams = decode(&self.parameters, "parameters")?;
                let row_data = params
                    .row_data
                    .ok_or_else(|| EditError::malformed("TABLE_ADD_ROW requires 'row_data' as a list"))?;
                Operation::TableAddRow(TableAddRow {
                    table: TableSelector::from_target(&target)?,
                    row_data: row_data.iter().map(scalar_text).collect(),
                    insert_at_index: params.insert_at_index,
                })
            }
        };
        Ok(operation)
    }
}

/// A validated instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ReplaceText(ReplaceText),
    InsertText(InsertText),
    ApplyTextFormatting(TextFormatting),
    ApplyParagraphFormatting(ParagraphFormatting),
    DeleteElement(DeleteElement),
    TableModifyCell(TableModifyCell),
    TableAddRow(TableAddRow),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ReplaceText(_) => OperationKind::ReplaceText,
            Operation::InsertText(_) => OperationKind::InsertText,
            Operation::ApplyTextFormatting(_) => OperationKind::ApplyTextFormatting,
            Operation::ApplyParagraphFormatting(_) => OperationKind::ApplyParagraphFormatting,
            Operation::DeleteElement(_) => OperationKind::DeleteElement,
            Operation::TableModifyCell(_) => OperationKind::TableModifyCell,
            Operation::TableAddRow(_) => OperationKind::TableAddRow,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceText {
    /// Restricts the search to paragraphs containing this text, when any do.
    pub context: Option<String>,
    pub old_text: String,
    pub new_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    BeforeParagraph,
    AfterParagraph,
    StartOfParagraph,
    EndOfParagraph,
}

impl FromStr for InsertPosition {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before_paragraph" => Ok(InsertPosition::BeforeParagraph),
            "after_paragraph" => Ok(InsertPosition::AfterParagraph),
            "start_of_paragraph" => Ok(InsertPosition::StartOfParagraph),
            "end_of_paragraph" => Ok(InsertPosition::EndOfParagraph),
            other => Err(EditError::malformed(format!("unknown insert position '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertText {
    pub anchor: String,
    pub text: String,
    pub position: InsertPosition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFormatting {
    pub segment: String,
    pub rules: Vec<StyleChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphFormatting {
    pub text: String,
    pub rules: Vec<StyleChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    Paragraph(String),
    Table(TableSelector),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteElement {
    pub target: DeleteTarget,
}

/// Identifies a top-level table: by index when given, else by cell text.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSelector {
    pub index: Option<usize>,
    pub text: Option<String>,
}

impl TableSelector {
    fn from_target(target: &TargetDescription) -> EditResult<Self> {
        let selector = TableSelector {
            index: target.table_index,
            text: target.text().map(str::to_string),
        };
        if selector.index.is_none() && selector.text.is_none() {
            return Err(EditError::malformed("table requires 'table_index' or 'text_to_find'"));
        }
        Ok(selector)
    }
}

impl fmt::Display for TableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.index, &self.text) {
            (Some(index), _) => write!(f, "table #{index}"),
            (None, Some(text)) => write!(f, "table containing '{text}'"),
            (None, None) => f.write_str("unspecified table"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableModifyCell {
    pub table: TableSelector,
    pub coords: TableCoords,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAddRow {
    pub table: TableSelector,
    pub row_data: Vec<String>,
    /// Accepted but not honored: rows are always appended.
    pub insert_at_index: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplaceTextParams {
    #[serde(default)]
    old_text: Option<String>,
    #[serde(default)]
    new_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InsertTextParams {
    #[serde(default)]
    text_to_insert: Option<String>,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TextFormattingParams {
    #[serde(default)]
    apply_to_text_segment: Option<String>,
    #[serde(default)]
    formatting_rules: Vec<FormattingRule>,
}

#[derive(Debug, Default, Deserialize)]
struct ParagraphFormattingParams {
    #[serde(default)]
    formatting_rules: Vec<FormattingRule>,
}

#[derive(Debug, Default, Deserialize)]
struct ModifyCellParams {
    #[serde(default)]
    new_cell_text: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct AddRowParams {
    #[serde(default)]
    row_data: Option<Vec<Value>>,
    #[serde(default)]
    insert_at_index: Option<usize>,
}

/// Decode an optional JSON object; `null` counts as empty.
fn decode<T: DeserializeOwned + Default>(value: &Value, field: &str) -> EditResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| EditError::malformed(format!("invalid '{field}': {e}")))
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|text| !text.trim().is_empty())
}

/// Cell text from a JSON scalar; strings are taken verbatim.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
