//! In-memory document tree.
//!
//! A [`Document`] is a body plus per-section headers and footers. Each of those
//! is a [`Container`] of blocks (paragraphs and tables); table cells are
//! containers again. Text lives only in [`Run`]s: a paragraph's text is always
//! recomputed from its runs.

use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One element of source markup kept verbatim, e.g. a `w:numPr` subtree.
/// `name` is the element's local name, `xml` its exact source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupElement {
    pub name: String,
    pub xml: String,
}

impl MarkupElement {
    pub fn new(name: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xml: xml.into(),
        }
    }
}

/// Source markup an element carries without the model interpreting it, so a
/// writer can put it back (numbering, spacing, table grids, cell widths...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup {
    elements: Vec<MarkupElement>,
}

impl Markup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: MarkupElement) {
        self.elements.push(element);
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkupElement> {
        self.elements.iter()
    }

    pub fn get(&self, name: &str) -> Option<&MarkupElement> {
        self.elements.iter().find(|element| element.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Copy without the elements named `name`.
    pub fn without(&self, name: &str) -> Markup {
        Markup {
            elements: self.elements.iter().filter(|e| e.name != name).cloned().collect(),
        }
    }
}

impl FromIterator<MarkupElement> for Markup {
    fn from_iter<I: IntoIterator<Item = MarkupElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

/// Character formatting carried by a run. `None` means "inherited".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    /// Size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Hex RGB like "FF0000".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightColor>,
}

impl RunFormat {
    pub fn bold() -> Self {
        Self {
            bold: Some(true),
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: Some(true),
            ..Self::default()
        }
    }
}

/// Atomic unit of formatting.
///
/// A run with `inline` set stands for an object the model does not edit (a
/// drawing, a field code, a bookmark). Its text is empty, so no search ever
/// lands inside it, and writers emit the markup as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub format: RunFormat,
    /// Source run properties, interpreted ones included.
    #[serde(default, skip_serializing_if = "Markup::is_empty")]
    pub properties: Markup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<MarkupElement>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn inline(element: MarkupElement) -> Self {
        Self {
            inline: Some(element),
            ..Self::default()
        }
    }

    /// Run with new text and format that keeps this run's source properties.
    pub fn sibling(&self, text: impl Into<String>, format: RunFormat) -> Run {
        Run {
            text: text.into(),
            format,
            properties: self.properties.clone(),
            inline: None,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.inline.is_some()
    }

    pub fn with_format(mut self, format: RunFormat) -> Self {
        self.format = format;
        self
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distribute,
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEFT" | "START" => Ok(Alignment::Left),
            "CENTER" | "CENTRE" => Ok(Alignment::Center),
            "RIGHT" | "END" => Ok(Alignment::Right),
            "JUSTIFY" | "BOTH" => Ok(Alignment::Justify),
            "DISTRIBUTE" => Ok(Alignment::Distribute),
            other => Err(format!("unknown alignment '{other}'")),
        }
    }
}

/// Highlight colors, named after the word-processor color index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightColor {
    #[serde(rename = "BLACK")]
    Black,
    #[serde(rename = "BLUE")]
    Blue,
    #[serde(rename = "BRIGHT_GREEN")]
    BrightGreen,
    #[serde(rename = "DARK_BLUE")]
    DarkBlue,
    #[serde(rename = "DARK_RED")]
    DarkRed,
    #[serde(rename = "DARK_YELLOW")]
    DarkYellow,
    #[serde(rename = "GRAY_25")]
    Gray25,
    #[serde(rename = "GRAY_50")]
    Gray50,
    #[serde(rename = "GREEN")]
    Green,
    #[serde(rename = "PINK")]
    Pink,
    #[serde(rename = "RED")]
    Red,
    #[serde(rename = "TEAL")]
    Teal,
    #[serde(rename = "TURQUOISE")]
    Turquoise,
    #[serde(rename = "VIOLET")]
    Violet,
    #[serde(rename = "WHITE")]
    White,
    #[serde(rename = "YELLOW")]
    Yellow,
}

impl HighlightColor {
    const ALL: [HighlightColor; 16] = [
        HighlightColor::Black,
        HighlightColor::Blue,
        HighlightColor::BrightGreen,
        HighlightColor::DarkBlue,
        HighlightColor::DarkRed,
        HighlightColor::DarkYellow,
        HighlightColor::Gray25,
        HighlightColor::Gray50,
        HighlightColor::Green,
        HighlightColor::Pink,
        HighlightColor::Red,
        HighlightColor::Teal,
        HighlightColor::Turquoise,
        HighlightColor::Violet,
        HighlightColor::White,
        HighlightColor::Yellow,
    ];

    /// Color-index name, e.g. `BRIGHT_GREEN`.
    pub fn name(&self) -> &'static str {
        match self {
            HighlightColor::Black => "BLACK",
            HighlightColor::Blue => "BLUE",
            HighlightColor::BrightGreen => "BRIGHT_GREEN",
            HighlightColor::DarkBlue => "DARK_BLUE",
            HighlightColor::DarkRed => "DARK_RED",
            HighlightColor::DarkYellow => "DARK_YELLOW",
            HighlightColor::Gray25 => "GRAY_25",
            HighlightColor::Gray50 => "GRAY_50",
            HighlightColor::Green => "GREEN",
            HighlightColor::Pink => "PINK",
            HighlightColor::Red => "RED",
            HighlightColor::Teal => "TEAL",
            HighlightColor::Turquoise => "TURQUOISE",
            HighlightColor::Violet => "VIOLET",
            HighlightColor::White => "WHITE",
            HighlightColor::Yellow => "YELLOW",
        }
    }

    /// Value of the `w:highlight` attribute in WordprocessingML.
    pub fn word_value(&self) -> &'static str {
        match self {
            HighlightColor::Black => "black",
            HighlightColor::Blue => "blue",
            HighlightColor::BrightGreen => "green",
            HighlightColor::DarkBlue => "darkBlue",
            HighlightColor::DarkRed => "darkRed",
            HighlightColor::DarkYellow => "darkYellow",
            HighlightColor::Gray25 => "lightGray",
            HighlightColor::Gray50 => "darkGray",
            HighlightColor::Green => "darkGreen",
            HighlightColor::Pink => "magenta",
            HighlightColor::Red => "red",
            HighlightColor::Teal => "darkCyan",
            HighlightColor::Turquoise => "cyan",
            HighlightColor::Violet => "darkMagenta",
            HighlightColor::White => "white",
            HighlightColor::Yellow => "yellow",
        }
    }

    pub fn from_word_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.word_value() == value)
    }
}

impl FromStr for HighlightColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| format!("unknown highlight color '{s}'"))
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered sequence of runs plus paragraph-level properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Paragraph style id, e.g. "Heading1".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub runs: Vec<Run>,
    /// Source paragraph properties, interpreted ones included.
    #[serde(default, skip_serializing_if = "Markup::is_empty")]
    pub properties: Markup,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph with a single unformatted run.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new().with_runs(vec![Run::new(text)])
    }

    pub fn with_runs(mut self, runs: Vec<Run>) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Concatenation of the run texts.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Empty paragraph sharing this paragraph's style, alignment and source
    /// properties. A section break stays with the original.
    pub fn sibling(&self) -> Paragraph {
        Paragraph {
            style: self.style.clone(),
            alignment: self.alignment,
            runs: Vec::new(),
            properties: self.properties.without("sectPr"),
        }
    }

    /// Replace the whole text, keeping the first run's formatting.
    pub fn set_text(&mut self, text: impl Into<String>) {
        match self.runs.first_mut() {
            Some(first) => {
                first.text = text.into();
                self.runs.truncate(1);
            }
            None => self.runs.push(Run::new(text)),
        }
    }
}

/// Top-level element of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// Ordered blocks: the body, a header, a footer or a table cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            blocks: paragraphs.into_iter().map(Block::Paragraph).collect(),
        }
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn push_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Direct child paragraphs, skipping tables.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Table(_) => None,
        })
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.blocks.iter_mut().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Table(_) => None,
        })
    }

    /// Direct child tables, skipping paragraphs.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.blocks.iter_mut().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }

    /// Block index of the `ordinal`-th table.
    pub fn table_block_index(&self, ordinal: usize) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| matches!(block, Block::Table(_)))
            .nth(ordinal)
            .map(|(index, _)| index)
    }

    /// Text of the direct child paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: Container,
    #[serde(default, skip_serializing_if = "Markup::is_empty")]
    pub properties: Markup,
}

impl TableCell {
    pub fn new(content: Container) -> Self {
        Self {
            content,
            properties: Markup::new(),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Container::from_paragraphs(vec![Paragraph::from_text(text)]))
    }

    pub fn text(&self) -> String {
        self.content.text()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<TableCell>,
    #[serde(default, skip_serializing_if = "Markup::is_empty")]
    pub properties: Markup,
}

impl TableRow {
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            cells,
            properties: Markup::new(),
        }
    }

    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self::new(texts.iter().map(|text| TableCell::from_text(text.as_ref())).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<TableRow>,
    /// Source table properties and grid.
    #[serde(default, skip_serializing_if = "Markup::is_empty")]
    pub properties: Markup,
}

impl Table {
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self {
            rows,
            properties: Markup::new(),
        }
    }

    /// Table of single-paragraph cells.
    pub fn from_texts<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Self::new(rows.iter().map(|row| TableRow::from_texts(row)).collect())
    }

    /// Widest row's cell count.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row)?.cells.get(col)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row)?.cells.get_mut(col)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    /// Whether any cell's text contains `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.cells().any(|cell| cell.text().contains(needle))
    }
}

/// Per-section header and footer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub header: Container,
    #[serde(default)]
    pub footer: Container,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub body: Container,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: Container) -> Self {
        Self {
            body,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Top-level body tables.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.tables()
    }

    /// Every paragraph in document order: body paragraphs, body table cells,
    /// then each section's header and footer the same way.
    pub fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        for container in self.root_containers() {
            collect_paragraphs(container, &mut out);
        }
        out
    }

    /// Mutable counterpart of [`Document::paragraphs`], same order.
    pub fn paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        let mut out = Vec::new();
        collect_paragraphs_mut(&mut self.body, &mut out);
        for section in &mut self.sections {
            collect_paragraphs_mut(&mut section.header, &mut out);
            collect_paragraphs_mut(&mut section.footer, &mut out);
        }
        out
    }

    /// Visit every container (body, cells, headers, footers) in document
    /// order until the visitor breaks. A container is visited before the
    /// cells of its tables, so the visitor may restructure it first.
    pub fn visit_containers_mut<F>(&mut self, visitor: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&mut Container) -> ControlFlow<()>,
    {
        if visit_mut(&mut self.body, visitor).is_break() {
            return ControlFlow::Break(());
        }
        for section in &mut self.sections {
            if visit_mut(&mut section.header, visitor).is_break()
                || visit_mut(&mut section.footer, visitor).is_break()
            {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn root_containers(&self) -> Vec<&Container> {
        let mut roots = vec![&self.body];
        for section in &self.sections {
            roots.push(&section.header);
            roots.push(&section.footer);
        }
        roots
    }
}

fn collect_paragraphs<'a>(container: &'a Container, out: &mut Vec<&'a Paragraph>) {
    out.extend(container.paragraphs());
    for table in container.tables() {
        for cell in table.cells() {
            collect_paragraphs(&cell.content, out);
        }
    }
}

fn collect_paragraphs_mut<'a>(container: &'a mut Container, out: &mut Vec<&'a mut Paragraph>) {
    let mut tables = Vec::new();
    for block in container.blocks.iter_mut() {
        match block {
            Block::Paragraph(paragraph) => out.push(paragraph),
            Block::Table(table) => tables.push(table),
        }
    }
    for table in tables {
        for row in table.rows.iter_mut() {
            for cell in row.cells.iter_mut() {
                collect_paragraphs_mut(&mut cell.content, out);
            }
        }
    }
}

fn visit_mut<F>(container: &mut Container, visitor: &mut F) -> ControlFlow<()>
where
    F: FnMut(&mut Container) -> ControlFlow<()>,
{
    if visitor(container).is_break() {
        return ControlFlow::Break(());
    }
    for table in container.tables_mut() {
        for row in table.rows.iter_mut() {
            for cell in row.cells.iter_mut() {
                if visit_mut(&mut cell.content, visitor).is_break() {
                    return ControlFlow::Break(());
                }
            }
        }
    }
    ControlFlow::Continue(())
}
