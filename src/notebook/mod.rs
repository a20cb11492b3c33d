// SPDX-License-Identifier: PMPL-1.0-or-later
//! In-memory notebook model.
//!
//! A [`Notebook`] is an ordered list of [`Cell`]s loaded from nbformat 4
//! JSON. Cell order is significant and preserved end-to-end; the only
//! structural edit is [`Notebook::insert_cell_at`], used by the remediator
//! to add a title cell. Fields the auditor does not inspect (metadata,
//! execution counts, raw output objects) are carried through untouched so a
//! remediated notebook can be written back without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// Fatal load failure. Raised before any rule runs.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("notebook root is not a JSON object")]
    NotAnObject,

    #[error("notebook has no `cells` list")]
    MissingCells,

    #[error("cell {index} is invalid: {source}")]
    InvalidCell {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Kind of a notebook cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    /// Prose, headings, images and links
    Markdown,
    /// Executable source with rendered outputs
    Code,
    /// Unrendered passthrough content; never scanned
    Raw,
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellKind::Markdown => write!(f, "markdown"),
            CellKind::Code => write!(f, "code"),
            CellKind::Raw => write!(f, "raw"),
        }
    }
}

/// Cell source: nbformat allows one string or a list of line strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Source {
    fn into_text(self) -> String {
        match self {
            Source::Text(text) => text,
            Source::Lines(lines) => lines.concat(),
        }
    }

    /// Line form, the way Jupyter writes it
    fn lines(text: &str) -> Self {
        Source::Lines(text.split_inclusive('\n').map(str::to_string).collect())
    }
}

/// One cell as nbformat stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CellRecord {
    cell_type: CellKind,
    source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outputs: Option<Vec<Map<String, Value>>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// The notebook root as nbformat stores it
#[derive(Debug, Serialize)]
struct NotebookRecord {
    cells: Vec<CellRecord>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// One rendered output of a code cell, keyed by mime type.
///
/// Rules only ever look at `mime_type`; the payload is opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub mime_type: String,
    pub payload: Value,
}

impl OutputArtifact {
    pub fn new(mime_type: &str, payload: Value) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            payload,
        }
    }

    /// Whether this output renders as an image (chart, figure, picture)
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Flatten one nbformat output object into mime-keyed artifacts
    fn from_output(output: &Map<String, Value>) -> Vec<Self> {
        match output.get("output_type").and_then(Value::as_str) {
            Some("stream") => vec![Self::new(
                "text/plain",
                output.get("text").cloned().unwrap_or(Value::Null),
            )],
            Some("error") => vec![Self::new(
                "application/vnd.jupyter.error",
                Value::Object(output.clone()),
            )],
            _ => match output.get("data") {
                Some(Value::Object(data)) => data
                    .iter()
                    .map(|(mime, payload)| Self::new(mime, payload.clone()))
                    .collect(),
                _ => Vec::new(),
            },
        }
    }

    /// Wrap as a `display_data` output object
    fn to_output(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(self.mime_type.clone(), self.payload.clone());

        let mut output = Map::new();
        output.insert("output_type".to_string(), Value::from("display_data"));
        output.insert("data".to_string(), Value::Object(data));
        output.insert("metadata".to_string(), Value::Object(Map::new()));
        output
    }
}

/// A single notebook cell.
///
/// `outputs` is derived from the stored nbformat output objects and is
/// read-only; [`Cell::with_output`] updates both together.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    index: usize,
    pub kind: CellKind,
    pub source: String,
    outputs: Vec<OutputArtifact>,
    raw_outputs: Vec<Map<String, Value>>,
    extra: Map<String, Value>,
}

impl Cell {
    fn new(kind: CellKind, source: &str) -> Self {
        Self {
            index: 0,
            kind,
            source: source.to_string(),
            outputs: Vec::new(),
            raw_outputs: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Create a markdown cell
    pub fn markdown(source: &str) -> Self {
        Self::new(CellKind::Markdown, source)
    }

    /// Create a code cell without outputs
    pub fn code(source: &str) -> Self {
        Self::new(CellKind::Code, source)
    }

    /// Create a raw cell
    pub fn raw(source: &str) -> Self {
        Self::new(CellKind::Raw, source)
    }

    /// Attach an output artifact, stored as a `display_data` output
    pub fn with_output(mut self, artifact: OutputArtifact) -> Self {
        self.raw_outputs.push(artifact.to_output());
        self.outputs.push(artifact);
        self
    }

    /// Position of this cell in its notebook (0-based)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rendered outputs in nbformat order
    pub fn outputs(&self) -> &[OutputArtifact] {
        &self.outputs
    }

    pub fn is_markdown(&self) -> bool {
        self.kind == CellKind::Markdown
    }

    pub fn is_code(&self) -> bool {
        self.kind == CellKind::Code
    }

    /// Whether any output of this cell is an image
    pub fn has_image_output(&self) -> bool {
        self.outputs.iter().any(OutputArtifact::is_image)
    }

    fn from_record(index: usize, record: CellRecord) -> Self {
        let raw_outputs = record.outputs.unwrap_or_default();
        let outputs = raw_outputs
            .iter()
            .flat_map(OutputArtifact::from_output)
            .collect();

        Self {
            index,
            kind: record.cell_type,
            source: record.source.into_text(),
            outputs,
            raw_outputs,
            extra: record.extra,
        }
    }

    fn to_record(&self) -> CellRecord {
        let mut extra = self.extra.clone();
        extra
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));

        // only code cells carry outputs and an execution count
        let outputs = if self.kind == CellKind::Code {
            extra.entry("execution_count").or_insert(Value::Null);
            Some(self.raw_outputs.clone())
        } else {
            extra.remove("execution_count");
            None
        };

        CellRecord {
            cell_type: self.kind,
            source: Source::lines(&self.source),
            outputs,
            extra,
        }
    }
}

/// A parsed notebook
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Notebook {
    cells: Vec<Cell>,
    extra: Map<String, Value>,
}

impl Notebook {
    /// Build a notebook from cells; indices are assigned in order
    pub fn new(cells: Vec<Cell>) -> Self {
        let mut notebook = Self {
            cells,
            extra: Map::new(),
        };
        notebook.reindex();
        notebook
    }

    /// Parse nbformat JSON text
    pub fn from_json_str(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Parse an already-decoded nbformat JSON value
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let Value::Object(mut root) = value else {
            return Err(ParseError::NotAnObject);
        };
        let Some(Value::Array(raw_cells)) = root.remove("cells") else {
            return Err(ParseError::MissingCells);
        };

        let cells = raw_cells
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                serde_json::from_value::<CellRecord>(raw)
                    .map(|record| Cell::from_record(index, record))
                    .map_err(|source| ParseError::InvalidCell { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cells, extra: root })
    }

    /// Read and parse a notebook file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Serialize back to nbformat JSON, keys sorted as Jupyter writes them
    pub fn to_json_value(&self) -> Result<Value, serde_json::Error> {
        let mut extra = self.extra.clone();
        extra
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        extra.entry("nbformat").or_insert(Value::from(4));
        extra.entry("nbformat_minor").or_insert(Value::from(5));

        serde_json::to_value(NotebookRecord {
            cells: self.cells.iter().map(Cell::to_record).collect(),
            extra,
        })
    }

    /// Pretty JSON using the single-space indent Jupyter writes
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.to_json_value()?.serialize(&mut serializer)?;
        buf.push(b'\n');
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the notebook to disk
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Markdown cells in ascending index order
    pub fn markdown_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_markdown())
    }

    /// Code cells in ascending index order
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }

    /// Insert a cell and recompute every index.
    ///
    /// Positions past the end append.
    pub fn insert_cell_at(&mut self, position: usize, cell: Cell) {
        let position = position.min(self.cells.len());
        self.cells.insert(position, cell);
        self.reindex();
    }

    pub(crate) fn cell_mut(&mut self, index: usize) -> Option<&mut Cell> {
        self.cells.get_mut(index)
    }

    fn reindex(&mut self) {
        for (index, cell) in self.cells.iter_mut().enumerate() {
            cell.index = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_list_and_string_sources() {
        let nb = Notebook::from_value(json!({
            "cells": [
                {"cell_type": "markdown", "metadata": {}, "source": ["# Title\n", "Intro"]},
                {"cell_type": "code", "metadata": {}, "source": "x = 1", "outputs": [], "execution_count": 1}
            ],
            "metadata": {},
            "nbformat": 4,
            "nbformat_minor": 5
        }))
        .expect("valid notebook");

        assert_eq!(nb.len(), 2);
        assert_eq!(nb.cells()[0].source, "# Title\nIntro");
        assert_eq!(nb.cells()[1].kind, CellKind::Code);
        assert_eq!(nb.cells()[1].index(), 1);
    }

    #[test]
    fn test_outputs_flatten_to_mime_types() {
        let nb = Notebook::from_value(json!({
            "cells": [{
                "cell_type": "code",
                "source": "plt.show()",
                "outputs": [
                    {"output_type": "stream", "name": "stdout", "text": ["hi\n"]},
                    {"output_type": "display_data", "data": {"image/png": "iVBOR", "text/plain": ["<Figure>"]}, "metadata": {}}
                ]
            }]
        }))
        .expect("valid notebook");

        let mimes: Vec<&str> = nb.cells()[0]
            .outputs()
            .iter()
            .map(|o| o.mime_type.as_str())
            .collect();
        assert_eq!(mimes, vec!["text/plain", "image/png", "text/plain"]);
        assert!(nb.cells()[0].has_image_output());
    }

    #[test]
    fn test_missing_cells_is_fatal() {
        let err = Notebook::from_value(json!({"metadata": {}})).unwrap_err();
        assert!(matches!(err, ParseError::MissingCells));
        assert!(matches!(
            Notebook::from_value(json!(["not", "an", "object"])),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn test_cell_without_kind_or_source_is_fatal() {
        let err = Notebook::from_value(json!({"cells": [{"source": "x"}]})).unwrap_err();
        assert!(matches!(err, ParseError::InvalidCell { index: 0, .. }));
        assert!(err.to_string().contains("cell_type"), "{}", err);

        let err = Notebook::from_value(json!({"cells": [
            {"cell_type": "markdown", "source": ""},
            {"cell_type": "markdown"}
        ]}))
        .unwrap_err();
        assert!(matches!(err, ParseError::InvalidCell { index: 1, .. }));
        assert!(err.to_string().contains("source"), "{}", err);
    }

    #[test]
    fn test_malformed_cells_are_fatal() {
        for cell in [
            json!("not an object"),
            json!({"cell_type": "widget", "source": ""}),
            json!({"cell_type": "markdown", "source": ["ok", 3]}),
            json!({"cell_type": "code", "source": "", "outputs": ["not an object"]}),
        ] {
            let err = Notebook::from_value(json!({"cells": [cell]})).unwrap_err();
            assert!(matches!(err, ParseError::InvalidCell { index: 0, .. }), "{}", err);
        }
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        assert!(matches!(
            Notebook::from_json_str("{not json"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_insert_recomputes_indices() {
        let mut nb = Notebook::new(vec![Cell::markdown("a"), Cell::code("b")]);
        nb.insert_cell_at(0, Cell::markdown("# Title"));

        assert_eq!(nb.len(), 3);
        let indices: Vec<usize> = nb.cells().iter().map(Cell::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(nb.cells()[1].source, "a");
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let original = json!({
            "cells": [{
                "cell_type": "code",
                "id": "abc123",
                "metadata": {"tags": ["keep"]},
                "source": ["a = 1\n", "b = 2"],
                "outputs": [{"output_type": "execute_result", "data": {"text/plain": "3"}, "metadata": {}, "execution_count": 4}],
                "execution_count": 4
            }],
            "metadata": {"kernelspec": {"name": "python3"}},
            "nbformat": 4,
            "nbformat_minor": 5
        });

        let nb = Notebook::from_value(original.clone()).expect("valid notebook");
        let text = nb.to_json_string().expect("serializable");
        let reparsed: Value = serde_json::from_str(&text).expect("valid JSON");

        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_outputs_added_through_builder_are_saved() {
        let cell = Cell::code("plot()").with_output(OutputArtifact::new("image/png", json!("iVBOR")));
        let nb = Notebook::new(vec![cell]);

        let value = nb.to_json_value().expect("serializable");
        assert_eq!(value["cells"][0]["outputs"][0]["output_type"], "display_data");
        assert_eq!(value["cells"][0]["outputs"][0]["data"]["image/png"], "iVBOR");
        assert_eq!(value["cells"][0]["execution_count"], Value::Null);

        let reloaded = Notebook::from_value(value).expect("valid notebook");
        assert_eq!(reloaded.cells()[0].outputs(), nb.cells()[0].outputs());
    }

    #[test]
    fn test_markdown_cells_written_without_outputs() {
        let value = Notebook::new(vec![Cell::markdown("# T")])
            .to_json_value()
            .expect("serializable");
        let cell = value["cells"][0].as_object().expect("cell object");
        assert!(!cell.contains_key("outputs"));
        assert!(!cell.contains_key("execution_count"));
        assert_eq!(cell["source"], json!(["# T"]));
        assert_eq!(value["nbformat"], 4);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nb.ipynb");
        let nb = Notebook::new(vec![Cell::markdown("# Hello\n"), Cell::raw("raw text")]);

        nb.save(&path).expect("save");
        let loaded = Notebook::load(&path).expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.cells()[1].kind, CellKind::Raw);
        assert_eq!(loaded.cells()[0].source, "# Hello\n");
    }
}
