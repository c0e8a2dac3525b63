//! Jupyter notebook reader
//!
//! Reads nbformat v4 (`cells`) and v3 (`worksheets[].cells`) documents and
//! exposes the source of their code cells.

use serde::Deserialize;

/// Cell source, either one string or a list of lines
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Text(text) => text,
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: String,
    /// v4
    #[serde(default)]
    source: Option<CellSource>,
    /// v3 code cells
    #[serde(default)]
    input: Option<CellSource>,
}

#[derive(Debug, Default, Deserialize)]
struct Worksheet {
    #[serde(default)]
    cells: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    #[serde(default)]
    cells: Vec<RawCell>,
    #[serde(default)]
    worksheets: Vec<Worksheet>,
}

/// A code cell from a notebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCell {
    /// Position among all cells of the notebook
    pub index: usize,
    pub source: String,
}

/// Parse notebook JSON and return its code cells in order
pub fn read_code_cells(json: &str) -> Result<Vec<CodeCell>, serde_json::Error> {
    let notebook: RawNotebook = serde_json::from_str(json)?;

    let cells = notebook
        .cells
        .into_iter()
        .chain(notebook.worksheets.into_iter().flat_map(|w| w.cells))
        .enumerate()
        .filter(|(_, cell)| cell.cell_type == "code")
        .map(|(index, cell)| CodeCell {
            index,
            source: cell
                .source
                .or(cell.input)
                .unwrap_or_default()
                .into_text(),
        })
        .collect();

    Ok(cells)
}
