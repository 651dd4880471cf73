use serde::{Deserialize, Serialize};

use super::direction::GridPos;

/// Why a DAG document could not be turned into a floor layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("expected exactly one root node, found {} ({})", candidates.len(), candidates.join(", "))]
    MissingRoot { candidates: Vec<String> },

    #[error("node '{parent}' lists unknown child '{child}'")]
    DanglingReference { parent: String, child: String },

    #[error("node name '{0}' appears more than once")]
    DuplicateName(String),

    #[error("invalid node '{name}': {reason}")]
    InvalidNode { name: String, reason: String },

    #[error("node '{node}' overlaps '{existing}' at cell {cell}")]
    Overlap {
        node: String,
        existing: String,
        cell: GridPos,
    },
}

/// Stable error category for logs and the FFI surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutErrorKind {
    MissingRoot,
    DanglingReference,
    DuplicateName,
    InvalidNode,
    Overlap,
}

impl LayoutError {
    pub fn kind(&self) -> LayoutErrorKind {
        match self {
            LayoutError::MissingRoot { .. } => LayoutErrorKind::MissingRoot,
            LayoutError::DanglingReference { .. } => LayoutErrorKind::DanglingReference,
            LayoutError::DuplicateName(_) => LayoutErrorKind::DuplicateName,
            LayoutError::InvalidNode { .. } => LayoutErrorKind::InvalidNode,
            LayoutError::Overlap { .. } => LayoutErrorKind::Overlap,
        }
    }
}
