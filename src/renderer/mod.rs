//! Label rendering seam
//!
//! Drawing QR symbols and laying out PDF pages is left to an external
//! collaborator. A [`LabelRenderer`] receives the artifact path once, then one
//! [`FormattedLabel`] per slot on the sheet.

mod command;
mod manifest;

pub use command::CommandRenderer;
pub use manifest::ManifestRenderer;

use crate::formatter::FormattedLabel;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Errors reported by a renderer
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Renderer command '{command}' could not be started: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Renderer command '{command}' failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Failed to encode label data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Renderer used before open()")]
    NotOpen,
}

/// Physical sheet layout handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SheetGeometry {
    pub columns: u32,
    pub rows: u32,
    /// Label width in millimetres
    pub label_width_mm: f32,
    /// Label height in millimetres
    pub label_height_mm: f32,
}

impl Default for SheetGeometry {
    /// Avery 4731: 7 x 27 labels of 25.4 x 10 mm
    fn default() -> Self {
        Self {
            columns: 7,
            rows: 27,
            label_width_mm: 25.4,
            label_height_mm: 10.0,
        }
    }
}

impl SheetGeometry {
    pub fn capacity(&self) -> u32 {
        self.columns * self.rows
    }

    /// Position of the `index`-th label, filled row by row
    pub fn slot(&self, index: u32) -> LabelSlot {
        let columns = self.columns.max(1);
        LabelSlot {
            index,
            column: index % columns,
            row: index / columns,
        }
    }
}

/// Where on the sheet a label goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelSlot {
    pub index: u32,
    pub column: u32,
    pub row: u32,
}

/// External label-rendering collaborator
pub trait LabelRenderer {
    /// Start a new artifact at `artifact`
    fn open(&mut self, artifact: &Path, geometry: &SheetGeometry) -> Result<(), RenderError>;

    /// Draw one label
    fn render(&mut self, slot: LabelSlot, label: &FormattedLabel) -> Result<(), RenderError>;

    /// Finish the artifact. Success here means the whole batch was produced.
    fn close(&mut self) -> Result<(), RenderError>;

    /// File written for `artifact`. Renderers that produce a different
    /// file than the named artifact report it here.
    fn output_path(&self, artifact: &Path) -> PathBuf {
        artifact.to_path_buf()
    }
}
