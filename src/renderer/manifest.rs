//! ManifestRenderer - JSON layout manifest for an external print tool

use super::{LabelRenderer, LabelSlot, RenderError, SheetGeometry};
use crate::formatter::FormattedLabel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct ManifestEntry {
    #[serde(flatten)]
    slot: LabelSlot,
    #[serde(flatten)]
    label: FormattedLabel,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    artifact: &'a Path,
    generated_at: DateTime<Utc>,
    sheet: &'a SheetGeometry,
    labels: &'a [ManifestEntry],
}

struct OpenManifest {
    artifact: PathBuf,
    geometry: SheetGeometry,
    entries: Vec<ManifestEntry>,
}

/// Writes `<artifact>.json` describing every label on the sheet.
///
/// The manifest is written in one go on `close()`.
#[derive(Default)]
pub struct ManifestRenderer {
    current: Option<OpenManifest>,
}

impl ManifestRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path the manifest for `artifact` is written to
    pub fn manifest_path(artifact: &Path) -> PathBuf {
        artifact.with_extension("json")
    }
}

impl LabelRenderer for ManifestRenderer {
    fn open(&mut self, artifact: &Path, geometry: &SheetGeometry) -> Result<(), RenderError> {
        self.current = Some(OpenManifest {
            artifact: artifact.to_path_buf(),
            geometry: *geometry,
            entries: Vec::with_capacity(geometry.capacity() as usize),
        });
        Ok(())
    }

    fn render(&mut self, slot: LabelSlot, label: &FormattedLabel) -> Result<(), RenderError> {
        let current = self.current.as_mut().ok_or(RenderError::NotOpen)?;
        current.entries.push(ManifestEntry {
            slot,
            label: label.clone(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), RenderError> {
        let current = self.current.take().ok_or(RenderError::NotOpen)?;
        let manifest = Manifest {
            artifact: &current.artifact,
            generated_at: Utc::now(),
            sheet: &current.geometry,
            labels: &current.entries,
        };

        let path = Self::manifest_path(&current.artifact);
        let content = serde_json::to_string_pretty(&manifest)?;
        fs::write(&path, content).map_err(|source| RenderError::Io { path, source })?;
        Ok(())
    }

    fn output_path(&self, artifact: &Path) -> PathBuf {
        Self::manifest_path(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Asn;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_written_on_close() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("ASN-01-0100100-0100101.pdf");
        let sheet = SheetGeometry::default();

        let mut renderer = ManifestRenderer::new();
        renderer.open(&artifact, &sheet).unwrap();
        for (i, value) in [100_100u32, 100_101].into_iter().enumerate() {
            let label = FormattedLabel {
                asn: Asn::new(value),
                token: format!("ASN{:07}", value),
                display: format!("ASN-01-{:05}", value % 100_000),
            };
            renderer.render(sheet.slot(i as u32), &label).unwrap();
        }
        renderer.close().unwrap();

        let manifest_path = renderer.output_path(&artifact);
        assert_eq!(manifest_path, temp_dir.path().join("ASN-01-0100100-0100101.json"));
        assert!(manifest_path.is_file());
        assert!(!artifact.exists());
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();

        let labels = json["labels"].as_array().unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1]["token"], "ASN0100101");
        assert_eq!(labels[1]["display"], "ASN-01-00101");
        assert_eq!(labels[1]["column"], 1);
        assert_eq!(json["sheet"]["columns"], 7);
    }

    #[test]
    fn test_render_before_open_fails() {
        let mut renderer = ManifestRenderer::new();
        let label = FormattedLabel {
            asn: Asn::new(1),
            token: "ASN0000001".to_string(),
            display: "ASN-00-00001".to_string(),
        };
        let slot = SheetGeometry::default().slot(0);
        assert!(matches!(renderer.render(slot, &label), Err(RenderError::NotOpen)));
    }
}
