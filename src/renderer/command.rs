//! CommandRenderer - hands labels to an external program
//!
//! The program is started once per batch with the configured arguments
//! (`{output}` is replaced by the artifact path) and receives one JSON object
//! per label on stdin. A non-zero exit status fails the batch.

use super::{LabelRenderer, LabelSlot, RenderError, SheetGeometry};
use crate::formatter::FormattedLabel;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

/// Placeholder substituted with the artifact path in renderer arguments
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

#[derive(Serialize)]
struct LabelLine<'a> {
    #[serde(flatten)]
    slot: LabelSlot,
    width_mm: f32,
    height_mm: f32,
    #[serde(flatten)]
    label: &'a FormattedLabel,
}

struct Running {
    child: Child,
    stdin: ChildStdin,
    geometry: SheetGeometry,
}

pub struct CommandRenderer {
    command: String,
    args: Vec<String>,
    running: Option<Running>,
}

impl CommandRenderer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            running: None,
        }
    }

    fn expand_args(&self, artifact: &Path) -> Vec<String> {
        let output = artifact.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }

    fn failed(&self, detail: impl Into<String>) -> RenderError {
        RenderError::CommandFailed {
            command: self.command.clone(),
            detail: detail.into(),
        }
    }
}

impl LabelRenderer for CommandRenderer {
    fn open(&mut self, artifact: &Path, geometry: &SheetGeometry) -> Result<(), RenderError> {
        let mut child = Command::new(&self.command)
            .args(self.expand_args(artifact))
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RenderError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.failed("stdin was not captured"));
            }
        };

        self.running = Some(Running {
            child,
            stdin,
            geometry: *geometry,
        });
        Ok(())
    }

    fn render(&mut self, slot: LabelSlot, label: &FormattedLabel) -> Result<(), RenderError> {
        let running = self.running.as_mut().ok_or(RenderError::NotOpen)?;
        let line = LabelLine {
            slot,
            width_mm: running.geometry.label_width_mm,
            height_mm: running.geometry.label_height_mm,
            label,
        };

        let mut encoded = serde_json::to_vec(&line)?;
        encoded.push(b'\n');
        if let Err(e) = running.stdin.write_all(&encoded) {
            return Err(self.failed(format!("failed to send label {}: {}", label.token, e)));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), RenderError> {
        let Running {
            mut child, stdin, ..
        } = self.running.take().ok_or(RenderError::NotOpen)?;

        // Closing stdin tells the program the batch is complete
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| self.failed(format!("failed to wait for exit: {}", e)))?;
        if !status.success() {
            return Err(self.failed(format!("exited with {}", status)));
        }
        Ok(())
    }
}

impl Drop for CommandRenderer {
    fn drop(&mut self) {
        // Abandoned mid-batch: don't leave the program running
        if let Some(mut running) = self.running.take() {
            let _ = running.child.kill();
            let _ = running.child.wait();
        }
    }
}
