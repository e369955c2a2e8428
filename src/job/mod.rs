//! LabelJob - one label sheet, from start resolution to watermark commit
//!
//! Phases run strictly in order:
//!
//! ```text
//! ResolvingConfig -> ResolvingStart -> Rendering -> CommittingState -> Done
//! ```
//!
//! Any fatal error moves the job to `Aborted`. State is written only after
//! the renderer has closed the artifact successfully, and only for runs that
//! allocated from a range.

mod resolve;

pub use resolve::{resolve_config, Bookkeeping, StartPlan, StartRequest, StartSource};

use crate::allocator::{self, AllocationError};
use crate::config::ConfigError;
use crate::formatter::{AsnFormatter, FormatError};
use crate::models::{
    AllocationState, Asn, BatchError, FormatScheme, LabelBatch, RenderOutcome, LABELS_PER_SHEET,
};
use crate::renderer::{LabelRenderer, RenderError, SheetGeometry};
use crate::state::{LoadOutcome, StateStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};

/// Job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    ResolvingConfig,
    ResolvingStart,
    Rendering,
    CommittingState,
    Done,
    Aborted,
}

impl JobPhase {
    pub fn name(&self) -> &'static str {
        match self {
            JobPhase::ResolvingConfig => "ResolvingConfig",
            JobPhase::ResolvingStart => "ResolvingStart",
            JobPhase::Rendering => "Rendering",
            JobPhase::CommittingState => "CommittingState",
            JobPhase::Done => "Done",
            JobPhase::Aborted => "Aborted",
        }
    }
}

/// Fatal job errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("Rendering failed: {0}")]
    Rendering(#[from] RenderError),

    #[error("Rendering failed: {0}")]
    Format(#[from] FormatError),
}

impl JobError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            JobError::Allocation(AllocationError::RangeExhausted { .. }) => 1,
            JobError::Config(_) | JobError::Batch(_) => 2,
            JobError::Rendering(_) | JobError::Format(_) => 3,
        }
    }
}

/// Exit status for an error reaching the binary's top level.
///
/// Anything that is not a [`JobError`] is a setup problem and shares the
/// configuration status.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<JobError>()
        .map(JobError::exit_code)
        .unwrap_or(2)
}

/// Non-fatal conditions the operator should know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobWarning {
    StateUnreadable {
        path: PathBuf,
        reason: String,
    },
    StateMalformed {
        path: PathBuf,
        reason: String,
    },
    CorruptStatePreserved {
        backup: PathBuf,
    },
    CorruptStateNotPreserved {
        path: PathBuf,
        reason: String,
    },
    WatermarkBelowRange {
        range: String,
        start: Asn,
        base_start: Asn,
    },
    StateNotSaved {
        path: PathBuf,
        reason: String,
    },
}

impl fmt::Display for JobWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobWarning::StateUnreadable { path, reason } => write!(
                f,
                "Could not read {} ({}); treating all ranges as unused",
                path.display(),
                reason
            ),
            JobWarning::StateMalformed { path, reason } => write!(
                f,
                "Could not parse {} ({}); treating all ranges as unused",
                path.display(),
                reason
            ),
            JobWarning::CorruptStatePreserved { backup } => write!(
                f,
                "Unparsable state file saved to {} before being replaced",
                backup.display()
            ),
            JobWarning::CorruptStateNotPreserved { path, reason } => write!(
                f,
                "Could not keep a copy of unparsable {} ({}); it has been replaced",
                path.display(),
                reason
            ),
            JobWarning::WatermarkBelowRange {
                range,
                start,
                base_start,
            } => write!(
                f,
                "Range {} continues at {}, below its first ASN {}",
                range, start, base_start
            ),
            JobWarning::StateNotSaved { path, reason } => write!(
                f,
                "Labels were produced but {} was not updated ({}). Check artifact names before the next run",
                path.display(),
                reason
            ),
        }
    }
}

/// Settings that shape a run
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub scheme: FormatScheme,
    pub default_start: u32,
    pub output_dir: PathBuf,
    pub batch_size: u32,
    pub geometry: SheetGeometry,
    pub show_progress: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            scheme: FormatScheme::default(),
            default_start: crate::config::DEFAULT_START,
            output_dir: PathBuf::from("."),
            batch_size: LABELS_PER_SHEET,
            geometry: SheetGeometry::default(),
            show_progress: false,
        }
    }
}

/// Result of the two resolution phases
#[derive(Debug, Clone)]
pub struct PlannedBatch {
    pub batch: LabelBatch,
    pub source: StartSource,
    pub bookkeeping: Bookkeeping,
    /// State snapshot read for range runs; empty otherwise
    pub snapshot: AllocationState,
    /// The state file existed but could not be parsed
    pub state_malformed: bool,
    pub artifact: PathBuf,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct JobReport {
    pub batch: LabelBatch,
    pub source: StartSource,
    pub artifact: PathBuf,
    /// File the renderer actually produced
    pub output: PathBuf,
    /// Watermark written to the state store, if any
    pub committed: Option<Asn>,
}

pub struct LabelJob {
    settings: JobSettings,
    store: StateStore,
    phase: JobPhase,
    warnings: Vec<JobWarning>,
    last_batch: Option<LabelBatch>,
}

impl LabelJob {
    pub fn new(settings: JobSettings, store: StateStore) -> Self {
        Self {
            settings,
            store,
            phase: JobPhase::ResolvingConfig,
            warnings: Vec::new(),
            last_batch: None,
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn warnings(&self) -> &[JobWarning] {
        &self.warnings
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Batch handed to the renderer by the last `run`, with its outcome
    pub fn last_batch(&self) -> Option<&LabelBatch> {
        self.last_batch.as_ref()
    }

    /// Resolve the start and lay out the batch without rendering anything
    pub fn plan(&mut self, request: &StartRequest) -> Result<PlannedBatch, JobError> {
        let result = self.resolve(request);
        if result.is_err() {
            self.phase = JobPhase::Aborted;
        }
        result
    }

    /// Run the whole job against `renderer`
    pub fn run(
        &mut self,
        request: &StartRequest,
        renderer: &mut dyn LabelRenderer,
    ) -> Result<JobReport, JobError> {
        let result = self.run_phases(request, renderer);
        if result.is_err() {
            self.phase = JobPhase::Aborted;
        }
        result
    }

    fn run_phases(
        &mut self,
        request: &StartRequest,
        renderer: &mut dyn LabelRenderer,
    ) -> Result<JobReport, JobError> {
        let mut planned = self.resolve(request)?;

        self.phase = JobPhase::Rendering;
        let render_result = self.render(&planned, renderer);
        planned.batch.set_outcome(match &render_result {
            Ok(()) => RenderOutcome::Rendered,
            Err(e) => RenderOutcome::Failed(e.to_string()),
        });
        self.last_batch = Some(planned.batch.clone());
        render_result?;

        let committed = match planned.bookkeeping {
            Bookkeeping::Disabled => None,
            Bookkeeping::Range(range) => {
                self.phase = JobPhase::CommittingState;
                if planned.state_malformed {
                    self.preserve_corrupt_state();
                }
                let watermark = planned.batch.end();
                let next = planned.snapshot.with_watermark(range, watermark);
                match self.store.save(&next) {
                    Ok(()) => Some(watermark),
                    Err(e) => {
                        self.warnings.push(JobWarning::StateNotSaved {
                            path: self.store.path(),
                            reason: e.to_string(),
                        });
                        None
                    }
                }
            }
        };

        self.phase = JobPhase::Done;
        Ok(JobReport {
            output: renderer.output_path(&planned.artifact),
            batch: planned.batch,
            source: planned.source,
            artifact: planned.artifact,
            committed,
        })
    }

    fn resolve(&mut self, request: &StartRequest) -> Result<PlannedBatch, JobError> {
        self.phase = JobPhase::ResolvingConfig;
        let plan = resolve_config(request, self.settings.default_start)?;

        let (start, snapshot, state_malformed) = match plan {
            StartPlan::Fixed { start, .. } => (start, AllocationState::new(), false),
            StartPlan::Range(range) => {
                // A range the scheme cannot print is rejected before reading state
                LabelBatch::check_fits(
                    range.base_start(),
                    self.settings.batch_size,
                    self.settings.scheme,
                )?;

                self.phase = JobPhase::ResolvingStart;
                let (snapshot, state_malformed) = self.load_state();
                let start = allocator::resolve_start(range, &snapshot, self.settings.batch_size)?;
                if start < range.base_start() {
                    self.warnings.push(JobWarning::WatermarkBelowRange {
                        range: range.key(),
                        start,
                        base_start: range.base_start(),
                    });
                }
                (start, snapshot, state_malformed)
            }
        };

        let range = match plan.bookkeeping() {
            Bookkeeping::Range(range) => Some(range),
            Bookkeeping::Disabled => None,
        };
        let batch = LabelBatch::plan(range, start, self.settings.batch_size, self.settings.scheme)?;
        let artifact = self.settings.output_dir.join(batch.artifact_name());

        Ok(PlannedBatch {
            batch,
            source: plan.source(),
            bookkeeping: plan.bookkeeping(),
            snapshot,
            state_malformed,
            artifact,
        })
    }

    /// Read the state snapshot; the flag is set when the file was unparsable
    fn load_state(&mut self) -> (AllocationState, bool) {
        let loaded = self.store.load();
        let mut malformed = false;
        match loaded.outcome {
            LoadOutcome::Absent | LoadOutcome::Loaded => {}
            LoadOutcome::Unreadable { reason } => {
                self.warnings.push(JobWarning::StateUnreadable {
                    path: self.store.path(),
                    reason,
                });
            }
            LoadOutcome::Malformed { reason } => {
                malformed = true;
                self.warnings.push(JobWarning::StateMalformed {
                    path: self.store.path(),
                    reason,
                });
            }
        }
        (loaded.state, malformed)
    }

    /// Keep a copy of an unparsable state file before the commit replaces it
    fn preserve_corrupt_state(&mut self) {
        match self.store.preserve_corrupt() {
            Ok(Some(backup)) => self
                .warnings
                .push(JobWarning::CorruptStatePreserved { backup }),
            Ok(None) => {}
            Err(e) => self.warnings.push(JobWarning::CorruptStateNotPreserved {
                path: self.store.path(),
                reason: e.to_string(),
            }),
        }
    }

    fn render(
        &self,
        planned: &PlannedBatch,
        renderer: &mut dyn LabelRenderer,
    ) -> Result<(), JobError> {
        ensure_dir(&self.settings.output_dir)?;

        let formatter = AsnFormatter::new(self.settings.scheme);
        let geometry = self.settings.geometry;
        let progress = self.progress_bar(planned.batch.count());

        renderer.open(&planned.artifact, &geometry)?;
        for (index, label) in planned.batch.sequence().labels(formatter).enumerate() {
            let label = label?;
            renderer.render(geometry.slot(index as u32), &label)?;
            if let Some(pb) = &progress {
                pb.set_message(label.display.clone());
                pb.inc(1);
            }
        }
        renderer.close()?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        Ok(())
    }

    fn progress_bar(&self, count: u32) -> Option<ProgressBar> {
        if !self.settings.show_progress {
            return None;
        }
        let pb = ProgressBar::new(u64::from(count));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(pb)
    }
}

fn ensure_dir(dir: &Path) -> Result<(), RenderError> {
    std::fs::create_dir_all(dir).map_err(|source| RenderError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::FormattedLabel;
    use crate::models::RangeId;
    use crate::renderer::LabelSlot;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        opened: Option<PathBuf>,
        labels: Vec<FormattedLabel>,
        closed: bool,
    }

    impl LabelRenderer for Recorder {
        fn open(&mut self, artifact: &Path, _geometry: &SheetGeometry) -> Result<(), RenderError> {
            self.opened = Some(artifact.to_path_buf());
            Ok(())
        }

        fn render(&mut self, _slot: LabelSlot, label: &FormattedLabel) -> Result<(), RenderError> {
            self.labels.push(label.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), RenderError> {
            self.closed = true;
            Ok(())
        }
    }

    fn job(temp_dir: &TempDir) -> LabelJob {
        let settings = JobSettings {
            output_dir: temp_dir.path().join("out"),
            ..Default::default()
        };
        LabelJob::new(settings, StateStore::new(temp_dir.path().join("state")))
    }

    #[test]
    fn test_default_start_run_skips_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = job(&temp_dir);
        let mut recorder = Recorder::default();

        let report = job.run(&StartRequest::default(), &mut recorder).unwrap();

        assert_eq!(job.phase(), JobPhase::Done);
        assert_eq!(report.source, StartSource::Default);
        assert_eq!(report.committed, None);
        assert_eq!(recorder.labels.len(), 189);
        assert_eq!(recorder.labels[0].token, "ASN0000001");
        assert!(recorder.closed);
        assert!(!temp_dir.path().join("state").exists());
    }

    #[test]
    fn test_range_run_commits_watermark() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = job(&temp_dir);
        let mut recorder = Recorder::default();
        let request = StartRequest {
            range: Some(RangeId::new(2).unwrap()),
            ..Default::default()
        };

        let report = job.run(&request, &mut recorder).unwrap();

        assert_eq!(report.batch.start(), Asn::new(200_000));
        assert_eq!(report.committed, Some(Asn::new(200_188)));
        assert_eq!(report.batch.outcome(), &RenderOutcome::Rendered);
        assert_eq!(
            recorder.opened.unwrap(),
            temp_dir.path().join("out/ASN-02-0200000-0200188.pdf")
        );
    }

    #[test]
    fn test_plan_does_not_render_or_commit() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = job(&temp_dir);
        let request = StartRequest {
            range: Some(RangeId::new(5).unwrap()),
            ..Default::default()
        };

        let planned = job.plan(&request).unwrap();

        assert_eq!(planned.batch.start(), Asn::new(500_000));
        assert_eq!(planned.bookkeeping, Bookkeeping::Range(RangeId::new(5).unwrap()));
        assert!(!temp_dir.path().join("out").exists());
        assert!(!temp_dir.path().join("state").exists());
    }

    #[test]
    fn test_plan_leaves_malformed_state_alone() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = job(&temp_dir);
        let state_dir = temp_dir.path().join("state");
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join(crate::state::STATE_FILE), "{ not json").unwrap();
        let request = StartRequest {
            range: Some(RangeId::new(1).unwrap()),
            ..Default::default()
        };

        let planned = job.plan(&request).unwrap();

        assert!(planned.state_malformed);
        assert_eq!(std::fs::read_dir(&state_dir).unwrap().count(), 1);
        assert!(matches!(job.warnings()[0], JobWarning::StateMalformed { .. }));
    }

    #[test]
    fn test_failed_render_keeps_batch_outcome() {
        struct Failing;

        impl LabelRenderer for Failing {
            fn open(&mut self, _artifact: &Path, _geometry: &SheetGeometry) -> Result<(), RenderError> {
                Ok(())
            }

            fn render(&mut self, _slot: LabelSlot, _label: &FormattedLabel) -> Result<(), RenderError> {
                Err(RenderError::NotOpen)
            }

            fn close(&mut self) -> Result<(), RenderError> {
                Ok(())
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let mut job = job(&temp_dir);

        assert!(job.run(&StartRequest::default(), &mut Failing).is_err());

        let batch = job.last_batch().expect("batch should be kept");
        assert!(matches!(batch.outcome(), RenderOutcome::Failed(_)));
        assert_eq!(batch.start(), Asn::new(1));
    }

    #[test]
    fn test_exit_code_for_top_level_errors() {
        let exhausted = anyhow::Error::new(JobError::Allocation(AllocationError::RangeExhausted {
            range: RangeId::new(1).unwrap(),
            start: Asn::new(199_900),
            end: 200_088,
            limit: Asn::new(199_999),
            batch_size: 189,
        }));
        assert_eq!(exit_code_for(&exhausted), 1);

        let rendering = anyhow::Error::new(JobError::Rendering(RenderError::NotOpen))
            .context("while writing labels");
        assert_eq!(exit_code_for(&rendering), 3);

        let other = anyhow::anyhow!("output directory is not writable");
        assert_eq!(exit_code_for(&other), 2);
    }

    #[test]
    fn test_exit_codes() {
        let exhausted = JobError::Allocation(AllocationError::RangeExhausted {
            range: RangeId::new(1).unwrap(),
            start: Asn::new(199_900),
            end: 200_088,
            limit: Asn::new(199_999),
            batch_size: 189,
        });
        assert_eq!(exhausted.exit_code(), 1);
        assert_eq!(JobError::Batch(BatchError::Empty).exit_code(), 2);
        assert_eq!(JobError::Rendering(RenderError::NotOpen).exit_code(), 3);
    }
}
