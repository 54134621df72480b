//! Pipeline runtime: walk the day range in windows and run one
//! generate → upload → cleanup chain per day.
//!
//! Failure isolation, smallest scope first:
//! - upload errors are caught inside the chain; cleanup still runs;
//! - generation and cleanup errors end the chain and surface at the window,
//!   where they are logged together with panicked chains;
//! - a bad window never stops the run. Only setup errors (configuration,
//!   calendar range, sink construction) escape `run`.

use std::any::Any;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use vehgen_core::config::GeneratorConfig;
use vehgen_core::day::DayWindow;
use vehgen_io::{build_sink_from_config, BlobSink, UploadReceipt};
use vehgen_synth::VinPool;

use crate::log::{RunLog, TracingLog};
use crate::scheduler::plan_windows;
use crate::task::{remove_artifact, BatchContext, DayTask};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("configuration: {0}")]
    Config(#[from] vehgen_core::Error),

    #[error("upload sink: {0}")]
    Sink(#[source] vehgen_io::Error),

    #[error("generating day {day}: {source}")]
    Generate {
        day: String,
        #[source]
        source: vehgen_io::Error,
    },

    #[error("uploading day {day}: {source}")]
    Upload {
        day: String,
        #[source]
        source: vehgen_io::Error,
    },

    #[error("cleaning up day {day}: {source}")]
    Cleanup {
        day: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not start chain for day {day}: {source}")]
    Spawn {
        day: String,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal state of one day-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    Uploaded,
    /// Upload failed and was logged; the local file was still removed.
    UploadFailed,
    GenerateFailed,
    CleanupFailed,
    /// The chain thread could not be started.
    NotStarted,
    Panicked,
}

impl DayOutcome {
    fn from_error(err: &ExecError) -> Self {
        match err {
            ExecError::Generate { .. } => DayOutcome::GenerateFailed,
            ExecError::Cleanup { .. } => DayOutcome::CleanupFailed,
            ExecError::Spawn { .. } => DayOutcome::NotStarted,
            // Upload errors never leave a chain; treat stray ones like a failed upload.
            _ => DayOutcome::UploadFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub offset: u32,
    pub day: String,
    pub outcome: DayOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Number of chains launched per window, in launch order.
    pub windows: Vec<usize>,
    pub days: Vec<DayReport>,
}

impl RunReport {
    pub fn count(&self, outcome: DayOutcome) -> usize {
        self.days.iter().filter(|d| d.outcome == outcome).count()
    }

    pub fn outcome_of(&self, day: &str) -> Option<DayOutcome> {
        self.days.iter().find(|d| d.day == day).map(|d| d.outcome)
    }
}

pub struct Pipeline {
    cfg: GeneratorConfig,
    sink: Arc<dyn BlobSink>,
    log: Arc<dyn RunLog>,
}

impl Pipeline {
    /// Validate `cfg` and wire the given sink and log.
    pub fn new(
        cfg: GeneratorConfig,
        sink: Arc<dyn BlobSink>,
        log: Arc<dyn RunLog>,
    ) -> Result<Self, ExecError> {
        cfg.validate()?;
        Ok(Self { cfg, sink, log })
    }

    /// Build the sink from the configuration and log through `tracing`.
    pub fn from_config(cfg: GeneratorConfig) -> Result<Self, ExecError> {
        cfg.validate()?;
        let sink = build_sink_from_config(&cfg.storage_config()).map_err(ExecError::Sink)?;
        Self::new(cfg, sink, Arc::new(TracingLog))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.cfg
    }

    /// Draw the run's VIN pool: seeded from `seed` when configured.
    pub fn draw_vins(&self) -> VinPool {
        let mut rng = match self.cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        VinPool::generate(self.cfg.count_of_cars, &self.cfg.vin_prefix, &mut rng)
    }

    pub fn run(&self) -> Result<RunReport, ExecError> {
        let ctx = Arc::new(BatchContext::from_config(&self.cfg, self.draw_vins()));

        // Every day is mapped before the first window starts; a calendar error
        // must not surface after earlier windows already uploaded.
        let windows = plan_windows(self.cfg.count_of_days, self.cfg.parallel_task_count)
            .into_iter()
            .map(|window| {
                window
                    .map(|offset| {
                        DayWindow::for_offset(self.cfg.end_date, offset)
                            .map(|w| DayTask::new(w, Arc::clone(&ctx)))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = RunReport::default();
        for tasks in windows {
            report.windows.push(tasks.len());
            report.days.extend(self.run_window(tasks));
        }

        Ok(report)
    }

    /// Launch every chain of the window and wait for all of them.
    fn run_window(&self, tasks: Vec<DayTask>) -> Vec<DayReport> {
        thread::scope(|scope| {
            let handles: Vec<_> = tasks
                .into_iter()
                .map(|task| {
                    let offset = task.offset();
                    let day = task.day_id().to_string();
                    let handle = thread::Builder::new()
                        .name(format!("day-{day}"))
                        .spawn_scoped(scope, move || self.run_chain(task))
                        .map_err(|source| ExecError::Spawn {
                            day: day.clone(),
                            source,
                        });
                    (offset, day, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(offset, day, handle)| {
                    let outcome = match handle.map(|h| h.join()) {
                        Ok(Ok(Ok(outcome))) => outcome,
                        Ok(Ok(Err(err))) | Err(err) => {
                            self.log.error(&format!(
                                "Day {day} failed, continuing with the remaining days: {err}"
                            ));
                            DayOutcome::from_error(&err)
                        }
                        Ok(Err(panic)) => {
                            self.log.error(&format!(
                                "Day {day} panicked, continuing with the remaining days: {}",
                                panic_message(panic.as_ref())
                            ));
                            DayOutcome::Panicked
                        }
                    };
                    DayReport {
                        offset,
                        day,
                        outcome,
                    }
                })
                .collect()
        })
    }

    /// Generate → upload → cleanup for one day.
    fn run_chain(&self, mut task: DayTask) -> Result<DayOutcome, ExecError> {
        let day = task.day_id().to_string();
        let span = tracing::info_span!("day", day = %day, offset = task.offset());
        let _enter = span.enter();

        self.log.info(&format!("Started GENERATING day {day}"));
        let artifact = task.build()?.clone();
        self.log.info(&format!("Finished GENERATING day {day}"));

        self.log.info(&format!("Started uploading day {day}"));
        let blob_name = task.blob_name(&artifact);
        let outcome = match self.upload(&artifact.path, &blob_name) {
            Ok(receipt) => {
                tracing::debug!(blob = %receipt.blob_name, bytes = receipt.bytes, etag = ?receipt.etag, "uploaded");
                DayOutcome::Uploaded
            }
            Err(source) => {
                let err = ExecError::Upload {
                    day: day.clone(),
                    source,
                };
                self.log
                    .error(&format!("Upload failed, continuing with cleanup: {err}"));
                DayOutcome::UploadFailed
            }
        };
        self.log.info(&format!(
            "Finished UPLOAD of day {day} and uploaded file {}",
            artifact.path.display()
        ));

        self.log.info(&format!("Deleting {day}"));
        remove_artifact(&artifact.path).map_err(|source| ExecError::Cleanup {
            day: day.clone(),
            source,
        })?;
        self.log.info(&format!("Finished CLEANUP day {day}"));

        Ok(outcome)
    }

    fn upload(&self, path: &Path, blob_name: &str) -> vehgen_io::Result<UploadReceipt> {
        let mut file = File::open(path)?;
        self.sink.upload(blob_name, &mut file, false)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
