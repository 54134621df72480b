//! Day batch builder.
//!
//! A `DayTask` is created before scheduling, mutated once by `build` (which
//! records the artifact), read by the upload stage, and dropped after cleanup.
//! Every build writes a new uniquely named file; nothing is ever overwritten.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use vehgen_core::config::{Compression, GeneratorConfig, GeoBounds};
use vehgen_core::day::DayWindow;
use vehgen_core::schema::ColumnSpec;
use vehgen_io::write_artifact;
use vehgen_synth::{RowSynthesizer, VinPool};

use crate::pipeline::ExecError;

/// Read-only inputs shared by every day of a run.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub columns: ColumnSpec,
    pub vins: VinPool,
    pub geo: GeoBounds,
    pub rows_per_batch: usize,
    pub output_root: PathBuf,
    pub compression: Compression,
    pub seed: Option<u64>,
}

impl BatchContext {
    pub fn from_config(cfg: &GeneratorConfig, vins: VinPool) -> Self {
        Self {
            columns: cfg.columns(),
            vins,
            geo: cfg.geo_bounds(),
            rows_per_batch: cfg.rows_per_batch,
            output_root: PathBuf::from(&cfg.output_dir),
            compression: cfg.compression,
            seed: cfg.seed,
        }
    }

    /// Fresh generator per day: seeded from `seed + offset + 1` when
    /// configured (`seed` itself draws the VIN pool), otherwise from the
    /// thread-local entropy source.
    pub fn rng_for(&self, offset: u32) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(u64::from(offset) + 1)),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

/// The produced file for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct DayTask {
    window: DayWindow,
    ctx: Arc<BatchContext>,
    artifact: Option<Artifact>,
}

impl DayTask {
    pub fn new(window: DayWindow, ctx: Arc<BatchContext>) -> Self {
        Self {
            window,
            ctx,
            artifact: None,
        }
    }

    pub fn window(&self) -> &DayWindow {
        &self.window
    }

    pub fn day_id(&self) -> &str {
        &self.window.id
    }

    pub fn offset(&self) -> u32 {
        self.window.offset
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// `<output_root>/<YYYYMMDD>`
    pub fn day_dir(&self) -> PathBuf {
        self.ctx.output_root.join(&self.window.id)
    }

    /// Blob name for an artifact of this day: `<YYYYMMDD>/<file name>`.
    pub fn blob_name(&self, artifact: &Artifact) -> String {
        format!("{}/{}", self.window.id, artifact.file_name)
    }

    /// Generate the day's rows and write them to a new artifact file.
    pub fn build(&mut self) -> Result<&Artifact, ExecError> {
        let dir = self.day_dir();
        fs::create_dir_all(&dir).map_err(|e| self.generate_error(e.into()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), self.ctx.compression.extension());
        let path = dir.join(&file_name);

        let mut rng = self.ctx.rng_for(self.window.offset);
        let text = self.render(&mut rng);
        let bytes = write_artifact(&path, self.ctx.compression, &text)
            .map_err(|e| self.generate_error(e))?;

        Ok(self.artifact.insert(Artifact {
            path,
            file_name,
            bytes,
        }))
    }

    /// Header plus `rows_per_batch` rows, each terminated by `\n`.
    pub fn render<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let ctx = &*self.ctx;
        let synth = RowSynthesizer::new(&ctx.columns, &ctx.vins, ctx.geo);
        let header = ctx.columns.header();

        let mut text = String::with_capacity((ctx.rows_per_batch + 1) * (header.len() + 1));
        text.push_str(&header);
        text.push('\n');
        for _ in 0..ctx.rows_per_batch {
            text.push_str(&synth.render_row(self.window.start, rng));
            text.push('\n');
        }
        text
    }

    fn generate_error(&self, source: vehgen_io::Error) -> ExecError {
        ExecError::Generate {
            day: self.window.id.clone(),
            source,
        }
    }
}

/// Remove the artifact file. Missing files are not an error.
pub(crate) fn remove_artifact(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
