use crate::config::{
    DEFAULT_MARKER_RADIUS, DEFAULT_PARTICIPANT, SessionConfig, check_marker_radius,
};
use crate::error::{ConfigError, Result};
use crate::session::TrialSession;
use crate::trial::{TrialOutcome, TrialResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reach_core::{
    Canvas, FeedbackMode, FinishPolicy, NormalizedPoint, Surface, TargetVisibility, TransformKind,
};
use reach_timing::Clock;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A run of trials sharing one feedback mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    pub name: String,
    pub feedback: FeedbackMode,
    pub transform: TransformKind,
    pub trials: usize,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            name: "baseline".to_string(),
            feedback: FeedbackMode::Reflected,
            transform: TransformKind::Identity,
            trials: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub participant: String,
    pub width: u32,
    pub height: u32,
    pub output_dir: PathBuf,
    pub finish_policy: FinishPolicy,
    pub target_visibility: TargetVisibility,
    pub marker_radius: f64,
    pub inter_trial_interval_ms: u64,
    /// Fixes the target sequence when set.
    pub seed: Option<u64>,
    pub blocks: Vec<BlockConfig>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            participant: DEFAULT_PARTICIPANT.to_string(),
            width: 1920,
            height: 1080,
            output_dir: PathBuf::from("."),
            finish_policy: FinishPolicy::default(),
            target_visibility: TargetVisibility::default(),
            marker_radius: DEFAULT_MARKER_RADIUS,
            inter_trial_interval_ms: 0,
            seed: None,
            blocks: vec![
                BlockConfig {
                    name: "reflected".to_string(),
                    transform: TransformKind::Mirror,
                    ..BlockConfig::default()
                },
                BlockConfig {
                    name: "rotated".to_string(),
                    transform: TransformKind::Rotate90,
                    ..BlockConfig::default()
                },
            ],
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.blocks.iter().all(|b| b.trials == 0) {
            return Err(ConfigError::NoBlocks);
        }
        if !Canvas::new(self.width, self.height).fits_clip_margin() {
            return Err(ConfigError::CanvasTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        check_marker_radius(self.marker_radius)?;
        for (i, block) in self.blocks.iter().enumerate() {
            if self.blocks[..i].iter().any(|b| b.name == block.name) {
                return Err(ConfigError::DuplicateBlock(block.name.clone()));
            }
        }
        Ok(())
    }

    /// Folder holding every log of this participant.
    pub fn participant_dir(&self) -> PathBuf {
        self.output_dir.join(&self.participant)
    }

    pub fn total_trials(&self) -> usize {
        self.blocks.iter().map(|b| b.trials).sum()
    }
}

/// Mean completion time of one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub name: String,
    pub trials: usize,
    pub mean_elapsed_secs: f64,
}

#[derive(Debug, Clone, Copy)]
struct PendingTrial {
    block: usize,
    trial: usize,
    target: NormalizedPoint,
}

/// Sequences the trial sessions of a whole run, block by block.
///
/// The host asks for the next session with [`Experiment::next_trial`], drives
/// it to completion and hands the outcome back through
/// [`Experiment::complete_trial`].
pub struct Experiment<R: Rng> {
    pub config: ExperimentConfig,
    rng: R,
    block_index: usize,
    trial_in_block: usize,
    pending: Option<PendingTrial>,
    results: Vec<TrialResult>,
}

impl Experiment<StdRng> {
    pub fn new(config: ExperimentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Experiment<R> {
    pub fn with_rng(config: ExperimentConfig, rng: R) -> Self {
        let mut experiment = Self {
            config,
            rng,
            block_index: 0,
            trial_in_block: 0,
            pending: None,
            results: Vec::new(),
        };
        experiment.skip_empty_blocks();
        experiment
    }

    fn skip_empty_blocks(&mut self) {
        while let Some(block) = self.config.blocks.get(self.block_index) {
            if self.trial_in_block < block.trials {
                break;
            }
            self.block_index += 1;
            self.trial_in_block = 0;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.block_index >= self.config.blocks.len()
    }

    pub fn current_block(&self) -> Option<&BlockConfig> {
        self.config.blocks.get(self.block_index)
    }

    /// `(trials done, trials total)` over the whole run.
    pub fn progress(&self) -> (usize, usize) {
        (self.results.len(), self.config.total_trials())
    }

    /// Builds the session for the next trial on `surface`, or `None` once
    /// every block has run. A random target is drawn for every trial.
    pub fn next_trial<S: Surface, C: Clock>(
        &mut self,
        surface: S,
        clock: C,
    ) -> Result<Option<TrialSession<S, C>>> {
        let Some(block) = self.config.blocks.get(self.block_index) else {
            return Ok(None);
        };
        if self.pending.is_some() {
            warn!("next trial requested before the previous one completed");
        }

        let dir = self.config.participant_dir().join(&block.name);
        let target = NormalizedPoint::new(
            self.rng.random_range(0.0..=1.0),
            self.rng.random_range(0.0..=1.0),
        );

        let session_config = SessionConfig {
            target,
            width: self.config.width,
            height: self.config.height,
            logfile: Some(dir.join(format!("trial_{}.csv", self.trial_in_block))),
            feedback: block.feedback,
            participant: self.config.participant.clone(),
            transform: block.transform.into(),
            finish_policy: self.config.finish_policy,
            target_visibility: self.config.target_visibility,
            marker_radius: self.config.marker_radius,
        };
        session_config.validate()?;
        std::fs::create_dir_all(&dir)?;
        let session = TrialSession::new(session_config, surface, clock)?;

        info!(
            block = %block.name,
            trial = self.trial_in_block,
            nx = target.nx,
            ny = target.ny,
            "trial prepared"
        );
        self.pending = Some(PendingTrial {
            block: self.block_index,
            trial: self.trial_in_block,
            target,
        });
        Ok(Some(session))
    }

    /// Records the outcome of the trial handed out last and moves on.
    pub fn complete_trial(&mut self, outcome: TrialOutcome) {
        let Some(pending) = self.pending.take() else {
            warn!("trial outcome received with no trial in progress");
            return;
        };
        let block = &self.config.blocks[pending.block];
        self.results.push(TrialResult {
            block: block.name.clone(),
            trial: pending.trial,
            feedback: block.feedback,
            transform: block.transform,
            target: pending.target,
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            samples: outcome.samples,
            log_path: outcome.log_path,
        });

        self.trial_in_block += 1;
        if self.trial_in_block >= block.trials {
            let name = block.name.clone();
            if let Some(summary) = self.block_summaries().into_iter().find(|s| s.name == name) {
                info!(
                    block = %summary.name,
                    trials = summary.trials,
                    mean_secs = summary.mean_elapsed_secs,
                    "block complete"
                );
            }
        }
        self.skip_empty_blocks();
    }

    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    /// Per-block mean completion times, in block order.
    pub fn block_summaries(&self) -> Vec<BlockSummary> {
        let mut summaries: Vec<BlockSummary> = Vec::new();
        for result in &self.results {
            match summaries.iter_mut().find(|s| s.name == result.block) {
                Some(s) => {
                    s.mean_elapsed_secs += result.elapsed_secs;
                    s.trials += 1;
                }
                None => summaries.push(BlockSummary {
                    name: result.block.clone(),
                    trials: 1,
                    mean_elapsed_secs: result.elapsed_secs,
                }),
            }
        }
        for s in &mut summaries {
            s.mean_elapsed_secs /= s.trials as f64;
        }
        summaries
    }

    /// Writes every trial result to `results.json` in the participant folder.
    pub fn write_results(&self) -> Result<PathBuf> {
        let dir = self.config.participant_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("results.json");
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, &self.results)?;
        info!(path = %path.display(), trials = self.results.len(), "results saved");
        Ok(path)
    }
}
