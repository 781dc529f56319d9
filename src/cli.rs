use anyhow::{Context, Result};
use clap::Parser;
use reach_core::{FinishPolicy, TargetVisibility};
use reach_experiment::ExperimentConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "reaching-experiment",
    about = "Reach-to-target trials with distorted visual feedback",
    version
)]
pub struct Cli {
    /// JSON protocol describing participant, canvas and blocks.
    #[arg(long)]
    pub protocol: Option<PathBuf>,

    #[arg(long)]
    pub participant: Option<String>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Trials per block.
    #[arg(long)]
    pub trials: Option<usize>,

    /// Root folder for `{participant}/{block}/trial_{n}.csv` logs.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// `overlap` or `direct-entry`.
    #[arg(long)]
    pub finish_policy: Option<FinishPolicy>,

    /// Draw the target before the start control is pressed.
    #[arg(long)]
    pub show_target: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Blank pause between trials, in milliseconds.
    #[arg(long)]
    pub inter_trial_ms: Option<u64>,
}

impl Cli {
    /// The protocol file (or the built-in demo protocol) with command-line
    /// overrides applied.
    pub fn into_config(self) -> Result<ExperimentConfig> {
        let mut config = match &self.protocol {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("loading protocol {}", path.display()))?,
            None => ExperimentConfig::default(),
        };

        if let Some(participant) = self.participant {
            config.participant = participant;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(trials) = self.trials {
            for block in &mut config.blocks {
                block.trials = trials;
            }
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(policy) = self.finish_policy {
            config.finish_policy = policy;
        }
        if self.show_target {
            config.target_visibility = TargetVisibility::AlwaysVisible;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(ms) = self.inter_trial_ms {
            config.inter_trial_interval_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }
}
