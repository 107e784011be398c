pub mod init;
pub mod profile;
pub mod recovery;
pub mod sleep;
pub mod summary;
pub mod workouts;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use whoop_client::WhoopClient;

use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum Command {
    /// Store client credentials and tokens in the env file
    Init(init::InitArgs),
    /// Today's recovery, sleep and strain in one view
    Summary,
    /// Sleep duration and quality over the last N days
    Sleep(sleep::SleepArgs),
    /// Recovery scores and HRV over the last N days
    Recovery(recovery::RecoveryArgs),
    /// Recent workouts with strain and heart-rate zones
    Workouts(workouts::WorkoutsArgs),
    /// Basic profile of the connected account
    Profile,
}

/// Settings shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub env_file: PathBuf,
}

impl Context {
    pub async fn connect(&self) -> Result<WhoopClient> {
        self.config.connect(&self.env_file).await
    }
}
