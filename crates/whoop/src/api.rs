use tracing::info;

use crate::client::WhoopClient;
use crate::error::Result;
use crate::models::{Cycle, Profile, Recovery, Sleep, Workout};

pub const RECOVERY_PATH: &str = "/v2/recovery";
pub const SLEEP_PATH: &str = "/v2/activity/sleep";
pub const CYCLE_PATH: &str = "/v2/cycle";
pub const WORKOUT_PATH: &str = "/v2/activity/workout";
pub const PROFILE_PATH: &str = "/v2/user/profile/basic";

/// Sleeps scanned when looking for the latest non-nap sleep.
const LAST_SLEEP_WINDOW: usize = 5;

impl WhoopClient {
    // -- Recovery -----------------------------------------------------------

    /// Most recent recovery records, newest first.
    pub async fn get_recovery(&self, limit: usize) -> Result<Vec<Recovery>> {
        info!(limit, "Fetching recovery");
        self.paginate_as(RECOVERY_PATH, limit, self.page_size()).await
    }

    pub async fn get_today_recovery(&self) -> Result<Option<Recovery>> {
        Ok(self.get_recovery(1).await?.into_iter().next())
    }

    pub async fn get_recovery_trend(&self, days: usize) -> Result<Vec<Recovery>> {
        self.get_recovery(days).await
    }

    // -- Sleep --------------------------------------------------------------

    pub async fn get_sleep(&self, limit: usize) -> Result<Vec<Sleep>> {
        info!(limit, "Fetching sleep");
        self.paginate_as(SLEEP_PATH, limit, self.page_size()).await
    }

    /// Latest main sleep. Falls back to the latest nap when the window has
    /// nothing else.
    pub async fn get_last_sleep(&self) -> Result<Option<Sleep>> {
        let records = self.get_sleep(LAST_SLEEP_WINDOW).await?;
        let main = records.iter().position(|s| !s.nap).unwrap_or(0);
        Ok(records.into_iter().nth(main))
    }

    // -- Strain -------------------------------------------------------------

    pub async fn get_cycles(&self, limit: usize) -> Result<Vec<Cycle>> {
        info!(limit, "Fetching cycles");
        self.paginate_as(CYCLE_PATH, limit, self.page_size()).await
    }

    pub async fn get_workouts(&self, limit: usize) -> Result<Vec<Workout>> {
        info!(limit, "Fetching workouts");
        self.paginate_as(WORKOUT_PATH, limit, self.page_size()).await
    }

    // -- Profile ------------------------------------------------------------

    pub async fn get_profile(&self) -> Result<Profile> {
        self.get_json(PROFILE_PATH, &[]).await
    }
}
