use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

const MILLIS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;
const MILLIS_PER_MINUTE: f64 = 1000.0 * 60.0;
const KCAL_PER_KJ: f64 = 0.239;
const MILES_PER_METER: f64 = 0.000_621_371;

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Scoring status shared by every scored record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreState {
    Scored,
    PendingScore,
    Unscorable,
    #[serde(untagged)]
    Other(String),
}

impl ScoreState {
    pub fn is_scored(&self) -> bool {
        matches!(self, ScoreState::Scored)
    }
}

impl fmt::Display for ScoreState {
    /// Lowercase, space separated: `PENDING_SCORE` renders as "pending score".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = match self {
            ScoreState::Scored => "scored",
            ScoreState::PendingScore => "pending score",
            ScoreState::Unscorable => "unscorable",
            ScoreState::Other(s) => return write!(f, "{}", s.to_lowercase().replace('_', " ")),
        };
        f.write_str(raw)
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Recovery {
    pub cycle_id: i64,
    pub sleep_id: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score_state: ScoreState,
    pub score: Option<RecoveryScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryScore {
    /// Percentage, 0-100.
    pub recovery_score: f64,
    pub resting_heart_rate: f64,
    pub hrv_rmssd_milli: f64,
    /// WHOOP 4.0 and later.
    pub spo2_percentage: Option<f64>,
    pub skin_temp_celsius: Option<f64>,
    #[serde(default)]
    pub user_calibrating: bool,
}

impl Recovery {
    /// The score, only once upstream has finished scoring.
    pub fn scored(&self) -> Option<&RecoveryScore> {
        self.score.as_ref().filter(|_| self.score_state.is_scored())
    }
}

// ---------------------------------------------------------------------------
// Sleep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Sleep {
    pub id: String,
    pub cycle_id: Option<i64>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone_offset: String,
    pub nap: bool,
    pub score_state: ScoreState,
    pub score: Option<SleepScore>,
}

impl Sleep {
    pub fn scored(&self) -> Option<&SleepScore> {
        self.score.as_ref().filter(|_| self.score_state.is_scored())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SleepScore {
    pub stage_summary: SleepStageSummary,
    pub sleep_needed: SleepNeeded,
    pub respiratory_rate: Option<f64>,
    pub sleep_performance_percentage: Option<f64>,
    pub sleep_consistency_percentage: Option<f64>,
    pub sleep_efficiency_percentage: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SleepStageSummary {
    pub total_in_bed_time_milli: i64,
    pub total_awake_time_milli: i64,
    #[serde(default)]
    pub total_no_data_time_milli: i64,
    pub total_light_sleep_time_milli: i64,
    pub total_slow_wave_sleep_time_milli: i64,
    pub total_rem_sleep_time_milli: i64,
    pub sleep_cycle_count: i64,
    pub disturbance_count: i64,
}

impl SleepStageSummary {
    /// Light + deep + REM; awake time excluded.
    pub fn total_sleep_milli(&self) -> i64 {
        self.total_light_sleep_time_milli
            + self.total_slow_wave_sleep_time_milli
            + self.total_rem_sleep_time_milli
    }

    pub fn total_sleep_hours(&self) -> f64 {
        self.total_sleep_milli() as f64 / MILLIS_PER_HOUR
    }

    pub fn deep_sleep_hours(&self) -> f64 {
        self.total_slow_wave_sleep_time_milli as f64 / MILLIS_PER_HOUR
    }

    pub fn rem_sleep_hours(&self) -> f64 {
        self.total_rem_sleep_time_milli as f64 / MILLIS_PER_HOUR
    }

    pub fn light_sleep_hours(&self) -> f64 {
        self.total_light_sleep_time_milli as f64 / MILLIS_PER_HOUR
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SleepNeeded {
    pub baseline_milli: i64,
    pub need_from_sleep_debt_milli: i64,
    pub need_from_recent_strain_milli: i64,
    #[serde(default)]
    pub need_from_recent_nap_milli: i64,
}

// ---------------------------------------------------------------------------
// Cycle (daily strain)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Cycle {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    /// Absent while the cycle is still running.
    pub end: Option<DateTime<Utc>>,
    pub timezone_offset: String,
    pub score_state: ScoreState,
    pub score: Option<CycleScore>,
}

impl Cycle {
    pub fn scored(&self) -> Option<&CycleScore> {
        self.score.as_ref().filter(|_| self.score_state.is_scored())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CycleScore {
    /// 0-21 scale.
    pub strain: f64,
    pub kilojoule: f64,
    pub average_heart_rate: i64,
    pub max_heart_rate: i64,
}

impl CycleScore {
    pub fn calories(&self) -> i64 {
        (self.kilojoule * KCAL_PER_KJ) as i64
    }
}

// ---------------------------------------------------------------------------
// Workout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Workout {
    pub id: String,
    pub user_id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone_offset: String,
    #[serde(default)]
    pub sport_name: String,
    pub score_state: ScoreState,
    pub score: Option<WorkoutScore>,
}

impl Workout {
    pub fn scored(&self) -> Option<&WorkoutScore> {
        self.score.as_ref().filter(|_| self.score_state.is_scored())
    }

    pub fn duration_minutes(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / MILLIS_PER_MINUTE
    }

    /// `functional_fitness` becomes "Functional Fitness".
    pub fn sport_title(&self) -> String {
        self.sport_name
            .split(['_', ' '])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkoutScore {
    pub strain: f64,
    pub average_heart_rate: i64,
    pub max_heart_rate: i64,
    pub kilojoule: f64,
    pub percent_recorded: Option<f64>,
    pub distance_meter: Option<f64>,
    pub altitude_gain_meter: Option<f64>,
    pub altitude_change_meter: Option<f64>,
    #[serde(default)]
    pub zone_durations: ZoneDurations,
}

impl WorkoutScore {
    pub fn calories(&self) -> i64 {
        (self.kilojoule * KCAL_PER_KJ) as i64
    }

    pub fn distance_miles(&self) -> Option<f64> {
        self.distance_meter
            .filter(|m| *m > 0.0)
            .map(|m| m * MILES_PER_METER)
    }
}

/// Time spent in each heart-rate zone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZoneDurations {
    pub zone_zero_milli: i64,
    pub zone_one_milli: i64,
    pub zone_two_milli: i64,
    pub zone_three_milli: i64,
    pub zone_four_milli: i64,
    pub zone_five_milli: i64,
}

impl ZoneDurations {
    pub fn zone_milli(&self, zone: u8) -> i64 {
        match zone {
            0 => self.zone_zero_milli,
            1 => self.zone_one_milli,
            2 => self.zone_two_milli,
            3 => self.zone_three_milli,
            4 => self.zone_four_milli,
            5 => self.zone_five_milli,
            _ => 0,
        }
    }

    pub fn zone_minutes(&self, zone: u8) -> f64 {
        self.zone_milli(zone) as f64 / MILLIS_PER_MINUTE
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            format!("user {}", self.user_id)
        } else {
            parts.join(" ")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_scored_recovery() {
        let json = r#"{
            "cycle_id": 93845,
            "sleep_id": "ecfc6a15-4661-442f-a9a4-f160dd7afae8",
            "user_id": 10129,
            "created_at": "2022-04-24T11:25:44.774Z",
            "updated_at": "2022-04-24T14:25:44.774Z",
            "score_state": "SCORED",
            "score": {
                "user_calibrating": false,
                "recovery_score": 44,
                "resting_heart_rate": 64,
                "hrv_rmssd_milli": 31.813562,
                "spo2_percentage": 95.6875,
                "skin_temp_celsius": 33.7
            }
        }"#;
        let r: Recovery = serde_json::from_str(json).unwrap();
        assert_eq!(r.cycle_id, 93845);
        let score = r.scored().unwrap();
        assert_eq!(score.recovery_score, 44.0);
        assert_eq!(score.spo2_percentage, Some(95.6875));
    }

    #[test]
    fn pending_recovery_has_no_scored_view() {
        let json = r#"{
            "cycle_id": 1, "user_id": 2,
            "created_at": "2024-01-15T10:00:00Z",
            "updated_at": "2024-01-15T10:00:00Z",
            "score_state": "PENDING_SCORE"
        }"#;
        let r: Recovery = serde_json::from_str(json).unwrap();
        assert_eq!(r.score_state, ScoreState::PendingScore);
        assert!(r.scored().is_none());
        assert_eq!(r.score_state.to_string(), "pending score");
    }

    #[test]
    fn unknown_score_state_is_preserved() {
        let state: ScoreState = serde_json::from_str(r#""NEEDS_REVIEW""#).unwrap();
        assert_eq!(state, ScoreState::Other("NEEDS_REVIEW".into()));
        assert_eq!(state.to_string(), "needs review");
    }

    #[test]
    fn sleep_stage_hours() {
        let json = r#"{
            "id": "s1", "cycle_id": 5, "user_id": 2,
            "created_at": "2024-01-15T10:00:00Z",
            "updated_at": "2024-01-15T10:00:00Z",
            "start": "2024-01-14T23:00:00Z",
            "end": "2024-01-15T07:00:00Z",
            "timezone_offset": "-05:00",
            "nap": false,
            "score_state": "SCORED",
            "score": {
                "stage_summary": {
                    "total_in_bed_time_milli": 28800000,
                    "total_awake_time_milli": 1800000,
                    "total_light_sleep_time_milli": 14400000,
                    "total_slow_wave_sleep_time_milli": 5400000,
                    "total_rem_sleep_time_milli": 7200000,
                    "sleep_cycle_count": 4,
                    "disturbance_count": 9
                },
                "sleep_needed": {
                    "baseline_milli": 27000000,
                    "need_from_sleep_debt_milli": 0,
                    "need_from_recent_strain_milli": 600000
                },
                "sleep_performance_percentage": 91
            }
        }"#;
        let s: Sleep = serde_json::from_str(json).unwrap();
        let stages = &s.scored().unwrap().stage_summary;
        assert_eq!(stages.total_sleep_hours(), 7.5);
        assert_eq!(stages.deep_sleep_hours(), 1.5);
        assert_eq!(stages.rem_sleep_hours(), 2.0);
        assert_eq!(stages.light_sleep_hours(), 4.0);
        assert_eq!(stages.total_no_data_time_milli, 0);
    }

    #[test]
    fn cycle_without_end_is_ongoing() {
        let json = r#"{
            "id": 93845, "user_id": 10129,
            "created_at": "2022-04-24T11:25:44.774Z",
            "updated_at": "2022-04-24T14:25:44.774Z",
            "start": "2022-04-24T02:25:44.774Z",
            "end": null,
            "timezone_offset": "-05:00",
            "score_state": "SCORED",
            "score": {"strain": 5.29, "kilojoule": 8288.3, "average_heart_rate": 68, "max_heart_rate": 141}
        }"#;
        let c: Cycle = serde_json::from_str(json).unwrap();
        assert!(c.end.is_none());
        assert_eq!(c.scored().unwrap().calories(), 1980);
    }

    #[test]
    fn workout_helpers() {
        let json = r#"{
            "id": "w1", "user_id": 2,
            "start": "2024-01-15T10:00:00Z",
            "end": "2024-01-15T10:45:00Z",
            "timezone_offset": "+01:00",
            "sport_name": "functional_fitness",
            "score_state": "SCORED",
            "score": {
                "strain": 8.25, "average_heart_rate": 123, "max_heart_rate": 146,
                "kilojoule": 1569.34, "percent_recorded": 100,
                "distance_meter": 1609.34,
                "zone_durations": {"zone_three_milli": 600000, "zone_four_milli": 120000}
            }
        }"#;
        let w: Workout = serde_json::from_str(json).unwrap();
        assert_eq!(w.duration_minutes(), 45.0);
        assert_eq!(w.sport_title(), "Functional Fitness");
        let score = w.scored().unwrap();
        assert_eq!(score.calories(), 375);
        assert!((score.distance_miles().unwrap() - 1.0).abs() < 0.001);
        assert_eq!(score.zone_durations.zone_minutes(3), 10.0);
        assert_eq!(score.zone_durations.zone_minutes(5), 0.0);
    }

    #[test]
    fn profile_display_name_falls_back_to_id() {
        let p: Profile = serde_json::from_str(r#"{"user_id": 7}"#).unwrap();
        assert_eq!(p.display_name(), "user 7");

        let p: Profile =
            serde_json::from_str(r#"{"user_id": 7, "first_name": "Sam", "last_name": "Lee"}"#)
                .unwrap();
        assert_eq!(p.display_name(), "Sam Lee");
    }
}
