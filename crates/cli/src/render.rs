//! Plain-text rendering of WHOOP records for agent hosts.

use chrono::{DateTime, FixedOffset, Utc};
use whoop_client::WhoopError;
use whoop_client::models::{Cycle, Profile, Recovery, Sleep, Workout};

const BAR_WIDTH: usize = 10;
/// Hours of sleep that fill the whole bar.
const FULL_SLEEP_HOURS: f64 = 8.0;

/// `7.5` renders as "7h 30m".
pub fn format_hours_minutes(hours: f64) -> String {
    let h = hours.trunc();
    let m = ((hours - h) * 60.0) as i64;
    format!("{}h {m}m", h as i64)
}

pub fn bar(filled: usize) -> String {
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Shift to the record's own timezone when upstream supplied a parseable offset.
fn local(dt: &DateTime<Utc>, offset: &str) -> DateTime<FixedOffset> {
    offset
        .parse::<FixedOffset>()
        .map(|o| dt.with_timezone(&o))
        .unwrap_or_else(|_| dt.fixed_offset())
}

// ---------------------------------------------------------------------------
// Daily summary
// ---------------------------------------------------------------------------

pub fn summary(
    recovery: Option<&Recovery>,
    sleep: Option<&Sleep>,
    cycle: Option<&Cycle>,
) -> String {
    let mut lines = vec!["=== WHOOP Daily Summary ===".to_string(), String::new()];

    lines.push("RECOVERY".into());
    match recovery.map(|r| (r, r.scored())) {
        Some((_, Some(score))) => {
            lines.push(format!("  Score: {:.0}%", score.recovery_score));
            lines.push(format!("  HRV: {:.1}ms", score.hrv_rmssd_milli));
            lines.push(format!("  Resting HR: {:.0}bpm", score.resting_heart_rate));
            if let Some(spo2) = score.spo2_percentage.filter(|v| *v > 0.0) {
                lines.push(format!("  SpO2: {spo2:.1}%"));
            }
        }
        Some((r, None)) if !r.score_state.is_scored() => {
            lines.push(format!("  {}", r.score_state))
        }
        _ => lines.push("  Not available yet".into()),
    }
    lines.push(String::new());

    lines.push("SLEEP".into());
    match sleep.map(|s| (s, s.scored())) {
        Some((_, Some(score))) => {
            let stages = &score.stage_summary;
            lines.push(format!(
                "  Total: {}",
                format_hours_minutes(stages.total_sleep_hours())
            ));
            lines.push(format!(
                "  Deep: {} | REM: {}",
                format_hours_minutes(stages.deep_sleep_hours()),
                format_hours_minutes(stages.rem_sleep_hours())
            ));
            if let Some(perf) = score.sleep_performance_percentage.filter(|v| *v > 0.0) {
                lines.push(format!("  Performance: {perf:.0}%"));
            }
        }
        Some((s, None)) if !s.score_state.is_scored() => {
            lines.push(format!("  {}", s.score_state))
        }
        _ => lines.push("  Not available yet".into()),
    }
    lines.push(String::new());

    lines.push("STRAIN".into());
    match cycle.map(|c| (c, c.scored())) {
        Some((_, Some(score))) => {
            lines.push(format!("  Score: {:.1} / 21", score.strain));
            lines.push(format!("  Calories: {} kcal", score.calories()));
            lines.push(format!("  Avg HR: {}bpm", score.average_heart_rate));
        }
        Some((c, None)) if !c.score_state.is_scored() => {
            lines.push(format!("  {}", c.score_state))
        }
        _ => lines.push("  Not available yet".into()),
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

pub fn sleep_trend(records: &[Sleep]) -> String {
    if records.is_empty() {
        return "No sleep data available.".into();
    }
    let main: Vec<&Sleep> = records.iter().filter(|s| !s.nap).collect();
    if main.is_empty() {
        return "No main sleep data available.".into();
    }

    let mut lines = vec![
        format!("Sleep Trend (last {} nights):", main.len()),
        String::new(),
    ];
    for record in &main {
        let date = local(&record.start, &record.timezone_offset).format("%m/%d");
        match record.scored() {
            Some(score) => {
                let hours = score.stage_summary.total_sleep_hours();
                let perf = score.sleep_performance_percentage.unwrap_or(0.0);
                let filled = (hours * BAR_WIDTH as f64 / FULL_SLEEP_HOURS) as usize;
                lines.push(format!(
                    "{date}: {} {hours:.1}h ({perf:.0}% perf)",
                    bar(filled)
                ));
            }
            None => lines.push(format!("{date}: [not scored]")),
        }
    }

    let scored: Vec<_> = main.iter().filter_map(|s| s.scored()).collect();
    if !scored.is_empty() {
        let n = scored.len() as f64;
        let avg_hours = scored
            .iter()
            .map(|s| s.stage_summary.total_sleep_hours())
            .sum::<f64>()
            / n;
        let avg_perf = scored
            .iter()
            .map(|s| s.sleep_performance_percentage.unwrap_or(0.0))
            .sum::<f64>()
            / n;
        let avg_deep = scored
            .iter()
            .map(|s| s.stage_summary.deep_sleep_hours())
            .sum::<f64>()
            / n;
        lines.push(String::new());
        lines.push(format!(
            "Average: {avg_hours:.1}h sleep, {avg_perf:.0}% performance, {avg_deep:.1}h deep"
        ));
    }

    lines.join("\n")
}

pub fn recovery_trend(records: &[Recovery]) -> String {
    if records.is_empty() {
        return "No recovery data available.".into();
    }

    let mut lines = vec![
        format!("Recovery Trend (last {} days):", records.len()),
        String::new(),
    ];
    for record in records {
        let date = record.created_at.format("%m/%d");
        match record.scored() {
            Some(score) => {
                let filled = score.recovery_score.max(0.0) as usize / 10;
                lines.push(format!(
                    "{date}: {} {:.0}% (HRV: {:.0}ms)",
                    bar(filled),
                    score.recovery_score,
                    score.hrv_rmssd_milli
                ));
            }
            None => lines.push(format!("{date}: [not scored]")),
        }
    }

    let scored: Vec<_> = records.iter().filter_map(Recovery::scored).collect();
    if !scored.is_empty() {
        let n = scored.len() as f64;
        let avg_recovery = scored.iter().map(|s| s.recovery_score).sum::<f64>() / n;
        let avg_hrv = scored.iter().map(|s| s.hrv_rmssd_milli).sum::<f64>() / n;
        lines.push(String::new());
        lines.push(format!(
            "Average: {avg_recovery:.0}% recovery, {avg_hrv:.0}ms HRV"
        ));
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Workouts
// ---------------------------------------------------------------------------

pub fn workouts(records: &[Workout]) -> String {
    if records.is_empty() {
        return "No workout data available.".into();
    }

    let mut lines = vec![format!("Recent Workouts ({}):", records.len()), String::new()];
    for w in records {
        let date = local(&w.start, &w.timezone_offset).format("%m/%d %H:%M");
        let heading = format!(
            "• {date} - {} ({:.0}min)",
            w.sport_title(),
            w.duration_minutes()
        );
        let Some(s) = w.scored() else {
            lines.push(format!("{heading} [not scored]"));
            lines.push(String::new());
            continue;
        };

        lines.push(heading);
        lines.push(format!(
            "  Strain: {:.1} | {} cal | Avg HR: {} bpm",
            s.strain,
            s.calories(),
            s.average_heart_rate
        ));
        if let Some(miles) = s.distance_miles() {
            lines.push(format!("  Distance: {miles:.2} mi"));
        }
        let zones: Vec<String> = (3..=5)
            .filter(|z| s.zone_durations.zone_milli(*z) > 0)
            .map(|z| format!("Z{z}: {:.0}m", s.zone_durations.zone_minutes(z)))
            .collect();
        if !zones.is_empty() {
            lines.push(format!("  Zones: {}", zones.join(" | ")));
        }
        lines.push(String::new());
    }

    lines.join("\n").trim().to_string()
}

pub fn profile(p: &Profile) -> String {
    let mut lines = vec![p.display_name(), format!("  User ID: {}", p.user_id)];
    if let Some(email) = &p.email {
        lines.push(format!("  Email: {email}"));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// User-facing text for a failed tool call.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<WhoopError>() {
        Some(WhoopError::Auth(msg)) => {
            format!("Authentication error: {msg}. Run `whoop init` to store fresh tokens.")
        }
        Some(WhoopError::RateLimited {
            retry_after: Some(secs),
        }) => format!("Rate limit exceeded. Try again in {secs}s."),
        Some(WhoopError::RateLimited { retry_after: None }) => {
            "Rate limit exceeded. Try again later.".into()
        }
        Some(e @ (WhoopError::Api { .. } | WhoopError::Transport(_))) => format!("API error: {e}"),
        Some(e) => format!("Error: {e}"),
        None => format!("Error: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recovery(score_state: &str, score: Option<f64>) -> Recovery {
        let mut value = json!({
            "cycle_id": 1, "user_id": 1,
            "created_at": "2024-03-02T12:00:00Z",
            "updated_at": "2024-03-02T12:00:00Z",
            "score_state": score_state
        });
        if let Some(s) = score {
            value["score"] = json!({
                "recovery_score": s, "resting_heart_rate": 52.0, "hrv_rmssd_milli": 61.4
            });
        }
        serde_json::from_value(value).unwrap()
    }

    fn sleep(nap: bool, light_ms: i64) -> Sleep {
        serde_json::from_value(json!({
            "id": "s", "user_id": 1,
            "created_at": "2024-03-02T08:00:00Z",
            "updated_at": "2024-03-02T08:00:00Z",
            "start": "2024-03-01T23:00:00Z",
            "end": "2024-03-02T07:00:00Z",
            "timezone_offset": "+00:00",
            "nap": nap,
            "score_state": "SCORED",
            "score": {
                "stage_summary": {
                    "total_in_bed_time_milli": 28800000,
                    "total_awake_time_milli": 0,
                    "total_light_sleep_time_milli": light_ms,
                    "total_slow_wave_sleep_time_milli": 3600000,
                    "total_rem_sleep_time_milli": 3600000,
                    "sleep_cycle_count": 4,
                    "disturbance_count": 2
                },
                "sleep_needed": {
                    "baseline_milli": 0,
                    "need_from_sleep_debt_milli": 0,
                    "need_from_recent_strain_milli": 0
                },
                "sleep_performance_percentage": 80
            }
        }))
        .unwrap()
    }

    #[test]
    fn hours_minutes() {
        assert_eq!(format_hours_minutes(7.5), "7h 30m");
        assert_eq!(format_hours_minutes(0.25), "0h 15m");
    }

    #[test]
    fn bar_is_clamped() {
        assert_eq!(bar(3), "███░░░░░░░");
        assert_eq!(bar(42), "██████████");
    }

    #[test]
    fn summary_reports_pending_and_missing_sections() {
        let pending = recovery("PENDING_SCORE", None);
        let text = summary(Some(&pending), None, None);
        assert!(text.contains("RECOVERY\n  pending score\n"));
        assert!(text.contains("SLEEP\n  Not available yet\n"));
        assert!(text.ends_with("STRAIN\n  Not available yet"));
    }

    #[test]
    fn summary_shows_scored_recovery() {
        let scored = recovery("SCORED", Some(67.0));
        let text = summary(Some(&scored), None, None);
        assert!(text.contains("  Score: 67%"));
        assert!(text.contains("  HRV: 61.4ms"));
        assert!(!text.contains("SpO2"));
    }

    #[test]
    fn sleep_trend_skips_naps_and_averages() {
        let records = vec![sleep(false, 4 * 3600000), sleep(true, 1800000)];
        let text = sleep_trend(&records);
        assert!(text.starts_with("Sleep Trend (last 1 nights):"));
        assert!(text.contains("03/01: ███████░░░ 6.0h (80% perf)"));
        assert!(text.ends_with("Average: 6.0h sleep, 80% performance, 1.0h deep"));
    }

    #[test]
    fn sleep_trend_with_only_naps() {
        assert_eq!(
            sleep_trend(&[sleep(true, 0)]),
            "No main sleep data available."
        );
    }

    #[test]
    fn recovery_trend_lines() {
        let records = vec![
            recovery("SCORED", Some(44.0)),
            recovery("UNSCORABLE", None),
        ];
        let text = recovery_trend(&records);
        assert!(text.contains("03/02: ████░░░░░░ 44% (HRV: 61ms)"));
        assert!(text.contains("03/02: [not scored]"));
        assert!(text.ends_with("Average: 44% recovery, 61ms HRV"));
    }

    #[test]
    fn workouts_render_zones_and_distance() {
        let w: Workout = serde_json::from_value(json!({
            "id": "w", "user_id": 1,
            "start": "2024-03-02T17:00:00Z",
            "end": "2024-03-02T17:30:00Z",
            "timezone_offset": "-05:00",
            "sport_name": "running",
            "score_state": "SCORED",
            "score": {
                "strain": 11.04, "average_heart_rate": 150, "max_heart_rate": 181,
                "kilojoule": 1000.0, "distance_meter": 5000.0,
                "zone_durations": {"zone_four_milli": 300000}
            }
        }))
        .unwrap();

        let text = workouts(&[w]);
        assert!(text.contains("• 03/02 12:00 - Running (30min)"));
        assert!(text.contains("  Strain: 11.0 | 239 cal | Avg HR: 150 bpm"));
        assert!(text.contains("  Distance: 3.11 mi"));
        assert!(text.ends_with("  Zones: Z4: 5m"));
    }

    #[test]
    fn errors_become_user_text() {
        let err = anyhow::Error::new(WhoopError::RateLimited {
            retry_after: Some(30),
        });
        assert_eq!(describe_error(&err), "Rate limit exceeded. Try again in 30s.");

        let err = anyhow::Error::new(WhoopError::Auth("no access token found".into()));
        assert!(describe_error(&err).starts_with("Authentication error: no access token found."));

        let err = anyhow::anyhow!("disk full");
        assert_eq!(describe_error(&err), "Error: disk full");
    }
}
