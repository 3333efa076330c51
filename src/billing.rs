use crate::api::User;
use chrono::{DateTime, Utc};
use serde::Serialize;

const DEFAULT_RATE: f64 = 0.10;
const PRO_RATE: f64 = 0.08;
const ENTERPRISE_RATE: f64 = 0.05;

/// Dollar value of `credits` under the given plan's per-credit rate
pub fn credits_to_dollars(credits: f64, plan: &str) -> f64 {
    let rate = match plan.trim().to_ascii_lowercase().as_str() {
        "pro" => PRO_RATE,
        "enterprise" => ENTERPRISE_RATE,
        _ => DEFAULT_RATE,
    };
    credits * rate
}

/// Values derived from a profile for dashboard display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub total_credits: f64,
    pub is_paid_plan: bool,
    /// 0-100
    pub cycle_progress: f64,
    pub days_until_cycle_end: i64,
}

impl User {
    pub fn total_credits(&self) -> f64 {
        self.non_expiring_credits + self.expiring_credits
    }

    pub fn summary(&self, now: DateTime<Utc>) -> AccountSummary {
        let start = parse_timestamp(&self.current_cycle_start);
        let end = parse_timestamp(&self.current_cycle_end);

        let (cycle_progress, days_until_cycle_end) = match (start, end) {
            (Some(start), Some(end)) if end > start => {
                let total = (end - start).num_seconds() as f64;
                let elapsed = (now - start).num_seconds() as f64;
                let progress = (elapsed / total * 100.0).clamp(0.0, 100.0);
                let days = (end - now).num_days().max(0);
                (progress, days)
            }
            _ => (0.0, 0),
        };

        AccountSummary {
            total_credits: self.total_credits(),
            is_paid_plan: !self.plan_name.trim().eq_ignore_ascii_case("free"),
            cycle_progress,
            days_until_cycle_end,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
