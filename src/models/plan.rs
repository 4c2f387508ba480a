// src/models/plan.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Cancelled)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPriority {
    High,
    // Older records carry "medium" for the same level.
    #[default]
    #[serde(alias = "medium")]
    Normal,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPlan {
    pub id: Uuid,
    pub customer_id: Uuid,

    pub plan_date: NaiveDate,
    /// Scheduled slot. Drop-in plans created from the nearby flow have none
    /// until the route optimizer assigns one.
    pub plan_time: Option<NaiveTime>,

    pub priority: PlanPriority,
    pub status: PlanStatus,

    /// 1-based rank assigned by route optimization; display aid only.
    pub route_order: Option<u32>,

    pub remark: Option<String>,
    /// True when the plan came from the nearby drop-in flow.
    pub drop_in: bool,

    pub create_time: DateTime<Utc>,
    pub completed_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    pub customer_id: Uuid,
    pub plan_date: NaiveDate,
    pub plan_time: NaiveTime,
    #[serde(default)]
    pub priority: PlanPriority,
    pub remark: Option<String>,
}

/// Half-hour slots the planning form offers: 08:00–11:30 and 14:00–18:00.
/// The lunch gap is intentional.
pub fn is_schedulable_slot(time: NaiveTime) -> bool {
    use chrono::Timelike;

    if time.second() != 0 || (time.minute() != 0 && time.minute() != 30) {
        return false;
    }
    let morning_start = NaiveTime::from_hms_opt(8, 0, 0).expect("valid literal");
    let morning_end = NaiveTime::from_hms_opt(11, 30, 0).expect("valid literal");
    let afternoon_start = NaiveTime::from_hms_opt(14, 0, 0).expect("valid literal");
    let afternoon_end = NaiveTime::from_hms_opt(18, 0, 0).expect("valid literal");

    (time >= morning_start && time <= morning_end)
        || (time >= afternoon_start && time <= afternoon_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn slot_set_matches_planning_form() {
        assert!(is_schedulable_slot(t(8, 0)));
        assert!(is_schedulable_slot(t(11, 30)));
        assert!(is_schedulable_slot(t(14, 0)));
        assert!(is_schedulable_slot(t(18, 0)));

        // lunch gap and off-grid times
        assert!(!is_schedulable_slot(t(12, 0)));
        assert!(!is_schedulable_slot(t(13, 30)));
        assert!(!is_schedulable_slot(t(9, 15)));
        assert!(!is_schedulable_slot(t(18, 30)));
        assert!(!is_schedulable_slot(t(7, 30)));
    }

    #[test]
    fn medium_priority_deserializes_as_normal() {
        let p: PlanPriority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(p, PlanPriority::Normal);
    }
}
