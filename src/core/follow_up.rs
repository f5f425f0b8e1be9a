//! Follow-up notes attached to a lead

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// A dated note on a lead, labelled with a "day" sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: String,
    pub lead_id: String,
    /// Caller-supplied label, not checked for uniqueness or contiguity
    pub day_number: u32,
    pub notes: String,
    pub updated_by: String,
    /// ISO 8601 calendar date
    pub follow_up_date: String,
    pub work_status: String,
    pub next_step: String,
    /// Server timestamp
    pub created_at: DateTime<Utc>,
}

/// Payload of add and update follow-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FollowUpDraft {
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub lead_id: String,
    #[validate(range(min = 1, message = "must be a positive day number"))]
    pub day_number: u32,
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub notes: String,
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub updated_by: String,
    #[validate(custom(function = "crate::core::validation::iso_date"))]
    pub follow_up_date: String,
    pub work_status: String,
    pub next_step: String,
}

impl FollowUpDraft {
    pub fn to_columns(&self) -> FollowUpColumns {
        FollowUpColumns {
            lead_id: self.lead_id.clone(),
            day_number: self.day_number,
            notes: self.notes.clone(),
            updated_by: self.updated_by.clone(),
            follow_up_date: self.follow_up_date.clone(),
            work_status: self.work_status.clone(),
            next_step: self.next_step.clone(),
        }
    }
}

/// Writable columns of the `follow_ups` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpColumns {
    pub lead_id: String,
    pub day_number: u32,
    pub notes: String,
    pub updated_by: String,
    pub follow_up_date: String,
    pub work_status: String,
    pub next_step: String,
}

/// A full row of the `follow_ups` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpRow {
    pub id: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub columns: FollowUpColumns,
}

impl From<FollowUpRow> for FollowUp {
    fn from(row: FollowUpRow) -> Self {
        let FollowUpRow {
            id,
            created_at,
            columns,
            ..
        } = row;
        FollowUp {
            id,
            lead_id: columns.lead_id,
            day_number: columns.day_number,
            notes: columns.notes,
            updated_by: columns.updated_by,
            follow_up_date: columns.follow_up_date,
            work_status: columns.work_status,
            next_step: columns.next_step,
            created_at,
        }
    }
}

/// Group follow-ups by lead id, each group ordered by ascending `day_number`
///
/// The sort is stable, so entries sharing a day number keep the order the
/// backend returned them in.
pub fn group_by_lead(
    follow_ups: impl IntoIterator<Item = FollowUp>,
) -> HashMap<String, Vec<FollowUp>> {
    let mut grouped: HashMap<String, Vec<FollowUp>> = HashMap::new();
    for follow_up in follow_ups {
        grouped
            .entry(follow_up.lead_id.clone())
            .or_default()
            .push(follow_up);
    }
    for group in grouped.values_mut() {
        group.sort_by_key(|f| f.day_number);
    }
    grouped
}

/// Day number to offer for the next follow-up on a lead
pub fn next_day_number(follow_ups: &[FollowUp]) -> u32 {
    follow_ups
        .iter()
        .map(|f| f.day_number)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follow_up(id: &str, lead_id: &str, day_number: u32) -> FollowUp {
        FollowUp {
            id: id.to_string(),
            lead_id: lead_id.to_string(),
            day_number,
            notes: format!("day {}", day_number),
            updated_by: "Sarah".to_string(),
            follow_up_date: "2025-01-20".to_string(),
            work_status: "In Progress".to_string(),
            next_step: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_lead_orders_by_day_number() {
        let grouped = group_by_lead(vec![
            follow_up("a", "l1", 3),
            follow_up("b", "l2", 1),
            follow_up("c", "l1", 1),
            follow_up("d", "l1", 2),
        ]);

        let days: Vec<u32> = grouped["l1"].iter().map(|f| f.day_number).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(grouped["l2"].len(), 1);
        assert!(!grouped.contains_key("l3"));
    }

    #[test]
    fn test_group_by_lead_keeps_duplicate_days() {
        let grouped = group_by_lead(vec![follow_up("a", "l1", 1), follow_up("b", "l1", 1)]);
        let ids: Vec<&str> = grouped["l1"].iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_next_day_number() {
        assert_eq!(next_day_number(&[]), 1);
        assert_eq!(
            next_day_number(&[follow_up("a", "l1", 1), follow_up("b", "l1", 4)]),
            5
        );
    }

    #[test]
    fn test_row_projection() {
        let row = FollowUpRow {
            id: "fu-1".to_string(),
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            columns: FollowUpColumns {
                lead_id: "l1".to_string(),
                day_number: 2,
                notes: "Sent proposal".to_string(),
                updated_by: "Sarah".to_string(),
                follow_up_date: "2025-01-21".to_string(),
                work_status: "Pending".to_string(),
                next_step: "Call back".to_string(),
            },
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["lead_id"], "l1");
        assert_eq!(json["day_number"], 2);

        let follow_up = FollowUp::from(row.clone());
        assert_eq!(follow_up.id, "fu-1");
        assert_eq!(follow_up.created_at, row.created_at);
        assert_eq!(follow_up.next_step, "Call back");
    }
}
