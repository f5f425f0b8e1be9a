//! Immutable view of the mirror's state

use crate::core::follow_up::{FollowUp, next_day_number};
use crate::core::lead::Lead;
use crate::core::metrics::{DashboardMetrics, Reminder, upcoming_follow_ups};
use chrono::NaiveDate;
use std::collections::HashMap;

/// State published to UI consumers after every applied fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorSnapshot {
    /// Leads in backend order, newest first
    pub leads: Vec<Lead>,
    /// Follow-ups grouped by lead id, each group by ascending day number
    ///
    /// Raw fetch result: may hold groups whose lead is no longer mirrored.
    /// Read through [`follow_ups_for`](Self::follow_ups_for) or
    /// [`visible_follow_ups`](Self::visible_follow_ups) to leave those out.
    pub follow_ups_by_lead: HashMap<String, Vec<FollowUp>>,
    /// True until the first leads fetch settles
    pub loading: bool,
    /// Sequence number of the leads fetch currently shown (0 = none yet)
    pub leads_revision: u64,
    /// Sequence number of the follow-ups fetch currently shown
    pub follow_ups_revision: u64,
}

impl MirrorSnapshot {
    pub fn lead(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.id == id)
    }

    /// Follow-ups of a lead, empty when it has none or is not mirrored
    pub fn follow_ups_for(&self, lead_id: &str) -> &[FollowUp] {
        if self.lead(lead_id).is_none() {
            return &[];
        }
        self.follow_ups_by_lead
            .get(lead_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Follow-up groups whose lead is mirrored
    pub fn visible_follow_ups(&self) -> HashMap<String, Vec<FollowUp>> {
        self.follow_ups_by_lead
            .iter()
            .filter(|(lead_id, _)| self.lead(lead_id).is_some())
            .map(|(lead_id, group)| (lead_id.clone(), group.clone()))
            .collect()
    }

    /// Day number the next follow-up on a lead should carry
    pub fn next_day_number(&self, lead_id: &str) -> u32 {
        next_day_number(self.follow_ups_for(lead_id))
    }

    pub fn metrics(&self) -> DashboardMetrics {
        DashboardMetrics::compute(&self.leads)
    }

    pub fn reminders(&self, today: NaiveDate, horizon_days: i64) -> Vec<Reminder<'_>> {
        upcoming_follow_ups(&self.leads, today, horizon_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lead::{LeadSource, LeadStatus, Portfolio};
    use chrono::Utc;

    fn lead(id: &str) -> Lead {
        Lead {
            id: id.to_string(),
            name: format!("Lead {}", id),
            organization: "Org".to_string(),
            email: "lead@org.io".to_string(),
            contact_number: "+1000000000".to_string(),
            portfolio: Portfolio::Academy,
            lead_type: "Warm".to_string(),
            lead_source: LeadSource::Website,
            next_follow_up: "2025-01-20".to_string(),
            expected_revenue: "0".to_string(),
            lead_owner: "Owner".to_string(),
            requirements: String::new(),
            status: LeadStatus::New,
        }
    }

    fn follow_up(lead_id: &str, day_number: u32) -> FollowUp {
        FollowUp {
            id: format!("{}-{}", lead_id, day_number),
            lead_id: lead_id.to_string(),
            day_number,
            notes: "Called".to_string(),
            updated_by: "Owner".to_string(),
            follow_up_date: "2025-01-20".to_string(),
            work_status: String::new(),
            next_step: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_orphaned_follow_ups_are_hidden() {
        let mut snapshot = MirrorSnapshot {
            leads: vec![lead("kept")],
            ..MirrorSnapshot::default()
        };
        snapshot
            .follow_ups_by_lead
            .insert("kept".to_string(), vec![follow_up("kept", 1)]);
        snapshot
            .follow_ups_by_lead
            .insert("gone".to_string(), vec![follow_up("gone", 1)]);

        assert_eq!(snapshot.follow_ups_for("kept").len(), 1);
        assert!(snapshot.follow_ups_for("gone").is_empty());
        assert_eq!(snapshot.next_day_number("gone"), 1);

        let visible = snapshot.visible_follow_ups();
        assert_eq!(visible.len(), 1);
        assert!(visible.contains_key("kept"));
    }
}
