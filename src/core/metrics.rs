//! Derived dashboard metrics
//!
//! Pure functions over a leads snapshot. Nothing here is persisted; the
//! dashboard recomputes from the mirror's current state on every render.

use crate::core::lead::{Lead, LeadStatus, Portfolio};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Number of leads per status, every status present
pub fn count_by_status(leads: &[Lead]) -> HashMap<LeadStatus, usize> {
    let mut counts: HashMap<LeadStatus, usize> =
        LeadStatus::ALL.into_iter().map(|status| (status, 0)).collect();
    for lead in leads {
        *counts.entry(lead.status).or_default() += 1;
    }
    counts
}

/// Leads in a status tab; `None` is the "all" tab
pub fn filter_by_status(leads: &[Lead], status: Option<LeadStatus>) -> Vec<&Lead> {
    leads
        .iter()
        .filter(|lead| status.is_none_or(|s| lead.status == s))
        .collect()
}

/// Won leads as a percentage of all leads, rounded to one decimal
///
/// Zero when there are no leads.
pub fn conversion_rate(leads: &[Lead]) -> f64 {
    if leads.is_empty() {
        return 0.0;
    }
    let won = leads.iter().filter(|l| l.status == LeadStatus::Won).count();
    round_one_decimal(won as f64 / leads.len() as f64 * 100.0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Numeric value of a free-text revenue field
///
/// Everything but digits and the decimal point is stripped ("$50,000" is
/// 50000). Values that still do not parse count as zero.
pub fn parse_revenue(value: &str) -> f64 {
    static NON_NUMERIC: OnceLock<Regex> = OnceLock::new();
    let regex = NON_NUMERIC.get_or_init(|| Regex::new(r"[^0-9.]").unwrap());
    regex
        .replace_all(value, "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Sum of free-text revenue values, malformed entries counting as zero
pub fn sum_revenue<'a>(values: impl IntoIterator<Item = &'a str>) -> f64 {
    values.into_iter().map(parse_revenue).sum()
}

/// Total expected revenue across leads
pub fn expected_revenue(leads: &[Lead]) -> f64 {
    sum_revenue(leads.iter().map(|l| l.expected_revenue.as_str()))
}

/// Lead count and revenue of one portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub portfolio: Portfolio,
    pub leads: usize,
    pub revenue: f64,
}

/// Per-portfolio breakdown, one entry per portfolio in display order
pub fn revenue_by_portfolio(leads: &[Lead]) -> Vec<PortfolioSummary> {
    Portfolio::ALL
        .into_iter()
        .map(|portfolio| {
            let in_portfolio: Vec<&Lead> =
                leads.iter().filter(|l| l.portfolio == portfolio).collect();
            PortfolioSummary {
                portfolio,
                leads: in_portfolio.len(),
                revenue: sum_revenue(in_portfolio.iter().map(|l| l.expected_revenue.as_str())),
            }
        })
        .collect()
}

/// Dollar amount for a dashboard tile: `$950`, `$81K`, `$1.2M`
///
/// The unit is picked after rounding, so `$999.6` shows as `$1K` and
/// `$999,500` as `$1M`.
pub fn format_compact_currency(amount: f64) -> String {
    let amount = amount.max(0.0);
    let dollars = amount.round();
    if dollars < 1_000.0 {
        return format!("${}", dollars as u64);
    }
    let thousands = (amount / 1_000.0).round();
    if thousands < 1_000.0 {
        return format!("${}K", thousands as u64);
    }
    let millions = round_one_decimal(amount / 1_000_000.0);
    if millions.fract() == 0.0 {
        format!("${}M", millions as u64)
    } else {
        format!("${:.1}M", millions)
    }
}

/// Everything the dashboard overview shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_leads: usize,
    pub by_status: HashMap<LeadStatus, usize>,
    pub won_leads: usize,
    pub conversion_rate: f64,
    pub expected_revenue: f64,
    pub portfolios: Vec<PortfolioSummary>,
}

impl DashboardMetrics {
    pub fn compute(leads: &[Lead]) -> Self {
        let by_status = count_by_status(leads);
        let won_leads = by_status.get(&LeadStatus::Won).copied().unwrap_or(0);
        Self {
            total_leads: leads.len(),
            by_status,
            won_leads,
            conversion_rate: conversion_rate(leads),
            expected_revenue: expected_revenue(leads),
            portfolios: revenue_by_portfolio(leads),
        }
    }

    pub fn count(&self, status: LeadStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

// =============================================================================
// Follow-up reminders
// =============================================================================

/// How pressing a lead's next follow-up is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Date passed and the lead is still open
    Overdue,
    Today,
    /// Due within the reminder horizon
    Upcoming,
}

impl Urgency {
    pub fn label(&self) -> &'static str {
        match self {
            Urgency::Overdue => "Overdue",
            Urgency::Today => "Today",
            Urgency::Upcoming => "Upcoming",
        }
    }
}

/// A lead whose next follow-up needs attention
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder<'a> {
    pub lead: &'a Lead,
    pub due: NaiveDate,
    pub urgency: Urgency,
}

/// Leads due today, due within `horizon_days`, or overdue while still open
///
/// Leads with an unparseable `next_follow_up` are skipped. Lead order is kept.
pub fn upcoming_follow_ups(
    leads: &[Lead],
    today: NaiveDate,
    horizon_days: i64,
) -> Vec<Reminder<'_>> {
    leads
        .iter()
        .filter_map(|lead| {
            let due = lead.next_follow_up_date()?;
            let days_until = (due - today).num_days();
            let urgency = if days_until == 0 {
                Urgency::Today
            } else if days_until > 0 && days_until <= horizon_days {
                Urgency::Upcoming
            } else if days_until < 0 && !lead.status.is_closed() {
                Urgency::Overdue
            } else {
                return None;
            };
            Some(Reminder { lead, due, urgency })
        })
        .collect()
}
