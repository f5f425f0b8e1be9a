//! Client-side validation run before any backend call
//!
//! Drafts derive [`validator::Validate`]; the reusable field validators below
//! are referenced from those derives. [`check`] runs a draft's rules and
//! converts the outcome into this crate's [`ValidationError`].

use crate::core::error::{FieldValidationError, ValidationError};
use crate::core::lead::DATE_FORMAT;
use chrono::NaiveDate;
use std::borrow::Cow;
use validator::{Validate, ValidationErrors};

/// Validator: value must contain something other than whitespace
pub fn non_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        Err(rule("required", Cow::Borrowed("is required")))
    } else {
        Ok(())
    }
}

/// Validator: value must be an ISO `YYYY-MM-DD` date
pub fn iso_date(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("required", Cow::Borrowed("please select a date")));
    }
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(_) => Ok(()),
        Err(_) => Err(rule(
            "date_format",
            Cow::Owned(format!(
                "must be a date in YYYY-MM-DD format (got '{}')",
                value
            )),
        )),
    }
}

fn rule(code: &'static str, message: Cow<'static, str>) -> validator::ValidationError {
    validator::ValidationError::new(code).with_message(message)
}

/// Run a draft's validation rules
pub fn check<T: Validate>(draft: &T) -> Result<(), ValidationError> {
    draft.validate().map_err(from_validator_errors)
}

/// Flatten `validator` output into field errors, sorted by field name
pub fn from_validator_errors(errors: ValidationErrors) -> ValidationError {
    let mut fields: Vec<FieldValidationError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldValidationError {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));

    match fields.len() {
        1 => {
            let only = fields.remove(0);
            ValidationError::FieldError {
                field: only.field,
                message: only.message,
            }
        }
        _ => ValidationError::FieldErrors(fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::follow_up::FollowUpDraft;
    use crate::core::lead::{LeadDraft, LeadSource, LeadStatus, Portfolio};

    fn lead_draft() -> LeadDraft {
        LeadDraft {
            name: "Jane Roe".to_string(),
            organization: "Acme".to_string(),
            email: "jane@acme.io".to_string(),
            contact_number: "+255700000000".to_string(),
            portfolio: Portfolio::Academy,
            lead_type: "Warm".to_string(),
            lead_source: LeadSource::Referral,
            next_follow_up: "2025-02-01".to_string(),
            expected_revenue: "$12,000".to_string(),
            lead_owner: "Sam".to_string(),
            requirements: String::new(),
            status: LeadStatus::New,
        }
    }

    fn follow_up_draft() -> FollowUpDraft {
        FollowUpDraft {
            lead_id: "lead-1".to_string(),
            day_number: 1,
            notes: "Intro call".to_string(),
            updated_by: "Sam".to_string(),
            follow_up_date: "2025-02-01".to_string(),
            work_status: String::new(),
            next_step: String::new(),
        }
    }

    #[test]
    fn test_non_blank() {
        assert!(non_blank("x").is_ok());
        assert!(non_blank("   ").is_err());
    }

    #[test]
    fn test_iso_date() {
        assert!(iso_date("2025-12-31").is_ok());
        assert!(iso_date("31/12/2025").is_err());
        assert_eq!(iso_date("").unwrap_err().code, "required");
    }

    #[test]
    fn test_valid_lead_draft() {
        assert!(check(&lead_draft()).is_ok());
    }

    #[test]
    fn test_missing_follow_up_date_blocks_lead() {
        let mut draft = lead_draft();
        draft.next_follow_up = String::new();

        match check(&draft).unwrap_err() {
            ValidationError::FieldError { message, .. } => {
                assert_eq!(message, "please select a date");
            }
            other => panic!("Expected a single field error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_date_is_a_field_error() {
        let mut draft = follow_up_draft();
        draft.follow_up_date = "01/02/2025".to_string();

        match check(&draft).unwrap_err() {
            ValidationError::FieldError { field, message } => {
                assert_eq!(field, "follow_up_date");
                assert!(message.contains("YYYY-MM-DD"));
            }
            other => panic!("Expected a single field error, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_lead_errors_are_sorted() {
        let mut draft = lead_draft();
        draft.name = " ".to_string();
        draft.email = "not-an-email".to_string();

        let err = check(&draft).unwrap_err();
        assert_eq!(err.fields(), vec!["email", "name"]);
    }

    #[test]
    fn test_follow_up_rules() {
        assert!(check(&follow_up_draft()).is_ok());

        let mut draft = follow_up_draft();
        draft.day_number = 0;
        draft.notes = String::new();
        draft.follow_up_date = String::new();

        let err = check(&draft).unwrap_err();
        assert_eq!(err.fields(), vec!["day_number", "follow_up_date", "notes"]);
    }
}
