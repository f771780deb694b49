use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{BookingService, BookingSession};
use crate::services::flow::sequencer::StepKind;

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a service.")]
    ServiceRequired,

    #[error("The selected service is no longer available. Please choose another one.")]
    ServiceUnavailable,

    #[error("Please select a date.")]
    DateRequired,

    #[error("Please select a valid date.")]
    DateInvalid,

    #[error("Please select a date that is today or later.")]
    DateInPast,

    #[error("Please select a time.")]
    TimeRequired,

    #[error("Please select a professional.")]
    ProfessionalRequired,

    #[error("Please enter your name and email.")]
    DetailsRequired,

    #[error("Please enter a valid email address.")]
    EmailInvalid,
}

/// What the validators need to know beyond the session itself.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub services: &'a [BookingService],
    pub today: NaiveDate,
}

/// Runs the validator for `kind`, recording the outcome in the session's
/// form error. Returns whether the step may be left.
pub fn validate_step(kind: StepKind, session: &mut BookingSession, ctx: StepContext<'_>) -> bool {
    match check_step(kind, session, ctx) {
        Ok(()) => {
            session.clear_error();
            true
        }
        Err(e) => {
            tracing::debug!(step = kind.as_str(), reason = %e, "step rejected");
            session.set_error(e.to_string());
            false
        }
    }
}

pub fn check_step(
    kind: StepKind,
    session: &mut BookingSession,
    ctx: StepContext<'_>,
) -> Result<(), ValidationError> {
    match kind {
        StepKind::Service => validate_service(session, ctx.services),
        StepKind::Date => validate_date(session.selected_date(), ctx.today).map(|_| ()),
        StepKind::Time => validate_time(session.selected_time()),
        StepKind::Professional => validate_professional(session.selected_professional_id()),
        StepKind::Details => validate_details(session.customer_name(), session.customer_email()),
    }
}

/// Resets the selection when the chosen service has disappeared from the
/// currently loaded list.
pub fn validate_service(
    session: &mut BookingSession,
    services: &[BookingService],
) -> Result<(), ValidationError> {
    let id = session.selected_service_id();
    if id.is_empty() {
        return Err(ValidationError::ServiceRequired);
    }
    if !services.iter().any(|s| s.id == id) {
        session.clear_service();
        return Err(ValidationError::ServiceUnavailable);
    }
    Ok(())
}

/// Calendar-day comparison only; time of day plays no part.
pub fn validate_date(date: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if date.is_empty() {
        return Err(ValidationError::DateRequired);
    }
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::DateInvalid)?;
    if parsed < today {
        return Err(ValidationError::DateInPast);
    }
    Ok(parsed)
}

pub fn validate_time(time: &str) -> Result<(), ValidationError> {
    if time.is_empty() {
        return Err(ValidationError::TimeRequired);
    }
    Ok(())
}

pub fn validate_professional(professional_id: &str) -> Result<(), ValidationError> {
    if professional_id.is_empty() {
        return Err(ValidationError::ProfessionalRequired);
    }
    Ok(())
}

pub fn validate_details(name: &str, email: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(ValidationError::DetailsRequired);
    }
    if !looks_like_email(email) {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

/// `<non-space>@<non-space>.<non-space>`, nothing stricter.
pub fn looks_like_email(email: &str) -> bool {
    EMAIL_PATTERN
        .get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"))
        .is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InitialData;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, 10).unwrap()
    }

    fn services() -> Vec<BookingService> {
        vec![BookingService {
            id: "S1".to_string(),
            name: "Cut".to_string(),
            duration_minutes: 30,
            price: None,
            description: None,
        }]
    }

    fn session() -> BookingSession {
        BookingSession::new(1, &InitialData::default())
    }

    #[test]
    fn test_service_required() {
        let mut s = session();
        assert_eq!(
            validate_service(&mut s, &services()),
            Err(ValidationError::ServiceRequired)
        );
    }

    #[test]
    fn test_service_removed_resets_selection() {
        let mut s = session();
        s.set_service("S1");
        let mut list = services();
        assert!(validate_service(&mut s, &list).is_ok());

        list.retain(|svc| svc.id != "S1");
        let ctx = StepContext {
            services: &list,
            today: today(),
        };
        assert!(!validate_step(StepKind::Service, &mut s, ctx));
        assert_eq!(s.selected_service_id(), "");
        assert!(s.form_error().is_some());
    }

    #[test]
    fn test_date_rules() {
        let t = today();
        assert_eq!(validate_date("", t), Err(ValidationError::DateRequired));
        assert_eq!(validate_date("10/05/2030", t), Err(ValidationError::DateInvalid));
        let yesterday = (t - Duration::days(1)).format("%Y-%m-%d").to_string();
        assert_eq!(validate_date(&yesterday, t), Err(ValidationError::DateInPast));
        assert_eq!(validate_date("2030-05-10", t), Ok(t));
        assert!(validate_date("2030-05-11", t).is_ok());
    }

    #[test]
    fn test_past_date_sets_form_error() {
        let mut s = session();
        s.set_date("2030-05-09");
        let list = services();
        let ctx = StepContext {
            services: &list,
            today: today(),
        };
        assert!(!validate_step(StepKind::Date, &mut s, ctx));
        assert_eq!(
            s.form_error(),
            Some("Please select a date that is today or later.")
        );
    }

    #[test]
    fn test_success_clears_form_error() {
        let mut s = session();
        s.set_time("10:00");
        s.set_error("stale");
        let list = services();
        let ctx = StepContext {
            services: &list,
            today: today(),
        };
        assert!(validate_step(StepKind::Time, &mut s, ctx));
        assert!(s.form_error().is_none());
    }

    #[test]
    fn test_time_and_professional_required() {
        assert_eq!(validate_time(""), Err(ValidationError::TimeRequired));
        assert!(validate_time("10:00").is_ok());
        assert_eq!(
            validate_professional(""),
            Err(ValidationError::ProfessionalRequired)
        );
        assert!(validate_professional("P1").is_ok());
    }

    #[test]
    fn test_details() {
        assert_eq!(
            validate_details("", "ana@x.com"),
            Err(ValidationError::DetailsRequired)
        );
        assert_eq!(
            validate_details("Ana", "  "),
            Err(ValidationError::DetailsRequired)
        );
        assert_eq!(
            validate_details("Ana", "ana.x.com"),
            Err(ValidationError::EmailInvalid)
        );
        assert!(validate_details("Ana", "ana@x.com").is_ok());
    }

    #[test]
    fn test_email_pattern_is_permissive() {
        assert!(looks_like_email("a@b.c"));
        assert!(looks_like_email("first.last+tag@sub.example.org"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.c"));
        assert!(!looks_like_email("a @ b.c"));
    }
}
