//! services/app/src/client/booking.rs
//!
//! The trial-lesson booking form. Submission is simulated: after validation it
//! waits for the configured latency, logs the request and reports success.

use chrono::{DateTime, Utc};
use learnlingo_core::domain::{Tutor, TutorId};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::client::state::AppStore;
use crate::client::validation::{require, require_email, ValidationErrors};
use crate::error::AppError;

//=========================================================================================
// Form Field Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
}

impl PreferredTime {
    pub fn label(self) -> &'static str {
        match self {
            PreferredTime::Morning => "Morning (9 AM - 12 PM)",
            PreferredTime::Afternoon => "Afternoon (12 PM - 5 PM)",
            PreferredTime::Evening => "Evening (5 PM - 9 PM)",
        }
    }
}

impl FromStr for PreferredTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(PreferredTime::Morning),
            "afternoon" => Ok(PreferredTime::Afternoon),
            "evening" => Ok(PreferredTime::Evening),
            other => Err(format!("'{}' is not one of: morning, afternoon, evening", other)),
        }
    }
}

/// Main reason for learning, as offered by the booking form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningReason {
    CareerAndBusiness,
    LessonsForKids,
    LivingAbroad,
    ExamsAndCoursework,
    CultureTravelOrHobby,
}

impl LearningReason {
    pub const ALL: [LearningReason; 5] = [
        LearningReason::CareerAndBusiness,
        LearningReason::LessonsForKids,
        LearningReason::LivingAbroad,
        LearningReason::ExamsAndCoursework,
        LearningReason::CultureTravelOrHobby,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            LearningReason::CareerAndBusiness => "career",
            LearningReason::LessonsForKids => "kids",
            LearningReason::LivingAbroad => "abroad",
            LearningReason::ExamsAndCoursework => "exams",
            LearningReason::CultureTravelOrHobby => "culture",
        }
    }
}

impl fmt::Display for LearningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LearningReason::CareerAndBusiness => "Career and business",
            LearningReason::LessonsForKids => "Lessons for kids",
            LearningReason::LivingAbroad => "Living abroad",
            LearningReason::ExamsAndCoursework => "Exams and coursework",
            LearningReason::CultureTravelOrHobby => "Culture, travel or hobby",
        };
        f.write_str(label)
    }
}

impl FromStr for LearningReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        LearningReason::ALL
            .into_iter()
            .find(|r| r.slug() == wanted || r.to_string().to_ascii_lowercase() == wanted)
            .ok_or_else(|| {
                let slugs: Vec<&str> = LearningReason::ALL.iter().map(|r| r.slug()).collect();
                format!("'{}' is not one of: {}", s.trim(), slugs.join(", "))
            })
    }
}

//=========================================================================================
// The Form
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub preferred_time: Option<PreferredTime>,
    pub reason: Option<LearningReason>,
    pub message: String,
}

/// A booking that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub tutor_id: TutorId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub preferred_time: PreferredTime,
    pub reason: Option<LearningReason>,
    pub message: Option<String>,
}

impl BookingForm {
    pub fn validate(&self, tutor_id: &str) -> Result<BookingRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require(&mut errors, "name", &self.name, "Name is required");
        require_email(&mut errors, &self.email);
        require(&mut errors, "phone", &self.phone, "Phone is required");
        if self.preferred_time.is_none() {
            errors.add("preferred_time", "Preferred time is required");
        }
        let message = self.message.trim();
        if self.reason.is_none() && message.is_empty() {
            errors.add("reason", "Choose a reason or write a message");
        }

        match self.preferred_time {
            Some(preferred_time) if errors.is_empty() => Ok(BookingRequest {
                tutor_id: tutor_id.to_string(),
                name: self.name.trim().to_string(),
                email: self.email.trim().to_string(),
                phone: self.phone.trim().to_string(),
                preferred_time,
                reason: self.reason,
                message: (!message.is_empty()).then(|| message.to_string()),
            }),
            _ => Err(errors),
        }
    }

    pub fn reset(&mut self) {
        *self = BookingForm::default();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub request_id: Uuid,
    pub tutor_id: TutorId,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<AppStore>,
    latency: Duration,
}

impl BookingService {
    pub fn new(store: Arc<AppStore>, latency: Duration) -> Self {
        Self { store, latency }
    }

    /// Validates, simulates sending, and resets the form on success.
    ///
    /// On any error the form is left untouched so the user can correct it.
    pub async fn submit(
        &self,
        tutor: &Tutor,
        form: &mut BookingForm,
    ) -> Result<BookingConfirmation, AppError> {
        let user = self
            .store
            .state()
            .auth
            .session
            .ok_or(AppError::Unauthenticated)?;
        let request = form.validate(&tutor.id)?;

        tokio::time::sleep(self.latency).await;

        let confirmation = BookingConfirmation {
            request_id: Uuid::new_v4(),
            tutor_id: request.tutor_id.clone(),
            submitted_at: Utc::now(),
        };
        info!(
            request_id = %confirmation.request_id,
            user_id = %user.user_id,
            tutor = %tutor.full_name(),
            "Booking request sent: {:?}",
            request
        );
        form.reset();
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> BookingForm {
        BookingForm {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+380 44 000 0000".into(),
            preferred_time: Some(PreferredTime::Evening),
            reason: Some(LearningReason::LivingAbroad),
            message: String::new(),
        }
    }

    #[test]
    fn empty_form_reports_every_field() {
        let errors = BookingForm::default().validate("t1").unwrap_err();
        for field in ["name", "email", "phone", "preferred_time", "reason"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn message_can_stand_in_for_reason() {
        let mut form = filled();
        form.reason = None;
        assert!(form.validate("t1").is_err());
        form.message = "  I am moving to Lyon  ".into();
        let request = form.validate("t1").unwrap();
        assert_eq!(request.message.as_deref(), Some("I am moving to Lyon"));
        assert_eq!(request.reason, None);
    }

    #[test]
    fn rejects_malformed_email() {
        let mut form = filled();
        form.email = "ada-at-example".into();
        let errors = form.validate("t1").unwrap_err();
        assert_eq!(errors.get("email"), Some("Invalid email"));
    }

    #[test]
    fn parses_reasons_and_times() {
        assert_eq!("kids".parse::<LearningReason>(), Ok(LearningReason::LessonsForKids));
        assert_eq!(
            "Culture, travel or hobby".parse::<LearningReason>(),
            Ok(LearningReason::CultureTravelOrHobby)
        );
        assert!("fun".parse::<LearningReason>().is_err());
        assert_eq!("Evening".parse::<PreferredTime>(), Ok(PreferredTime::Evening));
    }

    #[test]
    fn reset_clears_everything() {
        let mut form = filled();
        form.reset();
        assert_eq!(form, BookingForm::default());
    }
}
