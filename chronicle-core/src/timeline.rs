//! Timeline request and result types.

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ChronicleError, ChronicleResult, ValidationError};

/// Name of the inbound field carrying the birth date.
pub const BIRTH_DATE_FIELD: &str = "birthDate";

// ============================================================================
// REQUEST
// ============================================================================

/// Input to the generation pipeline, derived from a calendar birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub birth_year: i32,
    pub birth_month: u32,
    pub birth_day: u32,
    /// Year at invocation time, never user-supplied.
    pub current_year: i32,
}

impl GenerationRequest {
    /// Build a request from an already-parsed birth date.
    ///
    /// Rejects a birth year that lies after `current_year`.
    pub fn from_birth_date(birth_date: NaiveDate, current_year: i32) -> ChronicleResult<Self> {
        let request = Self {
            birth_year: birth_date.year(),
            birth_month: birth_date.month(),
            birth_day: birth_date.day(),
            current_year,
        };
        request.validate()?;
        Ok(request)
    }

    /// Parse the raw `birthDate` input and build a request.
    ///
    /// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, of which only the
    /// date part is used. Blank input counts as missing.
    pub fn from_input(birth_date: Option<&str>, current_year: i32) -> ChronicleResult<Self> {
        let raw = birth_date
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: BIRTH_DATE_FIELD.to_string(),
            })?;

        Self::from_birth_date(parse_birth_date(raw)?, current_year)
    }

    pub fn validate(&self) -> ChronicleResult<()> {
        if NaiveDate::from_ymd_opt(self.birth_year, self.birth_month, self.birth_day).is_none() {
            return Err(ValidationError::InvalidValue {
                field: BIRTH_DATE_FIELD.to_string(),
                reason: format!(
                    "{}-{:02}-{:02} is not a calendar date",
                    self.birth_year, self.birth_month, self.birth_day
                ),
            }
            .into());
        }
        if self.birth_year > self.current_year {
            return Err(ValidationError::BirthYearInFuture {
                birth_year: self.birth_year,
                current_year: self.current_year,
            }
            .into());
        }
        Ok(())
    }

    /// Age of the subject during `year`, clamped at zero.
    pub fn age_in(&self, year: i32) -> i32 {
        (year - self.birth_year).max(0)
    }

    /// Whether `year` falls inside the timeline's span.
    pub fn covers(&self, year: i32) -> bool {
        (self.birth_year..=self.current_year).contains(&year)
    }
}

fn parse_birth_date(raw: &str) -> ChronicleResult<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|e| {
            ChronicleError::from(ValidationError::InvalidValue {
                field: BIRTH_DATE_FIELD.to_string(),
                reason: format!("'{}' is not an ISO-8601 date: {}", raw, e),
            })
        })
}

// ============================================================================
// RESULT
// ============================================================================

/// One historical event on the subject's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub year: i32,
    pub age: i32,
    pub event: String,
    #[serde(default)]
    pub is_highlighted: bool,
}

/// A well-known person sharing the subject's birthday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamousPerson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    pub description: String,
}

/// Successful pipeline output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub timeline: Vec<TimelineEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub famous_people: Option<Vec<FamousPerson>>,
}

impl GenerationResult {
    /// Check the structural invariants of a result against its request.
    pub fn is_consistent_with(&self, request: &GenerationRequest) -> bool {
        !self.timeline.is_empty()
            && self.timeline.windows(2).all(|pair| pair[0].year <= pair[1].year)
            && self.timeline.iter().all(|event| {
                request.covers(event.year)
                    && event.age == request.age_in(event.year)
                    && !event.event.trim().is_empty()
            })
    }
}
