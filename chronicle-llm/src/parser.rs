//! Response parsing and validation.
//!
//! Turns the model's completion text into a [`GenerationResult`]. Model
//! output is untrusted: every event is checked against the request and ages
//! are recomputed from the year.

use chronicle_core::{
    ChronicleError, ChronicleResult, FamousPerson, GenerationRequest, GenerationResult, LlmError,
    TimelineEvent,
};
use serde::Deserialize;

use crate::{CompletionProvider, RawEnvelope};

// ============================================================================
// RAW MODEL OUTPUT
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResult {
    timeline: Option<Vec<RawEvent>>,
    #[serde(default)]
    famous_people: Option<Vec<RawFamousPerson>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    year: i64,
    #[serde(default)]
    age: Option<i64>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    is_highlighted: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFamousPerson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

// ============================================================================
// PARSER
// ============================================================================

/// Parses completions for one request.
#[derive(Debug, Clone, Copy)]
pub struct ResponseParser {
    request: GenerationRequest,
    expect_famous_people: bool,
}

impl ResponseParser {
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            request,
            expect_famous_people: false,
        }
    }

    /// Keep `famousPeople` in the result. Without this it is dropped.
    pub fn with_famous_people(mut self, expected: bool) -> Self {
        self.expect_famous_people = expected;
        self
    }

    /// Extract the completion from `envelope` and parse it.
    pub fn parse(
        &self,
        provider: &dyn CompletionProvider,
        envelope: RawEnvelope,
    ) -> ChronicleResult<GenerationResult> {
        let text = provider.extract_completion(envelope)?;
        self.parse_completion(provider.name(), &text)
    }

    /// Parse completion text produced by `provider`.
    pub fn parse_completion(&self, provider: &str, text: &str) -> ChronicleResult<GenerationResult> {
        let raw = decode_result(provider, text)?;

        let raw_timeline = raw
            .timeline
            .ok_or_else(|| malformed(provider, "timeline is missing"))?;
        if raw_timeline.is_empty() {
            return Err(malformed(provider, "timeline is empty"));
        }

        let mut timeline = raw_timeline
            .into_iter()
            .enumerate()
            .map(|(index, raw)| self.validate_event(provider, index, raw))
            .collect::<ChronicleResult<Vec<_>>>()?;
        // stable: same-year events keep the model's order
        timeline.sort_by_key(|event| event.year);

        let famous_people = match (self.expect_famous_people, raw.famous_people) {
            (true, Some(people)) => Some(
                people
                    .into_iter()
                    .enumerate()
                    .map(|(index, raw)| validate_person(provider, index, raw))
                    .collect::<ChronicleResult<Vec<_>>>()?,
            ),
            (true, None) => Some(Vec::new()),
            (false, _) => None,
        };

        Ok(GenerationResult {
            timeline,
            famous_people,
        })
    }

    fn validate_event(
        &self,
        provider: &str,
        index: usize,
        raw: RawEvent,
    ) -> ChronicleResult<TimelineEvent> {
        let year = i32::try_from(raw.year)
            .ok()
            .filter(|year| self.request.covers(*year))
            .ok_or_else(|| {
                malformed(
                    provider,
                    format!(
                        "timeline[{}].year {} is outside {}..={}",
                        index, raw.year, self.request.birth_year, self.request.current_year
                    ),
                )
            })?;

        let event = raw
            .event
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| malformed(provider, format!("timeline[{}].event is empty", index)))?;

        let age = self.request.age_in(year);
        if raw.age != Some(i64::from(age)) {
            tracing::debug!(
                index,
                year,
                reported_age = ?raw.age,
                age,
                "Correcting age reported by model"
            );
        }

        Ok(TimelineEvent {
            year,
            age,
            event,
            is_highlighted: raw.is_highlighted.unwrap_or(false),
        })
    }
}

fn validate_person(provider: &str, index: usize, raw: RawFamousPerson) -> ChronicleResult<FamousPerson> {
    let required = |value: Option<String>, field: &str| {
        value
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| malformed(provider, format!("famousPeople[{}].{} is empty", index, field)))
    };

    Ok(FamousPerson {
        name: required(raw.name, "name")?,
        birth_date: raw
            .birth_date
            .map(|date| date.trim().to_string())
            .filter(|date| !date.is_empty()),
        description: required(raw.description, "description")?,
    })
}

/// Decode the first JSON object in `text` that carries a timeline.
///
/// Each `{` is tried as a start position and whatever follows the object is
/// ignored, so braces in surrounding prose or a code fence do not matter.
/// Without a timeline-bearing object, the first object that decodes at all
/// is returned so the caller can report what is missing.
fn decode_result(provider: &str, text: &str) -> ChronicleResult<RawResult> {
    let mut fallback: Option<RawResult> = None;
    let mut first_error: Option<serde_json::Error> = None;

    for (start, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<RawResult>();
        match stream.next() {
            Some(Ok(raw)) if raw.timeline.is_some() => return Ok(raw),
            Some(Ok(raw)) => {
                fallback.get_or_insert(raw);
            }
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    match (fallback, first_error) {
        (Some(raw), _) => Ok(raw),
        (None, Some(e)) => Err(malformed(
            provider,
            format!("completion is not valid timeline JSON: {}", e),
        )),
        (None, None) => Err(malformed(provider, "completion contains no JSON object")),
    }
}

fn malformed(provider: &str, reason: impl Into<String>) -> ChronicleError {
    LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
    .into()
}
