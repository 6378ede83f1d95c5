//! Prompt construction for timeline generation.
//!
//! Pure and deterministic: the same request and options always produce the
//! same prompt text.

use serde::{Deserialize, Serialize};

use crate::timeline::GenerationRequest;

/// Event categories the model should draw from without favouring any one.
pub const EVENT_CATEGORIES: &[&str] = &[
    "Politics and international affairs (wars, treaties, independence movements)",
    "Society and culture (legislation, social movements, cultural shifts)",
    "Science and technology (inventions, discoveries, technical breakthroughs)",
    "Economy (financial crises, market swings, currency changes)",
    "Disasters and accidents (earthquakes, tsunamis, major accidents)",
    "Sports and entertainment (Olympics, World Expos and similar, without overrepresenting them)",
];

const SYSTEM_INSTRUCTION: &str = "You are an assistant that produces accurate historical timelines.

Hard rules:
1. Every date you state must be historically accurate.
2. Include only events that really happened and can be verified. Never invent or speculate.
3. Leave out anything you are not certain about.
4. Label future or scheduled events explicitly as scheduled.
5. Do not include an entry for the subject's own birth.

Respond with valid JSON only, matching the schema given in the request. Do not wrap it in prose or code fences.";

/// System and user instructions sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Builds prompts for one pipeline configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptBuilder {
    include_famous_people: bool,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also ask for well-known people sharing the subject's birthday.
    pub fn with_famous_people(mut self, enabled: bool) -> Self {
        self.include_famous_people = enabled;
        self
    }

    pub fn includes_famous_people(&self) -> bool {
        self.include_famous_people
    }

    pub fn build(&self, request: &GenerationRequest) -> Prompt {
        Prompt {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: self.user_instruction(request),
        }
    }

    fn user_instruction(&self, request: &GenerationRequest) -> String {
        let GenerationRequest {
            birth_year,
            birth_month,
            birth_day,
            current_year,
        } = *request;

        let categories = EVENT_CATEGORIES
            .iter()
            .map(|category| format!("- {}", category))
            .collect::<Vec<_>>()
            .join("\n");

        let famous_people_request = if self.include_famous_people {
            format!(
                "\nAlso list 3-5 well-known people who share the birthday {:02}-{:02} \
                 (month-day), with a one-sentence description of each.\n",
                birth_month, birth_day
            )
        } else {
            String::new()
        };

        format!(
            "Date of birth: {birth_year:04}-{birth_month:02}-{birth_day:02}

Request:
Provide a diverse, chronologically ordered list of historical events from {birth_year} up to the present year ({current_year}).

Event categories to draw from:
{categories}

Guidelines:
- Only events that actually happened
- Years must be exact
- Balance the categories; do not lean on any single field
- For each event, give the subject's age in that year (year minus {birth_year})
- Choose roughly 10-15 significant events
{famous_people_request}
Before answering, check:
- Is the year of every event correct?
- Have you left out everything uncertain?
- Is every age calculated correctly?

Reply with JSON in exactly this shape:
{schema}",
            schema = self.output_schema(),
        )
    }

    fn output_schema(&self) -> String {
        let famous_people = if self.include_famous_people {
            ",
  \"famousPeople\": [
    {
      \"name\": \"full name (string)\",
      \"birthDate\": \"date of birth (string)\",
      \"description\": \"one-sentence description (string)\"
    }
  ]"
        } else {
            ""
        };

        format!(
            "{{
  \"timeline\": [
    {{
      \"year\": <year (integer)>,
      \"age\": <age in that year (integer)>,
      \"event\": \"accurate description of the historical event (string)\",
      \"isHighlighted\": false
    }}
  ]{}
}}",
            famous_people
        )
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Building the same prompt twice yields identical text.
        #[test]
        fn prop_build_is_deterministic(
            birth_year in 1900i32..2024,
            birth_month in 1u32..=12,
            birth_day in 1u32..=28,
            famous in any::<bool>(),
        ) {
            let request = GenerationRequest {
                birth_year,
                birth_month,
                birth_day,
                current_year: 2024,
            };
            let builder = PromptBuilder::new().with_famous_people(famous);
            prop_assert_eq!(builder.build(&request), builder.build(&request));
        }

        /// The user instruction always names both ends of the year range.
        #[test]
        fn prop_user_instruction_names_range(
            birth_year in 1900i32..2024,
            current_year in 2024i32..2100,
        ) {
            let request = GenerationRequest {
                birth_year,
                birth_month: 6,
                birth_day: 1,
                current_year,
            };
            let prompt = PromptBuilder::new().build(&request);
            let birth_year_text = birth_year.to_string();
            let current_year_text = current_year.to_string();
            prop_assert!(prompt.user.contains(&birth_year_text));
            prop_assert!(prompt.user.contains(&current_year_text));
        }
    }
}
