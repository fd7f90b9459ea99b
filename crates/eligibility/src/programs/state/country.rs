//! Country-specific leaves scored over a single facts record.

use std::slice;

use serde::{Deserialize, Serialize};

use super::collection::{apply_filters, FilterScores, Record, RecordFilters, RecordOutput};
use super::LeafOutput;
use crate::error::EngineError;
use crate::programs::context::Context;
use crate::programs::domain::{AustraliaFacts, IsraelFacts, StateInput};
use crate::programs::english::EnglishLevel;
use crate::programs::similarity::boolean_similarity;

const AUSTRALIA_KIND: &str = "australia";
const AUSTRALIA_ABSENT_SIMILARITY: f64 = 0.2;
const AUSTRALIA_MISSING_SIMILARITY: f64 = 0.2;

const ISRAEL_KIND: &str = "israel";
const ISRAEL_ABSENT_SIMILARITY: f64 = 0.1;
const ISRAEL_MISSING_SIMILARITY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum AustraliaState {
    #[serde(rename = "matches")]
    Matches { expected: AustraliaFilters },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AustraliaFilters {
    /// Minimum English level demonstrated by the applicant's test result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_level: Option<EnglishLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialist_education: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regional_study: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_year: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_language: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_assessment: Option<bool>,
}

impl Record for AustraliaFacts {
    fn id(&self) -> &str {
        AUSTRALIA_KIND
    }
}

impl RecordFilters<AustraliaFacts> for AustraliaFilters {
    fn is_empty(&self) -> bool {
        self.english_level.is_none()
            && self.specialist_education.is_none()
            && self.regional_study.is_none()
            && self.professional_year.is_none()
            && self.community_language.is_none()
            && self.skills_assessment.is_none()
    }

    fn score(
        &self,
        _context: &Context,
        _input: &StateInput,
        facts: &AustraliaFacts,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError> {
        if let Some(expected) = self.english_level {
            // A test that reaches no band is observed as `null` and fails.
            let level = facts.english_test.as_ref().map(|test| test.level());
            scores.observe("english_level", &expected, level, |level| {
                boolean_similarity(level.is_some_and(|level| level >= expected))
            });
        }

        let flags = [
            ("specialist_education", self.specialist_education, facts.specialist_education),
            ("regional_study", self.regional_study, facts.regional_study),
            ("professional_year", self.professional_year, facts.professional_year),
            ("community_language", self.community_language, facts.community_language),
            ("skills_assessment", self.skills_assessment, facts.skills_assessment),
        ];
        for (name, expected, actual) in flags {
            if let Some(expected) = expected {
                scores.observe(name, &expected, actual, |actual| {
                    boolean_similarity(*actual == expected)
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum IsraelState {
    #[serde(rename = "matches")]
    Matches { expected: IsraelFilters },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsraelFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_of_return: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jewish_ancestry: Option<bool>,
}

impl IsraelFacts {
    /// Eligibility under the Law of Return, or `None` when the facts cannot decide it.
    ///
    /// Practising another religion disqualifies regardless of ancestry or conversion.
    pub fn law_of_return(&self) -> Option<bool> {
        if self.practices_other_religion == Some(true) {
            return Some(false);
        }
        match (self.jewish_parent_or_grandparent, self.converted_to_judaism) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        }
    }
}

impl Record for IsraelFacts {
    fn id(&self) -> &str {
        ISRAEL_KIND
    }
}

impl RecordFilters<IsraelFacts> for IsraelFilters {
    fn is_empty(&self) -> bool {
        self.law_of_return.is_none() && self.jewish_ancestry.is_none()
    }

    fn score(
        &self,
        _context: &Context,
        _input: &StateInput,
        facts: &IsraelFacts,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError> {
        if let Some(expected) = self.law_of_return {
            scores.observe("law_of_return", &expected, facts.law_of_return(), |actual| {
                boolean_similarity(*actual == expected)
            });
        }
        if let Some(expected) = self.jewish_ancestry {
            scores.observe(
                "jewish_ancestry",
                &expected,
                facts.jewish_parent_or_grandparent,
                |actual| boolean_similarity(*actual == expected),
            );
        }
        Ok(())
    }
}

pub(crate) fn evaluate_australia(
    context: &Context,
    state: &AustraliaState,
    input: &StateInput,
) -> Result<LeafOutput<AustraliaState, RecordOutput>, EngineError> {
    let AustraliaState::Matches { expected } = state;
    let actual = score_facts(
        AUSTRALIA_KIND,
        context,
        input,
        expected,
        input.australia.as_ref(),
        AUSTRALIA_MISSING_SIMILARITY,
    )?;
    Ok(leaf(state, actual, AUSTRALIA_ABSENT_SIMILARITY))
}

pub(crate) fn evaluate_israel(
    context: &Context,
    state: &IsraelState,
    input: &StateInput,
) -> Result<LeafOutput<IsraelState, RecordOutput>, EngineError> {
    let IsraelState::Matches { expected } = state;
    let actual = score_facts(
        ISRAEL_KIND,
        context,
        input,
        expected,
        input.israel.as_ref(),
        ISRAEL_MISSING_SIMILARITY,
    )?;
    Ok(leaf(state, actual, ISRAEL_ABSENT_SIMILARITY))
}

/// Run the filters over the one facts record; empty filter sets fail even without facts.
fn score_facts<R, F>(
    kind: &'static str,
    context: &Context,
    input: &StateInput,
    filters: &F,
    facts: Option<&R>,
    missing: f64,
) -> Result<Option<RecordOutput>, EngineError>
where
    R: Record,
    F: RecordFilters<R>,
{
    if filters.is_empty() {
        return Err(EngineError::EmptyFilterSet { kind });
    }
    let Some(facts) = facts else {
        return Ok(None);
    };

    let outputs = apply_filters(kind, context, input, filters, slice::from_ref(facts), missing)?;
    Ok(outputs.into_iter().next())
}

fn leaf<S: Clone>(
    state: &S,
    actual: Option<RecordOutput>,
    absent: f64,
) -> LeafOutput<S, RecordOutput> {
    let similarity = actual.as_ref().map_or(absent, |record| record.similarity);
    LeafOutput {
        state: state.clone(),
        actual,
        similarity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::context::ContextInput;
    use crate::programs::english::{EnglishTest, SectionScores};

    fn ielts(band: f64) -> EnglishTest {
        EnglishTest::Ielts {
            sections: SectionScores {
                listening: band,
                reading: band,
                writing: band,
                speaking: band,
            },
            overall: Some(band),
        }
    }

    fn australia(expected: AustraliaFilters) -> AustraliaState {
        AustraliaState::Matches { expected }
    }

    #[test]
    fn proficient_english_satisfies_competent_requirement() {
        let context = Context::new(&ContextInput::default());
        let state = australia(AustraliaFilters {
            english_level: Some(EnglishLevel::Competent),
            ..AustraliaFilters::default()
        });
        let input = StateInput {
            australia: Some(AustraliaFacts {
                english_test: Some(ielts(7.0)),
                ..AustraliaFacts::default()
            }),
            ..StateInput::default()
        };

        let output = evaluate_australia(&context, &state, &input).expect("evaluates");
        assert_eq!(output.similarity, 1.0);
    }

    #[test]
    fn missing_flags_score_the_missing_default() {
        let context = Context::new(&ContextInput::default());
        let state = australia(AustraliaFilters {
            professional_year: Some(true),
            skills_assessment: Some(true),
            ..AustraliaFilters::default()
        });
        let input = StateInput {
            australia: Some(AustraliaFacts {
                skills_assessment: Some(true),
                ..AustraliaFacts::default()
            }),
            ..StateInput::default()
        };

        let output = evaluate_australia(&context, &state, &input).expect("evaluates");
        assert_eq!(output.similarity, 0.6);
    }

    #[test]
    fn empty_filters_fail_before_absent_facts() {
        let context = Context::new(&ContextInput::default());
        let err = evaluate_australia(
            &context,
            &australia(AustraliaFilters::default()),
            &StateInput::default(),
        )
        .unwrap_err();
        assert_eq!(err, EngineError::EmptyFilterSet { kind: "australia" });
    }

    #[test]
    fn absent_israel_facts_are_unverified() {
        let context = Context::new(&ContextInput::default());
        let state = IsraelState::Matches {
            expected: IsraelFilters {
                law_of_return: Some(true),
                jewish_ancestry: None,
            },
        };
        let output = evaluate_israel(&context, &state, &StateInput::default()).expect("evaluates");
        assert_eq!(output.actual, None);
        assert_eq!(output.similarity, ISRAEL_ABSENT_SIMILARITY);
    }

    #[test]
    fn law_of_return_derivation() {
        let facts = |ancestry, conversion, other| IsraelFacts {
            jewish_parent_or_grandparent: ancestry,
            converted_to_judaism: conversion,
            practices_other_religion: other,
        };
        assert_eq!(facts(Some(true), None, None).law_of_return(), Some(true));
        assert_eq!(facts(None, Some(true), Some(false)).law_of_return(), Some(true));
        assert_eq!(facts(Some(true), None, Some(true)).law_of_return(), Some(false));
        assert_eq!(facts(Some(false), Some(false), None).law_of_return(), Some(false));
        assert_eq!(facts(Some(false), None, None).law_of_return(), None);
    }
}
