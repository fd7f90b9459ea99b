use serde::{Deserialize, Serialize};

use super::aggregation::{count_aggregation, duration_aggregation, CountExpectation};
use super::collection::{
    Aggregation, AggregationOutput, CollectionActual, CollectionDefaults, CollectionState,
    FilterScores, Record, RecordFilters,
};
use super::conditions::{DateCondition, DurationSpec, MembershipCondition, RankingCondition};
use super::LeafOutput;
use crate::error::EngineError;
use crate::programs::context::{Context, InstitutionRanking};
use crate::programs::domain::{EducationExperience, EducationLevel, StateInput};
use crate::programs::similarity::boolean_similarity;

const DEFAULTS: CollectionDefaults = CollectionDefaults {
    kind: "education_experiences",
    absent: 0.2,
    missing: 0.2,
};

pub type EducationState = CollectionState<EducationFilters, EducationAggregation>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum LevelCondition {
    #[serde(rename = "==")]
    Exactly { expected: EducationLevel },
    #[serde(rename = ">=")]
    AtLeast { expected: EducationLevel },
    #[serde(rename = "in")]
    In { expected: Vec<EducationLevel> },
}

impl LevelCondition {
    pub fn score(&self, actual: EducationLevel) -> f64 {
        boolean_similarity(match self {
            LevelCondition::Exactly { expected } => actual == *expected,
            LevelCondition::AtLeast { expected } => actual >= *expected,
            LevelCondition::In { expected } => expected.contains(&actual),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionRankingSystem {
    Qs,
    Arwu,
    Twur,
    Usnwr,
}

impl InstitutionRankingSystem {
    fn rank(self, institution: &InstitutionRanking) -> Option<u32> {
        match self {
            InstitutionRankingSystem::Qs => institution.qs,
            InstitutionRankingSystem::Arwu => institution.arwu,
            InstitutionRankingSystem::Twur => institution.twur,
            InstitutionRankingSystem::Usnwr => institution.usnwr,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<MembershipCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<MembershipCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<MembershipCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_ranking: Option<RankingCondition<InstitutionRankingSystem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduation_date: Option<DateCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl Record for EducationExperience {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RecordFilters<EducationExperience> for EducationFilters {
    fn is_empty(&self) -> bool {
        self.level.is_none()
            && self.field_of_study.is_none()
            && self.country.is_none()
            && self.language.is_none()
            && self.institution_ranking.is_none()
            && self.graduation_date.is_none()
            && self.completed.is_none()
    }

    fn score(
        &self,
        context: &Context,
        input: &StateInput,
        record: &EducationExperience,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError> {
        if let Some(condition) = &self.level {
            scores.observe("level", condition, Some(record.level), |level| {
                condition.score(*level)
            });
        }
        if let Some(condition) = &self.field_of_study {
            scores.observe(
                "field_of_study",
                condition,
                record.field_of_study.as_ref(),
                |field| condition.score_one(field),
            );
        }
        if let Some(condition) = &self.country {
            scores.observe("country", condition, record.country.as_ref(), |country| {
                condition.score_one(country)
            });
        }
        if let Some(condition) = &self.language {
            scores.observe("language", condition, record.language.as_ref(), |language| {
                condition.score_one(language)
            });
        }
        if let Some(condition) = &self.institution_ranking {
            let rank = record
                .institution_id
                .as_deref()
                .and_then(|id| context.institution(id))
                .and_then(|institution| condition.system.rank(institution));
            scores.observe("institution_ranking", condition, rank, |rank| {
                condition.score(*rank)
            });
        }
        if let Some(condition) = &self.graduation_date {
            condition.observe("graduation_date", context, input, record.end_date, scores)?;
        }
        if let Some(expected) = self.completed {
            let completed = record.end_date.map(|end| end <= context.now());
            scores.observe("completed", &expected, completed, |completed| {
                boolean_similarity(*completed == expected)
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EducationAggregation {
    /// Years of study with overlapping programmes counted once.
    Duration { expected: DurationSpec },
    Count { expected: CountExpectation },
}

impl Aggregation<EducationExperience> for EducationAggregation {
    fn aggregate(
        &self,
        context: &Context,
        records: &[&EducationExperience],
    ) -> Result<AggregationOutput, EngineError> {
        Ok(match self {
            EducationAggregation::Duration { expected } => {
                duration_aggregation(context, self, expected, records, |record| {
                    (record.start_date, record.end_date)
                })
            }
            EducationAggregation::Count { expected } => count_aggregation(self, expected, records),
        })
    }
}

pub(crate) fn evaluate(
    context: &Context,
    state: &EducationState,
    input: &StateInput,
) -> Result<LeafOutput<EducationState, CollectionActual>, EngineError> {
    let (actual, similarity) = state.evaluate(
        context,
        input,
        input.education_experiences.as_deref(),
        DEFAULTS,
    )?;

    Ok(LeafOutput {
        state: state.clone(),
        actual,
        similarity,
    })
}
