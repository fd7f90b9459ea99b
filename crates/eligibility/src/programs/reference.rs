//! Named, parameterized references resolved against the applicant's own records.
//!
//! References are authored as `<namespace>.<selector>[.<calculation>]`, for example
//! `graduation_date.bachelor_or_higher.add_months:6`, and parsed once when the program loads.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{EducationLevel, StateInput};
use crate::error::EngineError;

const GRADUATION_DATE: &str = "graduation_date";
const OR_HIGHER_SUFFIX: &str = "_or_higher";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSelector {
    Exactly(EducationLevel),
    OrHigher(EducationLevel),
}

impl LevelSelector {
    pub fn accepts(self, level: EducationLevel) -> bool {
        match self {
            LevelSelector::Exactly(expected) => level == expected,
            LevelSelector::OrHigher(minimum) => level >= minimum,
        }
    }
}

/// What a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Most recent end date among education records accepted by the selector.
    GraduationDate(LevelSelector),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetUnit {
    Years,
    Months,
    Days,
}

impl OffsetUnit {
    fn as_str(self) -> &'static str {
        match self {
            OffsetUnit::Years => "years",
            OffsetUnit::Months => "months",
            OffsetUnit::Days => "days",
        }
    }
}

/// Date arithmetic applied to a resolved date.
///
/// Malformed calculations are kept verbatim and behave as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateCalculation {
    Offset { unit: OffsetUnit, amount: i64 },
    Ignored(String),
}

impl DateCalculation {
    fn parse(raw: &str) -> Self {
        let Some((operation, operand)) = raw.split_once(':') else {
            return DateCalculation::Ignored(raw.to_string());
        };
        let Ok(operand) = operand.trim().parse::<i64>() else {
            return DateCalculation::Ignored(raw.to_string());
        };
        let (sign, unit) = match operation {
            "add_years" => (1, OffsetUnit::Years),
            "add_months" => (1, OffsetUnit::Months),
            "add_days" => (1, OffsetUnit::Days),
            "subtract_years" => (-1, OffsetUnit::Years),
            "subtract_months" => (-1, OffsetUnit::Months),
            "subtract_days" => (-1, OffsetUnit::Days),
            _ => return DateCalculation::Ignored(raw.to_string()),
        };

        DateCalculation::Offset {
            unit,
            amount: sign * operand,
        }
    }

    /// Shift `date`; overflow leaves it untouched.
    pub fn apply(&self, date: NaiveDate) -> NaiveDate {
        let DateCalculation::Offset { unit, amount } = self else {
            return date;
        };
        let magnitude = amount.unsigned_abs();
        let shifted = match unit {
            OffsetUnit::Years | OffsetUnit::Months => {
                let months = if *unit == OffsetUnit::Years {
                    magnitude.checked_mul(12)
                } else {
                    Some(magnitude)
                };
                months
                    .and_then(|months| u32::try_from(months).ok())
                    .and_then(|months| {
                        if *amount >= 0 {
                            date.checked_add_months(Months::new(months))
                        } else {
                            date.checked_sub_months(Months::new(months))
                        }
                    })
            }
            OffsetUnit::Days => {
                if *amount >= 0 {
                    date.checked_add_days(Days::new(magnitude))
                } else {
                    date.checked_sub_days(Days::new(magnitude))
                }
            }
        };

        shifted.unwrap_or(date)
    }
}

impl fmt::Display for DateCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateCalculation::Offset { unit, amount } => {
                let verb = if *amount < 0 { "subtract" } else { "add" };
                write!(f, "{verb}_{}:{}", unit.as_str(), amount.unsigned_abs())
            }
            DateCalculation::Ignored(raw) => f.write_str(raw),
        }
    }
}

/// Parsed reference; serializes back to its authored string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub target: ReferenceTarget,
    pub calculation: Option<DateCalculation>,
}

impl FromStr for Reference {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unresolvable = || EngineError::UnresolvableReference(raw.to_string());
        let mut parts = raw.splitn(3, '.');
        let namespace = parts.next().unwrap_or_default();
        let selector = parts.next().ok_or_else(unresolvable)?;
        let calculation = parts.next().map(DateCalculation::parse);

        let target = match namespace {
            GRADUATION_DATE => {
                let selector = match selector.strip_suffix(OR_HIGHER_SUFFIX) {
                    Some(level) => EducationLevel::from_key(level).map(LevelSelector::OrHigher),
                    None => EducationLevel::from_key(selector).map(LevelSelector::Exactly),
                };
                ReferenceTarget::GraduationDate(selector.ok_or_else(unresolvable)?)
            }
            _ => return Err(unresolvable()),
        };

        Ok(Self {
            target,
            calculation,
        })
    }
}

impl TryFrom<String> for Reference {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            ReferenceTarget::GraduationDate(LevelSelector::Exactly(level)) => {
                write!(f, "{GRADUATION_DATE}.{level}")?
            }
            ReferenceTarget::GraduationDate(LevelSelector::OrHigher(level)) => {
                write!(f, "{GRADUATION_DATE}.{level}{OR_HIGHER_SUFFIX}")?
            }
        }
        if let Some(calculation) = &self.calculation {
            write!(f, ".{calculation}")?;
        }
        Ok(())
    }
}

/// Value a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Date(NaiveDate),
}

/// Resolves references against auxiliary profile data.
pub trait ReferenceResolver: Send + Sync {
    /// `Ok(None)` when the profile holds nothing the reference can point at.
    fn resolve(
        &self,
        reference: &Reference,
        input: &StateInput,
    ) -> Result<Option<ResolvedValue>, EngineError>;
}

/// Default resolver over the applicant's own education history.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileReferenceResolver;

impl ReferenceResolver for ProfileReferenceResolver {
    fn resolve(
        &self,
        reference: &Reference,
        input: &StateInput,
    ) -> Result<Option<ResolvedValue>, EngineError> {
        let date = match reference.target {
            ReferenceTarget::GraduationDate(selector) => input
                .education_experiences
                .iter()
                .flatten()
                .filter(|experience| selector.accepts(experience.level))
                .filter_map(|experience| experience.end_date)
                .max(),
        };

        Ok(date.map(|date| {
            let date = match &reference.calculation {
                Some(calculation) => calculation.apply(date),
                None => date,
            };
            ResolvedValue::Date(date)
        }))
    }
}
