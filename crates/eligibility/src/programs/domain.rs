use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::english::EnglishTest;

/// Monetary amount tagged with an ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

/// Education levels in ascending order; the derived ordering backs "level or higher" checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Primary,
    Secondary,
    Vocational,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            EducationLevel::Primary => "primary",
            EducationLevel::Secondary => "secondary",
            EducationLevel::Vocational => "vocational",
            EducationLevel::Associate => "associate",
            EducationLevel::Bachelor => "bachelor",
            EducationLevel::Master => "master",
            EducationLevel::Doctorate => "doctorate",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        match value {
            "primary" => Some(EducationLevel::Primary),
            "secondary" => Some(EducationLevel::Secondary),
            "vocational" => Some(EducationLevel::Vocational),
            "associate" => Some(EducationLevel::Associate),
            "bachelor" => Some(EducationLevel::Bachelor),
            "master" => Some(EducationLevel::Master),
            "doctorate" => Some(EducationLevel::Doctorate),
            _ => None,
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occupation classification systems known to the crosswalk matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupationClassification {
    #[serde(rename = "isco-2008", alias = "ISCO-2008")]
    Isco2008,
    #[serde(rename = "anzsco-2022", alias = "ANZSCO-2022")]
    Anzsco2022,
    #[serde(rename = "soc-2010", alias = "SOC-2010")]
    Soc2010,
    #[serde(rename = "soc-2018", alias = "SOC-2018")]
    Soc2018,
    #[serde(rename = "noc-2021", alias = "NOC-2021")]
    Noc2021,
}

impl OccupationClassification {
    /// Namespace prefix used by crosswalk identifiers (`<namespace>:<code>`).
    pub const fn namespace(self) -> &'static str {
        match self {
            OccupationClassification::Isco2008 => "isco-2008",
            OccupationClassification::Anzsco2022 => "anzsco-2022",
            OccupationClassification::Soc2010 => "soc-2010",
            OccupationClassification::Soc2018 => "soc-2018",
            OccupationClassification::Noc2021 => "noc-2021",
        }
    }
}

/// A code within one occupation classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccupationCode {
    pub kind: OccupationClassification,
    pub code: String,
}

impl OccupationCode {
    pub fn new(kind: OccupationClassification, code: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
        }
    }

    pub fn crosswalk_id(&self) -> String {
        format!("{}:{}", self.kind.namespace(), self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationExperience {
    pub id: String,
    pub level: EducationLevel,
    pub field_of_study: Option<String>,
    pub institution_id: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub id: String,
    pub occupation: Option<OccupationCode>,
    pub country: Option<String>,
    pub employer_id: Option<String>,
    pub hours_per_week: Option<f64>,
    pub self_employed: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub monthly_salary: Option<Money>,
    pub annual_salary: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Spouse,
    Partner,
    Child,
    Parent,
    Sibling,
    Grandparent,
    Grandchild,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: String,
    pub relationship: Relationship,
    pub age: Option<u32>,
    pub citizenships: Option<Vec<String>>,
    pub permanent_residencies: Option<Vec<String>>,
    pub country_of_residence: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingKind {
    Savings,
    Investment,
    Property,
    Salary,
    Scholarship,
    Sponsorship,
    Loan,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funding {
    pub id: String,
    pub kind: FundingKind,
    pub amount: Option<Money>,
    pub start_date: Option<NaiveDate>,
}

/// Facts only meaningful for Australian skilled migration programs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AustraliaFacts {
    pub english_test: Option<EnglishTest>,
    pub specialist_education: Option<bool>,
    pub regional_study: Option<bool>,
    pub professional_year: Option<bool>,
    pub community_language: Option<bool>,
    pub skills_assessment: Option<bool>,
}

/// Facts backing the Israeli Law of Return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsraelFacts {
    pub jewish_parent_or_grandparent: Option<bool>,
    pub converted_to_judaism: Option<bool>,
    pub practices_other_religion: Option<bool>,
}

/// Applicant profile as consumed by the evaluator. Every field is optional; absence is scored,
/// never rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateInput {
    pub age: Option<u32>,
    pub citizenships: Option<Vec<String>>,
    pub country_of_birth: Option<String>,
    pub permanent_residencies: Option<Vec<String>>,
    pub funding: Option<Vec<Funding>>,
    pub points: Option<f64>,
    pub education_experiences: Option<Vec<EducationExperience>>,
    pub work_experiences: Option<Vec<WorkExperience>>,
    pub family_members: Option<Vec<FamilyMember>>,
    pub australia: Option<AustraliaFacts>,
    pub israel: Option<IsraelFacts>,
}

impl StateInput {
    /// Apply the override bag on top of the supplied profile.
    pub fn with_overrides(&self, overrides: &StateInputOverrides) -> Cow<'_, StateInput> {
        match overrides.points {
            None => Cow::Borrowed(self),
            Some(points) => {
                let mut merged = self.clone();
                merged.points = Some(points);
                Cow::Owned(merged)
            }
        }
    }

    /// Whether the profile supplies the fact behind a dependency key.
    pub fn provides(&self, key: &str) -> bool {
        match key {
            "age" => self.age.is_some(),
            "citizenships" | "citizenship" => self.citizenships.is_some(),
            "country_of_birth" => self.country_of_birth.is_some(),
            "permanent_residencies" | "permanent_residency" => {
                self.permanent_residencies.is_some()
            }
            "funding" => self.funding.is_some(),
            "points" => self.points.is_some(),
            "education_experiences" => self.education_experiences.is_some(),
            "work_experiences" => self.work_experiences.is_some(),
            "family_members" => self.family_members.is_some(),
            "australia" => self.australia.is_some(),
            "israel" => self.israel.is_some(),
            _ => false,
        }
    }
}

/// Values written by contributors during one program run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateInputOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_points_only() {
        let input = StateInput {
            age: Some(31),
            points: Some(10.0),
            ..StateInput::default()
        };

        let untouched = input.with_overrides(&StateInputOverrides::default());
        assert!(matches!(untouched, Cow::Borrowed(_)));

        let merged = input.with_overrides(&StateInputOverrides { points: Some(45.0) });
        assert_eq!(merged.points, Some(45.0));
        assert_eq!(merged.age, Some(31));
    }

    #[test]
    fn education_levels_are_ordered() {
        assert!(EducationLevel::Doctorate > EducationLevel::Master);
        assert!(EducationLevel::Bachelor >= EducationLevel::Bachelor);
        assert!(EducationLevel::Vocational < EducationLevel::Bachelor);
        assert_eq!(
            EducationLevel::from_key("master"),
            Some(EducationLevel::Master)
        );
        assert_eq!(EducationLevel::from_key("masters"), None);
    }

    #[test]
    fn occupation_codes_deserialize_uppercase_aliases() {
        let code: OccupationCode =
            serde_json::from_str(r#"{"kind":"ISCO-2008","code":"2511"}"#).expect("valid code");
        assert_eq!(code.kind, OccupationClassification::Isco2008);
        assert_eq!(code.crosswalk_id(), "isco-2008:2511");
    }
}
