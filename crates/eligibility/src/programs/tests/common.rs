use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::programs::context::{Context, ContextInput};
use crate::programs::currency::ExchangeRate;
use crate::programs::domain::{
    EducationExperience, EducationLevel, Money, OccupationClassification, OccupationCode,
    StateInput, WorkExperience,
};
use crate::programs::occupation::{CrosswalkPair, OccupationClassificationCode, OccupationLevel};
use crate::programs::state::State;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn context_input() -> ContextInput {
    ContextInput {
        exchange_rates: vec![ExchangeRate {
            currency_code: "EUR".to_string(),
            rate_to_usd: 0.85,
            created_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        }],
        occupation_codes: vec![OccupationClassificationCode {
            kind: OccupationClassification::Anzsco2022,
            code: "261311".to_string(),
            level: OccupationLevel::Unit,
            title: "Analyst Programmer".to_string(),
        }],
        occupation_crosswalks: vec![CrosswalkPair {
            source_id: "isco-2008:2511".to_string(),
            target_id: "anzsco-2022:261311".to_string(),
        }],
        now: Some(date(2024, 6, 1)),
        ..ContextInput::default()
    }
}

pub(super) fn context() -> Context {
    Context::new(&context_input())
}

pub(super) fn state(value: Value) -> State {
    serde_json::from_value(value).expect("state deserializes")
}

/// A points leaf whose similarity against `points` is `points / expected`.
pub(super) fn points_at_least(expected: f64) -> State {
    state(serde_json::json!({"kind": "points", "op": ">=", "expected": expected}))
}

pub(super) fn age_at_least(expected: f64) -> State {
    state(serde_json::json!({"kind": "age", "op": ">=", "expected": expected}))
}

pub(super) fn software_engineer(
    id: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> WorkExperience {
    WorkExperience {
        id: id.to_string(),
        occupation: Some(OccupationCode::new(OccupationClassification::Isco2008, "2511")),
        country: Some("IN".to_string()),
        employer_id: None,
        hours_per_week: Some(40.0),
        self_employed: Some(false),
        start_date: Some(start),
        end_date: end,
        monthly_salary: Some(Money::new(4_000.0, "USD")),
        annual_salary: None,
    }
}

pub(super) fn bachelor(end: NaiveDate) -> EducationExperience {
    EducationExperience {
        id: "edu-bachelor".to_string(),
        level: EducationLevel::Bachelor,
        field_of_study: Some("Computer Science".to_string()),
        institution_id: None,
        country: Some("IN".to_string()),
        language: Some("en".to_string()),
        start_date: Some(date(2014, 7, 1)),
        end_date: Some(end),
    }
}

pub(super) fn profile() -> StateInput {
    StateInput {
        age: Some(45),
        citizenships: Some(vec!["IN".to_string()]),
        education_experiences: Some(vec![bachelor(date(2018, 6, 30))]),
        work_experiences: Some(vec![
            software_engineer("w1", date(2019, 1, 1), Some(date(2021, 1, 1))),
            software_engineer("w2", date(2020, 1, 1), Some(date(2022, 1, 1))),
        ]),
        ..StateInput::default()
    }
}
