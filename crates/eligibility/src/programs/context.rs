use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::currency::{ExchangeRate, RateTable};
use super::domain::{OccupationCode, StateInput};
use super::occupation::{
    CrosswalkPair, OccupationClassificationCode, OccupationFilter, OccupationMatch,
    OccupationTables,
};
use super::reference::{ProfileReferenceResolver, Reference, ReferenceResolver, ResolvedValue};
use crate::error::EngineError;

/// University league table row; lower rank is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionRanking {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    pub qs: Option<u32>,
    pub arwu: Option<u32>,
    pub twur: Option<u32>,
    pub usnwr: Option<u32>,
}

/// Notable employer row; lower rank is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployerRanking {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    pub fortune: Option<u32>,
    pub forbes: Option<u32>,
}

/// Reference data bundle as delivered by the data layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextInput {
    #[serde(default)]
    pub exchange_rates: Vec<ExchangeRate>,
    #[serde(default)]
    pub institution_rankings: Vec<InstitutionRanking>,
    #[serde(default)]
    pub employer_rankings: Vec<EmployerRanking>,
    #[serde(default)]
    pub occupation_codes: Vec<OccupationClassificationCode>,
    #[serde(default)]
    pub occupation_crosswalks: Vec<CrosswalkPair>,
    /// Evaluation date; today (UTC) when absent.
    #[serde(default)]
    pub now: Option<NaiveDate>,
}

/// Read-only evaluation context. Safe to share across concurrent runs.
#[derive(Clone)]
pub struct Context {
    rates: RateTable,
    institutions: HashMap<String, InstitutionRanking>,
    employers: HashMap<String, EmployerRanking>,
    occupations: OccupationTables,
    resolver: Arc<dyn ReferenceResolver>,
    now: NaiveDate,
}

impl Context {
    pub fn new(input: &ContextInput) -> Self {
        Self {
            rates: RateTable::from_rates(&input.exchange_rates),
            institutions: input
                .institution_rankings
                .iter()
                .map(|row| (row.id.clone(), row.clone()))
                .collect(),
            employers: input
                .employer_rankings
                .iter()
                .map(|row| (row.id.clone(), row.clone()))
                .collect(),
            occupations: OccupationTables::new(
                &input.occupation_codes,
                &input.occupation_crosswalks,
            ),
            resolver: Arc::new(ProfileReferenceResolver),
            now: input.now.unwrap_or_else(|| Utc::now().date_naive()),
        }
    }

    /// Swap the reference resolver, e.g. to serve additional namespaces.
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn now(&self) -> NaiveDate {
        self.now
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn institution(&self, id: &str) -> Option<&InstitutionRanking> {
        self.institutions.get(id)
    }

    pub fn employer(&self, id: &str) -> Option<&EmployerRanking> {
        self.employers.get(id)
    }

    pub fn match_occupation(
        &self,
        actual: &OccupationCode,
        filter: &OccupationFilter,
    ) -> OccupationMatch {
        self.occupations.match_occupation(actual, filter)
    }

    pub fn resolve_date(
        &self,
        reference: &Reference,
        input: &StateInput,
    ) -> Result<Option<NaiveDate>, EngineError> {
        Ok(self
            .resolver
            .resolve(reference, input)?
            .map(|ResolvedValue::Date(date)| date))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("now", &self.now)
            .field("institutions", &self.institutions.len())
            .field("employers", &self.employers.len())
            .finish_non_exhaustive()
    }
}
