use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::{OccupationClassification, OccupationCode};

/// Hierarchy level a filter code is expressed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupationLevel {
    Category,
    Major,
    SubMajor,
    Minor,
    Broad,
    Unit,
}

/// Row of a classification code table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupationClassificationCode {
    pub kind: OccupationClassification,
    pub code: String,
    pub level: OccupationLevel,
    pub title: String,
}

/// Equivalence between two codes (`<namespace>:<code>`); bidirectional links need both rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosswalkPair {
    pub source_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupationFilterCode {
    pub level: OccupationLevel,
    pub code: String,
}

/// Acceptable codes within a target classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupationFilter {
    pub kind: OccupationClassification,
    pub codes: Vec<OccupationFilterCode>,
}

/// Outcome of matching one occupation against a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupationMatch {
    pub code: OccupationCode,
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl OccupationMatch {
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

/// Read-only classification tables indexed for lookup.
#[derive(Debug, Clone, Default)]
pub struct OccupationTables {
    titles: HashMap<(OccupationClassification, String), String>,
    crosswalk: HashMap<String, Vec<String>>,
}

impl OccupationTables {
    pub fn new(codes: &[OccupationClassificationCode], pairs: &[CrosswalkPair]) -> Self {
        let titles = codes
            .iter()
            .map(|row| ((row.kind, row.code.clone()), row.title.clone()))
            .collect();

        let mut crosswalk: HashMap<String, Vec<String>> = HashMap::new();
        for pair in pairs {
            crosswalk
                .entry(pair.source_id.clone())
                .or_default()
                .push(pair.target_id.clone());
        }

        Self { titles, crosswalk }
    }

    /// Codes in the filter's classification that `actual` maps to.
    fn candidates(&self, actual: &OccupationCode, target: OccupationClassification) -> Vec<String> {
        let mut candidates = Vec::new();
        if actual.kind == target {
            candidates.push(actual.code.clone());
        }

        let prefix = format!("{}:", target.namespace());
        if let Some(targets) = self.crosswalk.get(&actual.crosswalk_id()) {
            for target_id in targets {
                if let Some(code) = target_id.strip_prefix(&prefix) {
                    if !candidates.iter().any(|existing| existing == code) {
                        candidates.push(code.to_string());
                    }
                }
            }
        }

        candidates
    }

    pub fn match_occupation(
        &self,
        actual: &OccupationCode,
        filter: &OccupationFilter,
    ) -> OccupationMatch {
        let candidates = self.candidates(actual, filter.kind);
        let matched = candidates
            .iter()
            .find(|candidate| {
                filter
                    .codes
                    .iter()
                    .any(|wanted| code_matches(filter.kind, wanted, candidate))
            })
            .cloned();
        let title = matched
            .as_ref()
            .and_then(|code| self.titles.get(&(filter.kind, code.clone())).cloned());

        OccupationMatch {
            code: actual.clone(),
            candidates,
            matched,
            title,
        }
    }
}

fn code_matches(
    kind: OccupationClassification,
    wanted: &OccupationFilterCode,
    candidate: &str,
) -> bool {
    if wanted.level == OccupationLevel::Unit {
        return candidate == wanted.code;
    }

    match kind {
        OccupationClassification::Isco2008 => {
            // Major group 0 (armed forces) is matched against three character codes.
            (wanted.level == OccupationLevel::Major && wanted.code == "0" && candidate.len() == 3)
                || candidate.starts_with(&wanted.code)
        }
        OccupationClassification::Soc2010 | OccupationClassification::Soc2018 => {
            // Segments are counted in digits; "15-1252" compares as "151252".
            let candidate = soc_digits(candidate);
            let wanted_code = soc_digits(&wanted.code);
            let width = match wanted.level {
                OccupationLevel::Major => 2,
                OccupationLevel::Minor => 4,
                OccupationLevel::Broad => 5,
                _ => wanted_code.len(),
            };
            match (candidate.get(..width), wanted_code.get(..width)) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            }
        }
        _ => candidate.starts_with(&wanted.code),
    }
}

fn soc_digits(code: &str) -> String {
    code.chars().filter(|c| *c != '-').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> OccupationTables {
        OccupationTables::new(
            &[OccupationClassificationCode {
                kind: OccupationClassification::Anzsco2022,
                code: "261311".to_string(),
                level: OccupationLevel::Unit,
                title: "Analyst Programmer".to_string(),
            }],
            &[
                CrosswalkPair {
                    source_id: "isco-2008:2511".to_string(),
                    target_id: "anzsco-2022:261311".to_string(),
                },
                CrosswalkPair {
                    source_id: "isco-2008:2512".to_string(),
                    target_id: "soc-2018:15-1252".to_string(),
                },
            ],
        )
    }

    fn filter(
        kind: OccupationClassification,
        level: OccupationLevel,
        code: &str,
    ) -> OccupationFilter {
        OccupationFilter {
            kind,
            codes: vec![OccupationFilterCode {
                level,
                code: code.to_string(),
            }],
        }
    }

    #[test]
    fn crosswalk_unit_match() {
        let actual = OccupationCode::new(OccupationClassification::Isco2008, "2511");
        let outcome = tables().match_occupation(
            &actual,
            &filter(OccupationClassification::Anzsco2022, OccupationLevel::Unit, "261311"),
        );
        assert!(outcome.is_match());
        assert_eq!(outcome.title.as_deref(), Some("Analyst Programmer"));

        let miss = tables().match_occupation(
            &actual,
            &filter(OccupationClassification::Anzsco2022, OccupationLevel::Unit, "261312"),
        );
        assert!(!miss.is_match());
        assert_eq!(miss.candidates, vec!["261311".to_string()]);
    }

    #[test]
    fn soc_levels_compare_fixed_width_segments() {
        let actual = OccupationCode::new(OccupationClassification::Isco2008, "2512");
        let tables = tables();
        let soc = OccupationClassification::Soc2018;

        assert!(tables
            .match_occupation(&actual, &filter(soc, OccupationLevel::Major, "15-0000"))
            .is_match());
        assert!(tables
            .match_occupation(&actual, &filter(soc, OccupationLevel::Minor, "15-1200"))
            .is_match());
        assert!(tables
            .match_occupation(&actual, &filter(soc, OccupationLevel::Broad, "15-1250"))
            .is_match());
        assert!(!tables
            .match_occupation(&actual, &filter(soc, OccupationLevel::Broad, "15-1240"))
            .is_match());
        assert!(!tables
            .match_occupation(&actual, &filter(soc, OccupationLevel::Minor, "15-1100"))
            .is_match());
        assert!(!tables
            .match_occupation(&actual, &filter(soc, OccupationLevel::Major, "13-0000"))
            .is_match());
    }

    #[test]
    fn soc_codes_in_target_classification_compare_by_digits() {
        let tables = OccupationTables::default();
        let soc = OccupationClassification::Soc2018;
        let developer = OccupationCode::new(soc, "15-1252");

        assert!(tables
            .match_occupation(&developer, &filter(soc, OccupationLevel::Broad, "15-1250"))
            .is_match());
        assert!(!tables
            .match_occupation(&developer, &filter(soc, OccupationLevel::Broad, "15-1240"))
            .is_match());
        assert!(tables
            .match_occupation(&developer, &filter(soc, OccupationLevel::Unit, "15-1252"))
            .is_match());
    }

    #[test]
    fn isco_prefix_and_armed_forces_rules() {
        let tables = OccupationTables::default();
        let isco = OccupationClassification::Isco2008;

        let developer = OccupationCode::new(isco, "2512");
        assert!(tables
            .match_occupation(&developer, &filter(isco, OccupationLevel::SubMajor, "25"))
            .is_match());
        assert!(!tables
            .match_occupation(&developer, &filter(isco, OccupationLevel::SubMajor, "24"))
            .is_match());

        let officer = OccupationCode::new(isco, "011");
        assert!(tables
            .match_occupation(&officer, &filter(isco, OccupationLevel::Major, "0"))
            .is_match());
        let unrelated = OccupationCode::new(isco, "311");
        assert!(tables
            .match_occupation(&unrelated, &filter(isco, OccupationLevel::Major, "0"))
            .is_match());
    }

    #[test]
    fn other_classifications_fall_back_to_prefix() {
        let tables = OccupationTables::default();
        let noc = OccupationClassification::Noc2021;
        let actual = OccupationCode::new(noc, "21231");
        assert!(tables
            .match_occupation(&actual, &filter(noc, OccupationLevel::Minor, "212"))
            .is_match());
        assert!(!tables
            .match_occupation(&actual, &filter(noc, OccupationLevel::Unit, "2123"))
            .is_match());
    }
}
