//! English proficiency bands used by Australian skilled migration.
//!
//! Functional level is derived differently per certificate: IELTS and PTE require the
//! pre-computed `overall`, while TOEFL and OET accept any non-zero `total` or fall back to the
//! raw section sum. The per-type rules are kept as they are.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnglishLevel {
    Functional,
    Vocational,
    Competent,
    Proficient,
    Superior,
}

/// Per-section scores in listening, reading, writing, speaking order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionScores {
    pub listening: f64,
    pub reading: f64,
    pub writing: f64,
    pub speaking: f64,
}

impl SectionScores {
    fn each_at_least(&self, minimum: [f64; 4]) -> bool {
        self.listening >= minimum[0]
            && self.reading >= minimum[1]
            && self.writing >= minimum[2]
            && self.speaking >= minimum[3]
    }

    fn raw_sum(&self) -> f64 {
        self.listening + self.reading + self.writing + self.speaking
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnglishTest {
    Ielts {
        #[serde(flatten)]
        sections: SectionScores,
        overall: Option<f64>,
    },
    Pte {
        #[serde(flatten)]
        sections: SectionScores,
        overall: Option<f64>,
    },
    Toefl {
        #[serde(flatten)]
        sections: SectionScores,
        total: Option<f64>,
    },
    Oet {
        #[serde(flatten)]
        sections: SectionScores,
        total: Option<f64>,
    },
}

struct Bands {
    superior: [f64; 4],
    proficient: [f64; 4],
    competent: [f64; 4],
    vocational: [f64; 4],
}

const IELTS: Bands = Bands {
    superior: [8.0; 4],
    proficient: [7.0; 4],
    competent: [6.0; 4],
    vocational: [5.0; 4],
};

const PTE: Bands = Bands {
    superior: [79.0; 4],
    proficient: [65.0; 4],
    competent: [50.0; 4],
    vocational: [36.0; 4],
};

const TOEFL: Bands = Bands {
    superior: [28.0, 29.0, 30.0, 26.0],
    proficient: [24.0, 24.0, 27.0, 23.0],
    competent: [12.0, 13.0, 21.0, 18.0],
    vocational: [4.0, 4.0, 14.0, 14.0],
};

const OET: Bands = Bands {
    superior: [390.0, 400.0, 420.0, 400.0],
    proficient: [350.0, 360.0, 350.0, 360.0],
    competent: [290.0, 290.0, 270.0, 330.0],
    vocational: [200.0; 4],
};

const IELTS_FUNCTIONAL_OVERALL: f64 = 4.5;
const PTE_FUNCTIONAL_OVERALL: f64 = 30.0;
const TOEFL_FUNCTIONAL_TOTAL: f64 = 32.0;
const OET_FUNCTIONAL_TOTAL: f64 = 800.0;

impl EnglishTest {
    fn sections(&self) -> &SectionScores {
        match self {
            EnglishTest::Ielts { sections, .. }
            | EnglishTest::Pte { sections, .. }
            | EnglishTest::Toefl { sections, .. }
            | EnglishTest::Oet { sections, .. } => sections,
        }
    }

    fn bands(&self) -> &'static Bands {
        match self {
            EnglishTest::Ielts { .. } => &IELTS,
            EnglishTest::Pte { .. } => &PTE,
            EnglishTest::Toefl { .. } => &TOEFL,
            EnglishTest::Oet { .. } => &OET,
        }
    }

    fn is_functional(&self) -> bool {
        match self {
            EnglishTest::Ielts { overall, .. } => {
                overall.is_some_and(|overall| overall >= IELTS_FUNCTIONAL_OVERALL)
            }
            EnglishTest::Pte { overall, .. } => {
                overall.is_some_and(|overall| overall >= PTE_FUNCTIONAL_OVERALL)
            }
            EnglishTest::Toefl { sections, total } => {
                total.is_some_and(|total| total != 0.0)
                    || sections.raw_sum() >= TOEFL_FUNCTIONAL_TOTAL
            }
            EnglishTest::Oet { sections, total } => {
                total.is_some_and(|total| total != 0.0)
                    || sections.raw_sum() >= OET_FUNCTIONAL_TOTAL
            }
        }
    }

    /// Highest band the certificate reaches, if any.
    pub fn level(&self) -> Option<EnglishLevel> {
        let sections = self.sections();
        let bands = self.bands();

        if sections.each_at_least(bands.superior) {
            Some(EnglishLevel::Superior)
        } else if sections.each_at_least(bands.proficient) {
            Some(EnglishLevel::Proficient)
        } else if sections.each_at_least(bands.competent) {
            Some(EnglishLevel::Competent)
        } else if sections.each_at_least(bands.vocational) {
            Some(EnglishLevel::Vocational)
        } else if self.is_functional() {
            Some(EnglishLevel::Functional)
        } else {
            None
        }
    }
}
