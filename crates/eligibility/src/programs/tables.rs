//! CSV exports of the reference tables behind a [`ContextInput`].

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::context::ContextInput;

pub const EXCHANGE_RATES_FILE: &str = "exchange_rates.csv";
pub const INSTITUTION_RANKINGS_FILE: &str = "institution_rankings.csv";
pub const EMPLOYER_RANKINGS_FILE: &str = "employer_rankings.csv";
pub const OCCUPATION_CODES_FILE: &str = "occupation_codes.csv";
pub const OCCUPATION_CROSSWALKS_FILE: &str = "occupation_crosswalks.csv";

#[derive(Debug, thiserror::Error)]
pub enum TablesError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed row in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub fn parse_rows<T, R>(reader: R) -> Result<Vec<T>, csv::Error>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<T>().collect()
}

/// Load every table present in `dir`. Missing files leave their table empty.
pub fn load_dir(dir: &Path) -> Result<ContextInput, TablesError> {
    Ok(ContextInput {
        exchange_rates: load_file(&dir.join(EXCHANGE_RATES_FILE))?,
        institution_rankings: load_file(&dir.join(INSTITUTION_RANKINGS_FILE))?,
        employer_rankings: load_file(&dir.join(EMPLOYER_RANKINGS_FILE))?,
        occupation_codes: load_file(&dir.join(OCCUPATION_CODES_FILE))?,
        occupation_crosswalks: load_file(&dir.join(OCCUPATION_CROSSWALKS_FILE))?,
        now: None,
    })
}

fn load_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TablesError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(TablesError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_rows(file).map_err(|source| TablesError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

impl ContextInput {
    /// Append the rows of `other`; an explicit evaluation date in `self` wins.
    pub fn merge(&mut self, other: ContextInput) {
        self.exchange_rates.extend(other.exchange_rates);
        self.institution_rankings.extend(other.institution_rankings);
        self.employer_rankings.extend(other.employer_rankings);
        self.occupation_codes.extend(other.occupation_codes);
        self.occupation_crosswalks.extend(other.occupation_crosswalks);
        self.now = self.now.or(other.now);
    }
}
