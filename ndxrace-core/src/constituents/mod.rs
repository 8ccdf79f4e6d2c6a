//! Constituent tables: the tickers a run covers.
//!
//! A table is an explicit immutable value handed to the assembler. The
//! built-in Nasdaq-100 table is the default; TOML and CSV files or a fresh
//! scrape of Wikipedia can replace it.
//!
//! Tables list companies *currently* in the index. Historical additions and
//! removals are not modelled, so long histories carry survivorship bias.

mod nasdaq100;
pub mod wikipedia;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstituentError {
    #[error("read constituents file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse constituents: {0}")]
    Parse(String),

    #[error("unsupported constituents file format: {0} (expected .toml or .csv)")]
    UnsupportedFormat(String),

    #[error("constituent table is empty")]
    Empty,

    #[error("constituent #{index} has an empty ticker")]
    EmptyTicker { index: usize },

    #[error("duplicate ticker in constituent table: {ticker}")]
    Duplicate { ticker: String },

    #[error("fetch constituents from Wikipedia: {0}")]
    Wikipedia(String),
}

/// A company tracked by the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    pub ticker: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl Constituent {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            sector: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ConstituentFile {
    constituents: Vec<Constituent>,
}

/// A validated, ordered list of constituents with unique tickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstituentTable {
    constituents: Vec<Constituent>,
}

impl ConstituentTable {
    /// Validate and freeze a list. Tickers and names are trimmed; a blank
    /// name falls back to the ticker.
    pub fn new(constituents: Vec<Constituent>) -> Result<Self, ConstituentError> {
        if constituents.is_empty() {
            return Err(ConstituentError::Empty);
        }

        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(constituents.len());
        for (index, c) in constituents.into_iter().enumerate() {
            let ticker = c.ticker.trim().to_string();
            if ticker.is_empty() {
                return Err(ConstituentError::EmptyTicker { index });
            }
            if !seen.insert(ticker.clone()) {
                return Err(ConstituentError::Duplicate { ticker });
            }
            let name = match c.name.trim() {
                "" => ticker.clone(),
                name => name.to_string(),
            };
            let sector = c
                .sector
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            cleaned.push(Constituent {
                ticker,
                name,
                sector,
            });
        }

        Ok(Self {
            constituents: cleaned,
        })
    }

    /// The built-in Nasdaq-100 table.
    pub fn nasdaq100() -> Self {
        Self {
            constituents: nasdaq100::NASDAQ_100
                .iter()
                .map(|(ticker, name)| Constituent::new(*ticker, *name))
                .collect(),
        }
    }

    /// Load a table from a `.toml` or `.csv` file.
    pub fn from_file(path: &Path) -> Result<Self, ConstituentError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConstituentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml(&content),
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::from_csv(content.as_bytes()),
            other => Err(ConstituentError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Parse `[[constituents]]` entries from TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConstituentError> {
        let file: ConstituentFile =
            toml::from_str(content).map_err(|e| ConstituentError::Parse(e.to_string()))?;
        Self::new(file.constituents)
    }

    /// Parse CSV with a `ticker,name[,sector]` header.
    pub fn from_csv<R: std::io::Read>(reader: R) -> Result<Self, ConstituentError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut constituents = Vec::new();
        for record in rdr.deserialize::<Constituent>() {
            constituents.push(record.map_err(|e| ConstituentError::Parse(e.to_string()))?);
        }
        Self::new(constituents)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constituent> {
        self.constituents.iter()
    }

    pub fn as_slice(&self) -> &[Constituent] {
        &self.constituents
    }

    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.constituents.iter().map(|c| c.ticker.as_str()).collect()
    }

    pub fn get(&self, ticker: &str) -> Option<&Constituent> {
        self.constituents.iter().find(|c| c.ticker == ticker)
    }
}

impl Default for ConstituentTable {
    fn default() -> Self {
        Self::nasdaq100()
    }
}

impl<'a> IntoIterator for &'a ConstituentTable {
    type Item = &'a Constituent;
    type IntoIter = std::slice::Iter<'a, Constituent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
