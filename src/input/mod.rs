use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use thiserror::Error;

pub mod catalog;
pub mod manifest;
pub mod roster;
pub mod snapshot;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("could not open {}: {source}", path.display())]
    DataSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: missing column {column}", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: {msg}", path.display())]
    Malformed { path: PathBuf, msg: String },
    #[error("{}: malformed JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration {}: {msg}", path.display())]
    Config { path: PathBuf, msg: String },
    #[error("store snapshot {}: {msg}", path.display())]
    Snapshot { path: PathBuf, msg: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InputError {
    pub fn data_source(path: &Path, source: std::io::Error) -> Self {
        InputError::DataSource {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn config(path: &Path, msg: impl Into<String>) -> Self {
        InputError::Config {
            path: path.to_path_buf(),
            msg: msg.into(),
        }
    }

    pub fn malformed(path: &Path, msg: impl Into<String>) -> Self {
        InputError::Malformed {
            path: path.to_path_buf(),
            msg: msg.into(),
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        InputError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, InputError> {
    let file = File::open(path).map_err(|e| InputError::data_source(path, e))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A comma-separated file held in memory, header row first.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

impl CsvTable {
    pub fn column(&self, name: &str) -> Result<usize, InputError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| InputError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    pub fn field<'a>(&self, row: &'a csv::StringRecord, col: usize) -> &'a str {
        row.get(col).unwrap_or("")
    }
}

pub fn read_csv(path: &Path) -> Result<CsvTable, InputError> {
    let reader = open_maybe_gz(path)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| InputError::csv(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    if headers.is_empty() {
        return Err(InputError::MissingColumn {
            path: path.to_path_buf(),
            column: "<header>".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        rows.push(record.map_err(|e| InputError::csv(path, e))?);
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "read csv");
    Ok(CsvTable {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Reads a JSON control file. Syntax errors are `Json`; well-formed JSON
/// with missing or mistyped keys is a `Config` error.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, InputError> {
    let reader = open_maybe_gz(path)?;
    serde_json::from_reader(reader).map_err(|source| {
        if source.is_data() {
            InputError::config(path, source.to_string())
        } else {
            InputError::Json {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
