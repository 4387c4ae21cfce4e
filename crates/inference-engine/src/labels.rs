//! Class label table

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::{InferenceError, LoadError};

/// Class labels, index-aligned with the model's output positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    entries: Vec<String>,
}

impl Labels {
    /// Read one label per line
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let label_error = |e: std::io::Error| LoadError::LabelFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let file = File::open(path).map_err(|e| {
            warn!("Failed to load labels {}", path.display());
            label_error(e)
        })?;
        let labels = Self::from_reader(BufReader::new(file)).map_err(label_error)?;

        debug!("Loaded {} labels from {}", labels.len(), path.display());
        Ok(labels)
    }

    /// Read one label per line from any buffered reader.
    ///
    /// Lines are trimmed and inner whitespace runs collapse to one space.
    pub fn from_reader(reader: impl BufRead) -> std::io::Result<Self> {
        let entries = reader
            .lines()
            .map(|line| line.map(|l| l.split_whitespace().collect::<Vec<_>>().join(" ")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Label for an output index
    pub fn get(&self, index: usize) -> Result<&str, InferenceError> {
        self.entries
            .get(index)
            .map(String::as_str)
            .ok_or(InferenceError::OutOfRangeLabel {
                index,
                count: self.entries.len(),
            })
    }
}

impl<S: Into<String>> FromIterator<S> for Labels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}
