//! `source:destination` template references

use crate::TemplateError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A template to render and where to write the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    /// Template file to read
    pub source: PathBuf,
    /// File the rendered output is written to
    pub destination: PathBuf,
}

impl TemplateSpec {
    /// Create a spec from explicit paths
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

impl FromStr for TemplateSpec {
    type Err = TemplateError;

    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let invalid = || TemplateError::InvalidSpec {
            reference: reference.to_string(),
        };

        let (source, destination) = reference.split_once(':').ok_or_else(invalid)?;
        if source.is_empty() || destination.is_empty() || destination.contains(':') {
            return Err(invalid());
        }

        Ok(Self::new(source, destination))
    }
}

impl fmt::Display for TemplateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.source.display(),
            self.destination.display()
        )
    }
}
