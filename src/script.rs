//! Script documents
//!
//! Saved scripts are a JSON object holding a version tag and the ordered
//! command lines. Plain text files with one command per line are accepted too.

use crate::{Result, SeqError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SCRIPT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScriptDocument {
    pub version: String,
    pub commands: Vec<String>,
}

impl Default for ScriptDocument {
    fn default() -> Self {
        Self {
            version: SCRIPT_VERSION.to_string(),
            commands: Vec::new(),
        }
    }
}

impl ScriptDocument {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load a JSON script document
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| SeqError::Script(format!("Failed to read {}: {}", path.display(), e)))?;

        let document: ScriptDocument = serde_json::from_str(&contents)?;
        if document.version != SCRIPT_VERSION {
            tracing::warn!(
                "{} has script version {}, expected {}",
                path.display(),
                document.version,
                SCRIPT_VERSION
            );
        }
        Ok(document)
    }

    /// Load by extension: `.script` and `.json` are JSON documents, anything
    /// else is plain text with one command per line
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_document = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("script") | Some("json")
        );

        if is_document {
            return Self::load(path);
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| SeqError::Script(format!("Failed to read {}: {}", path.display(), e)))?;
        Ok(Self::from_lines(contents.lines()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
