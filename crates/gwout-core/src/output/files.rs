use crate::domain::{FieldKind, OutputError, OutputResult};
use globset::GlobBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where each field's records live inside the engine's output directory.
///
/// An explicit file name wins; otherwise the field's glob pattern must match
/// exactly one file in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputFiles {
    pub head: Option<PathBuf>,
    pub drawdown: Option<PathBuf>,
    pub flow: Option<PathBuf>,
    pub budget: Option<PathBuf>,
    pub patterns: BTreeMap<FieldKind, String>,
}

impl OutputFiles {
    pub fn default_pattern(field: FieldKind) -> &'static str {
        match field {
            FieldKind::Head => "*.hds",
            FieldKind::Drawdown => "*.ddn",
            FieldKind::Flow | FieldKind::Budget => "*.cbc",
        }
    }

    pub fn with_file(mut self, field: FieldKind, name: impl Into<PathBuf>) -> Self {
        let slot = match field {
            FieldKind::Head => &mut self.head,
            FieldKind::Drawdown => &mut self.drawdown,
            FieldKind::Flow => &mut self.flow,
            FieldKind::Budget => &mut self.budget,
        };
        *slot = Some(name.into());
        self
    }

    pub fn file_for(&self, field: FieldKind) -> Option<&Path> {
        match field {
            FieldKind::Head => self.head.as_deref(),
            FieldKind::Drawdown => self.drawdown.as_deref(),
            FieldKind::Flow => self.flow.as_deref(),
            FieldKind::Budget => self.budget.as_deref(),
        }
    }

    pub fn pattern_for(&self, field: FieldKind) -> &str {
        self.patterns
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| Self::default_pattern(field))
    }

    pub fn resolve(&self, output_dir: &Path, field: FieldKind) -> OutputResult<PathBuf> {
        if let Some(name) = self.file_for(field) {
            return Ok(output_dir.join(name));
        }

        let pattern = self.pattern_for(field);
        let unresolved = |message: String| OutputError::OutputFileUnresolved {
            field,
            directory: output_dir.to_path_buf(),
            message,
        };
        let matcher = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|source| unresolved(format!("invalid pattern '{pattern}': {source}")))?
            .compile_matcher();

        let entries = fs::read_dir(output_dir).map_err(|source| OutputError::IoUnavailable {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| OutputError::IoUnavailable {
                path: output_dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && matcher.is_match(entry.file_name()) {
                matches.push(path);
            }
        }
        matches.sort();

        match matches.len() {
            0 => Err(unresolved(format!("no file matches '{pattern}'"))),
            1 => {
                let path = matches.remove(0);
                debug!(field = %field, path = %path.display(), "resolved output file");
                Ok(path)
            }
            count => {
                let names = matches
                    .iter()
                    .filter_map(|path| path.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(unresolved(format!(
                    "pattern '{pattern}' matches {count} files: {names}"
                )))
            }
        }
    }
}
