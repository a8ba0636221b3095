//! Minimal MMIF document model.
//!
//! The orchestrator only needs a handful of operations on a document: parse it
//! (failing on malformed input), append a view, label the view with an app,
//! attach metadata properties, and serialize it back. Everything it does not
//! understand is carried through untouched in `extra` maps.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Metadata property that marks a view as an error record.
pub const ERROR_PROPERTY: &str = "error";

const APP_PREFIXES: &[&str] = &["http://mmif.clams.ai/apps/", "https://apps.clams.ai/"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Map<String, Value>,
    pub documents: Vec<Value>,
    pub views: Vec<View>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub metadata: ViewMetadata,
    #[serde(default)]
    pub annotations: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewMetadata {
    #[serde(default)]
    pub app: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Document {
    /// Parse a serialized MMIF document.
    ///
    /// A document must be a JSON object with a `metadata` object that names the
    /// MMIF version, plus `documents` and `views` arrays.
    pub fn parse(text: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(text).context("parse MMIF JSON")?;
        if !document
            .metadata
            .get("mmif")
            .is_some_and(|version| version.is_string())
        {
            anyhow::bail!("MMIF metadata is missing the \"mmif\" version");
        }
        Ok(document)
    }

    /// Append an empty view with the next free `v_<n>` identifier.
    pub fn new_view(&mut self) -> &mut View {
        let mut n = self.views.len();
        let id = loop {
            let candidate = format!("v_{n}");
            if !self.views.iter().any(|view| view.id == candidate) {
                break candidate;
            }
            n += 1;
        };
        self.views.push(View {
            id,
            metadata: ViewMetadata::default(),
            annotations: Vec::new(),
            extra: Map::new(),
        });
        let last = self.views.len() - 1;
        &mut self.views[last]
    }

    pub fn last_view(&self) -> Option<&View> {
        self.views.last()
    }

    /// True when the most recent view carries an error record.
    pub fn last_view_has_error(&self) -> bool {
        self.last_view().is_some_and(View::has_error)
    }

    pub fn serialize(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        text.context("serialize MMIF document")
    }
}

impl View {
    pub fn set_app_identifier(&mut self, app: &str) {
        self.metadata.app = app.to_string();
    }

    pub fn set_property(&mut self, key: &str, value: Value) {
        self.metadata.properties.insert(key.to_string(), value);
    }

    pub fn error_message(&self) -> Option<&str> {
        self.metadata
            .properties
            .get(ERROR_PROPERTY)
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
    }

    pub fn has_error(&self) -> bool {
        self.error_message().is_some()
    }

    /// App identifier with the well-known CLAMS prefixes removed.
    pub fn short_app(&self) -> &str {
        APP_PREFIXES
            .iter()
            .find_map(|prefix| self.metadata.app.strip_prefix(prefix))
            .unwrap_or(&self.metadata.app)
    }

    /// Annotation counts keyed by the last path segment of `@type`.
    pub fn annotation_types(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for annotation in &self.annotations {
            let at_type = annotation
                .get("@type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let short = at_type.rsplit('/').next().unwrap_or(at_type);
            *counts.entry(short.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
#[path = "mmif_tests.rs"]
mod tests;
