//! Field selection for an enrichment run.
//!
//! Request bodies are parsed explicitly; anything that does not parse falls
//! back to the configured default selection instead of failing the request.

use std::collections::BTreeSet;

use lineage_types::EnrichableField;
use serde_json::Value;
use tracing::debug;

use crate::error::SelectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    fields: BTreeSet<EnrichableField>,
}

impl FieldSelection {
    pub fn new(fields: impl IntoIterator<Item = EnrichableField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Parse `{"fields": ["title", "phone", ...]}`.
    pub fn parse(request: &Value) -> Result<Self, SelectionError> {
        let object = request.as_object().ok_or(SelectionError::NotAnObject)?;
        let fields = object
            .get("fields")
            .ok_or(SelectionError::MissingFields)?
            .as_array()
            .ok_or(SelectionError::FieldsNotArray)?;
        if fields.is_empty() {
            return Err(SelectionError::Empty);
        }

        let mut selected = BTreeSet::new();
        for value in fields {
            let name = value.as_str().ok_or(SelectionError::FieldsNotArray)?;
            let field = name
                .parse::<EnrichableField>()
                .map_err(|_| SelectionError::UnknownField(name.to_string()))?;
            selected.insert(field);
        }
        Ok(Self { fields: selected })
    }

    /// Parse an optional request body, falling back to `default` on any error.
    pub fn from_request(request: Option<&Value>, default: &[EnrichableField]) -> Self {
        request
            .ok_or(SelectionError::MissingFields)
            .and_then(Self::parse)
            .unwrap_or_else(|err| {
                debug!(error = %err, "using default field selection");
                Self::new(default.iter().copied())
            })
    }

    pub fn contains(&self, field: EnrichableField) -> bool {
        self.fields.contains(&field)
    }

    /// Selected fields in declaration order.
    pub fn to_vec(&self) -> Vec<EnrichableField> {
        self.fields.iter().copied().collect()
    }
}
