//! Allow-lists restricting which root fields are exposed as tools

use std::collections::HashSet;

use tracing::warn;

/// The set of field names allowed for one operation kind.
///
/// An unrestricted whitelist allows every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Whitelist {
    fields: Option<HashSet<String>>,
}

impl Whitelist {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse a whitelist from its configured form.
    ///
    /// Accepts either a JSON array of names or a comma separated list. A value
    /// that cannot be parsed leaves the whitelist unrestricted.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::unrestricted();
        };

        let names: Vec<String> = if raw.starts_with('[') {
            match serde_json::from_str::<Vec<String>>(raw) {
                Ok(names) => names,
                Err(error) => {
                    warn!(%error, value = raw, "Ignoring malformed whitelist, all fields are allowed");
                    return Self::unrestricted();
                }
            }
        } else {
            raw.split(',').map(str::to_string).collect()
        };

        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if names.is_empty() {
            Self::unrestricted()
        } else {
            Self::from_fields(names)
        }
    }

    pub fn allows(&self, field: &str) -> bool {
        self.fields
            .as_ref()
            .is_none_or(|fields| fields.contains(field))
    }

    pub fn is_restricted(&self) -> bool {
        self.fields.is_some()
    }
}
