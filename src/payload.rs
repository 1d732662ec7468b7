use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DATA_OPTION: &str = "data_option";
pub const SELECTED_VARIABLES: &str = "selected_variables";
pub const API_URL: &str = "api_url";

pub const ENTIRE_TABLE: &str = "entire_table";
pub const SELECT_VARIABLES: &str = "select_variables";

/// Flat field-name to value map sent to both endpoints.
///
/// Serializes as a plain JSON object of strings. Keys are kept sorted so the
/// request bodies are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionPayload(BTreeMap<String, String>);

impl SelectionPayload {
    /// Builds a payload from raw form entries and drops `selected_variables`
    /// when the whole table was requested.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut payload = Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        payload.strip_unused_variables();
        payload
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.0.insert(API_URL.to_string(), api_url.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn strip_unused_variables(&mut self) {
        if self.get(DATA_OPTION) == Some(ENTIRE_TABLE) {
            self.0.remove(SELECTED_VARIABLES);
        }
    }
}
