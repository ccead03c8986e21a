//! In-memory view of the descriptor printed by `zerotier-idtool initmoon`.

use serde_json::{Map, Value};
use thiserror::Error;

const ROOTS_KEY: &str = "roots";
const STABLE_ENDPOINTS_KEY: &str = "stableEndpoints";

/// Structural problems found in a moon descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoonDocumentError {
    /// The text was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),
    /// The top-level value was not an object.
    #[error("descriptor is not a JSON object")]
    NotAnObject,
    /// The descriptor had no `roots` member.
    #[error("descriptor has no `roots` member")]
    MissingRoots,
    /// `roots` was present but not an array.
    #[error("`roots` is not an array")]
    RootsNotArray,
    /// A root entry was not an object.
    #[error("root {index} is not an object")]
    RootNotObject {
        /// Position of the root.
        index: usize,
    },
    /// A root had no `stableEndpoints` member.
    #[error("root {index} has no `stableEndpoints` member")]
    MissingStableEndpoints {
        /// Position of the root.
        index: usize,
    },
    /// `stableEndpoints` was present but not an array.
    #[error("`stableEndpoints` of root {index} is not an array")]
    StableEndpointsNotArray {
        /// Position of the root.
        index: usize,
    },
}

/// A validated moon descriptor.
///
/// Every member other than the endpoint lists is carried through untouched,
/// in its original key order.
#[derive(Debug, Clone, PartialEq)]
pub struct MoonDocument {
    value: Value,
}

impl MoonDocument {
    /// Parses and validates descriptor text.
    ///
    /// # Errors
    ///
    /// Returns a [`MoonDocumentError`] describing the first structural
    /// problem found.
    pub fn parse(text: &str) -> Result<Self, MoonDocumentError> {
        let value = serde_json::from_str(text)
            .map_err(|error| MoonDocumentError::Json(error.to_string()))?;
        Self::from_value(value)
    }

    /// Validates an already parsed descriptor.
    ///
    /// # Errors
    ///
    /// Returns a [`MoonDocumentError`] describing the first structural
    /// problem found.
    pub fn from_value(value: Value) -> Result<Self, MoonDocumentError> {
        let object = value.as_object().ok_or(MoonDocumentError::NotAnObject)?;
        let roots = object
            .get(ROOTS_KEY)
            .ok_or(MoonDocumentError::MissingRoots)?
            .as_array()
            .ok_or(MoonDocumentError::RootsNotArray)?;
        for (index, entry) in roots.iter().enumerate() {
            let root = entry
                .as_object()
                .ok_or(MoonDocumentError::RootNotObject { index })?;
            match root.get(STABLE_ENDPOINTS_KEY) {
                None => return Err(MoonDocumentError::MissingStableEndpoints { index }),
                Some(Value::Array(_)) => {}
                Some(_) => return Err(MoonDocumentError::StableEndpointsNotArray { index }),
            }
        }
        Ok(Self { value })
    }

    /// Number of root entries.
    #[must_use]
    pub fn root_count(&self) -> usize {
        self.roots().map_or(0, Vec::len)
    }

    /// Stable endpoints of the root at `index`, in document order.
    #[must_use]
    pub fn stable_endpoints(&self, index: usize) -> Vec<&str> {
        self.roots()
            .and_then(|roots| roots.get(index))
            .and_then(|root| root.get(STABLE_ENDPOINTS_KEY))
            .and_then(Value::as_array)
            .map(|endpoints| endpoints.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Appends `endpoints`, in order, to every root's endpoint list.
    ///
    /// Returns the number of endpoint strings added across all roots.
    pub fn append_stable_endpoints(&mut self, endpoints: &[String]) -> usize {
        let mut added = 0;
        for root in self.roots_mut() {
            if let Some(Value::Array(list)) = root.get_mut(STABLE_ENDPOINTS_KEY) {
                list.extend(endpoints.iter().cloned().map(Value::String));
                added += endpoints.len();
            }
        }
        added
    }

    /// Pretty-printed JSON for the descriptor file.
    ///
    /// # Errors
    ///
    /// Propagates serialisation failures.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.value)
    }

    /// The underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.value
    }

    fn roots(&self) -> Option<&Vec<Value>> {
        self.value.get(ROOTS_KEY).and_then(Value::as_array)
    }

    fn roots_mut(&mut self) -> impl Iterator<Item = &mut Map<String, Value>> {
        self.value
            .get_mut(ROOTS_KEY)
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
    }
}
