//! Parsed `key=value&...` data from query strings and url-encoded
//! request bodies.

use kstring::KString;
use serde_json::{Map, Value};

use crate::url_encoding::{form_decode, UrlDecodingError};
use crate::wicket::variables::VariableSet;

/// Key/value pairs in the order given. Keys may repeat.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryString(Vec<(KString, String)>);

impl QueryString {
    pub fn from_str(s: &str) -> Result<Self, UrlDecodingError> {
        let mut v = Vec::new();
        for partraw in s.split('&') {
            if ! partraw.is_empty() {
                let (key, val) = partraw.split_once('=').unwrap_or((partraw, ""));
                v.push((KString::from_string(form_decode(key)?),
                        form_decode(val)?));
            }
        }
        Ok(QueryString(v))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// As variables for rendering; for repeated keys the last value
    /// is used.
    pub fn to_variables(&self) -> VariableSet {
        self.0.iter().cloned().collect()
    }

    /// As a JSON object; repeated keys are collected into arrays.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (k, v) in &self.0 {
            match map.get_mut(k.as_str()) {
                None => {
                    map.insert(k.to_string(), Value::String(v.clone()));
                }
                Some(Value::Array(vals)) => vals.push(Value::String(v.clone())),
                Some(old) => {
                    let first = old.take();
                    *old = Value::Array(vec![first, Value::String(v.clone())]);
                }
            }
        }
        Value::Object(map)
    }
}
