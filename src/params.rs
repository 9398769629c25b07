//! Query parameter handling.
//!
//! Dune queries embed parameters as `{{name}}` placeholders in SQL text.
//! This module extracts them, substitutes values for ad-hoc SQL, and parses
//! `name=value` pairs from the command line.

use crate::api::QueryParameter;
use crate::error::{DuneqError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"))
}

/// Extracts `{{name}}` placeholders from SQL text.
///
/// Returns unique parameter names in order of first appearance. Text with
/// no placeholders yields an empty list.
pub fn extract_parameters(sql: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();

    for capture in placeholder_pattern().captures_iter(sql) {
        let name = &capture[1];
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }

    names
}

/// Replaces `{{name}}` placeholders with the supplied values.
///
/// Single quotes in values are doubled so a value cannot terminate a SQL
/// string literal.
pub fn substitute_parameters(sql: &str, values: &HashMap<String, String>) -> String {
    let mut result = sql.to_string();
    for (name, value) in values {
        let escaped = value.replace('\'', "''");
        result = result.replace(&format!("{{{{{name}}}}}"), &escaped);
    }
    result
}

/// Parses repeated `--param name=value` flags into a map.
pub fn parse_param_flags(flags: &[String]) -> Result<HashMap<String, String>> {
    let mut values = HashMap::new();
    for flag in flags {
        let (name, value) = flag.split_once('=').ok_or_else(|| {
            DuneqError::config(format!(
                "Invalid parameter '{flag}'. Expected name=value"
            ))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DuneqError::config(format!(
                "Invalid parameter '{flag}'. Parameter name is empty"
            )));
        }
        values.insert(name.to_string(), value.to_string());
    }
    Ok(values)
}

/// Converts parameter values to the API's parameter list.
///
/// All parameters are sent as text; empty values are skipped.
pub fn build_parameters(values: &HashMap<String, String>) -> Vec<QueryParameter> {
    let mut params: Vec<QueryParameter> = values
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(name, value)| QueryParameter::text(name, value))
        .collect();
    // Stable ordering keeps request bodies reproducible.
    params.sort_by(|a, b| a.name.cmp(&b.name));
    params
}

/// Returns the placeholders in `sql` that have no value in `values`.
pub fn missing_parameters(sql: &str, values: &HashMap<String, String>) -> Vec<String> {
    extract_parameters(sql)
        .into_iter()
        .filter(|name| {
            values
                .get(name)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .collect()
}
