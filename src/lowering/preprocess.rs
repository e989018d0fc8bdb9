//! Variable preprocessing.
//!
//! Dashboard variables (`$__rate_interval`, `$interval`, `[[host]]`,
//! `${host:csv}`, ...) are not legal tokens in the query grammar, so they
//! are rewritten into identifier-shaped placeholders before parsing and
//! restored whenever strings are extracted from the tree afterwards.
//!
//! Builtin interval variables use a fixed, bijective rewrite (`$__x` →
//! `___x`); template variables get generated placeholders recorded in a
//! substitution table. Both rewrites keep the placeholder the same length
//! as the original whenever possible, so error offsets into the rewritten
//! text still point at the right spot in the original.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Substitution table from placeholder identifiers back to the variable
/// text they replaced.
pub type Replacements = HashMap<String, String>;

/// Builtin interval variables, longest first so restoration never rewrites
/// a prefix of a longer name.
const BUILTIN_VARIABLES: &[&str] = &[
    "$__rate_interval_ms",
    "$__rate_interval",
    "$__interval_ms",
    "$__interval",
    "$__range_ms",
    "$__range_s",
    "$__range",
];

/// Template variable forms: `$name`, `[[name]]`, `${name}` and
/// `${name:fmt}`.
static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\w+|\[\[.+?\]\]|\$\{\w+(?::[^}]+)?\}").unwrap());

fn builtin_placeholder(name: &str) -> String {
    name.replacen('$', "_", 1)
}

/// Rewrite builtin interval variables into identifier-legal placeholders.
/// Must run before [`replace_variables`], which would otherwise claim them.
pub fn replace_builtin_variables(expr: &str) -> String {
    let mut out = expr.to_string();
    for variable in BUILTIN_VARIABLES {
        if out.contains(variable) {
            out = out.replace(variable, &builtin_placeholder(variable));
        }
    }
    out
}

/// Put builtin interval variables back into a string extracted from the
/// rewritten text.
pub fn restore_builtin_variables(text: &str) -> String {
    let mut out = text.to_string();
    for variable in BUILTIN_VARIABLES {
        let placeholder = builtin_placeholder(variable);
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, variable);
        }
    }
    out
}

/// Rewrite template variables into generated placeholders and record the
/// reverse mapping. Repeated occurrences of the same variable reuse one
/// placeholder.
pub fn replace_variables(expr: &str) -> (String, Replacements) {
    let mut table = Replacements::new();
    let mut by_original: HashMap<String, String> = HashMap::new();
    let mut counter = 0usize;
    let replaced = VARIABLE_PATTERN
        .replace_all(expr, |caps: &regex::Captures<'_>| {
            let original = caps[0].to_string();
            if let Some(existing) = by_original.get(&original) {
                return existing.clone();
            }
            let mut placeholder = format!("__v{counter}");
            counter += 1;
            // Pad to the original's length so offsets keep lining up.
            while placeholder.len() < original.len() {
                placeholder.push('_');
            }
            by_original.insert(original.clone(), placeholder.clone());
            table.insert(placeholder.clone(), original);
            placeholder
        })
        .into_owned();
    (replaced, table)
}

/// Rewrite every recorded placeholder in `text` back to its original form.
pub fn restore_variables(text: &str, table: &Replacements) -> String {
    if table.is_empty() {
        return text.to_string();
    }
    // Longest placeholders first so none rewrites a prefix of another.
    let mut placeholders: Vec<&String> = table.keys().collect();
    placeholders.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let mut out = text.to_string();
    for placeholder in placeholders {
        if out.contains(placeholder.as_str()) {
            out = out.replace(placeholder.as_str(), &table[placeholder]);
        }
    }
    out
}
