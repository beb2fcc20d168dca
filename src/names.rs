//! Identifier casing for hoisted type names

use std::sync::LazyLock;

use regex::{Captures, Regex};

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-|_.]([a-z])").expect("separator pattern is valid"));

/// Uppercase the first character and drop `-`, `_`, `.` and `|` separators,
/// uppercasing the lowercase letter that follows them.
///
/// `on_changed` → `OnChanged`, `devtools.panels` → `DevtoolsPanels`
pub fn to_upper_camel_case(value: &str) -> String {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest = SEPARATOR.replace_all(chars.as_str(), |caps: &Captures| caps[1].to_uppercase());
    let mut result: String = first.to_uppercase().collect();
    result.push_str(&rest);
    result
}

/// Append `suffix` in upper camel case to `prefix`
pub fn combine_name_prefix(prefix: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{prefix}{}", to_upper_camel_case(suffix)),
        _ => prefix.to_string(),
    }
}
