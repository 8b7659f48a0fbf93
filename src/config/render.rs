//! Compact literal rendering of document values for error messages.
//!
//! Strings are single-quoted, sequences use `[...]` and mappings `{k: v}`,
//! so that `Invalid prune options: [{'bad_option': 1}]` reads the same way
//! the offending YAML was written.

use serde_yaml::Value;

/// Render any document value.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", render(k), render(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::Tagged(tagged) => render(&tagged.value),
    }
}

/// Render names as a list literal, e.g. `['archives', 'repositories']`.
pub fn render_list<S: AsRef<str>>(names: &[S]) -> String {
    let items: Vec<String> = names.iter().map(|n| quote(n.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

/// Render names as a set literal, e.g. `{'bananas'}`. Callers pass sorted input.
pub fn render_set<S: AsRef<str>>(names: &[S]) -> String {
    let items: Vec<String> = names.iter().map(|n| quote(n.as_ref())).collect();
    format!("{{{}}}", items.join(", "))
}

/// Plain-text form of a scalar used as a name (mapping key or list entry).
///
/// Returns `None` for values that cannot name anything.
pub fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_name(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_values() {
        let value: Value = serde_yaml::from_str("[{bad_option: 1}, {other: [a, true]}]").unwrap();
        assert_eq!(render(&value), "[{'bad_option': 1}, {'other': ['a', true]}]");
    }

    #[test]
    fn renders_name_collections() {
        assert_eq!(
            render_list(&["archives", "repositories"]),
            "['archives', 'repositories']"
        );
        assert_eq!(render_set(&["bananas"]), "{'bananas'}");
        assert_eq!(render_list::<&str>(&[]), "[]");
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(render(&Value::String("it's".to_string())), r"'it\'s'");
    }

    #[test]
    fn scalar_names() {
        assert_eq!(scalar_name(&Value::String("usb".into())), Some("usb".into()));
        assert_eq!(scalar_name(&serde_yaml::from_str("42").unwrap()), Some("42".into()));
        assert_eq!(scalar_name(&Value::Null), None);
        assert_eq!(scalar_name(&serde_yaml::from_str("[a]").unwrap()), None);
    }
}
