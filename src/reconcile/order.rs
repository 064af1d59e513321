// src/reconcile/order.rs
use std::collections::HashMap;

/// Recover the declaration order of keys inside one top-level JSON object
/// section. Generic JSON parsing hands back an unordered map, and the
/// dashboard has to render groups the way the upstream file lists them, so
/// we go back to the raw text for the order.
///
/// Absent section yields an empty vec; malformed or truncated input yields
/// whatever prefix of the order could still be located. Never errors.
pub fn extract_section_order(raw: &str, section: &str) -> Vec<String> {
    let needle = format!("\"{}\"", section);
    let section_start = match raw.find(&needle) {
        Some(pos) => pos,
        None => return Vec::new(),
    };

    let brace_start = match raw[section_start..].find('{') {
        Some(pos) => section_start + pos,
        None => return Vec::new(),
    };

    // Scan forward to the matching close brace, tracking nesting depth.
    let bytes = raw.as_bytes();
    let mut depth = 1usize;
    let mut brace_end = brace_start + 1;
    while brace_end < bytes.len() && depth > 0 {
        match bytes[brace_end] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        brace_end += 1;
    }

    let section_json = &raw[brace_start..brace_end];

    // The parsed map gives us the key set; order comes from text positions.
    let groups: HashMap<String, serde_json::Value> =
        serde_json::from_str(section_json).unwrap_or_default();

    let mut order: Vec<String> = Vec::with_capacity(groups.len());
    let mut pos = 0usize;

    while order.len() < groups.len() {
        let mut earliest_pos = section_json.len();
        let mut earliest_key: Option<&str> = None;

        for key in groups.keys() {
            if order.iter().any(|added| added == key) {
                continue;
            }
            let quoted = format!("\"{}\"", key);
            if let Some(found) = section_json[pos..].find(&quoted) {
                let found = pos + found;
                if found < earliest_pos {
                    earliest_pos = found;
                    earliest_key = Some(key);
                }
            }
        }

        match earliest_key {
            Some(key) => {
                order.push(key.to_string());
                pos = earliest_pos + key.len() + 2;
            }
            // No remaining key found in text: truncated input, stop with
            // the partial order rather than failing.
            None => break,
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_literal_order_not_alphabetical() {
        let raw = r#"{"api": {"beta": {"urls": []}, "alpha": {"urls": []}}}"#;
        assert_eq!(extract_section_order(raw, "api"), vec!["beta", "alpha"]);
    }

    #[test]
    fn absent_section_yields_empty() {
        let raw = r#"{"api": {"a": 1}}"#;
        assert!(extract_section_order(raw, "ui").is_empty());
    }

    #[test]
    fn handles_nested_objects_in_section() {
        let raw = r#"{"api": {"zulu": {"urls": ["u"], "cors": true}, "mike": {"urls": []}}, "ui": {"echo": []}}"#;
        assert_eq!(extract_section_order(raw, "api"), vec!["zulu", "mike"]);
        assert_eq!(extract_section_order(raw, "ui"), vec!["echo"]);
    }

    #[test]
    fn malformed_section_yields_empty() {
        let raw = r#"{"api": {"b": }"#;
        assert!(extract_section_order(raw, "api").is_empty());
    }

    #[test]
    fn section_without_open_brace_yields_empty() {
        let raw = r#"{"api": 42}"#;
        assert!(extract_section_order(raw, "api").is_empty());
    }
}
