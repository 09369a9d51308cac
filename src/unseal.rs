use std::collections::BTreeMap;
use std::io::BufRead;

use anyhow::{Context, Result};

// `Unseal Key <index>: <value>` -- the value is the fourth
// whitespace-delimited field.
const VALUE_FIELD: usize = 3;

/// Extracts unseal keys from a line-oriented artifact.
///
/// Lines are scanned in order against a running expected index starting at 1.
/// A line is accepted only when it contains the marker for the current
/// expected index; anything else is ignored, which tolerates interleaved log
/// noise but silently drops keys that appear out of order. Finding fewer keys
/// than the backend generated is not an error at this layer.
///
/// # Errors
///
/// Returns an error only when the artifact itself cannot be read.
pub fn extract_unseal_keys<R: BufRead>(reader: R) -> Result<BTreeMap<u32, String>> {
    let mut keys = BTreeMap::new();
    let mut expected_index: u32 = 1;

    for line in reader.lines() {
        let line = line.context("Failed to read unseal key artifact")?;
        let marker = format!("Unseal Key {expected_index}:");
        if line.contains(&marker) {
            if let Some(value) = line.split_whitespace().nth(VALUE_FIELD) {
                keys.insert(expected_index, value.to_string());
                expected_index += 1;
            }
        }
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn extract(lines: &[&str]) -> BTreeMap<u32, String> {
        extract_unseal_keys(Cursor::new(lines.join("\n"))).unwrap()
    }

    #[test]
    fn test_extracts_keys_in_order_ignoring_noise() {
        let keys = extract(&[
            "Unseal Key 1: aaa",
            "Unseal Key 2: bbb",
            "noise",
            "Unseal Key 3: ccc",
        ]);
        assert_eq!(keys.get(&1).map(String::as_str), Some("aaa"));
        assert_eq!(keys.get(&2).map(String::as_str), Some("bbb"));
        assert_eq!(keys.get(&3).map(String::as_str), Some("ccc"));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_out_of_order_key_is_never_captured() {
        // The index-2 line appears before its turn, so it never matches. The
        // index-1 line still matches when the scan reaches it.
        let keys = extract(&["Unseal Key 2: bbb", "Unseal Key 1: aaa"]);
        assert_eq!(keys.get(&1).map(String::as_str), Some("aaa"));
        assert_eq!(keys.get(&2), None);
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_gap_in_indices_stops_matching() {
        let keys = extract(&["Unseal Key 1: aaa", "Unseal Key 3: ccc"]);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.get(&1).map(String::as_str), Some("aaa"));
    }

    #[test]
    fn test_empty_artifact_yields_no_keys() {
        let keys = extract(&[]);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_marker_without_value_is_ignored() {
        let keys = extract(&["Unseal Key 1:", "Unseal Key 1: aaa"]);
        assert_eq!(keys.get(&1).map(String::as_str), Some("aaa"));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_typical_init_output() {
        let keys = extract(&[
            "==> Vault server configuration:",
            "Unseal Key 1: zlhLYW1LbFpvNe8AS02O6lJpWX4RBn718a8fVxqO3VE0",
            "Unseal Key 2: aCsvEF1f0JMmHpdac1Cb8xh3zWBACylvIGPzTRGzjBjt",
            "Unseal Key 3: xyn1gDB2Y0HYBWZ4VDBxZJf9ImB7I3dCSbnDpAbUL7dz",
            "Unseal Key 4: jc8dBmrlAAfvsBCjZLjWjSkCWartUJDVSC9cwW6xMBkS",
            "Unseal Key 5: CBwa1nQ6UDpTGyMVtfbUvRjQuLAVzfnaY5mdmWZDpSBz",
            "Initial Root Token: 2b2ff306-18f0-366f-3e10-1c49b0249b69",
        ]);
        assert_eq!(keys.len(), 5);
        assert_eq!(
            keys.get(&5).map(String::as_str),
            Some("CBwa1nQ6UDpTGyMVtfbUvRjQuLAVzfnaY5mdmWZDpSBz")
        );
    }
}
