//! Splitting concatenated iPerf3 JSON documents.
//!
//! iPerf3 run with `--json --logfile` appends one complete JSON document
//! per run, so after the first append the log file as a whole is no longer
//! valid JSON:
//!
//! ```text
//! {
//!     ...result of run i...
//! }
//! {
//!     ...result of run i + 1...
//! }
//! ```
//!
//! This module recovers the individual documents. Block boundaries are
//! found by tracking brace nesting depth (string- and escape-aware) rather
//! than by matching the `}\n{` adjacency textually, so a brace inside a
//! reported label cannot end a block early. Depth returning to zero marks
//! the end of a block.

use serde_json::Value;

/// Byte ranges of the top-level `{...}` blocks in a log blob.
///
/// A trailing block whose closing brace never arrives (a run truncated by
/// a crash mid-write) is still reported, running to the end of the input;
/// the caller's parse attempt on it will fail and the fragment is dropped.
fn block_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        ranges.push((s, i + 1));
                    }
                }
            }
            _ => {}
        }
    }

    // Unterminated trailing block
    if let Some(s) = start {
        ranges.push((s, text.len()));
    }

    ranges
}

/// Parse every complete block in the blob, oldest first.
///
/// A fragment that fails to parse is dropped silently: a corrupt log
/// produces fewer records, never an error.
pub fn split_records(text: &str) -> Vec<Value> {
    block_ranges(text)
        .into_iter()
        .filter_map(|(start, end)| serde_json::from_str(&text[start..end]).ok())
        .collect()
}

/// Parse only the final block of the blob.
///
/// Returns an empty JSON object if the final block does not parse, or if
/// the blob holds no block at all.
pub fn latest_record(text: &str) -> Value {
    block_ranges(text)
        .last()
        .and_then(|&(start, end)| serde_json::from_str(&text[start..end]).ok())
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(n: u64) -> String {
        format!("{{\n    \"start\": {{\n        \"test_start\": {{\n            \"num_streams\": {}\n        }}\n    }}\n}}\n", n)
    }

    #[test]
    fn test_split_multiple_blocks_in_order() {
        let blob = format!("{}{}{}", block(1), block(2), block(3));
        let records = split_records(&blob);
        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(
                record["start"]["test_start"]["num_streams"],
                (i as u64 + 1)
            );
        }
    }

    #[test]
    fn test_split_single_block() {
        let blob = block(7);
        let records = split_records(&blob);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["start"]["test_start"]["num_streams"], 7);
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_records("").is_empty());
        assert!(split_records("\n\n").is_empty());
    }

    #[test]
    fn test_split_drops_truncated_final_block() {
        let blob = format!("{}{}{{\n    \"start\": {{", block(1), block(2));
        let records = split_records(&blob);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["start"]["test_start"]["num_streams"], 2);
    }

    #[test]
    fn test_split_ignores_brace_inside_string() {
        let blob = "{\n    \"extra_data\": \"}\\n{ not a boundary\"\n}\n{\n    \"extra_data\": \"second\"\n}\n";
        let records = split_records(blob);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["extra_data"], "}\n{ not a boundary");
        assert_eq!(records[1]["extra_data"], "second");
    }

    #[test]
    fn test_latest_returns_final_block() {
        let blob = format!("{}{}{}", block(1), block(2), block(3));
        let latest = latest_record(&blob);
        assert_eq!(latest["start"]["test_start"]["num_streams"], 3);
    }

    #[test]
    fn test_latest_single_block_without_boundary() {
        let blob = block(9);
        let latest = latest_record(&blob);
        assert_eq!(latest["start"]["test_start"]["num_streams"], 9);
    }

    #[test]
    fn test_latest_truncated_final_block_is_empty_object() {
        let blob = format!("{}{{\n    \"start\": {{", block(1));
        let latest = latest_record(&blob);
        assert_eq!(latest, Value::Object(serde_json::Map::new()));
    }

    #[test]
    fn test_latest_empty_input_is_empty_object() {
        assert_eq!(latest_record(""), Value::Object(serde_json::Map::new()));
    }
}
