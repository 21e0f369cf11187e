// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Truncation of oversized string leaves in property payloads.

use serde_json::Value;

/// Maximum length, in characters, of any string inside event or user properties.
pub const MAX_STRING_LENGTH: usize = 1024;

/// Truncates every string leaf of `value` to at most `max_len` characters.
///
/// Objects and arrays are walked recursively; keys and non-string leaves are
/// left untouched.
pub fn truncate_value(value: Value, max_len: usize) -> Value {
	match value {
		Value::String(s) => Value::String(truncate_string(s, max_len)),
		Value::Array(items) => Value::Array(
			items
				.into_iter()
				.map(|item| truncate_value(item, max_len))
				.collect(),
		),
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(k, v)| (k, truncate_value(v, max_len)))
				.collect(),
		),
		other => other,
	}
}

fn truncate_string(mut s: String, max_len: usize) -> String {
	if let Some((idx, _)) = s.char_indices().nth(max_len) {
		s.truncate(idx);
	}
	s
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	#[test]
	fn short_strings_are_unchanged() {
		let value = json!("checkout");
		assert_eq!(truncate_value(value.clone(), 10), value);
	}

	#[test]
	fn long_strings_are_cut_to_max_len() {
		let long = "x".repeat(MAX_STRING_LENGTH + 50);
		let truncated = truncate_value(Value::String(long), MAX_STRING_LENGTH);
		assert_eq!(truncated.as_str().unwrap().len(), MAX_STRING_LENGTH);
	}

	#[test]
	fn multibyte_strings_are_cut_on_char_boundaries() {
		let value = json!("héllo wörld");
		assert_eq!(truncate_value(value, 4), json!("héll"));
	}

	#[test]
	fn nested_objects_and_arrays_are_walked() {
		let value = json!({
			"name": "abcdef",
			"count": 12345678,
			"tags": ["abcdef", "ab", {"deep": "abcdef"}],
			"flag": true,
			"missing": null,
		});

		let truncated = truncate_value(value, 3);
		assert_eq!(
			truncated,
			json!({
				"name": "abc",
				"count": 12345678,
				"tags": ["abc", "ab", {"deep": "abc"}],
				"flag": true,
				"missing": null,
			})
		);
	}

	#[test]
	fn keys_are_not_truncated() {
		let value = json!({"a_very_long_key": "v"});
		let truncated = truncate_value(value, 2);
		assert_eq!(truncated["a_very_long_key"], "v");
	}

	proptest! {
		#[test]
		fn truncated_strings_never_exceed_max_len(s in ".{0,200}", max_len in 0usize..100) {
			let truncated = truncate_value(Value::String(s.clone()), max_len);
			let out = truncated.as_str().unwrap();
			prop_assert!(out.chars().count() <= max_len);
			prop_assert!(s.starts_with(out));
		}
	}
}
