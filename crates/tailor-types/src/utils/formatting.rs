//! String formatting utilities.
//!
//! Shortens identifiers so log lines stay readable.

/// Truncates an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("short"), "short");
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(
			truncate_id("3f2504e0-4f89-11d3-9a0c-0305e82c3301"),
			"3f2504e0.."
		);
		assert_eq!(truncate_id("工厂工厂工厂工厂工厂"), "工厂工厂工厂工厂..");
	}
}
