use serde_json::Value;

use crate::BuiltInKey;
use crate::Mapping;
use crate::SyntaxStyle;

/// The partial key typed after an unclosed opener that ends the text before
/// the caret, if any.
pub fn trigger_prefix(style: SyntaxStyle, before_caret: &str) -> Option<&str> {
	style
		.trigger_pattern()
		.captures(before_caret)
		.and_then(|captures| captures.get(1))
		.map(|partial| partial.as_str())
}

/// Every key path in a mapping, parents before children, in document order.
pub fn key_paths(mapping: &Mapping) -> Vec<String> {
	let mut paths = Vec::new();
	collect_paths(mapping, "", &mut paths);
	paths
}

fn collect_paths(mapping: &Mapping, prefix: &str, paths: &mut Vec<String>) {
	for (key, value) in mapping {
		let path = if prefix.is_empty() {
			key.clone()
		} else {
			format!("{prefix}.{key}")
		};
		paths.push(path.clone());

		if let Value::Object(child) = value {
			collect_paths(child, &path, paths);
		}
	}
}

/// Completion candidates for `partial`: mapping key paths first, then the
/// built-in keys when enabled. Built-ins shadowed by a mapping key are not
/// repeated.
pub fn suggestions(
	mapping: Option<&Mapping>,
	partial: &str,
	case_insensitive: bool,
	builtins: bool,
) -> Vec<String> {
	let folded = partial.to_lowercase();
	let matches = |candidate: &str| {
		if case_insensitive {
			candidate.to_lowercase().starts_with(&folded)
		} else {
			candidate.starts_with(partial)
		}
	};

	let mut candidates: Vec<String> = mapping
		.map(key_paths)
		.unwrap_or_default()
		.into_iter()
		.filter(|path| matches(path))
		.collect();

	if builtins {
		for key in BuiltInKey::ALL {
			let name = key.name();
			if matches(name) && !candidates.iter().any(|path| path == name) {
				candidates.push(name.to_string());
			}
		}
	}

	candidates
}
