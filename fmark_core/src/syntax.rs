use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::FmarkError;

static BRACKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| compile(r"\[%([^\[\]%]+)\]"));
static BRACKET_TRIGGER: LazyLock<Regex> = LazyLock::new(|| compile(r"\[%([A-Za-z0-9_.\-]*)$"));
static BRACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| compile(r"\{\{([^{}]+)\}\}"));
static BRACE_TRIGGER: LazyLock<Regex> = LazyLock::new(|| compile(r"\{\{([A-Za-z0-9_.\-]*)$"));

fn compile(pattern: &str) -> Regex {
	Regex::new(pattern).unwrap_or_else(|e| panic!("invalid marker pattern `{pattern}`: {e}"))
}

/// The token shape used to embed a marker in document text.
///
/// - [`SyntaxStyle::Bracket`]: `[%key]`. Keys may not contain `[`, `]` or
///   `%`.
/// - [`SyntaxStyle::Brace`]: `{{key}}`. Keys may not contain `{` or `}`.
///
/// Markers never nest: the first closer after an opener ends the marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxStyle {
	#[default]
	Bracket,
	Brace,
}

impl SyntaxStyle {
	pub const ALL: [SyntaxStyle; 2] = [SyntaxStyle::Bracket, SyntaxStyle::Brace];

	/// The literal that starts a marker.
	pub fn opener(self) -> &'static str {
		match self {
			Self::Bracket => "[%",
			Self::Brace => "{{",
		}
	}

	/// The literal that ends a marker.
	pub fn closer(self) -> &'static str {
		match self {
			Self::Bracket => "]",
			Self::Brace => "}}",
		}
	}

	/// Pattern matching a complete marker anywhere in a string. Capture group
	/// 1 is the untrimmed key path.
	pub fn pattern(self) -> &'static Regex {
		match self {
			Self::Bracket => &BRACKET_PATTERN,
			Self::Brace => &BRACE_PATTERN,
		}
	}

	/// Pattern matching an unfinished marker at the very end of a string.
	/// Capture group 1 is the partial key typed so far, limited to
	/// alphanumerics, `_`, `-` and `.`.
	pub fn trigger_pattern(self) -> &'static Regex {
		match self {
			Self::Bracket => &BRACKET_TRIGGER,
			Self::Brace => &BRACE_TRIGGER,
		}
	}

	/// Build the marker text for `key` in this style.
	pub fn marker(self, key: &str) -> String {
		format!("{}{key}{}", self.opener(), self.closer())
	}

	/// Whether `key` can be written in this style without being cut short by
	/// a reserved character.
	pub fn allows_key(self, key: &str) -> bool {
		let reserved: &[char] = match self {
			Self::Bracket => &['[', ']', '%'],
			Self::Brace => &['{', '}'],
		};
		!key.trim().is_empty() && !key.contains(reserved)
	}

	pub fn name(self) -> &'static str {
		match self {
			Self::Bracket => "bracket",
			Self::Brace => "brace",
		}
	}
}

impl Display for SyntaxStyle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name())
	}
}

impl FromStr for SyntaxStyle {
	type Err = FmarkError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"bracket" | "[%]" => Ok(Self::Bracket),
			"brace" | "{{}}" => Ok(Self::Brace),
			other => Err(FmarkError::UnknownSyntax(other.to_string())),
		}
	}
}
