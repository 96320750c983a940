use std::ops::Range;

use logos::Logos;

/// Raw tokens produced by logos for flat tokenization of a single line.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
	#[regex(r"`+")]
	Backticks,
	#[regex(r"\*+")]
	Stars,
	#[regex(r"_+")]
	Underscores,
	#[regex(r"~+")]
	Tildes,
	#[regex(r"=+")]
	Equals,
	/// A backslash escape. The escaped character never acts as a delimiter.
	#[regex(r"\\.")]
	Escaped,
	#[regex(r"[^`*_~=\\]+")]
	Text,
}

/// The inline-markdown delimiter characters the context scanner cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelimiterKind {
	Backtick,
	Star,
	Underscore,
	Tilde,
	Equals,
}

/// A maximal run of one delimiter character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DelimiterRun {
	pub kind: DelimiterKind,
	pub range: Range<usize>,
}

impl DelimiterRun {
	pub fn len(&self) -> usize {
		self.range.len()
	}
}

/// Tokenize a line into delimiter runs with byte ranges. Escaped characters
/// and plain text are skipped.
pub(crate) fn delimiter_runs(line: &str) -> Vec<DelimiterRun> {
	RawToken::lexer(line)
		.spanned()
		.filter_map(|(token, range)| {
			let kind = match token {
				Ok(RawToken::Backticks) => DelimiterKind::Backtick,
				Ok(RawToken::Stars) => DelimiterKind::Star,
				Ok(RawToken::Underscores) => DelimiterKind::Underscore,
				Ok(RawToken::Tildes) => DelimiterKind::Tilde,
				Ok(RawToken::Equals) => DelimiterKind::Equals,
				Ok(RawToken::Escaped | RawToken::Text) | Err(()) => return None,
			};
			Some(DelimiterRun { kind, range })
		})
		.collect()
}
