use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::EditorHost;
use crate::SyntaxStyle;
use crate::frontmatter::metadata_block_lines;
use crate::lexer::DelimiterKind;
use crate::lexer::DelimiterRun;
use crate::lexer::delimiter_runs;

static FENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*([`~]{3,})").unwrap_or_else(|e| panic!("invalid fence pattern: {e}"))
});

/// Filler written over marker spans before emphasis pairing so that `_` or
/// `*` inside a key is never read as a delimiter.
const MASK: char = 'x';

/// A marker located within one line. Offsets are byte offsets relative to
/// the start of the line and `start < end` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
	pub start: usize,
	pub end: usize,
	/// The trimmed key path between opener and closer.
	pub key: String,
}

impl Marker {
	pub fn range(&self) -> Range<usize> {
		self.start..self.end
	}

	/// Whether the marker shares at least one byte with `range`.
	pub fn overlaps(&self, range: &Range<usize>) -> bool {
		self.start < range.end && range.start < self.end
	}
}

/// Whether a line opens or closes a fenced code block on its own.
pub fn is_fence_line(line: &str) -> bool {
	FENCE_PATTERN.is_match(line)
}

/// Find every complete marker in a line. Markers whose key is blank after
/// trimming are skipped.
pub fn scan_line(style: SyntaxStyle, line: &str) -> Vec<Marker> {
	if !line.contains(style.opener()) {
		return Vec::new();
	}

	style
		.pattern()
		.captures_iter(line)
		.filter_map(|captures| {
			let whole = captures.get(0)?;
			let key = captures.get(1)?.as_str().trim();
			if key.is_empty() {
				return None;
			}
			Some(Marker {
				start: whole.start(),
				end: whole.end(),
				key: key.to_string(),
			})
		})
		.collect()
}

#[derive(Debug, Clone)]
struct CachedLine {
	style: SyntaxStyle,
	text: String,
	markers: Vec<Marker>,
}

/// Per-view cache of scanned markers keyed by line number. An entry is only
/// reused while the line text is byte-identical to the cached text.
#[derive(Debug, Default)]
pub struct LineMarkerCache {
	entries: HashMap<usize, CachedLine>,
	hits: usize,
	misses: usize,
}

impl LineMarkerCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Markers for `line`, rescanning only when the text changed since the
	/// last call for this line number.
	pub fn markers(&mut self, line: usize, text: &str, style: SyntaxStyle) -> &[Marker] {
		let fresh = self
			.entries
			.get(&line)
			.is_some_and(|entry| entry.style == style && entry.text == text);

		if fresh {
			self.hits += 1;
		} else {
			self.misses += 1;
			self.entries.insert(
				line,
				CachedLine {
					style,
					text: text.to_string(),
					markers: scan_line(style, text),
				},
			);
		}

		self.entries
			.get(&line)
			.map_or(&[][..], |entry| entry.markers.as_slice())
	}

	/// Drop entries for lines that no longer exist.
	pub fn truncate(&mut self, line_count: usize) {
		self.entries.retain(|line, _| *line < line_count);
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Return and reset the hit/miss counters.
	pub fn take_stats(&mut self) -> (usize, usize) {
		let stats = (self.hits, self.misses);
		self.hits = 0;
		self.misses = 0;
		stats
	}
}

/// Fenced code block state carried from one line to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FenceState {
	/// The opening fence character and its run length while inside a fence.
	open: Option<(char, usize)>,
}

/// How a single line relates to fenced code blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineFence {
	/// The line lies between an opening and a closing fence.
	pub inside: bool,
	/// The line itself opens or closes a fence.
	pub delimiter: bool,
}

impl LineFence {
	/// Lines inside a fence and fence lines are never eligible for
	/// substitution.
	pub fn is_excluded(self) -> bool {
		self.inside || self.delimiter
	}
}

impl FenceState {
	pub fn is_fenced(&self) -> bool {
		self.open.is_some()
	}

	/// Feed the next line and classify it. A fence closes only on the same
	/// character with a run at least as long as the opening run.
	pub fn advance(&mut self, line: &str) -> LineFence {
		let run = FENCE_PATTERN
			.captures(line)
			.and_then(|captures| captures.get(1))
			.and_then(|run| {
				let run = run.as_str();
				let ch = run.chars().next()?;
				let len = run.chars().take_while(|c| *c == ch).count();
				(len >= 3).then_some((ch, len))
			});

		match (self.open, run) {
			(None, Some(fence)) => {
				self.open = Some(fence);
				LineFence {
					inside: false,
					delimiter: true,
				}
			}
			(Some((open_ch, open_len)), Some((ch, len))) if ch == open_ch && len >= open_len => {
				self.open = None;
				LineFence {
					inside: false,
					delimiter: true,
				}
			}
			(Some(_), _) => {
				LineFence {
					inside: true,
					delimiter: false,
				}
			}
			(None, None) => LineFence::default(),
		}
	}
}

/// Replay fence detection from the first line through `target` and return
/// the state after it together with the classification of `target`. Lines
/// of the metadata block never open a fence.
pub fn fence_state_through_line(host: &dyn EditorHost, target: usize) -> (FenceState, LineFence) {
	let metadata = metadata_block_lines(|line| host.line_text(line));
	let mut state = FenceState::default();
	let mut classification = LineFence::default();

	for line in 0..=target.min(host.line_count().saturating_sub(1)) {
		if metadata.as_ref().is_some_and(|block| block.contains(&line)) {
			classification = LineFence::default();
			continue;
		}
		let Some(text) = host.line_text(line) else {
			break;
		};
		classification = state.advance(text);
	}

	(state, classification)
}

/// Byte ranges of inline code spans. Backtick runs pair with the next run of
/// equal length; an unmatched run never closes.
pub fn inline_code_ranges(line: &str) -> Vec<Range<usize>> {
	code_ranges_from_runs(&delimiter_runs(line))
}

fn code_ranges_from_runs(runs: &[DelimiterRun]) -> Vec<Range<usize>> {
	let mut ranges = Vec::new();
	let mut open: Option<&DelimiterRun> = None;

	for run in runs.iter().filter(|run| run.kind == DelimiterKind::Backtick) {
		match open {
			None => open = Some(run),
			Some(opener) if opener.len() == run.len() => {
				ranges.push(opener.range.start..run.range.end);
				open = None;
			}
			Some(_) => {}
		}
	}

	ranges
}

/// Inline styles wrapping a span of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InlineStyle {
	pub bold: bool,
	pub italic: bool,
	pub strikethrough: bool,
	pub highlight: bool,
}

impl InlineStyle {
	#[must_use]
	pub fn union(self, other: Self) -> Self {
		Self {
			bold: self.bold || other.bold,
			italic: self.italic || other.italic,
			strikethrough: self.strikethrough || other.strikethrough,
			highlight: self.highlight || other.highlight,
		}
	}
}

/// A delimiter pair and the style it applies. `start..end` covers both
/// delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedRange {
	pub start: usize,
	pub end: usize,
	pub style: InlineStyle,
}

impl DelimitedRange {
	fn contains(&self, marker: &Marker) -> bool {
		self.start <= marker.start && marker.end <= self.end
	}
}

/// Fixed two-character delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
	/// `~~text~~`
	Strikethrough,
	/// `==text==`
	Highlight,
}

impl Delimiter {
	fn kind(self) -> DelimiterKind {
		match self {
			Self::Strikethrough => DelimiterKind::Tilde,
			Self::Highlight => DelimiterKind::Equals,
		}
	}

	fn style(self) -> InlineStyle {
		match self {
			Self::Strikethrough => {
				InlineStyle {
					strikethrough: true,
					..InlineStyle::default()
				}
			}
			Self::Highlight => {
				InlineStyle {
					highlight: true,
					..InlineStyle::default()
				}
			}
		}
	}
}

/// Overwrite every marker span with a neutral filler of the same byte length.
pub fn mask_markers(line: &str, markers: &[Marker]) -> String {
	let mut masked = String::with_capacity(line.len());
	let mut last = 0;

	for marker in markers {
		if marker.start < last || marker.end > line.len() {
			continue;
		}
		masked.push_str(&line[last..marker.start]);
		masked.extend(std::iter::repeat_n(MASK, marker.end - marker.start));
		last = marker.end;
	}

	masked.push_str(&line[last..]);
	masked
}

fn in_code(range: &Range<usize>, code_ranges: &[Range<usize>]) -> bool {
	code_ranges
		.iter()
		.any(|code| range.start < code.end && code.start < range.end)
}

/// Pair `*` and `_` runs into emphasis ranges. Runs of one character are
/// italic, two are bold and three or more are both. Pass a line that already
/// had its markers masked.
pub fn emphasis_ranges(line: &str, code_ranges: &[Range<usize>]) -> Vec<DelimitedRange> {
	emphasis_from_runs(line, &delimiter_runs(line), code_ranges)
}

fn emphasis_from_runs(
	line: &str,
	runs: &[DelimiterRun],
	code_ranges: &[Range<usize>],
) -> Vec<DelimitedRange> {
	let mut ranges = Vec::new();
	let mut stack: Vec<&DelimiterRun> = Vec::new();

	for run in runs {
		if !matches!(run.kind, DelimiterKind::Star | DelimiterKind::Underscore)
			|| in_code(&run.range, code_ranges)
		{
			continue;
		}

		let before = line[..run.range.start].chars().next_back();
		let after = line[run.range.end..].chars().next();
		let mut can_open = after.is_some_and(|c| !c.is_whitespace());
		let mut can_close = before.is_some_and(|c| !c.is_whitespace());

		// Intraword underscores are literal.
		if run.kind == DelimiterKind::Underscore
			&& before.is_some_and(char::is_alphanumeric)
			&& after.is_some_and(char::is_alphanumeric)
		{
			can_open = false;
			can_close = false;
		}

		if can_close {
			let opener = stack
				.iter()
				.rposition(|open| open.kind == run.kind && open.len() == run.len());
			if let Some(position) = opener {
				let open = stack[position];
				stack.truncate(position);
				ranges.push(DelimitedRange {
					start: open.range.start,
					end: run.range.end,
					style: InlineStyle {
						bold: run.len() >= 2,
						italic: run.len() != 2,
						..InlineStyle::default()
					},
				});
				continue;
			}
		}

		if can_open {
			stack.push(run);
		}
	}

	ranges
}

/// Pair exact two-character `~~` or `==` runs left to right, ignoring runs
/// inside inline code. Pass a line that already had its markers masked.
pub fn delimited_ranges(
	line: &str,
	delimiter: Delimiter,
	code_ranges: &[Range<usize>],
) -> Vec<DelimitedRange> {
	delimited_from_runs(&delimiter_runs(line), delimiter, code_ranges)
}

fn delimited_from_runs(
	runs: &[DelimiterRun],
	delimiter: Delimiter,
	code_ranges: &[Range<usize>],
) -> Vec<DelimitedRange> {
	let kind = delimiter.kind();
	let mut ranges = Vec::new();
	let mut open: Option<usize> = None;

	for run in runs {
		if run.kind != kind || run.len() != 2 || in_code(&run.range, code_ranges) {
			continue;
		}

		match open.take() {
			None => open = Some(run.range.start),
			Some(start) => {
				ranges.push(DelimitedRange {
					start,
					end: run.range.end,
					style: delimiter.style(),
				});
			}
		}
	}

	ranges
}

/// Code and style context of one line, recomputed on every scan pass.
#[derive(Debug, Clone, Default)]
pub struct LineContext {
	pub code_ranges: Vec<Range<usize>>,
	pub style_ranges: Vec<DelimitedRange>,
}

impl LineContext {
	pub fn analyze(line: &str, markers: &[Marker]) -> Self {
		let code_ranges = inline_code_ranges(line);
		let masked = mask_markers(line, markers);

		let mut style_ranges = emphasis_ranges(&masked, &code_ranges);
		style_ranges.extend(delimited_ranges(&masked, Delimiter::Strikethrough, &code_ranges));
		style_ranges.extend(delimited_ranges(&masked, Delimiter::Highlight, &code_ranges));

		Self {
			code_ranges,
			style_ranges,
		}
	}

	/// A marker touching an inline code span, even partially, is excluded.
	pub fn in_code(&self, marker: &Marker) -> bool {
		self.code_ranges.iter().any(|code| marker.overlaps(code))
	}

	/// Combined style of every delimiter pair enclosing the marker.
	pub fn style_of(&self, marker: &Marker) -> InlineStyle {
		self.style_ranges
			.iter()
			.filter(|range| range.contains(marker))
			.fold(InlineStyle::default(), |style, range| style.union(range.style))
	}
}
