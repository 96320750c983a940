use std::ops::Range;

use derive_more::Deref;
use tracing::debug;
use tracing::trace;

use crate::DocumentId;
use crate::EditorHost;
use crate::FmarkConfig;
use crate::InlineStyle;
use crate::MetadataStore;
use crate::Resolver;
use crate::StyleFingerprint;
use crate::TextDelta;
use crate::ViewEvent;
use crate::frontmatter::metadata_block_lines;
use crate::host::map_range;
use crate::scanner::FenceState;
use crate::scanner::LineContext;
use crate::scanner::LineMarkerCache;
use crate::scanner::is_fence_line;
use crate::scanner::scan_line;

/// An instruction to display `replacement` in place of the marker text at
/// `range` without touching the stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
	/// Absolute byte range of the marker in the document.
	pub range: Range<usize>,
	/// The key path the marker names.
	pub key: String,
	/// The resolved value. Empty when the key exists with an empty value.
	pub replacement: String,
	/// Rich rendering of the value once the host has produced one.
	pub rendered: Option<String>,
	/// The document the value was resolved against.
	pub document: DocumentId,
	pub style: StyleFingerprint,
	/// Emphasis inherited from the text around the marker.
	pub inline: InlineStyle,
}

impl Decoration {
	/// Present but empty values render as a visible placeholder.
	pub fn is_empty_value(&self) -> bool {
		self.replacement.is_empty()
	}

	/// The rich rendering when available, otherwise the plain value.
	pub fn display_text(&self) -> &str {
		self.rendered.as_deref().unwrap_or(&self.replacement)
	}

	/// Class names a renderer can attach to the replacement widget.
	pub fn class_names(&self) -> Vec<&'static str> {
		let mut classes = vec!["fmark-value"];
		if self.is_empty_value() {
			classes.push("fmark-empty");
		}
		if self.inline.bold {
			classes.push("fmark-bold");
		}
		if self.inline.italic {
			classes.push("fmark-italic");
		}
		if self.inline.strikethrough {
			classes.push("fmark-strikethrough");
		}
		if self.inline.highlight {
			classes.push("fmark-highlight");
		}
		classes
	}
}

/// The decorations produced by one evaluation pass, sorted by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct DecorationSet {
	generation: u64,
	#[deref]
	decorations: Vec<Decoration>,
}

impl DecorationSet {
	/// The evaluation pass that produced this set.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Produce the displayed text: `text` with every decorated span replaced.
	/// `text` must be the document the set was computed or remapped for.
	pub fn apply(&self, text: &str) -> String {
		let mut result = String::with_capacity(text.len());
		let mut last = 0;

		for decoration in &self.decorations {
			let Range { start, end } = decoration.range;
			if start < last || end > text.len() {
				continue;
			}
			result.push_str(&text[last..start]);
			result.push_str(decoration.display_text());
			last = end;
		}

		result.push_str(&text[last..]);
		result
	}

	fn map_through(&mut self, deltas: &[TextDelta]) {
		self.decorations.retain_mut(|decoration| {
			match map_range(deltas, &decoration.range) {
				Some(range) => {
					decoration.range = range;
					true
				}
				None => false,
			}
		});
	}
}

/// Identifies one decoration of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTicket {
	pub generation: u64,
	pub index: usize,
}

/// A request for the host to produce a rich rendering of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
	pub ticket: RenderTicket,
	pub text: String,
	pub document: DocumentId,
}

/// Which lines an evaluation pass scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanScope {
	/// Only the lines the host reports as visible.
	Visible,
	/// Every line of the document.
	Full,
}

/// Decoration state for one open view of a document.
///
/// The view idles on its cached [`DecorationSet`] and re-evaluates when an
/// event makes the cache wrong: edits touching a marker or the metadata
/// block, viewport changes, carets entering or leaving a marker, style
/// changes and explicit refreshes.
#[derive(Debug)]
pub struct MarkerView {
	config: FmarkConfig,
	fingerprint: StyleFingerprint,
	cache: LineMarkerCache,
	decorations: DecorationSet,
	generation: u64,
	/// Every eligible marker span seen by the last pass, decorated or not.
	matched: Vec<Range<usize>>,
	/// Marker spans holding a caret during the last pass.
	active: Vec<Range<usize>>,
	/// Fence delimiter lines seen by the last pass.
	fences: Vec<Range<usize>>,
	metadata_block: Option<Range<usize>>,
	refresh_pending: bool,
}

impl MarkerView {
	pub fn new(config: FmarkConfig) -> Self {
		Self {
			fingerprint: config.style.fingerprint(),
			config,
			cache: LineMarkerCache::new(),
			decorations: DecorationSet::default(),
			generation: 0,
			matched: Vec::new(),
			active: Vec::new(),
			fences: Vec::new(),
			metadata_block: None,
			refresh_pending: false,
		}
	}

	pub fn config(&self) -> &FmarkConfig {
		&self.config
	}

	pub fn decorations(&self) -> &DecorationSet {
		&self.decorations
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Marker spans currently left as raw text because a caret sits in them.
	pub fn active_spans(&self) -> &[Range<usize>] {
		&self.active
	}

	pub fn cached_lines(&self) -> usize {
		self.cache.len()
	}

	pub fn needs_refresh(&self) -> bool {
		self.refresh_pending
	}

	/// Force the next handled event to rescan the whole document.
	pub fn request_refresh(&mut self) {
		self.refresh_pending = true;
	}

	/// Replace the configuration. Returns `true` when the change requires a
	/// full rescan, which is then scheduled.
	pub fn set_config(&mut self, config: FmarkConfig) -> bool {
		if !self.config.requires_rescan(&config) {
			self.config = config;
			return false;
		}

		if self.config.syntax != config.syntax {
			self.cache.clear();
		}
		self.fingerprint = config.style.fingerprint();
		self.config = config;
		self.refresh_pending = true;
		true
	}

	/// React to a host notification. Returns `true` when an evaluation pass
	/// ran, `false` when the cached decorations were kept.
	pub fn handle(
		&mut self,
		event: &ViewEvent,
		host: &dyn EditorHost,
		store: &dyn MetadataStore,
	) -> bool {
		let scope = match event {
			ViewEvent::TextChanged(deltas) => {
				if self.edit_requires_rescan(deltas, host) {
					Some(ScanScope::Visible)
				} else {
					self.remap(deltas);
					self.carets_moved(host).then_some(ScanScope::Visible)
				}
			}
			ViewEvent::ViewportChanged => Some(ScanScope::Visible),
			ViewEvent::SelectionChanged => self.carets_moved(host).then_some(ScanScope::Visible),
			ViewEvent::StyleChanged | ViewEvent::RefreshRequested => Some(ScanScope::Full),
			ViewEvent::MetadataChanged(document) => {
				(host.document_id() == Some(document)).then_some(ScanScope::Full)
			}
		};

		let scope = if self.refresh_pending {
			Some(ScanScope::Full)
		} else {
			scope
		};

		match scope {
			Some(scope) => {
				if scope == ScanScope::Full {
					debug!(?event, "full rescan");
				}
				self.evaluate(host, store, scope);
				true
			}
			None => false,
		}
	}

	/// Run an evaluation pass and replace the cached decorations.
	pub fn evaluate(
		&mut self,
		host: &dyn EditorHost,
		store: &dyn MetadataStore,
		scope: ScanScope,
	) -> &DecorationSet {
		self.generation += 1;
		self.refresh_pending = false;
		self.matched.clear();
		self.active.clear();
		self.fences.clear();
		self.metadata_block = None;

		let mut decorations = Vec::new();
		if host.is_rendered_mode() {
			if let Some(document) = host.document_id() {
				self.scan(host, store, document, scope, &mut decorations);
			}
		}

		self.decorations = DecorationSet {
			generation: self.generation,
			decorations,
		};
		&self.decorations
	}

	fn scan(
		&mut self,
		host: &dyn EditorHost,
		store: &dyn MetadataStore,
		document: &DocumentId,
		scope: ScanScope,
		decorations: &mut Vec<Decoration>,
	) {
		let mapping = store.mapping(document);
		let info = if self.config.builtin_keys {
			store.document_info(document)
		} else {
			None
		};
		let mut resolver = Resolver::new(
			mapping.as_ref(),
			self.config.case_insensitive,
			info.as_ref(),
			self.config.builtin_keys,
		);
		if resolver.is_inert() {
			return;
		}

		let line_count = host.line_count();
		self.cache.truncate(line_count);

		let metadata_lines = metadata_block_lines(|line| host.line_text(line));
		self.metadata_block = metadata_lines
			.as_ref()
			.and_then(|lines| block_bytes(host, lines));

		let ranges = match scope {
			ScanScope::Full => vec![0..line_count],
			ScanScope::Visible => merge_line_ranges(host.visible_line_ranges(), line_count),
		};
		let carets = carets(host);
		let syntax = self.config.syntax;

		// Fence state is replayed from the top on every pass so that cached
		// markers are never judged against a stale fence.
		let mut fence = FenceState::default();
		let mut next_line = 0;

		for range in ranges {
			for line in next_line..range.end {
				let Some(text) = host.line_text(line) else {
					break;
				};
				if metadata_lines
					.as_ref()
					.is_some_and(|block| block.contains(&line))
				{
					continue;
				}

				let line_start = host.line_start(line).unwrap_or_default();
				let line_fence = fence.advance(text);
				if line_fence.delimiter {
					self.fences.push(line_start..line_start + text.len());
				}
				if line < range.start || line_fence.is_excluded() {
					continue;
				}

				let markers = self.cache.markers(line, text, syntax);
				if markers.is_empty() {
					continue;
				}

				let context = LineContext::analyze(text, markers);

				for marker in markers {
					if context.in_code(marker) {
						continue;
					}

					let span = line_start + marker.start..line_start + marker.end;
					self.matched.push(span.clone());

					if carets.iter().any(|caret| caret_in_span(*caret, &span)) {
						self.active.push(span);
						continue;
					}

					let Some(replacement) = resolver.resolve(&marker.key) else {
						continue;
					};

					decorations.push(Decoration {
						range: span,
						key: marker.key.clone(),
						replacement,
						rendered: None,
						document: document.clone(),
						style: self.fingerprint,
						inline: context.style_of(marker),
					});
				}
			}
			next_line = next_line.max(range.end);
		}

		let (hits, misses) = self.cache.take_stats();
		trace!(
			hits,
			misses,
			decorations = decorations.len(),
			resolved_keys = resolver.cached_len(),
			"marker scan finished"
		);
	}

	/// Whether an edit invalidates the cached decorations: it touches the
	/// metadata block, a marker span or a fence line before or after the
	/// edit.
	fn edit_requires_rescan(&self, deltas: &[TextDelta], host: &dyn EditorHost) -> bool {
		let touches_before = deltas.iter().any(|delta| {
			self.metadata_block
				.as_ref()
				.is_some_and(|block| delta.touches_before(block))
				|| self.matched.iter().any(|span| delta.touches_before(span))
				|| self.fences.iter().any(|span| delta.touches_before(span))
		});
		if touches_before {
			return true;
		}

		let metadata_after = metadata_block_lines(|line| host.line_text(line))
			.and_then(|lines| block_bytes(host, &lines));
		if let Some(block) = &metadata_after {
			if deltas.iter().any(|delta| delta.touches_after(block)) {
				return true;
			}
		}

		let syntax = self.config.syntax;
		deltas.iter().any(|delta| {
			let first = line_at_offset(host, delta.from_b);
			let last = line_at_offset(host, delta.to_b);
			(first..=last).any(|line| {
				let (Some(text), Some(start)) = (host.line_text(line), host.line_start(line)) else {
					return false;
				};
				is_fence_line(text)
					|| scan_line(syntax, text).iter().any(|marker| {
						delta.touches_after(&(start + marker.start..start + marker.end))
					})
			})
		})
	}

	fn remap(&mut self, deltas: &[TextDelta]) {
		self.decorations.map_through(deltas);
		self.matched = self
			.matched
			.iter()
			.filter_map(|span| map_range(deltas, span))
			.collect();
		self.active = self
			.active
			.iter()
			.filter_map(|span| map_range(deltas, span))
			.collect();
		self.fences = self
			.fences
			.iter()
			.filter_map(|span| map_range(deltas, span))
			.collect();
		self.metadata_block = self
			.metadata_block
			.as_ref()
			.and_then(|block| map_range(deltas, block));
	}

	/// Whether the set of marker spans holding a caret differs from the last
	/// pass.
	fn carets_moved(&self, host: &dyn EditorHost) -> bool {
		let carets = carets(host);
		let active: Vec<&Range<usize>> = self
			.matched
			.iter()
			.filter(|span| carets.iter().any(|caret| caret_in_span(*caret, span)))
			.collect();

		active.len() != self.active.len()
			|| active.iter().zip(&self.active).any(|(now, before)| *now != before)
	}

	/// Requests for rich rendering of every decoration in the current set.
	pub fn render_requests(&self) -> Vec<RenderRequest> {
		self.decorations
			.iter()
			.enumerate()
			.map(|(index, decoration)| {
				RenderRequest {
					ticket: RenderTicket {
						generation: self.decorations.generation,
						index,
					},
					text: decoration.replacement.clone(),
					document: decoration.document.clone(),
				}
			})
			.collect()
	}

	/// Apply a finished rich rendering. Completions from a superseded pass
	/// are discarded and `false` is returned.
	pub fn complete_render(&mut self, ticket: RenderTicket, rendered: String) -> bool {
		if ticket.generation != self.decorations.generation {
			debug!(
				ticket = ticket.generation,
				current = self.decorations.generation,
				"discarding stale render"
			);
			return false;
		}

		let Some(decoration) = self.decorations.decorations.get_mut(ticket.index) else {
			return false;
		};
		decoration.rendered = Some(rendered);
		true
	}
}

/// Offsets of every empty selection.
fn carets(host: &dyn EditorHost) -> Vec<usize> {
	host.selections()
		.iter()
		.filter(|selection| selection.is_empty())
		.map(|selection| selection.head)
		.collect()
}

/// A caret on either boundary of a marker counts as inside it.
fn caret_in_span(caret: usize, span: &Range<usize>) -> bool {
	span.start <= caret && caret <= span.end
}

fn block_bytes(host: &dyn EditorHost, lines: &Range<usize>) -> Option<Range<usize>> {
	let last = lines.end.checked_sub(1)?;
	let end = host.line_start(last)? + host.line_text(last)?.len();
	Some(0..end)
}

/// Sort, clamp and merge visible line ranges so no line is scanned twice.
fn merge_line_ranges(mut ranges: Vec<Range<usize>>, line_count: usize) -> Vec<Range<usize>> {
	ranges.retain(|range| range.start < range.end.min(line_count));
	ranges.sort_by_key(|range| range.start);

	let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
	for range in ranges {
		let range = range.start..range.end.min(line_count);
		match merged.last_mut() {
			Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
			_ => merged.push(range),
		}
	}
	merged
}

/// Zero-indexed line containing a byte offset, by binary search over the
/// host's line starts.
fn line_at_offset(host: &dyn EditorHost, offset: usize) -> usize {
	let mut low = 0;
	let mut high = host.line_count();

	while low + 1 < high {
		let mid = low + (high - low) / 2;
		match host.line_start(mid) {
			Some(start) if start <= offset => low = mid,
			_ => high = mid,
		}
	}

	low
}
