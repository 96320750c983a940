use std::collections::HashMap;
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use derive_more::Deref;

use crate::Mapping;

/// Stable identity of a document, usually its vault-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deref)]
pub struct DocumentId(String);

impl DocumentId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for DocumentId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&Path> for DocumentId {
	fn from(path: &Path) -> Self {
		Self(path.to_string_lossy().replace('\\', "/"))
	}
}

/// Identity and stat attributes of a document, the source of built-in keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
	/// Path of the document relative to its vault or project root.
	pub path: PathBuf,
	/// Creation time, when the platform reports one.
	pub created: Option<SystemTime>,
	/// Last modification time.
	pub modified: Option<SystemTime>,
}

impl DocumentInfo {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			created: None,
			modified: None,
		}
	}

	/// Build from filesystem metadata. Timestamps the platform cannot report
	/// are left empty.
	pub fn from_metadata(path: impl Into<PathBuf>, metadata: &std::fs::Metadata) -> Self {
		Self {
			path: path.into(),
			created: metadata.created().ok(),
			modified: metadata.modified().ok(),
		}
	}

	#[must_use]
	pub fn with_times(mut self, created: Option<SystemTime>, modified: Option<SystemTime>) -> Self {
		self.created = created;
		self.modified = modified;
		self
	}
}

/// A selection range. An empty selection (`anchor == head`) is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
	pub anchor: usize,
	pub head: usize,
}

impl Selection {
	pub fn caret(offset: usize) -> Self {
		Self {
			anchor: offset,
			head: offset,
		}
	}

	pub fn range(anchor: usize, head: usize) -> Self {
		Self { anchor, head }
	}

	pub fn is_empty(&self) -> bool {
		self.anchor == self.head
	}
}

/// One replaced span of an edit. `from_a..to_a` is the replaced range in the
/// document before the edit and `from_b..to_b` the inserted range after it.
/// Deltas of a single edit are sorted and never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDelta {
	pub from_a: usize,
	pub to_a: usize,
	pub from_b: usize,
	pub to_b: usize,
}

impl TextDelta {
	/// Net change in document length caused by this delta.
	pub fn shift(&self) -> isize {
		(self.to_b - self.from_b) as isize - (self.to_a - self.from_a) as isize
	}

	/// Whether this delta touches `range` in pre-edit coordinates. Touching
	/// either end counts.
	pub fn touches_before(&self, range: &Range<usize>) -> bool {
		self.from_a <= range.end && range.start <= self.to_a
	}

	/// Whether this delta touches `range` in post-edit coordinates.
	pub fn touches_after(&self, range: &Range<usize>) -> bool {
		self.from_b <= range.end && range.start <= self.to_b
	}
}

/// Map a pre-edit range that no delta touches into post-edit coordinates.
/// Returns `None` when a delta touches the range.
pub fn map_range(deltas: &[TextDelta], range: &Range<usize>) -> Option<Range<usize>> {
	let mut shift = 0isize;
	for delta in deltas {
		if delta.touches_before(range) {
			return None;
		}
		if delta.to_a < range.start {
			shift += delta.shift();
		}
	}
	let start = range.start.checked_add_signed(shift)?;
	let end = range.end.checked_add_signed(shift)?;
	Some(start..end)
}

/// Notifications delivered by the host to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
	TextChanged(Vec<TextDelta>),
	ViewportChanged,
	SelectionChanged,
	StyleChanged,
	RefreshRequested,
	MetadataChanged(DocumentId),
}

/// The narrow view of an editor that the decoration engine needs. Host
/// adapters implement this for whatever concrete view type they own.
pub trait EditorHost {
	/// Identity of the document shown, if the view shows a document at all.
	fn document_id(&self) -> Option<&DocumentId>;
	/// Number of lines in the document. Always at least one.
	fn line_count(&self) -> usize;
	/// Text of a zero-indexed line, without its line terminator.
	fn line_text(&self, line: usize) -> Option<&str>;
	/// Byte offset where a zero-indexed line starts.
	fn line_start(&self, line: usize) -> Option<usize>;
	fn full_text(&self) -> &str;
	/// Visible zero-indexed line ranges. Ranges may overlap.
	fn visible_line_ranges(&self) -> Vec<Range<usize>>;
	fn selections(&self) -> &[Selection];
	/// `true` in live-preview mode, `false` in raw source mode.
	fn is_rendered_mode(&self) -> bool;
}

/// Supplies per-document metadata. Mappings are fetched fresh on every
/// evaluation pass.
pub trait MetadataStore {
	fn mapping(&self, document: &DocumentId) -> Option<Mapping>;
	fn document_info(&self, document: &DocumentId) -> Option<DocumentInfo>;
}

/// Document text with a pre-computed line table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
	text: String,
	/// Byte offsets of the start of each line. `line_starts[0]` is always 0.
	line_starts: Vec<usize>,
}

impl TextBuffer {
	pub fn new(text: impl Into<String>) -> Self {
		let text = text.into();
		let line_starts = line_starts(&text);
		Self { text, line_starts }
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn len(&self) -> usize {
		self.text.len()
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}

	pub fn line_count(&self) -> usize {
		self.line_starts.len()
	}

	pub fn line_start(&self, line: usize) -> Option<usize> {
		self.line_starts.get(line).copied()
	}

	pub fn line(&self, line: usize) -> Option<&str> {
		let start = *self.line_starts.get(line)?;
		let end = self
			.line_starts
			.get(line + 1)
			.map_or(self.text.len(), |next| next - 1);
		self.text.get(start..end)
	}

	/// Zero-indexed line containing a byte offset.
	pub fn line_of_offset(&self, offset: usize) -> usize {
		match self.line_starts.binary_search(&offset) {
			Ok(exact) => exact,
			Err(insert) => insert.saturating_sub(1),
		}
	}

	/// Replace `range` with `insert` and return the delta describing the edit.
	/// The range is clamped to the text and both ends are moved back to the
	/// nearest character boundary.
	pub fn replace(&mut self, range: Range<usize>, insert: &str) -> TextDelta {
		let end = floor_char_boundary(&self.text, range.end);
		let start = floor_char_boundary(&self.text, range.start.min(end));
		let delta = TextDelta {
			from_a: start,
			to_a: end,
			from_b: start,
			to_b: start + insert.len(),
		};
		self.text.replace_range(start..end, insert);
		self.line_starts = line_starts(&self.text);
		delta
	}
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
	let mut offset = offset.min(text.len());
	while !text.is_char_boundary(offset) {
		offset -= 1;
	}
	offset
}

fn line_starts(text: &str) -> Vec<usize> {
	let mut starts = vec![0];
	for (i, byte) in text.bytes().enumerate() {
		if byte == b'\n' {
			starts.push(i + 1);
		}
	}
	starts
}

/// An in-memory host: a text buffer plus viewport, selection and mode state.
/// Used by the command line adapter and tests.
#[derive(Debug, Clone)]
pub struct MemoryHost {
	document: Option<DocumentId>,
	buffer: TextBuffer,
	visible: Option<Vec<Range<usize>>>,
	selections: Vec<Selection>,
	rendered: bool,
}

impl MemoryHost {
	/// A host in rendered mode with every line visible and no selection.
	pub fn new(document: Option<DocumentId>, text: impl Into<String>) -> Self {
		Self {
			document,
			buffer: TextBuffer::new(text),
			visible: None,
			selections: Vec::new(),
			rendered: true,
		}
	}

	pub fn buffer(&self) -> &TextBuffer {
		&self.buffer
	}

	/// Restrict the viewport. `None` makes every line visible.
	pub fn set_visible_lines(&mut self, ranges: Option<Vec<Range<usize>>>) {
		self.visible = ranges;
	}

	pub fn set_selections(&mut self, selections: Vec<Selection>) {
		self.selections = selections;
	}

	pub fn set_caret(&mut self, offset: usize) {
		self.selections = vec![Selection::caret(offset)];
	}

	pub fn clear_selections(&mut self) {
		self.selections.clear();
	}

	pub fn set_rendered_mode(&mut self, rendered: bool) {
		self.rendered = rendered;
	}

	pub fn set_document(&mut self, document: Option<DocumentId>) {
		self.document = document;
	}

	/// Apply an edit. Carets after the edit shift with it; carets inside it
	/// move to the end of the inserted text.
	pub fn edit(&mut self, range: Range<usize>, insert: &str) -> TextDelta {
		let delta = self.buffer.replace(range, insert);
		for selection in &mut self.selections {
			selection.anchor = map_offset(&delta, selection.anchor);
			selection.head = map_offset(&delta, selection.head);
		}
		delta
	}
}

fn map_offset(delta: &TextDelta, offset: usize) -> usize {
	if offset < delta.from_a {
		offset
	} else if offset >= delta.to_a && offset > delta.from_a {
		offset.saturating_add_signed(delta.shift())
	} else {
		delta.to_b
	}
}

impl EditorHost for MemoryHost {
	fn document_id(&self) -> Option<&DocumentId> {
		self.document.as_ref()
	}

	fn line_count(&self) -> usize {
		self.buffer.line_count()
	}

	fn line_text(&self, line: usize) -> Option<&str> {
		self.buffer.line(line)
	}

	fn line_start(&self, line: usize) -> Option<usize> {
		self.buffer.line_start(line)
	}

	fn full_text(&self) -> &str {
		self.buffer.text()
	}

	fn visible_line_ranges(&self) -> Vec<Range<usize>> {
		match &self.visible {
			Some(ranges) => ranges.clone(),
			None => vec![0..self.buffer.line_count()],
		}
	}

	fn selections(&self) -> &[Selection] {
		&self.selections
	}

	fn is_rendered_mode(&self) -> bool {
		self.rendered
	}
}

/// Metadata held in memory, keyed by document.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
	mappings: HashMap<DocumentId, Mapping>,
	documents: HashMap<DocumentId, DocumentInfo>,
}

impl MemoryMetadataStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert_mapping(&mut self, document: DocumentId, mapping: Mapping) {
		self.mappings.insert(document, mapping);
	}

	pub fn remove_mapping(&mut self, document: &DocumentId) -> Option<Mapping> {
		self.mappings.remove(document)
	}

	pub fn insert_document(&mut self, document: DocumentId, info: DocumentInfo) {
		self.documents.insert(document, info);
	}
}

impl MetadataStore for MemoryMetadataStore {
	fn mapping(&self, document: &DocumentId) -> Option<Mapping> {
		self.mappings.get(document).cloned()
	}

	fn document_info(&self, document: &DocumentId) -> Option<DocumentInfo> {
		self.documents.get(document).cloned()
	}
}
