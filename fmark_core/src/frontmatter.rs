use std::ops::Range;
use std::path::Path;

use serde_json::Value;

use crate::DocumentId;
use crate::DocumentInfo;
use crate::FmarkError;
use crate::FmarkResult;
use crate::Mapping;
use crate::MemoryMetadataStore;

/// A parsed metadata block at the top of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
	/// The parsed YAML mapping, in document order.
	pub mapping: Mapping,
	/// Zero-indexed lines covered by the block, both fences included.
	pub lines: Range<usize>,
	/// Byte range of the block, from the opening fence to the end of the
	/// closing fence line (terminator excluded).
	pub bytes: Range<usize>,
	/// Byte offset where the body after the block starts.
	pub body_start: usize,
}

fn is_block_open(line: &str) -> bool {
	line.trim_end() == "---"
}

fn is_block_close(line: &str) -> bool {
	matches!(line.trim_end(), "---" | "...")
}

/// Locate the metadata block from a line accessor. The block must open on
/// the first line; an unterminated block is treated as no block.
pub fn metadata_block_lines<'a>(
	mut line_text: impl FnMut(usize) -> Option<&'a str>,
) -> Option<Range<usize>> {
	if !line_text(0).is_some_and(is_block_open) {
		return None;
	}

	let mut line = 1;
	while let Some(text) = line_text(line) {
		if is_block_close(text) {
			return Some(0..line + 1);
		}
		line += 1;
	}

	None
}

/// Byte range of the metadata block in `content`, terminator of the closing
/// line excluded.
pub fn metadata_block_range(content: &str) -> Option<Range<usize>> {
	let lines: Vec<&str> = content.split('\n').collect();
	let block = metadata_block_lines(|line| lines.get(line).copied())?;
	let end: usize = lines[..block.end].iter().map(|line| line.len() + 1).sum::<usize>() - 1;
	Some(0..end)
}

/// Split the metadata block off the top of `content` and parse it.
///
/// Returns `Ok(None)` when the document has no block. A block that opens but
/// never closes is an error here, since loading it would swallow the body.
pub fn split(content: &str, path_display: &str) -> FmarkResult<Option<Frontmatter>> {
	let lines: Vec<&str> = content.split('\n').collect();
	if !lines.first().copied().is_some_and(is_block_open) {
		return Ok(None);
	}

	let Some(block) = metadata_block_lines(|line| lines.get(line).copied()) else {
		return Err(FmarkError::UnterminatedFrontmatter(path_display.to_string()));
	};

	let closing_line = block.end - 1;
	let yaml_start = lines[0].len() + 1;
	let closing_start: usize = lines[..closing_line].iter().map(|line| line.len() + 1).sum();
	let closing_end = closing_start + lines[closing_line].len();
	let yaml = &content[yaml_start..closing_start];
	let mapping = parse_mapping(yaml, path_display)?;

	Ok(Some(Frontmatter {
		mapping,
		lines: block,
		bytes: 0..closing_end,
		body_start: (closing_end + 1).min(content.len()),
	}))
}

fn parse_mapping(yaml: &str, path_display: &str) -> FmarkResult<Mapping> {
	if yaml.trim().is_empty() {
		return Ok(Mapping::new());
	}

	let value: Value = serde_yaml_ng::from_str(yaml).map_err(|e| {
		FmarkError::Frontmatter {
			path: path_display.to_string(),
			reason: e.to_string(),
		}
	})?;

	match value {
		Value::Object(mapping) => Ok(mapping),
		Value::Null => Ok(Mapping::new()),
		other => {
			Err(FmarkError::Frontmatter {
				path: path_display.to_string(),
				reason: format!("expected a mapping, found {}", value_kind(&other)),
			})
		}
	}
}

fn value_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "a sequence",
		Value::Object(_) => "a mapping",
	}
}

/// Normalize CRLF line endings to LF.
pub fn normalize_line_endings(content: &str) -> String {
	if content.contains('\r') {
		content.replace("\r\n", "\n")
	} else {
		content.to_string()
	}
}

/// A document read from disk together with its metadata.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
	pub id: DocumentId,
	pub text: String,
	/// `None` when the document has no metadata block.
	pub mapping: Option<Mapping>,
	pub info: DocumentInfo,
}

impl LoadedDocument {
	/// Add this document's mapping and attributes to a store.
	pub fn register(&self, store: &mut MemoryMetadataStore) {
		if let Some(mapping) = &self.mapping {
			store.insert_mapping(self.id.clone(), mapping.clone());
		}
		store.insert_document(self.id.clone(), self.info.clone());
	}
}

/// Read a markdown document and parse its metadata block.
pub fn load_document(path: &Path) -> FmarkResult<LoadedDocument> {
	let text = normalize_line_endings(&std::fs::read_to_string(path)?);
	let metadata = std::fs::metadata(path)?;
	let frontmatter = split(&text, &path.display().to_string())?;

	Ok(LoadedDocument {
		id: DocumentId::from(path),
		mapping: frontmatter.map(|block| block.mapping),
		info: DocumentInfo::from_metadata(path, &metadata),
		text,
	})
}
