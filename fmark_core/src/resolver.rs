use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use chrono::DateTime;
use chrono::Local;
use serde_json::Value;

use crate::DocumentInfo;

/// Ordered, arbitrarily nested key/value metadata attached to one document.
pub type Mapping = serde_json::Map<String, Value>;

/// Format used for date-like built-in keys.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator used in key-index node paths. Keys may legitimately contain
/// `.` so the dotted form cannot be used.
const NODE_PATH_SEPARATOR: char = '\u{1f}';

/// Document attributes that resolve without consulting the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltInKey {
	/// File name with extension, e.g. `note.md`.
	Filename,
	/// File name without extension, e.g. `note`.
	Basename,
	/// Extension without the dot, e.g. `md`.
	Extension,
	/// Full document path.
	Path,
	/// Containing folder, `/` at the root.
	Folder,
	/// Wiki link to the document, e.g. `[[note]]`.
	Link,
	/// Creation time.
	Ctime,
	/// Modification time.
	Mtime,
}

impl BuiltInKey {
	pub const ALL: [BuiltInKey; 8] = [
		BuiltInKey::Filename,
		BuiltInKey::Basename,
		BuiltInKey::Extension,
		BuiltInKey::Path,
		BuiltInKey::Folder,
		BuiltInKey::Link,
		BuiltInKey::Ctime,
		BuiltInKey::Mtime,
	];

	pub fn name(self) -> &'static str {
		match self {
			Self::Filename => "filename",
			Self::Basename => "basename",
			Self::Extension => "extension",
			Self::Path => "path",
			Self::Folder => "folder",
			Self::Link => "link",
			Self::Ctime => "ctime",
			Self::Mtime => "mtime",
		}
	}

	/// Match a single-segment key. Dotted keys never name a built-in.
	pub fn parse(key: &str, case_insensitive: bool) -> Option<Self> {
		let key = key.trim();
		if key.is_empty() || key.contains('.') {
			return None;
		}

		Self::ALL.into_iter().find(|builtin| {
			if case_insensitive {
				builtin.name().eq_ignore_ascii_case(key)
			} else {
				builtin.name() == key
			}
		})
	}
}

/// Split a key path on `.`, trimming segments and dropping empty ones.
pub fn split_key_path(key_path: &str) -> Vec<&str> {
	key_path
		.split('.')
		.map(str::trim)
		.filter(|segment| !segment.is_empty())
		.collect()
}

/// Resolve a dotted key path against `mapping`.
///
/// Returns `None` when a segment is missing or the walk reaches a value that
/// is not a mapping before the path ends. A `null` value resolves to an empty
/// string, so "present but empty" and "absent" stay distinguishable.
pub fn resolve(mapping: &Mapping, key_path: &str, case_insensitive: bool) -> Option<String> {
	let mut index = KeyIndex::default();
	lookup(mapping, key_path, case_insensitive, &mut index).map(format_value)
}

/// Resolve a built-in document attribute.
pub fn resolve_builtin(document: &DocumentInfo, key: &str, case_insensitive: bool) -> Option<String> {
	let builtin = BuiltInKey::parse(key, case_insensitive)?;
	let path = document.path.as_path();

	match builtin {
		BuiltInKey::Filename => Some(os_str_lossy(path.file_name())),
		BuiltInKey::Basename => Some(os_str_lossy(path.file_stem())),
		BuiltInKey::Extension => Some(os_str_lossy(path.extension())),
		BuiltInKey::Path => Some(display_path(path)),
		BuiltInKey::Folder => {
			let folder = path.parent().map(display_path).unwrap_or_default();
			if folder.is_empty() {
				Some("/".to_string())
			} else {
				Some(folder)
			}
		}
		BuiltInKey::Link => Some(format!("[[{}]]", os_str_lossy(path.file_stem()))),
		BuiltInKey::Ctime => document.created.map(format_time),
		BuiltInKey::Mtime => document.modified.map(format_time),
	}
}

/// Render a timestamp the way date-like built-ins display it, in local time.
pub fn format_time(time: SystemTime) -> String {
	DateTime::<Local>::from(time)
		.format(DATE_TIME_FORMAT)
		.to_string()
}

fn os_str_lossy(value: Option<&std::ffi::OsStr>) -> String {
	value.map(|v| v.to_string_lossy().into_owned()).unwrap_or_default()
}

fn display_path(path: &Path) -> String {
	path.to_string_lossy().replace('\\', "/")
}

/// Format a resolved value for inline display.
///
/// Sequences join their formatted elements with `, `, dropping empty ones.
/// Nested mappings fall back to compact JSON since they have no inline form.
pub fn format_value(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => n.to_string(),
		Value::String(s) => s.clone(),
		Value::Array(items) => {
			items
				.iter()
				.map(format_value)
				.filter(|item| !item.is_empty())
				.collect::<Vec<_>>()
				.join(", ")
		}
		Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
	}
}

/// Lowercase → actual key indexes for mapping nodes, built on first
/// case-insensitive miss and keyed by the node's path from the root.
#[derive(Debug, Default)]
struct KeyIndex {
	nodes: HashMap<String, HashMap<String, String>>,
}

impl KeyIndex {
	fn actual_key(&mut self, node_path: &str, node: &Mapping, segment: &str) -> Option<String> {
		let index = self.nodes.entry(node_path.to_string()).or_insert_with(|| {
			let mut index = HashMap::with_capacity(node.len());
			for key in node.keys() {
				// The first key in document order wins a case-folded collision.
				index.entry(key.to_lowercase()).or_insert_with(|| key.clone());
			}
			index
		});

		index.get(&segment.to_lowercase()).cloned()
	}

	fn len(&self) -> usize {
		self.nodes.len()
	}
}

fn lookup<'m>(
	mapping: &'m Mapping,
	key_path: &str,
	case_insensitive: bool,
	index: &mut KeyIndex,
) -> Option<&'m Value> {
	let segments = split_key_path(key_path);
	let (first, rest) = segments.split_first()?;

	let mut node_path = String::new();
	let mut current = lookup_segment(mapping, first, case_insensitive, index, &mut node_path)?;

	for segment in rest {
		let Value::Object(node) = current else {
			return None;
		};
		current = lookup_segment(node, segment, case_insensitive, index, &mut node_path)?;
	}

	Some(current)
}

fn lookup_segment<'m>(
	node: &'m Mapping,
	segment: &str,
	case_insensitive: bool,
	index: &mut KeyIndex,
	node_path: &mut String,
) -> Option<&'m Value> {
	let (key, value) = if let Some(value) = node.get(segment) {
		(segment.to_string(), value)
	} else if case_insensitive {
		let actual = index.actual_key(node_path, node, segment)?;
		let value = node.get(&actual)?;
		(actual, value)
	} else {
		return None;
	};

	node_path.push(NODE_PATH_SEPARATOR);
	node_path.push_str(&key);
	Some(value)
}

/// A memoizing resolver for one render pass.
///
/// Each key path is resolved at most once: the mapping is consulted first
/// and, when that fails and built-ins are enabled, the document attributes.
/// Both found values and misses are cached for the resolver's lifetime.
#[derive(Debug)]
pub struct Resolver<'a> {
	mapping: Option<&'a Mapping>,
	document: Option<&'a DocumentInfo>,
	case_insensitive: bool,
	builtins: bool,
	index: KeyIndex,
	memo: HashMap<String, Option<String>>,
}

impl<'a> Resolver<'a> {
	pub fn new(
		mapping: Option<&'a Mapping>,
		case_insensitive: bool,
		document: Option<&'a DocumentInfo>,
		builtins: bool,
	) -> Self {
		Self {
			mapping,
			document,
			case_insensitive,
			builtins,
			index: KeyIndex::default(),
			memo: HashMap::new(),
		}
	}

	/// Whether this resolver can produce any value at all.
	pub fn is_inert(&self) -> bool {
		self.mapping.is_none() && !(self.builtins && self.document.is_some())
	}

	pub fn resolve(&mut self, key_path: &str) -> Option<String> {
		let key_path = key_path.trim();
		if let Some(cached) = self.memo.get(key_path) {
			return cached.clone();
		}

		let mut resolved = self.mapping.and_then(|mapping| {
			lookup(mapping, key_path, self.case_insensitive, &mut self.index).map(format_value)
		});

		if resolved.is_none() && self.builtins {
			resolved = self
				.document
				.and_then(|document| resolve_builtin(document, key_path, self.case_insensitive));
		}

		self.memo.insert(key_path.to_string(), resolved.clone());
		resolved
	}

	/// Number of distinct key paths resolved so far.
	pub fn cached_len(&self) -> usize {
		self.memo.len()
	}

	/// Number of mapping nodes with a built case-insensitive key index.
	pub fn indexed_nodes(&self) -> usize {
		self.index.len()
	}
}
