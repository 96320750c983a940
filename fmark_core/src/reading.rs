use std::collections::BTreeSet;
use std::fmt::Write;

use markdown::mdast::Node;

use crate::FmarkError;
use crate::FmarkResult;
use crate::Resolver;
use crate::SyntaxStyle;
use crate::frontmatter::metadata_block_lines;
use crate::scanner::FenceState;
use crate::scanner::inline_code_ranges;
use crate::scanner::scan_line;

/// Elements whose text is never substituted.
const PROTECTED_TAGS: [&str; 2] = ["code", "pre"];

/// Attribute that marks an element as an already substituted value.
const KEY_ATTRIBUTE: &str = "data-fmark-key";

/// Private-use characters framing a slot number in protected source. The
/// markdown parser treats them as plain text.
const SLOT_OPEN: char = '\u{e000}';
const SLOT_CLOSE: char = '\u{e001}';

/// A marker lifted out of the source before rendering.
#[derive(Debug, Clone)]
struct Slot {
	key: String,
	raw: String,
}

fn slot_placeholder(index: usize) -> String {
	format!("{SLOT_OPEN}{index}{SLOT_CLOSE}")
}

/// A value substituted into rendered output. The original key is kept so the
/// node can be refreshed when metadata changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutedNode {
	pub key: String,
	/// The marker as it appeared in the rendered HTML.
	pub raw: String,
	/// `None` while the key has no value; the raw marker is shown instead.
	pub value: Option<String>,
}

impl SubstitutedNode {
	pub fn is_resolved(&self) -> bool {
		self.value.is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.value.as_deref().is_some_and(str::is_empty)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingNode {
	/// Markup, copied through verbatim.
	Markup(String),
	/// Escaped text content, copied through verbatim.
	Text(String),
	Value(SubstitutedNode),
}

/// Rendered (non-editable) output with marker substitution applied to text
/// content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingView {
	nodes: Vec<ReadingNode>,
}

impl ReadingView {
	/// Render markdown to HTML and substitute markers in its text content.
	/// The leading metadata block is parsed as frontmatter and not rendered.
	///
	/// Markers are located in the source and replaced by placeholders before
	/// rendering, so markdown syntax inside a key is never interpreted.
	/// Markers that do not end up in a text node (code, link targets, raw
	/// HTML) are put back as written.
	pub fn render(
		source: &str,
		style: SyntaxStyle,
		resolver: &mut Resolver<'_>,
	) -> FmarkResult<Self> {
		let mut options = markdown::Options::gfm();
		options.parse.constructs.frontmatter = true;

		let (slots, protected) = protect_markers(source, style, |_| true);
		if slots.is_empty() {
			let html = markdown::to_html_with_options(source, &options)
				.map_err(|e| FmarkError::Markdown(e.to_string()))?;
			return Ok(Self {
				nodes: vec![ReadingNode::Markup(html)],
			});
		}

		let tree = markdown::to_mdast(&protected, &options.parse)
			.map_err(|e| FmarkError::Markdown(e.to_string()))?;
		let mut in_text = BTreeSet::new();
		collect_text_slots(&tree, &mut in_text);

		let (slots, protected) = protect_markers(source, style, |index| in_text.contains(&index));
		let html = markdown::to_html_with_options(&protected, &options)
			.map_err(|e| FmarkError::Markdown(e.to_string()))?;

		let mut nodes = Vec::new();
		split_html(&html, |text, _, nodes| expand_slots(text, &slots, resolver, nodes), &mut nodes);

		Ok(Self { nodes })
	}

	/// Substitute markers in the text content of already rendered HTML. Text
	/// inside `<code>`, `<pre>` and previously substituted elements is left
	/// alone.
	pub fn from_html(html: &str, style: SyntaxStyle, resolver: &mut Resolver<'_>) -> Self {
		let mut nodes = Vec::new();
		split_html(
			html,
			|text, eligible, nodes| {
				if eligible && text.contains(style.opener()) {
					substitute(text, style, resolver, nodes);
				} else {
					nodes.push(ReadingNode::Text(text.to_string()));
				}
			},
			&mut nodes,
		);

		Self { nodes }
	}

	pub fn nodes(&self) -> &[ReadingNode] {
		&self.nodes
	}

	pub fn substitutions(&self) -> impl Iterator<Item = &SubstitutedNode> {
		self.nodes.iter().filter_map(|node| {
			match node {
				ReadingNode::Value(value) => Some(value),
				_ => None,
			}
		})
	}

	/// Re-resolve every substituted node from its stored key. Returns the
	/// number of nodes whose value changed.
	pub fn refresh(&mut self, resolver: &mut Resolver<'_>) -> usize {
		let mut changed = 0;
		for node in &mut self.nodes {
			let ReadingNode::Value(value) = node else {
				continue;
			};
			let resolved = resolver.resolve(&value.key);
			if resolved != value.value {
				value.value = resolved;
				changed += 1;
			}
		}
		changed
	}

	pub fn to_html(&self) -> String {
		let mut html = String::new();
		for node in &self.nodes {
			match node {
				ReadingNode::Markup(content) | ReadingNode::Text(content) => html.push_str(content),
				ReadingNode::Value(SubstitutedNode {
					raw, value: None, ..
				}) => html.push_str(raw),
				ReadingNode::Value(SubstitutedNode {
					key,
					value: Some(value),
					..
				}) => {
					let class = if value.is_empty() {
						"fmark-value fmark-empty"
					} else {
						"fmark-value"
					};
					let _ = write!(
						html,
						"<span class=\"{class}\" {KEY_ATTRIBUTE}=\"{}\">{}</span>",
						escape_html(key),
						escape_html(value)
					);
				}
			}
		}
		html
	}
}

/// Split HTML into markup and text pieces. `on_text` receives each text
/// piece and whether it lies outside protected and substituted elements.
fn split_html(
	html: &str,
	mut on_text: impl FnMut(&str, bool, &mut Vec<ReadingNode>),
	nodes: &mut Vec<ReadingNode>,
) {
	let mut rest = html;
	let mut protected = 0usize;
	let mut substituted = 0usize;

	while !rest.is_empty() {
		if rest.starts_with('<') {
			let end = rest.find('>').map_or(rest.len(), |index| index + 1);
			let tag = &rest[..end];
			let (name, closing) = tag_name(tag);

			if PROTECTED_TAGS.contains(&name.as_str()) {
				protected = if closing {
					protected.saturating_sub(1)
				} else {
					protected + 1
				};
			} else if name == "span" {
				if closing {
					substituted = substituted.saturating_sub(1);
				} else if substituted > 0 || tag.contains(KEY_ATTRIBUTE) {
					substituted += 1;
				}
			}

			nodes.push(ReadingNode::Markup(tag.to_string()));
			rest = &rest[end..];
			continue;
		}

		let end = rest.find('<').unwrap_or(rest.len());
		on_text(&rest[..end], protected == 0 && substituted == 0, nodes);
		rest = &rest[end..];
	}
}

/// Replace markers in the source with numbered placeholders. Markers in the
/// metadata block, fenced code and inline code are left alone, as are those
/// for which `keep` returns `false`.
fn protect_markers(
	source: &str,
	style: SyntaxStyle,
	keep: impl Fn(usize) -> bool,
) -> (Vec<Slot>, String) {
	let lines: Vec<&str> = source.split('\n').collect();
	let metadata = metadata_block_lines(|line| lines.get(line).copied());
	let mut fence = FenceState::default();
	let mut slots = Vec::new();
	let mut protected = String::with_capacity(source.len());

	for (index, line) in lines.iter().enumerate() {
		if index > 0 {
			protected.push('\n');
		}

		let in_metadata = metadata.as_ref().is_some_and(|block| block.contains(&index));
		if in_metadata || fence.advance(line).is_excluded() {
			protected.push_str(line);
			continue;
		}

		let markers = scan_line(style, line);
		let code = inline_code_ranges(line);
		let mut last = 0;
		for marker in &markers {
			if code.iter().any(|range| marker.overlaps(range)) {
				continue;
			}
			let slot = slots.len();
			slots.push(Slot {
				key: marker.key.clone(),
				raw: line[marker.start..marker.end].to_string(),
			});
			if keep(slot) {
				protected.push_str(&line[last..marker.start]);
				protected.push_str(&slot_placeholder(slot));
				last = marker.end;
			}
		}
		protected.push_str(&line[last..]);
	}

	(slots, protected)
}

/// Collect the slot numbers that appear inside text nodes of the tree.
fn collect_text_slots(node: &Node, slots: &mut BTreeSet<usize>) {
	match node {
		Node::Text(text) => slots.extend(slot_numbers(&text.value)),
		Node::Code(_) | Node::InlineCode(_) | Node::Html(_) => {}
		_ => {
			if let Some(children) = node.children() {
				for child in children {
					collect_text_slots(child, slots);
				}
			}
		}
	}
}

fn slot_numbers(text: &str) -> Vec<usize> {
	let mut numbers = Vec::new();
	let mut rest = text;
	while let Some((_, number, after)) = find_slot(rest) {
		numbers.push(number);
		rest = after;
	}
	numbers
}

/// Find the next placeholder in `text`. Returns the text before it, the slot
/// number and the text after it.
fn find_slot(text: &str) -> Option<(&str, usize, &str)> {
	let mut search = 0;
	while let Some(offset) = text[search..].find(SLOT_OPEN) {
		let open = search + offset;
		let digits_start = open + SLOT_OPEN.len_utf8();
		let after = &text[digits_start..];
		let digits = after.chars().take_while(char::is_ascii_digit).count();
		if digits > 0 && after[digits..].starts_with(SLOT_CLOSE) {
			if let Ok(number) = after[..digits].parse() {
				let end = digits_start + digits + SLOT_CLOSE.len_utf8();
				return Some((&text[..open], number, &text[end..]));
			}
		}
		search = digits_start;
	}
	None
}

/// Turn the placeholders of a rendered text piece back into values.
fn expand_slots(
	text: &str,
	slots: &[Slot],
	resolver: &mut Resolver<'_>,
	nodes: &mut Vec<ReadingNode>,
) {
	let mut rest = text;
	while let Some((before, number, after)) = find_slot(rest) {
		let Some(slot) = slots.get(number) else {
			break;
		};
		if !before.is_empty() {
			nodes.push(ReadingNode::Text(before.to_string()));
		}
		nodes.push(ReadingNode::Value(SubstitutedNode {
			key: slot.key.clone(),
			raw: escape_html(&slot.raw),
			value: resolver.resolve(&slot.key),
		}));
		rest = after;
	}

	if !rest.is_empty() {
		nodes.push(ReadingNode::Text(rest.to_string()));
	}
}

fn substitute(
	text: &str,
	style: SyntaxStyle,
	resolver: &mut Resolver<'_>,
	nodes: &mut Vec<ReadingNode>,
) {
	let mut last = 0;

	for captures in style.pattern().captures_iter(text) {
		let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
			continue;
		};
		let key = decode_entities(key.as_str().trim());
		if key.is_empty() {
			continue;
		}

		if whole.start() > last {
			nodes.push(ReadingNode::Text(text[last..whole.start()].to_string()));
		}
		let value = resolver.resolve(&key);
		nodes.push(ReadingNode::Value(SubstitutedNode {
			key,
			raw: whole.as_str().to_string(),
			value,
		}));
		last = whole.end();
	}

	if last < text.len() {
		nodes.push(ReadingNode::Text(text[last..].to_string()));
	}
}

/// Lowercased element name of a tag and whether it is a closing tag.
fn tag_name(tag: &str) -> (String, bool) {
	let inner = tag.trim_start_matches('<');
	let (closing, inner) = match inner.strip_prefix('/') {
		Some(rest) => (true, rest),
		None => (false, inner),
	};
	let name = inner
		.chars()
		.take_while(char::is_ascii_alphanumeric)
		.collect::<String>()
		.to_ascii_lowercase();
	(name, closing)
}

pub fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for ch in text.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			_ => escaped.push(ch),
		}
	}
	escaped
}

/// Undo the entity escaping the markdown renderer applies to text.
pub fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}

	text.replace("&quot;", "\"")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&#x27;", "'")
		.replace("&amp;", "&")
}
