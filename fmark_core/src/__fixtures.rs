use crate::DocumentId;
use crate::DocumentInfo;
use crate::FmarkConfig;
use crate::Mapping;
use crate::MarkerView;
use crate::MemoryHost;
use crate::MemoryMetadataStore;
use crate::ScanScope;
use crate::SyntaxStyle;
use crate::frontmatter::split;

pub const DOCUMENT_PATH: &str = "notes/book.md";

pub const BOOK_DOCUMENT: &str = "---
title: \"Stay out of the sun!\"
tags: [Alexander, Cynic]
---
Book: [%title], tags: [%tags], missing: [%nope]";

pub fn document_id() -> DocumentId {
	DocumentId::new(DOCUMENT_PATH)
}

pub fn mapping_from_yaml(yaml: &str) -> Mapping {
	serde_yaml_ng::from_str(yaml).unwrap_or_else(|e| panic!("fixture yaml: {e}"))
}

/// A host showing `text` and a store holding its parsed metadata block.
pub fn setup(text: &str) -> (MemoryHost, MemoryMetadataStore) {
	let id = document_id();
	let mut store = MemoryMetadataStore::new();
	let frontmatter = split(text, DOCUMENT_PATH).unwrap_or_else(|e| panic!("fixture frontmatter: {e}"));
	if let Some(frontmatter) = frontmatter {
		store.insert_mapping(id.clone(), frontmatter.mapping);
	}
	store.insert_document(id.clone(), DocumentInfo::new(DOCUMENT_PATH));

	(MemoryHost::new(Some(id), text), store)
}

pub fn config(syntax: SyntaxStyle) -> FmarkConfig {
	FmarkConfig {
		syntax,
		..FmarkConfig::default()
	}
}

/// Evaluate the whole document and return the displayed text.
pub fn displayed(view: &mut MarkerView, host: &MemoryHost, store: &MemoryMetadataStore) -> String {
	let text = host.buffer().text().to_string();
	view.evaluate(host, store, ScanScope::Full).apply(&text)
}

/// The last line of the displayed text.
pub fn displayed_body(view: &mut MarkerView, host: &MemoryHost, store: &MemoryMetadataStore) -> String {
	displayed(view, host, store)
		.rsplit('\n')
		.next()
		.unwrap_or_default()
		.to_string()
}
