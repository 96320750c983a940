//! `fmark_core` substitutes frontmatter values into markdown documents at
//! display time. A marker such as `[%title]` or `{{title}}` in the body of a
//! document is shown as the value of `title` from the document's YAML
//! metadata block, while the stored text keeps the marker.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Host view (lines, viewport, carets, edits)
//!   -> Marker scanner (per-line markers, cached by line text)
//!   -> Context filter (metadata block, fenced code, inline code, emphasis)
//!   -> Resolver (key paths, case-insensitive fallback, built-in keys)
//!   -> DecorationSet (replacement spans for the host to draw)
//! ```
//!
//! ## Modules
//!
//! - [`config`] loads `fmark.toml`: marker syntax, key matching and the style
//!   flags forwarded to the renderer.
//! - [`engine`] holds [`MarkerView`], the per-view decoration state and its
//!   invalidation rules.
//! - [`reading`] substitutes values into already rendered HTML.
//! - [`migrate`] rewrites markers between the two syntaxes.
//!
//! ## Key Types
//!
//! - [`EditorHost`] and [`MetadataStore`] are the seams a host implements.
//! - [`Resolver`] turns key paths into display strings.
//! - [`Decoration`] replaces one marker span in the displayed text.
//! - [`ViewRegistry`] routes metadata notifications to every open view.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fmark_core::FmarkConfig;
//! use fmark_core::MarkerView;
//! use fmark_core::MemoryHost;
//! use fmark_core::MemoryMetadataStore;
//! use fmark_core::ScanScope;
//! use fmark_core::load_document;
//! use std::path::Path;
//!
//! let document = load_document(Path::new("notes.md")).unwrap();
//! let mut store = MemoryMetadataStore::new();
//! document.register(&mut store);
//!
//! let host = MemoryHost::new(Some(document.id.clone()), document.text.clone());
//! let mut view = MarkerView::new(FmarkConfig::default());
//! let decorations = view.evaluate(&host, &store, ScanScope::Full);
//!
//! println!("{}", decorations.apply(&document.text));
//! ```

pub use config::*;
pub use engine::*;
pub use error::*;
pub use frontmatter::*;
pub use host::*;
pub use migrate::*;
pub use reading::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
pub use suggest::*;
pub use syntax::*;

pub mod config;
pub mod engine;
#[allow(unused_assignments)]
mod error;
mod frontmatter;
mod host;
pub(crate) mod lexer;
pub mod migrate;
pub mod reading;
mod registry;
mod resolver;
mod scanner;
mod suggest;
mod syntax;

#[cfg(test)]
mod __fixtures;
