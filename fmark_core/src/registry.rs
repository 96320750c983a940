use std::collections::BTreeMap;

use tracing::debug;

use crate::DecorationSet;
use crate::DocumentId;
use crate::EditorHost;
use crate::FmarkConfig;
use crate::MarkerView;
use crate::MetadataStore;
use crate::ScanScope;
use crate::ViewEvent;

/// Handle for a view opened through a [`ViewRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
	pub fn value(self) -> u64 {
		self.0
	}
}

#[derive(Debug)]
struct RegisteredView {
	document: Option<DocumentId>,
	view: MarkerView,
}

/// Every open view together with the document it shows. Each view keeps its
/// own line cache; the registry only routes notifications.
#[derive(Debug, Default)]
pub struct ViewRegistry {
	next_id: u64,
	views: BTreeMap<ViewId, RegisteredView>,
}

impl ViewRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn open(&mut self, document: Option<DocumentId>, config: FmarkConfig) -> ViewId {
		let id = ViewId(self.next_id);
		self.next_id += 1;
		self.views.insert(
			id,
			RegisteredView {
				document,
				view: MarkerView::new(config),
			},
		);
		id
	}

	/// Remove a view and hand back its state.
	pub fn close(&mut self, id: ViewId) -> Option<MarkerView> {
		self.views.remove(&id).map(|entry| entry.view)
	}

	pub fn view(&self, id: ViewId) -> Option<&MarkerView> {
		self.views.get(&id).map(|entry| &entry.view)
	}

	pub fn view_mut(&mut self, id: ViewId) -> Option<&mut MarkerView> {
		self.views.get_mut(&id).map(|entry| &mut entry.view)
	}

	pub fn document(&self, id: ViewId) -> Option<&DocumentId> {
		self.views.get(&id).and_then(|entry| entry.document.as_ref())
	}

	/// Point a view at another document. The view rescans on its next event.
	pub fn set_document(&mut self, id: ViewId, document: Option<DocumentId>) -> bool {
		let Some(entry) = self.views.get_mut(&id) else {
			return false;
		};
		if entry.document != document {
			entry.document = document;
			entry.view.request_refresh();
		}
		true
	}

	/// Mark every view of `document` for a full rescan and return their ids.
	/// Views of other documents are untouched.
	pub fn metadata_changed(&mut self, document: &DocumentId) -> Vec<ViewId> {
		let affected: Vec<ViewId> = self
			.views
			.iter_mut()
			.filter(|(_, entry)| entry.document.as_ref() == Some(document))
			.map(|(id, entry)| {
				entry.view.request_refresh();
				*id
			})
			.collect();

		debug!(%document, views = affected.len(), "metadata changed");
		affected
	}

	/// Apply a new configuration everywhere. Returns the views that need a
	/// rescan.
	pub fn apply_config(&mut self, config: &FmarkConfig) -> Vec<ViewId> {
		self.views
			.iter_mut()
			.filter_map(|(id, entry)| entry.view.set_config(config.clone()).then_some(*id))
			.collect()
	}

	/// Forward a host event to one view. `None` when the view is not open.
	pub fn dispatch(
		&mut self,
		id: ViewId,
		event: &ViewEvent,
		host: &dyn EditorHost,
		store: &dyn MetadataStore,
	) -> Option<bool> {
		let entry = self.views.get_mut(&id)?;
		Some(entry.view.handle(event, host, store))
	}

	/// Run a full evaluation pass on one view.
	pub fn evaluate(
		&mut self,
		id: ViewId,
		host: &dyn EditorHost,
		store: &dyn MetadataStore,
	) -> Option<&DecorationSet> {
		let entry = self.views.get_mut(&id)?;
		Some(entry.view.evaluate(host, store, ScanScope::Full))
	}

	pub fn ids(&self) -> impl Iterator<Item = ViewId> + '_ {
		self.views.keys().copied()
	}

	pub fn len(&self) -> usize {
		self.views.len()
	}

	pub fn is_empty(&self) -> bool {
		self.views.is_empty()
	}
}
