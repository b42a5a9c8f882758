// ---------------------------------------------------------------------------
// Selection Synchronizer: the one shared "which topics are active" vector
// ---------------------------------------------------------------------------
//
// The ActiveSet is indexed by topic-hierarchy position. Only `Selection`
// writes it; views receive the whole vector after every mutation and never
// keep their own copy.
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::error::StoryError;
use crate::narrative::StepFilter;
use crate::sequence::Hierarchy;

/// Boolean per topic-hierarchy node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveSet(Vec<bool>);

impl ActiveSet {
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Out-of-range positions read as inactive.
	pub fn is_active(&self, position: usize) -> bool {
		self.0.get(position).copied().unwrap_or(false)
	}

	pub fn as_slice(&self) -> &[bool] {
		&self.0
	}

	pub fn active_count(&self) -> usize {
		self.0.iter().filter(|&&a| a).count()
	}
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Selection {
	active: ActiveSet,
}

impl Selection {
	/// All-inactive selection sized to `hierarchy`.
	pub fn new(hierarchy: &Hierarchy) -> Self {
		Self {
			active: ActiveSet(vec![false; hierarchy.len()]),
		}
	}

	pub fn active(&self) -> &ActiveSet {
		&self.active
	}

	/// Re-seed from a step filter: a node is active when its parent topic is
	/// named by the filter.
	pub fn seed(&mut self, hierarchy: &Hierarchy, filter: &StepFilter) -> &ActiveSet {
		let key = group_column(hierarchy);
		self.active = ActiveSet(
			hierarchy
				.nodes()
				.iter()
				.map(|n| n.column(key).is_some_and(|t| filter.includes(t)))
				.collect(),
		);
		&self.active
	}

	/// Flip exactly one node.
	pub fn toggle_one(&mut self, position: usize) -> Result<&ActiveSet, StoryError> {
		let len = self.active.len();
		let flag = self
			.active
			.0
			.get_mut(position)
			.ok_or(StoryError::NodeOutOfRange { index: position, len })?;
		*flag = !*flag;
		Ok(&self.active)
	}

	/// Set every node sharing the clicked node's group to the negation of the
	/// clicked node's prior state. Members move together regardless of their
	/// own prior state.
	pub fn toggle_group(
		&mut self,
		hierarchy: &Hierarchy,
		position: usize,
	) -> Result<&ActiveSet, StoryError> {
		let len = self.active.len();
		let node = hierarchy
			.node(position)
			.filter(|_| position < len)
			.ok_or(StoryError::NodeOutOfRange { index: position, len })?;
		let key_column = group_column(hierarchy);
		let key = node.column(key_column).unwrap_or_default().to_string();
		let value = !self.active.is_active(position);
		for (flag, n) in self.active.0.iter_mut().zip(hierarchy.nodes()) {
			if n.column(key_column) == Some(key.as_str()) {
				*flag = value;
			}
		}
		Ok(&self.active)
	}

	/// A badge click: parent badges toggle their group, leaf badges toggle
	/// themselves.
	pub fn click(&mut self, hierarchy: &Hierarchy, position: usize) -> Result<&ActiveSet, StoryError> {
		if hierarchy.is_root(position) {
			self.toggle_group(hierarchy, position)
		} else {
			self.toggle_one(position)
		}
	}
}

fn group_column(hierarchy: &Hierarchy) -> &str {
	hierarchy.columns().first().map(String::as_str).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Document popup: read-only view of the selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupTopic {
	pub position: usize,
	pub topic: String,
	pub subtopic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocPopup {
	pub position: usize,
	pub chapter: Option<String>,
	pub section: Option<String>,
	pub para: Option<String>,
	pub topics: Vec<PopupTopic>,
}

/// Topics mapped to the document at `doc_position`, keeping only those the
/// selection marks active.
pub fn doc_popup(
	docs: &Hierarchy,
	topics: &Hierarchy,
	doc_topic_map: &[(usize, usize)],
	active: &ActiveSet,
	doc_position: usize,
) -> Result<DocPopup, StoryError> {
	let doc = docs.node(doc_position).ok_or(StoryError::DocOutOfRange {
		index: doc_position,
		len: docs.len(),
	})?;

	let topics = doc_topic_map
		.iter()
		.filter(|(d, _)| *d == doc_position)
		.map(|&(_, t)| t)
		.filter(|&t| active.is_active(t))
		.filter_map(|t| {
			topics.node(t).map(|n| PopupTopic {
				position: t,
				topic: n.column("topic").unwrap_or_default().to_string(),
				subtopic: n.column("subtopic").unwrap_or_default().to_string(),
			})
		})
		.collect();

	let column = |name: &str| doc.column(name).map(str::to_string);
	Ok(DocPopup {
		position: doc_position,
		chapter: column("chapter"),
		section: column("section"),
		para: column("para"),
		topics,
	})
}
