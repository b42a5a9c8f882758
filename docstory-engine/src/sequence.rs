// ---------------------------------------------------------------------------
// Hierarchy Sequencer: flat tagged records into ordered prefix paths
// ---------------------------------------------------------------------------
//
// [ {topic, sub1}, {topic, sub2} ] becomes [ topic, sub1, sub2 ]: one node
// per distinct column-value prefix, emitted the first time that prefix is
// seen. When the input groups records contiguously, the output is a valid
// pre-order walk of the tree.
// ---------------------------------------------------------------------------

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::StoryError;
use crate::types::{Document, Topic};

/// Columns a [`Topic`] answers to.
pub const TOPIC_COLUMNS: &[&str] = &["topic", "subtopic"];
/// Columns a [`Document`] answers to.
pub const DOC_COLUMNS: &[&str] = &["chapter", "section", "para"];

/// Column access for anything that can be sequenced.
pub trait Record {
	fn field(&self, column: &str) -> Option<&str>;
}

/// Reject any column `known` does not list. An unknown column would read as
/// the empty string on every record and collapse its level.
pub fn check_columns(
	record: &'static str,
	columns: &[String],
	known: &[&str],
) -> Result<(), StoryError> {
	match columns.iter().find(|c| !known.contains(&c.as_str())) {
		Some(column) => Err(StoryError::UnknownColumn {
			record,
			column: column.clone(),
		}),
		None => Ok(()),
	}
}

impl Record for Topic {
	fn field(&self, column: &str) -> Option<&str> {
		match column {
			"topic" => Some(&self.topic),
			"subtopic" => Some(&self.subtopic),
			_ => None,
		}
	}
}

impl Record for Document {
	fn field(&self, column: &str) -> Option<&str> {
		match column {
			"chapter" => Some(&self.chapter),
			"section" => Some(&self.section),
			"para" => Some(&self.para),
			_ => None,
		}
	}
}

impl Record for BTreeMap<String, String> {
	fn field(&self, column: &str) -> Option<&str> {
		self.get(column).map(String::as_str)
	}
}

/// One entry in a flattened hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
	/// Column name this node sits at.
	#[serde(rename = "type")]
	pub kind: String,
	pub name: String,
	/// Source record that first introduced this path.
	pub index: usize,
	/// Depth, 0 for the outermost column.
	pub level: usize,
	/// Value of every column at or above this level.
	#[serde(flatten)]
	pub columns: BTreeMap<String, String>,
}

impl HierarchyNode {
	pub fn column(&self, name: &str) -> Option<&str> {
		self.columns.get(name).map(String::as_str)
	}
}

#[derive(Default)]
struct Seen {
	children: HashMap<String, Seen>,
}

/// Sequence `records` by `columns` (outer to inner).
///
/// A missing column value is treated as the empty string, so a record never
/// fails to sequence.
pub fn sequence<R, S>(records: &[R], columns: &[S]) -> Vec<HierarchyNode>
where
	R: Record,
	S: AsRef<str>,
{
	let mut seen = Seen::default();
	let mut nodes = Vec::new();

	for (index, record) in records.iter().enumerate() {
		let mut parent = &mut seen;
		let mut path = BTreeMap::new();
		for (level, column) in columns.iter().enumerate() {
			let column = column.as_ref();
			let value = record.field(column).unwrap_or_default().to_string();
			path.insert(column.to_string(), value.clone());
			parent = match parent.children.entry(value) {
				Entry::Occupied(slot) => slot.into_mut(),
				Entry::Vacant(slot) => {
					nodes.push(HierarchyNode {
						kind: column.to_string(),
						name: slot.key().clone(),
						index,
						level,
						columns: path.clone(),
					});
					slot.insert(Seen::default())
				}
			};
		}
	}

	nodes
}

// ---------------------------------------------------------------------------
// Hierarchy: sequenced nodes plus the record → position lookup
// ---------------------------------------------------------------------------

/// Sequenced nodes with a lookup from source record index to node position.
///
/// A record maps to the deepest node it introduced, which is the leaf for
/// well-formed input. Records whose full path duplicates an earlier record
/// map to nothing.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
	columns: Vec<String>,
	nodes: Vec<HierarchyNode>,
	positions: Vec<Option<usize>>,
}

impl Hierarchy {
	pub fn build<R: Record, S: AsRef<str>>(records: &[R], columns: &[S]) -> Self {
		let nodes = sequence(records, columns);
		let mut positions = vec![None; records.len()];
		for (position, node) in nodes.iter().enumerate() {
			positions[node.index] = Some(position);
		}
		Self {
			columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
			nodes,
			positions,
		}
	}

	pub fn nodes(&self) -> &[HierarchyNode] {
		&self.nodes
	}

	pub fn node(&self, position: usize) -> Option<&HierarchyNode> {
		self.nodes.get(position)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn columns(&self) -> &[String] {
		&self.columns
	}

	pub fn position_of(&self, record: usize) -> Option<usize> {
		self.positions.get(record).copied().flatten()
	}

	/// True when the node sits at the outermost column (a group parent).
	pub fn is_root(&self, position: usize) -> bool {
		self.nodes
			.get(position)
			.is_some_and(|n| n.level == 0)
	}
}
