// ---------------------------------------------------------------------------
// Views: renderer seams and the datasets handed to them
// ---------------------------------------------------------------------------
//
// Renderers live outside the engine. Each receives a prepared `ViewFrame` on
// render and the whole ActiveSet on every selection change; none of them
// computes counts or links of its own.
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::aggregate::surviving;
use crate::error::StoryError;
use crate::links::Link;
use crate::narrative::{Step, StepFilter};
use crate::selection::ActiveSet;
use crate::sequence::{Hierarchy, HierarchyNode};
use crate::tree::TreeRow;
use crate::types::{Match, Panel, Topic};

/// Smallest and largest node radius in the network panel.
pub const RADIUS_RANGE: (f64, f64) = (3.0, 30.0);
/// The radius scale never maps a count below this to the top of the range.
pub const RADIUS_MIN_DOMAIN: usize = 10;

/// A panel renderer.
pub trait View {
	fn panel(&self) -> Panel;

	/// Replace whatever the panel shows with `frame`.
	fn render(&mut self, frame: &ViewFrame) -> Result<(), StoryError>;

	/// Restyle for a new selection.
	fn update(&mut self, active: &ActiveSet) -> Result<(), StoryError>;

	fn set_faded(&mut self, faded: bool) -> Result<(), StoryError>;
}

/// The scroll driver. Reset whenever the step list is rebuilt.
pub trait StepObserver {
	fn reset(&mut self, steps: &[Step]) -> Result<(), StoryError>;
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "panel", rename_all = "lowercase")]
pub enum ViewFrame {
	Topics(TopicsFrame),
	Text(TextFrame),
	Network(NetworkFrame),
}

impl ViewFrame {
	pub fn panel(&self) -> Panel {
		match self {
			Self::Topics(_) => Panel::Topics,
			Self::Text(_) => Panel::Text,
			Self::Network(_) => Panel::Network,
		}
	}

	/// Nothing survives the current threshold.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Topics(f) => f.empty,
			Self::Text(f) => f.empty,
			Self::Network(f) => f.empty,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicsFrame {
	pub rows: Vec<TreeRow>,
	pub max_count_by_level: Vec<usize>,
	pub group: Option<String>,
	pub empty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFrame {
	pub topics: Vec<HierarchyNode>,
	pub docs: Vec<HierarchyNode>,
	/// `(doc_position, topic_position)` pairs at the current threshold.
	pub doc_topic_map: Vec<(usize, usize)>,
	pub filter: StepFilter,
	pub active: ActiveSet,
	pub empty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNode {
	pub index: usize,
	pub topic: String,
	pub subtopic: String,
	pub count: usize,
	/// Positive links to topics under a different parent.
	pub link_count: usize,
	pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLink {
	pub source: usize,
	pub target: usize,
	pub count: usize,
	pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFrame {
	pub nodes: Vec<NetworkNode>,
	pub links: Vec<NetworkLink>,
	pub empty: bool,
}

// ---------------------------------------------------------------------------
// Dataset builders
// ---------------------------------------------------------------------------

/// Map surviving matches onto hierarchy positions. Matches whose records have
/// no position (duplicated paths) are skipped.
pub fn doc_topic_map(
	matches: &[Match],
	threshold: f64,
	topics: &Hierarchy,
	docs: &Hierarchy,
) -> Vec<(usize, usize)> {
	surviving(matches, threshold)
		.filter_map(|m| Some((docs.position_of(m.doc)?, topics.position_of(m.topic)?)))
		.collect()
}

/// Linear scale from `[0, max(max_count, RADIUS_MIN_DOMAIN)]` onto
/// `RADIUS_RANGE`.
pub fn radius(count: usize, max_count: usize) -> f64 {
	let domain = max_count.max(RADIUS_MIN_DOMAIN) as f64;
	let (lo, hi) = RADIUS_RANGE;
	lo + (count as f64 / domain) * (hi - lo)
}

/// Network nodes and links for the current aggregates. `links` may hold
/// zero-weight pairs; only positive ones are drawn or counted.
pub fn network_frame(topics: &[Topic], links: &[Link]) -> NetworkFrame {
	let max_count = topics.iter().map(|t| t.count).max().unwrap_or(0);

	let mut link_counts = vec![0usize; topics.len()];
	let mut drawn = Vec::new();
	for l in links.iter().filter(|l| l.count > 0) {
		if let (Some(a), Some(b)) = (topics.get(l.source), topics.get(l.target)) {
			if a.topic != b.topic {
				link_counts[l.source] += 1;
				link_counts[l.target] += 1;
			}
		}
		drawn.push(NetworkLink {
			source: l.source,
			target: l.target,
			count: l.count,
			width: (l.count as f64).sqrt(),
		});
	}

	let nodes = topics
		.iter()
		.zip(link_counts)
		.map(|(t, link_count)| NetworkNode {
			index: t.index,
			topic: t.topic.clone(),
			subtopic: t.subtopic.clone(),
			count: t.count,
			link_count,
			radius: radius(t.count, max_count),
		})
		.collect();

	NetworkFrame {
		empty: max_count == 0,
		nodes,
		links: drawn,
	}
}
