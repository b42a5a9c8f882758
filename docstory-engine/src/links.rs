// ---------------------------------------------------------------------------
// Co-occurrence Link Builder: pairwise topic weights
// ---------------------------------------------------------------------------
//
// One link per unordered topic pair (source < target), held in a dense
// triangular array sized when the corpus is loaded. Counts are rebuilt from
// the documents' threshold-filtered topic lists, never from the raw matches,
// so link weights always agree with the topic counts at the same threshold.
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::types::{Document, Topic, TopicRef};

/// Weighted co-occurrence between two topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
	pub source: usize,
	pub target: usize,
	pub count: usize,
}

/// A neighbour of the most connected topic, strongest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
	pub topic: TopicRef,
	pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostConnected {
	pub topic: TopicRef,
	pub connections: Vec<Connection>,
}

// ---------------------------------------------------------------------------
// LinkTable
// ---------------------------------------------------------------------------

/// Every topic pair, in (i, j) lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
	topic_count: usize,
	links: Vec<Link>,
}

impl LinkTable {
	pub fn new(topic_count: usize) -> Self {
		let pairs = topic_count * topic_count.saturating_sub(1) / 2;
		let mut links = Vec::with_capacity(pairs);
		for source in 0..topic_count {
			for target in source + 1..topic_count {
				links.push(Link {
					source,
					target,
					count: 0,
				});
			}
		}
		Self { topic_count, links }
	}

	pub fn topic_count(&self) -> usize {
		self.topic_count
	}

	/// Position of the canonical entry for `{a, b}`. `None` for self pairs and
	/// indices outside the table.
	fn slot(&self, a: usize, b: usize) -> Option<usize> {
		let (i, j) = if a < b { (a, b) } else { (b, a) };
		if i == j || j >= self.topic_count {
			return None;
		}
		let n = self.topic_count;
		Some(i * (2 * n - i - 1) / 2 + (j - i - 1))
	}

	/// Weight of the pair `{a, b}`, whichever order it is asked in.
	pub fn count(&self, a: usize, b: usize) -> usize {
		self.slot(a, b).map_or(0, |s| self.links[s].count)
	}

	/// Reset every count, then add one per pair of topics co-listed in a
	/// document.
	///
	/// Pairs follow the document's topic list as iterated: a topic listed
	/// twice pairs twice with each neighbour. A topic never pairs with itself.
	pub fn rebuild(&mut self, topics: &[Topic], docs: &[Document]) {
		for link in &mut self.links {
			link.count = 0;
		}

		let mut valid = vec![false; self.topic_count];
		for topic in topics {
			if let Some(flag) = valid.get_mut(topic.index) {
				*flag = true;
			}
		}

		for doc in docs {
			let doc_topics: Vec<usize> = doc
				.topics
				.iter()
				.copied()
				.filter(|&t| valid.get(t).copied().unwrap_or(false))
				.collect();
			for i in 0..doc_topics.len() {
				for j in i + 1..doc_topics.len() {
					if let Some(s) = self.slot(doc_topics[i], doc_topics[j]) {
						self.links[s].count += 1;
					}
				}
			}
		}
	}

	/// The full table, zero-weight pairs included.
	pub fn all(&self) -> &[Link] {
		&self.links
	}

	/// Links with a positive weight, in pair order.
	pub fn positive(&self) -> Vec<Link> {
		self.links.iter().filter(|l| l.count > 0).copied().collect()
	}

	/// The topic with the highest count (first on ties) and its strongest
	/// neighbours, up to `limit`.
	///
	/// Neighbours are ranked by link weight descending; equal weights keep
	/// pair order.
	pub fn most_connected(&self, topics: &[Topic], limit: usize) -> Option<MostConnected> {
		let mut best: Option<&Topic> = None;
		for topic in topics {
			if best.map_or(true, |b| topic.count > b.count) {
				best = Some(topic);
			}
		}
		let best = best?;

		let mut incident: Vec<&Link> = self
			.links
			.iter()
			.filter(|l| l.count > 0 && (l.source == best.index || l.target == best.index))
			.collect();
		incident.sort_by(|a, b| b.count.cmp(&a.count));

		let connections = incident
			.into_iter()
			.filter_map(|l| {
				let other = if l.target == best.index { l.source } else { l.target };
				topics.get(other).map(|t| Connection {
					topic: TopicRef::from(t),
					count: l.count,
				})
			})
			.take(limit)
			.collect();

		Some(MostConnected {
			topic: TopicRef::from(best),
			connections,
		})
	}
}

/// Rebuild `table` for the current aggregates and return the positive links.
pub fn build_links(table: &mut LinkTable, topics: &[Topic], docs: &[Document]) -> Vec<Link> {
	table.rebuild(topics, docs);
	table.positive()
}
