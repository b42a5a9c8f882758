// ---------------------------------------------------------------------------
// Topic rollup tree: the topics panel's dataset
// ---------------------------------------------------------------------------
//
// Level 0 is the grand total, level 1 one row per parent topic, level 2 one
// row per subtopic. Siblings are ordered by count descending; the sort is
// stable so first-seen order breaks ties.
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::types::Topic;

pub const TOTAL_GROUP: &str = "All Topics";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRow {
	pub level: usize,
	/// Position among siblings after sorting.
	pub rank: usize,
	/// Label of this row: the total label, a topic, or a subtopic.
	pub group: String,
	/// Group of the parent row. `None` only for the total.
	pub parent: Option<String>,
	/// Parent topic this row belongs to. `None` only for the total.
	pub topic: Option<String>,
	pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicTree {
	pub rows: Vec<TreeRow>,
	pub max_count_by_level: Vec<usize>,
}

struct Branch<'a> {
	topic: &'a str,
	count: usize,
	leaves: Vec<(&'a str, usize)>,
}

impl TopicTree {
	pub fn build(topics: &[Topic]) -> Self {
		let mut branches: Vec<Branch<'_>> = Vec::new();
		for t in topics {
			let pos = match branches.iter().position(|b| b.topic == t.topic) {
				Some(pos) => pos,
				None => {
					branches.push(Branch {
						topic: t.topic.as_str(),
						count: 0,
						leaves: Vec::new(),
					});
					branches.len() - 1
				}
			};
			let branch = &mut branches[pos];
			branch.count += t.count;
			match branch.leaves.iter_mut().find(|(name, _)| *name == t.subtopic) {
				Some(leaf) => leaf.1 += t.count,
				None => branch.leaves.push((t.subtopic.as_str(), t.count)),
			}
		}

		branches.sort_by(|a, b| b.count.cmp(&a.count));
		let total: usize = branches.iter().map(|b| b.count).sum();

		let mut rows = vec![TreeRow {
			level: 0,
			rank: 0,
			group: TOTAL_GROUP.to_string(),
			parent: None,
			topic: None,
			count: total,
		}];
		for (rank, branch) in branches.iter_mut().enumerate() {
			rows.push(TreeRow {
				level: 1,
				rank,
				group: branch.topic.to_string(),
				parent: Some(TOTAL_GROUP.to_string()),
				topic: Some(branch.topic.to_string()),
				count: branch.count,
			});
			branch.leaves.sort_by(|a, b| b.1.cmp(&a.1));
			for (rank, (name, count)) in branch.leaves.iter().enumerate() {
				rows.push(TreeRow {
					level: 2,
					rank,
					group: name.to_string(),
					parent: Some(branch.topic.to_string()),
					topic: Some(branch.topic.to_string()),
					count: *count,
				});
			}
		}

		let mut max_count_by_level = vec![0; 3];
		for row in &rows {
			let slot = &mut max_count_by_level[row.level];
			*slot = (*slot).max(row.count);
		}

		Self {
			rows,
			max_count_by_level,
		}
	}

	/// Rows shown when the panel focuses on `group`: the total, the group
	/// itself and its children. `None` shows everything.
	pub fn visible(&self, group: Option<&str>) -> Vec<&TreeRow> {
		match group {
			None => self.rows.iter().collect(),
			Some(g) => self
				.rows
				.iter()
				.filter(|r| r.level == 0 || r.group == g || r.parent.as_deref() == Some(g))
				.collect(),
		}
	}

	/// Parent topics with a positive count, each with its positive subtopics,
	/// in tree order.
	pub fn leaders(&self) -> Vec<(&TreeRow, Vec<&TreeRow>)> {
		let mut out: Vec<(&TreeRow, Vec<&TreeRow>)> = Vec::new();
		for row in self.rows.iter().filter(|r| r.count > 0) {
			match row.level {
				1 => out.push((row, Vec::new())),
				2 => {
					if let Some((_, subs)) = out.last_mut() {
						subs.push(row);
					}
				}
				_ => {}
			}
		}
		out
	}

	/// Nothing matches at the current threshold.
	pub fn is_empty(&self) -> bool {
		self.rows.first().map_or(true, |r| r.count == 0)
	}
}
