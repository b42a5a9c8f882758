use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Corpus records
// ---------------------------------------------------------------------------

/// A leaf topic. `index` is assigned at load and never changes; `count` is
/// derived from the matches surviving the current threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
	#[serde(default)]
	pub index: usize,
	pub topic: String,
	pub subtopic: String,
	#[serde(default)]
	pub count: usize,
}

/// A paragraph of the source document. `count` and `topics` are derived and
/// always rebuilt together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
	#[serde(default)]
	pub index: usize,
	pub chapter: String,
	pub section: String,
	pub para: String,
	#[serde(default)]
	pub count: usize,
	#[serde(default)]
	pub topics: Vec<usize>,
}

/// Edge between a document and a topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
	pub doc: usize,
	pub topic: usize,
	pub similarity: f64,
}

/// Everything handed over by the corpus loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
	#[serde(default)]
	pub topics: Vec<Topic>,
	#[serde(default)]
	pub docs: Vec<Document>,
	#[serde(default)]
	pub matches: Vec<Match>,
}

impl Corpus {
	pub fn new(topics: Vec<Topic>, docs: Vec<Document>, matches: Vec<Match>) -> Self {
		let mut corpus = Self {
			topics,
			docs,
			matches,
		};
		corpus.assign_indices();
		corpus
	}

	/// Indices are positional. Whatever the loader put in `index` is replaced.
	pub fn assign_indices(&mut self) {
		for (i, topic) in self.topics.iter_mut().enumerate() {
			topic.index = i;
		}
		for (i, doc) in self.docs.iter_mut().enumerate() {
			doc.index = i;
		}
	}
}

/// Compact topic reference handed to narrative text and the network view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRef {
	pub index: usize,
	pub topic: String,
	pub subtopic: String,
	pub count: usize,
}

impl From<&Topic> for TopicRef {
	fn from(t: &Topic) -> Self {
		Self {
			index: t.index,
			topic: t.topic.clone(),
			subtopic: t.subtopic.clone(),
			count: t.count,
		}
	}
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// The three views a narrative step can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
	Topics,
	Text,
	Network,
}

impl Panel {
	pub const ALL: [Panel; 3] = [Panel::Topics, Panel::Text, Panel::Network];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Topics => "topics",
			Self::Text => "text",
			Self::Network => "network",
		}
	}
}

impl fmt::Display for Panel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
