use clap::Parser;

/// Library-level knobs for a [`crate::story::Story`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoryConfig {
	/// Starting similarity threshold. Matches must strictly exceed it.
	pub threshold: f64,
	/// Containment order of topic columns, outer first.
	pub topic_columns: Vec<String>,
	/// Containment order of document columns, outer first.
	pub doc_columns: Vec<String>,
	/// Neighbours listed for the most connected topic.
	pub top_connections: usize,
	/// How many leading topics get their own "mentions" step.
	pub topic_mention_steps: usize,
	/// Positive subtopics a topic step must exceed before it names an emphasis.
	pub emphasis_min_subtopics: usize,
	/// Count the leading subtopic must exceed to be named as the emphasis.
	pub emphasis_min_count: usize,
	/// Chapters quoted in the document overview step.
	pub sample_chapters: usize,
}

impl Default for StoryConfig {
	fn default() -> Self {
		Self {
			threshold: 0.75,
			topic_columns: vec!["topic".into(), "subtopic".into()],
			doc_columns: vec!["chapter".into(), "section".into(), "para".into()],
			top_connections: 3,
			topic_mention_steps: 2,
			emphasis_min_subtopics: 4,
			emphasis_min_count: 2,
			sample_chapters: 3,
		}
	}
}

#[derive(Parser, Debug)]
#[command(name = "docstory-engine", about = "Data story filtering and view-sync engine over JSON-RPC stdio")]
pub struct CliArgs {
	/// Initial similarity threshold (0..=1); `story/load` params override it
	#[arg(long, default_value = "0.75", env = "DOCSTORY_THRESHOLD")]
	pub threshold: f64,

	/// Neighbours listed for the most connected topic
	#[arg(long, default_value = "3")]
	pub top_connections: usize,

	/// Leading topics that get their own document-map step
	#[arg(long, default_value = "2")]
	pub topic_mention_steps: usize,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "DOCSTORY_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	pub fn story_config(&self) -> StoryConfig {
		StoryConfig {
			threshold: self.threshold,
			top_connections: self.top_connections,
			topic_mention_steps: self.topic_mention_steps,
			..StoryConfig::default()
		}
	}
}
