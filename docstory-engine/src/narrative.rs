// ---------------------------------------------------------------------------
// Narrative State Machine: scroll steps driving the panels
// ---------------------------------------------------------------------------
//
// One state per step plus "nothing active". `enter` and `exit` come from
// whatever drives the scroll (a browser observer, a JSON-RPC client, a test);
// the machine only decides what each event means and leaves the rendering to
// `Story`.
// ---------------------------------------------------------------------------

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::StoryConfig;
use crate::error::StoryError;
use crate::links::MostConnected;
use crate::tree::TopicTree;
use crate::types::{Document, Panel};

// ---------------------------------------------------------------------------
// StepFilter
// ---------------------------------------------------------------------------

/// Which parent topics a step highlights.
///
/// Anything that does not parse as `{ "topics": [string, ...] }` is kept as
/// the empty filter, which matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepFilter {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub topics: Option<Vec<String>>,
}

impl StepFilter {
	pub fn nothing() -> Self {
		Self::default()
	}

	pub fn topics<I, S>(topics: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			topics: Some(topics.into_iter().map(Into::into).collect()),
		}
	}

	/// Parse a filter from its JSON text form.
	pub fn parse(raw: &str) -> Self {
		match serde_json::from_str::<Value>(raw) {
			Ok(value) => Self::from_value(&value),
			Err(e) => {
				tracing::debug!(error = %e, "Unparsable step filter, matching nothing");
				Self::nothing()
			}
		}
	}

	pub fn from_value(value: &Value) -> Self {
		match value {
			Value::String(raw) => Self::parse(raw),
			Value::Object(map) => {
				let topics = map.get("topics").and_then(Value::as_array).map(|items| {
					items
						.iter()
						.filter_map(Value::as_str)
						.map(str::to_string)
						.collect()
				});
				Self { topics }
			}
			_ => Self::nothing(),
		}
	}

	pub fn includes(&self, topic: &str) -> bool {
		self.topics
			.as_ref()
			.is_some_and(|ts| ts.iter().any(|t| t == topic))
	}
}

impl<'de> Deserialize<'de> for StepFilter {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = Value::deserialize(deserializer)?;
		Ok(Self::from_value(&value))
	}
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Top two and bottom two subtopics of a dominant topic. `bottom` lists the
/// smallest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emphasis {
	pub top: Vec<String>,
	pub bottom: Vec<String>,
}

/// What the text layer should say for a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StepContent {
	/// Supplied by the caller; kept verbatim across rebuilds.
	#[default]
	Authored,
	Overview,
	TopicLeader {
		topic: String,
		rank: usize,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		emphasis: Option<Emphasis>,
	},
	DocumentOverview {
		chapters: usize,
		sections: usize,
		#[serde(rename = "sampleChapters")]
		sample_chapters: Vec<String>,
	},
	TopicMentions {
		topic: String,
	},
	AllTopics,
	SliderHint,
	NetworkIntro,
	WellConnected {
		threshold: f64,
		#[serde(rename = "mostConnected")]
		most_connected: MostConnected,
	},
	NoConnections {
		threshold: f64,
	},
	CraftYourOwn,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
	#[serde(default)]
	pub panel: Option<Panel>,
	#[serde(default)]
	pub filter: StepFilter,
	/// Topic group the topics panel focuses on.
	#[serde(default)]
	pub group: Option<String>,
	#[serde(default)]
	pub threshold_override: Option<f64>,
	#[serde(default)]
	pub content: StepContent,
}

impl Step {
	fn generated(panel: Panel, content: StepContent) -> Self {
		Self {
			panel: Some(panel),
			content,
			..Self::default()
		}
	}

	fn with_filter(mut self, filter: StepFilter) -> Self {
		self.filter = filter;
		self
	}

	fn with_group(mut self, group: &str) -> Self {
		self.group = Some(group.to_string());
		self
	}
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// What `Story` must do after an `enter`.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
	/// The step names no panel: only its marker changed.
	Mark,
	/// Re-render the target panel alone.
	Dispatch {
		panel: Panel,
		filter: StepFilter,
		group: Option<String>,
	},
	/// Switch threshold and rebuild the whole story.
	Rebuild {
		threshold: f64,
		panel: Panel,
		filter: StepFilter,
		group: Option<String>,
	},
}

#[derive(Debug, Clone, Default)]
pub struct NarrativeMachine {
	steps: Vec<Step>,
	active: Option<usize>,
	marked: Vec<bool>,
	visible_panel: Option<Panel>,
}

impl NarrativeMachine {
	pub fn new(steps: Vec<Step>) -> Self {
		let marked = vec![false; steps.len()];
		Self {
			steps,
			active: None,
			marked,
			visible_panel: None,
		}
	}

	pub fn steps(&self) -> &[Step] {
		&self.steps
	}

	pub fn active_step(&self) -> Option<usize> {
		self.active
	}

	pub fn visible_panel(&self) -> Option<Panel> {
		self.visible_panel
	}

	pub fn is_marked(&self, id: usize) -> bool {
		self.marked.get(id).copied().unwrap_or(false)
	}

	/// Swap in a rebuilt step list. The active slot survives when it still
	/// exists, since the reader has not scrolled.
	pub fn replace_steps(&mut self, steps: Vec<Step>) {
		self.active = self.active.filter(|&id| id < steps.len());
		self.marked = vec![false; steps.len()];
		if let Some(id) = self.active {
			self.marked[id] = true;
		}
		self.steps = steps;
	}

	pub fn on_enter(&mut self, id: usize, current_threshold: f64) -> Result<Transition, StoryError> {
		let step = self.steps.get(id).ok_or(StoryError::UnknownStep(id))?;

		for flag in &mut self.marked {
			*flag = false;
		}
		self.marked[id] = true;
		self.active = Some(id);

		let Some(panel) = step.panel else {
			tracing::debug!(step = id, "Entered step without a panel");
			return Ok(Transition::Mark);
		};
		self.visible_panel = Some(panel);

		let filter = step.filter.clone();
		let group = step.group.clone();
		match step.threshold_override {
			Some(threshold) if threshold != current_threshold => {
				tracing::debug!(step = id, %panel, threshold, "Entered step with threshold override");
				Ok(Transition::Rebuild {
					threshold,
					panel,
					filter,
					group,
				})
			}
			_ => {
				tracing::debug!(step = id, %panel, "Entered step");
				Ok(Transition::Dispatch {
					panel,
					filter,
					group,
				})
			}
		}
	}

	/// Clear the step's marker. Nothing is recomputed.
	pub fn on_exit(&mut self, id: usize) -> Result<(), StoryError> {
		let flag = self.marked.get_mut(id).ok_or(StoryError::UnknownStep(id))?;
		*flag = false;
		if self.active == Some(id) {
			self.active = None;
		}
		tracing::debug!(step = id, "Exited step");
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// Script generation
// ---------------------------------------------------------------------------

/// Build the default walkthrough for the current aggregates.
pub fn generate_steps(
	tree: &TopicTree,
	docs: &[Document],
	most_connected: Option<MostConnected>,
	threshold: f64,
	config: &StoryConfig,
) -> Vec<Step> {
	let mut steps = vec![Step::generated(Panel::Topics, StepContent::Overview)];

	let leaders = tree.leaders();
	for (rank, (topic, subs)) in leaders.iter().enumerate() {
		let emphasis = (subs.len() > config.emphasis_min_subtopics
			&& subs[0].count > config.emphasis_min_count)
			.then(|| Emphasis {
				top: subs.iter().take(2).map(|s| s.group.clone()).collect(),
				bottom: subs.iter().rev().take(2).map(|s| s.group.clone()).collect(),
			});
		steps.push(
			Step::generated(
				Panel::Topics,
				StepContent::TopicLeader {
					topic: topic.group.clone(),
					rank,
					emphasis,
				},
			)
			.with_group(&topic.group),
		);
	}

	let mut chapters: Vec<&str> = Vec::new();
	let mut sections: HashSet<&str> = HashSet::new();
	for doc in docs {
		if !chapters.contains(&doc.chapter.as_str()) {
			chapters.push(&doc.chapter);
		}
		sections.insert(&doc.section);
	}
	steps.push(Step::generated(
		Panel::Text,
		StepContent::DocumentOverview {
			chapters: chapters.len(),
			sections: sections.len(),
			sample_chapters: chapters
				.iter()
				.take(config.sample_chapters)
				.map(|c| c.to_string())
				.collect(),
		},
	));

	let names: Vec<&str> = leaders.iter().map(|(t, _)| t.group.as_str()).collect();
	for name in names.iter().take(config.topic_mention_steps) {
		steps.push(
			Step::generated(
				Panel::Text,
				StepContent::TopicMentions {
					topic: name.to_string(),
				},
			)
			.with_filter(StepFilter::topics([*name])),
		);
	}

	let everything = StepFilter::topics(names.iter().copied());
	steps.push(Step::generated(Panel::Text, StepContent::AllTopics).with_filter(everything.clone()));
	steps.push(Step::generated(Panel::Text, StepContent::SliderHint).with_filter(everything));

	steps.push(Step::generated(Panel::Network, StepContent::NetworkIntro));
	let connected = match most_connected {
		Some(mc) if mc.topic.count > 0 => StepContent::WellConnected {
			threshold,
			most_connected: mc,
		},
		_ => StepContent::NoConnections { threshold },
	};
	steps.push(Step::generated(Panel::Network, connected));
	steps.push(Step::generated(Panel::Network, StepContent::CraftYourOwn));

	steps
}
