// ---------------------------------------------------------------------------
// Story: the application state and its single recompute path
// ---------------------------------------------------------------------------
//
// Field ownership:
//   corpus counts, links, tree, doc map  written only by `rebuild`
//   selection                            written only through `Selection`
//   narrative                            written only by step events and
//                                        `rebuild` (step list)
//
// Every entry point runs to completion before returning, so a threshold
// change is fully reflected in all three panels before the next event.
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::{aggregate, validate_matches};
use crate::config::StoryConfig;
use crate::error::StoryError;
use crate::links::{Link, LinkTable, MostConnected};
use crate::narrative::{generate_steps, NarrativeMachine, Step, StepFilter, Transition};
use crate::selection::{doc_popup, ActiveSet, DocPopup, Selection};
use crate::sequence::{check_columns, Hierarchy, DOC_COLUMNS, TOPIC_COLUMNS};
use crate::tree::TopicTree;
use crate::types::{Corpus, Panel};
use crate::views::{
	doc_topic_map, network_frame, NetworkFrame, StepObserver, TextFrame, TopicsFrame, View,
	ViewFrame,
};

/// Filter and group a panel was last rendered with.
#[derive(Debug, Clone, Default)]
struct PanelFocus {
	filter: StepFilter,
	group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryState {
	pub threshold: f64,
	pub topics: usize,
	pub docs: usize,
	pub matches: usize,
	pub dropped_matches: usize,
	pub steps: usize,
	pub active_step: Option<usize>,
	pub visible_panel: Option<Panel>,
	pub empty: bool,
}

pub fn validate_threshold(threshold: f64) -> Result<f64, StoryError> {
	if (0.0..=1.0).contains(&threshold) {
		Ok(threshold)
	} else {
		Err(StoryError::InvalidThreshold(threshold))
	}
}

pub struct Story {
	config: StoryConfig,
	corpus: Corpus,
	dropped: usize,
	threshold: f64,
	topic_nodes: Hierarchy,
	doc_nodes: Hierarchy,
	links: LinkTable,
	tree: TopicTree,
	doc_topic_map: Vec<(usize, usize)>,
	selection: Selection,
	narrative: NarrativeMachine,
	authored: Option<Vec<Step>>,
	focus: HashMap<Panel, PanelFocus>,
	views: Vec<Box<dyn View>>,
	observer: Box<dyn StepObserver>,
}

impl Story {
	/// Load a corpus and render every panel at `config.threshold`.
	///
	/// `authored` replaces the generated walkthrough when non-empty and
	/// survives every rebuild unchanged.
	pub fn load(
		mut corpus: Corpus,
		authored: Option<Vec<Step>>,
		config: StoryConfig,
		views: Vec<Box<dyn View>>,
		observer: Box<dyn StepObserver>,
	) -> Result<Self, StoryError> {
		let threshold = validate_threshold(config.threshold)?;
		check_columns("topic", &config.topic_columns, TOPIC_COLUMNS)?;
		check_columns("document", &config.doc_columns, DOC_COLUMNS)?;
		let authored = authored.filter(|steps| !steps.is_empty());
		if let Some(steps) = &authored {
			for t in steps.iter().filter_map(|s| s.threshold_override) {
				validate_threshold(t)?;
			}
		}

		corpus.assign_indices();
		let (matches, dropped) = validate_matches(
			std::mem::take(&mut corpus.matches),
			corpus.topics.len(),
			corpus.docs.len(),
		);
		corpus.matches = matches;
		tracing::info!(
			topics = corpus.topics.len(),
			docs = corpus.docs.len(),
			matches = corpus.matches.len(),
			dropped,
			"Loaded corpus"
		);

		let topic_nodes = Hierarchy::build(&corpus.topics, config.topic_columns.as_slice());
		let doc_nodes = Hierarchy::build(&corpus.docs, config.doc_columns.as_slice());
		let links = LinkTable::new(corpus.topics.len());
		let selection = Selection::new(&topic_nodes);

		let mut story = Self {
			config,
			corpus,
			dropped,
			threshold,
			topic_nodes,
			doc_nodes,
			links,
			tree: TopicTree::default(),
			doc_topic_map: Vec::new(),
			selection,
			narrative: NarrativeMachine::default(),
			authored,
			focus: HashMap::new(),
			views,
			observer,
		};
		story.rebuild()?;
		Ok(story)
	}

	// ── Recompute ─────────────────────────────────────────────────────────

	/// Change the threshold and re-render the whole story.
	pub fn set_threshold(&mut self, threshold: f64) -> Result<(), StoryError> {
		let threshold = validate_threshold(threshold)?;
		tracing::debug!(from = self.threshold, to = threshold, "Threshold changed");
		self.threshold = threshold;
		self.rebuild()
	}

	/// Aggregate, link, regenerate steps, reset the observer, then render all
	/// panels, in that order.
	fn rebuild(&mut self) -> Result<(), StoryError> {
		aggregate(
			&mut self.corpus.topics,
			&mut self.corpus.docs,
			&self.corpus.matches,
			self.threshold,
		);
		self.links.rebuild(&self.corpus.topics, &self.corpus.docs);
		self.tree = TopicTree::build(&self.corpus.topics);
		self.doc_topic_map = doc_topic_map(
			&self.corpus.matches,
			self.threshold,
			&self.topic_nodes,
			&self.doc_nodes,
		);

		let steps = match &self.authored {
			Some(steps) => steps.clone(),
			None => generate_steps(
				&self.tree,
				&self.corpus.docs,
				self.links.most_connected(&self.corpus.topics, self.config.top_connections),
				self.threshold,
				&self.config,
			),
		};
		self.narrative.replace_steps(steps);
		self.observer.reset(self.narrative.steps())?;

		self.render_panels(&Panel::ALL)
	}

	/// Render `panels`. A text render re-seeds the selection, so every view
	/// then receives the new ActiveSet.
	fn render_panels(&mut self, panels: &[Panel]) -> Result<(), StoryError> {
		for &panel in panels {
			let frame = self.frame(panel);
			for view in self.views.iter_mut().filter(|v| v.panel() == panel) {
				tracing::trace!(%panel, empty = frame.is_empty(), "Rendering view");
				view.render(&frame)?;
			}
		}
		if panels.contains(&Panel::Text) {
			self.push_selection()?;
		}
		Ok(())
	}

	/// Prepared dataset for `panel` under its last focus. Rendering the text
	/// panel re-seeds the selection from its filter.
	fn frame(&mut self, panel: Panel) -> ViewFrame {
		let focus = self.focus.get(&panel).cloned().unwrap_or_default();
		match panel {
			Panel::Topics => ViewFrame::Topics(self.topic_tree(focus.group.as_deref())),
			Panel::Text => {
				self.selection.seed(&self.topic_nodes, &focus.filter);
				ViewFrame::Text(self.text_frame(focus.filter))
			}
			Panel::Network => ViewFrame::Network(self.network()),
		}
	}

	fn text_frame(&self, filter: StepFilter) -> TextFrame {
		TextFrame {
			topics: self.topic_nodes.nodes().to_vec(),
			docs: self.doc_nodes.nodes().to_vec(),
			doc_topic_map: self.doc_topic_map.clone(),
			filter,
			active: self.selection.active().clone(),
			empty: self.doc_topic_map.is_empty(),
		}
	}

	// ── Narrative ─────────────────────────────────────────────────────────

	pub fn on_enter(&mut self, id: usize) -> Result<Transition, StoryError> {
		let transition = self.narrative.on_enter(id, self.threshold)?;
		match &transition {
			Transition::Mark => {}
			Transition::Dispatch {
				panel,
				filter,
				group,
			} => {
				self.fade_except(*panel)?;
				self.set_focus(*panel, filter, group);
				self.render_panels(&[*panel])?;
			}
			Transition::Rebuild {
				threshold,
				panel,
				filter,
				group,
			} => {
				self.fade_except(*panel)?;
				self.set_focus(*panel, filter, group);
				tracing::debug!(from = self.threshold, to = *threshold, "Threshold changed by step");
				self.threshold = *threshold;
				self.rebuild()?;
			}
		}
		Ok(transition)
	}

	pub fn on_exit(&mut self, id: usize) -> Result<(), StoryError> {
		self.narrative.on_exit(id)
	}

	fn set_focus(&mut self, panel: Panel, filter: &StepFilter, group: &Option<String>) {
		self.focus.insert(
			panel,
			PanelFocus {
				filter: filter.clone(),
				group: group.clone(),
			},
		);
	}

	fn fade_except(&mut self, visible: Panel) -> Result<(), StoryError> {
		for view in &mut self.views {
			let faded = view.panel() != visible;
			view.set_faded(faded)?;
		}
		Ok(())
	}

	// ── Selection ─────────────────────────────────────────────────────────

	/// Badge click on a topic node.
	pub fn click(&mut self, position: usize) -> Result<&ActiveSet, StoryError> {
		self.selection.click(&self.topic_nodes, position)?;
		self.push_selection()
	}

	pub fn toggle(&mut self, position: usize) -> Result<&ActiveSet, StoryError> {
		self.selection.toggle_one(position)?;
		self.push_selection()
	}

	pub fn toggle_group(&mut self, position: usize) -> Result<&ActiveSet, StoryError> {
		self.selection.toggle_group(&self.topic_nodes, position)?;
		self.push_selection()
	}

	fn push_selection(&mut self) -> Result<&ActiveSet, StoryError> {
		let active = self.selection.active();
		for view in &mut self.views {
			view.update(active)?;
		}
		Ok(active)
	}

	pub fn active(&self) -> &ActiveSet {
		self.selection.active()
	}

	pub fn popup(&self, doc_position: usize) -> Result<DocPopup, StoryError> {
		doc_popup(
			&self.doc_nodes,
			&self.topic_nodes,
			&self.doc_topic_map,
			self.selection.active(),
			doc_position,
		)
	}

	// ── Queries ───────────────────────────────────────────────────────────

	pub fn threshold(&self) -> f64 {
		self.threshold
	}

	pub fn config(&self) -> &StoryConfig {
		&self.config
	}

	pub fn corpus(&self) -> &Corpus {
		&self.corpus
	}

	pub fn steps(&self) -> &[Step] {
		self.narrative.steps()
	}

	pub fn topic_nodes(&self) -> &Hierarchy {
		&self.topic_nodes
	}

	pub fn doc_nodes(&self) -> &Hierarchy {
		&self.doc_nodes
	}

	pub fn topic_tree(&self, group: Option<&str>) -> TopicsFrame {
		TopicsFrame {
			rows: self.tree.visible(group).into_iter().cloned().collect(),
			max_count_by_level: self.tree.max_count_by_level.clone(),
			group: group.map(str::to_string),
			empty: self.tree.is_empty(),
		}
	}

	pub fn network(&self) -> NetworkFrame {
		network_frame(&self.corpus.topics, &self.links.positive())
	}

	/// Positive links, or the full table with `all`.
	pub fn links(&self, all: bool) -> Vec<Link> {
		if all {
			self.links.all().to_vec()
		} else {
			self.links.positive()
		}
	}

	pub fn most_connected(&self, limit: Option<usize>) -> Option<MostConnected> {
		self.links.most_connected(
			&self.corpus.topics,
			limit.unwrap_or(self.config.top_connections),
		)
	}

	pub fn state(&self) -> StoryState {
		StoryState {
			threshold: self.threshold,
			topics: self.corpus.topics.len(),
			docs: self.corpus.docs.len(),
			matches: self.corpus.matches.len(),
			dropped_matches: self.dropped,
			steps: self.narrative.steps().len(),
			active_step: self.narrative.active_step(),
			visible_panel: self.narrative.visible_panel(),
			empty: self.tree.is_empty(),
		}
	}
}
