// ---------------------------------------------------------------------------
// StoryServer: JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to `Story`
// operations: a main `run()` loop, a `dispatch()` match, `with_story` /
// `with_story_mut` helpers, and free-standing handler functions for each
// method.
//
// Renderers and the scroll observer live on the client side of the pipe.
// The engine reaches them through notifications written on the same stdout
// stream, always before the response to the request that caused them.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};

use serde::Deserialize;
use serde_json::json;

use crate::config::StoryConfig;
use crate::error::StoryError;
use crate::narrative::{Step, Transition};
use crate::protocol::*;
use crate::selection::ActiveSet;
use crate::story::Story;
use crate::transport::NdjsonTransport;
use crate::types::{Corpus, Document, Match, Panel, Topic};
use crate::views::{StepObserver, View, ViewFrame};

// ---------------------------------------------------------------------------
// Remote renderers
// ---------------------------------------------------------------------------

/// A panel renderer reached through `view/*` notifications.
pub struct NotifyingView {
	panel: Panel,
	transport: NdjsonTransport,
}

impl NotifyingView {
	pub fn new(panel: Panel, transport: NdjsonTransport) -> Self {
		Self { panel, transport }
	}

	fn notify(&self, method: &str, params: serde_json::Value) -> Result<(), StoryError> {
		self.transport
			.write_notification(method, params)
			.map_err(|e| StoryError::View {
				panel: self.panel,
				message: e.to_string(),
			})
	}
}

impl View for NotifyingView {
	fn panel(&self) -> Panel {
		self.panel
	}

	fn render(&mut self, frame: &ViewFrame) -> Result<(), StoryError> {
		self.notify(VIEW_RENDER, json!({ "frame": frame }))
	}

	fn update(&mut self, active: &ActiveSet) -> Result<(), StoryError> {
		self.notify(VIEW_UPDATE, json!({ "panel": self.panel, "active": active }))
	}

	fn set_faded(&mut self, faded: bool) -> Result<(), StoryError> {
		self.notify(VIEW_FADE, json!({ "panel": self.panel, "faded": faded }))
	}
}

/// Tells the client to tear down and re-register its scroll observer.
pub struct NotifyingObserver {
	transport: NdjsonTransport,
}

impl StepObserver for NotifyingObserver {
	fn reset(&mut self, steps: &[Step]) -> Result<(), StoryError> {
		self.transport
			.write_notification(OBSERVER_RESET, json!({ "steps": steps }))?;
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// JSON-RPC server that dispatches requests to a [`Story`].
pub struct StoryServer {
	transport: NdjsonTransport,
	config: StoryConfig,
	story: Option<Story>,
}

impl StoryServer {
	/// The story is created when `story/load` is called. `config` supplies
	/// the defaults its params may override.
	pub fn new(transport: NdjsonTransport, config: StoryConfig) -> Self {
		Self {
			transport,
			config,
			story: None,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), StoryError> {
		let stdin = io::stdin();
		let reader = stdin.lock();

		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let result = match req.method.as_str() {
			// -- Lifecycle -----------------------------------------------
			"story/load" => self.handle_load(req.params),
			"story/setThreshold" => self.with_story_mut(|s| handle_set_threshold(s, req.params)),
			"story/state" => self.with_story(|s| Ok(json!(s.state()))),
			"story/steps" => self.with_story(|s| Ok(json!({ "steps": s.steps() }))),

			// -- Narrative -----------------------------------------------
			"step/enter" => self.with_story_mut(|s| handle_step_enter(s, req.params)),
			"step/exit" => self.with_story_mut(|s| {
				let p: StepParams = parse_params(req.params)?;
				s.on_exit(p.step)?;
				Ok(json!({}))
			}),

			// -- Selection -----------------------------------------------
			"selection/click" => self.with_story_mut(|s| {
				let p: PositionParams = parse_params(req.params)?;
				Ok(json!({ "active": s.click(p.position)? }))
			}),
			"selection/toggle" => self.with_story_mut(|s| {
				let p: PositionParams = parse_params(req.params)?;
				Ok(json!({ "active": s.toggle(p.position)? }))
			}),
			"selection/toggleGroup" => self.with_story_mut(|s| {
				let p: PositionParams = parse_params(req.params)?;
				Ok(json!({ "active": s.toggle_group(p.position)? }))
			}),
			"selection/get" => self.with_story(|s| Ok(json!({ "active": s.active() }))),
			"doc/popup" => self.with_story(|s| {
				let p: PositionParams = parse_params(req.params)?;
				Ok(json!(s.popup(p.position)?))
			}),

			// -- Datasets ------------------------------------------------
			"topics/tree" => self.with_story(|s| {
				let p: TreeParams = parse_params(req.params)?;
				Ok(json!(s.topic_tree(p.group.as_deref())))
			}),
			"network/get" => self.with_story(|s| Ok(json!(s.network()))),
			"links/get" => self.with_story(|s| {
				let p: LinksParams = parse_params(req.params)?;
				Ok(json!({ "links": s.links(p.all) }))
			}),
			"links/mostConnected" => self.with_story(|s| {
				let p: MostConnectedParams = parse_params(req.params)?;
				Ok(json!({ "mostConnected": s.most_connected(p.limit) }))
			}),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e @ StoryError::Serialization(_)) => {
				self.transport
					.write_error(id, INVALID_PARAMS, e.to_string(), Some(e.to_json_rpc_error()))
			}
			Err(e @ StoryError::Io(_)) => {
				self.transport
					.write_error(id, INTERNAL_ERROR, e.to_string(), Some(e.to_json_rpc_error()))
			}
			Err(e) => self.transport.write_error(
				id,
				STORY_ERROR,
				e.to_string(),
				Some(e.to_json_rpc_error()),
			),
		}
	}

	// ── Story accessors ───────────────────────────────────────────────────

	fn with_story<F>(&self, f: F) -> Result<serde_json::Value, StoryError>
	where
		F: FnOnce(&Story) -> Result<serde_json::Value, StoryError>,
	{
		match &self.story {
			Some(s) => f(s),
			None => Err(StoryError::NotLoaded),
		}
	}

	fn with_story_mut<F>(&mut self, f: F) -> Result<serde_json::Value, StoryError>
	where
		F: FnOnce(&mut Story) -> Result<serde_json::Value, StoryError>,
	{
		match &mut self.story {
			Some(s) => f(s),
			None => Err(StoryError::NotLoaded),
		}
	}

	// ── Load ──────────────────────────────────────────────────────────────

	fn handle_load(&mut self, params: serde_json::Value) -> Result<serde_json::Value, StoryError> {
		let p: LoadParams = parse_params(params)?;

		let defaults = &self.config;
		let config = StoryConfig {
			threshold: p.threshold.unwrap_or(defaults.threshold),
			topic_columns: p.topic_columns.unwrap_or_else(|| defaults.topic_columns.clone()),
			doc_columns: p.doc_columns.unwrap_or_else(|| defaults.doc_columns.clone()),
			top_connections: p.top_connections.unwrap_or(defaults.top_connections),
			topic_mention_steps: p.topic_mention_steps.unwrap_or(defaults.topic_mention_steps),
			emphasis_min_subtopics: p
				.emphasis_min_subtopics
				.unwrap_or(defaults.emphasis_min_subtopics),
			emphasis_min_count: p.emphasis_min_count.unwrap_or(defaults.emphasis_min_count),
			sample_chapters: p.sample_chapters.unwrap_or(defaults.sample_chapters),
		};

		let views: Vec<Box<dyn View>> = Panel::ALL
			.iter()
			.map(|&panel| Box::new(NotifyingView::new(panel, self.transport)) as Box<dyn View>)
			.collect();
		let observer = Box::new(NotifyingObserver {
			transport: self.transport,
		});

		// A failed reload leaves no story behind rather than a stale one.
		self.story = None;
		let corpus = Corpus::new(p.topics, p.docs, p.matches);
		let story = Story::load(corpus, p.steps, config, views, observer)?;
		let state = story.state();
		self.story = Some(story);

		Ok(json!(state))
	}
}

// ---------------------------------------------------------------------------
// Param types
// ---------------------------------------------------------------------------

/// Absent params read as `{}` so all-optional param structs still parse.
fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, StoryError> {
	let params = if params.is_null() { json!({}) } else { params };
	serde_json::from_value(params)
		.map_err(|e| StoryError::Serialization(format!("Invalid params: {}", e)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadParams {
	#[serde(default)]
	topics: Vec<Topic>,
	#[serde(default)]
	docs: Vec<Document>,
	#[serde(default)]
	matches: Vec<Match>,
	steps: Option<Vec<Step>>,
	threshold: Option<f64>,
	topic_columns: Option<Vec<String>>,
	doc_columns: Option<Vec<String>>,
	top_connections: Option<usize>,
	topic_mention_steps: Option<usize>,
	emphasis_min_subtopics: Option<usize>,
	emphasis_min_count: Option<usize>,
	sample_chapters: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThresholdParams {
	threshold: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepParams {
	step: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionParams {
	position: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeParams {
	group: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinksParams {
	#[serde(default)]
	all: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MostConnectedParams {
	limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_set_threshold(
	story: &mut Story,
	params: serde_json::Value,
) -> Result<serde_json::Value, StoryError> {
	let p: ThresholdParams = parse_params(params)?;
	story.set_threshold(p.threshold)?;
	Ok(json!(story.state()))
}

fn handle_step_enter(
	story: &mut Story,
	params: serde_json::Value,
) -> Result<serde_json::Value, StoryError> {
	let p: StepParams = parse_params(params)?;
	let transition = story.on_enter(p.step)?;
	let (kind, panel) = match &transition {
		Transition::Mark => ("mark", None),
		Transition::Dispatch { panel, .. } => ("dispatch", Some(*panel)),
		Transition::Rebuild { panel, .. } => ("rebuild", Some(*panel)),
	};
	Ok(json!({
		"transition": kind,
		"panel": panel,
		"threshold": story.threshold(),
	}))
}
