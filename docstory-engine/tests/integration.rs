// ---------------------------------------------------------------------------
// Integration tests for docstory-engine JSON-RPC 2.0 / NDJSON protocol
// ---------------------------------------------------------------------------
//
// Each test spawns a fresh docstory-engine binary and communicates via
// stdin/stdout using newline-delimited JSON-RPC 2.0 messages. Renderer
// notifications arrive on the same stream ahead of each response.
// ---------------------------------------------------------------------------

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

struct StoryProcess {
	child: Child,
	reader: BufReader<std::process::ChildStdout>,
	next_id: AtomicU64,
}

impl StoryProcess {
	fn spawn() -> Self {
		let bin = env!("CARGO_BIN_EXE_docstory-engine");
		let mut child = Command::new(bin)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.spawn()
			.expect("failed to spawn docstory-engine");

		let stdout = child.stdout.take().expect("no stdout");
		let reader = BufReader::new(stdout);

		Self {
			child,
			reader,
			next_id: AtomicU64::new(1),
		}
	}

	fn write_raw(&mut self, line: &str) {
		let stdin = self.child.stdin.as_mut().expect("no stdin");
		stdin.write_all(line.as_bytes()).unwrap();
		stdin.write_all(b"\n").unwrap();
		stdin.flush().unwrap();
	}

	/// Send a request; return the notifications that preceded its response,
	/// and the response itself.
	fn send(&mut self, method: &str, params: Value) -> (Vec<Value>, RpcResponse) {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let request = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});
		self.write_raw(&serde_json::to_string(&request).unwrap());

		let mut notifications = Vec::new();
		loop {
			let mut buf = String::new();
			let bytes_read = self
				.reader
				.read_line(&mut buf)
				.expect("failed to read from stdout");
			if bytes_read == 0 {
				panic!("unexpected EOF while waiting for response to id={}", id);
			}
			let buf = buf.trim();
			if buf.is_empty() {
				continue;
			}
			let parsed: Value = serde_json::from_str(buf)
				.unwrap_or_else(|e| panic!("invalid JSON from engine: {e}\nline: {buf}"));
			if parsed.get("id").is_none() {
				notifications.push(parsed);
				continue;
			}
			let resp_id = parsed["id"].as_u64().expect("response id is not u64");
			assert_eq!(resp_id, id, "response id mismatch");
			if let Some(error) = parsed.get("error") {
				return (notifications, RpcResponse::Error(error.clone()));
			}
			let result = parsed.get("result").cloned().unwrap_or(Value::Null);
			return (notifications, RpcResponse::Ok(result));
		}
	}

	fn call(&mut self, method: &str, params: Value) -> Value {
		self.call_notified(method, params).1
	}

	fn call_notified(&mut self, method: &str, params: Value) -> (Vec<Value>, Value) {
		match self.send(method, params) {
			(n, RpcResponse::Ok(v)) => (n, v),
			(_, RpcResponse::Error(e)) => panic!("expected success, got error: {e}"),
		}
	}

	fn call_err(&mut self, method: &str, params: Value) -> Value {
		match self.send(method, params).1 {
			RpcResponse::Error(e) => e,
			RpcResponse::Ok(v) => panic!("expected error, got success: {v}"),
		}
	}

	/// Load the two-paper corpus at threshold 0.8.
	fn load(&mut self, extra: Value) -> (Vec<Value>, Value) {
		let mut params = corpus();
		params["threshold"] = json!(0.8);
		if let Value::Object(extra) = extra {
			for (k, v) in extra {
				params[k] = v;
			}
		}
		self.call_notified("story/load", params)
	}
}

impl Drop for StoryProcess {
	fn drop(&mut self) {
		drop(self.child.stdin.take());
		let _ = self.child.wait();
	}
}

#[derive(Debug)]
enum RpcResponse {
	Ok(Value),
	Error(Value),
}

fn corpus() -> Value {
	json!({
		"topics": [
			{ "topic": "Ethics", "subtopic": "privacy" },
			{ "topic": "Ethics", "subtopic": "bias" },
			{ "topic": "Ethics", "subtopic": "consent" },
			{ "topic": "Tech", "subtopic": "models" },
			{ "topic": "Tech", "subtopic": "data" },
			{ "topic": "Policy", "subtopic": "law" }
		],
		"docs": [
			{ "chapter": "Paper 1", "section": "Intro", "para": "Privacy and bias in models." },
			{ "chapter": "Paper 1", "section": "Intro", "para": "Consent matters." },
			{ "chapter": "Paper 1", "section": "Methods", "para": "We trained models on data." },
			{ "chapter": "Paper 2", "section": "Intro", "para": "Law and privacy." },
			{ "chapter": "Paper 2", "section": "Results", "para": "Bias in data." }
		],
		"matches": [
			{ "doc": 0, "topic": 0, "similarity": 0.92 },
			{ "doc": 0, "topic": 1, "similarity": 0.88 },
			{ "doc": 0, "topic": 3, "similarity": 0.81 },
			{ "doc": 1, "topic": 2, "similarity": 0.90 },
			{ "doc": 2, "topic": 3, "similarity": 0.95 },
			{ "doc": 2, "topic": 4, "similarity": 0.86 },
			{ "doc": 3, "topic": 5, "similarity": 0.91 },
			{ "doc": 3, "topic": 0, "similarity": 0.84 },
			{ "doc": 4, "topic": 1, "similarity": 0.89 },
			{ "doc": 4, "topic": 4, "similarity": 0.79 }
		]
	})
}

fn methods(notifications: &[Value]) -> Vec<&str> {
	notifications
		.iter()
		.map(|n| n["method"].as_str().unwrap())
		.collect()
}

fn rendered_panels(notifications: &[Value]) -> Vec<&str> {
	notifications
		.iter()
		.filter(|n| n["method"] == "view/render")
		.map(|n| n["params"]["frame"]["panel"].as_str().unwrap())
		.collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn requests_before_load_fail() {
	let mut proc = StoryProcess::spawn();
	let err = proc.call_err("story/state", json!({}));
	assert_eq!(err["code"], -32000);
	assert_eq!(err["data"]["storyCode"], "STORY_NOT_LOADED");
}

#[test]
fn unknown_method() {
	let mut proc = StoryProcess::spawn();
	let err = proc.call_err("story/frobnicate", json!({}));
	assert_eq!(err["code"], -32601);
}

#[test]
fn unparsable_lines_are_skipped() {
	let mut proc = StoryProcess::spawn();
	proc.write_raw("{this is not json");
	proc.load(json!({}));
	let state = proc.call("story/state", Value::Null);
	assert_eq!(state["topics"], 6);
}

#[test]
fn load_renders_every_panel() {
	let mut proc = StoryProcess::spawn();
	let (notifications, state) = proc.load(json!({}));

	assert_eq!(methods(&notifications)[0], "observer/reset");
	assert_eq!(rendered_panels(&notifications), vec!["topics", "text", "network"]);
	assert_eq!(state["threshold"], 0.8);
	assert_eq!(state["docs"], 5);
	assert_eq!(state["steps"], 12);
	assert_eq!(state["droppedMatches"], 0);
	assert_eq!(state["empty"], false);
}

#[test]
fn threshold_sweep_changes_counts_and_links() {
	let mut proc = StoryProcess::spawn();
	proc.load(json!({}));

	let links = proc.call("links/get", json!({}));
	assert_eq!(links["links"].as_array().unwrap().len(), 5);

	let (notifications, state) = proc.call_notified("story/setThreshold", json!({ "threshold": 0.9 }));
	assert_eq!(state["threshold"], 0.9);
	assert_eq!(rendered_panels(&notifications), vec!["topics", "text", "network"]);

	let links = proc.call("links/get", json!({}));
	assert!(links["links"].as_array().unwrap().is_empty());
	let all = proc.call("links/get", json!({ "all": true }));
	assert_eq!(all["links"].as_array().unwrap().len(), 15);

	let tree = proc.call("topics/tree", json!({ "group": "Ethics" }));
	let rows = tree["rows"].as_array().unwrap();
	assert_eq!(rows[0]["count"], 3);
	assert_eq!(rows[1]["group"], "Ethics");
	assert_eq!(rows[2]["group"], "privacy");
}

#[test]
fn invalid_threshold_is_rejected() {
	let mut proc = StoryProcess::spawn();
	proc.load(json!({}));
	let err = proc.call_err("story/setThreshold", json!({ "threshold": 1.5 }));
	assert_eq!(err["data"]["storyCode"], "STORY_INVALID_THRESHOLD");

	let err = proc.call_err("story/setThreshold", json!({}));
	assert_eq!(err["code"], -32602);
}

#[test]
fn generated_steps_drive_single_panels() {
	let mut proc = StoryProcess::spawn();
	proc.load(json!({}));

	let steps = proc.call("story/steps", json!({}));
	let steps = steps["steps"].as_array().unwrap();
	assert_eq!(steps[0]["content"]["kind"], "overview");
	assert_eq!(steps[5]["content"]["kind"], "topicMentions");
	assert_eq!(steps[5]["filter"]["topics"], json!(["Ethics"]));

	let (notifications, result) = proc.call_notified("step/enter", json!({ "step": 5 }));
	assert_eq!(result["transition"], "dispatch");
	assert_eq!(result["panel"], "text");
	assert_eq!(rendered_panels(&notifications), vec!["text"]);
	let fades: Vec<(&str, bool)> = notifications
		.iter()
		.filter(|n| n["method"] == "view/fade")
		.map(|n| {
			(
				n["params"]["panel"].as_str().unwrap(),
				n["params"]["faded"].as_bool().unwrap(),
			)
		})
		.collect();
	assert_eq!(fades, vec![("topics", true), ("text", false), ("network", true)]);

	// The text render re-seeds the selection and every panel hears about it.
	let text = notifications
		.iter()
		.find(|n| n["method"] == "view/render")
		.unwrap();
	let seeded = &text["params"]["frame"]["active"];
	let updates: Vec<&Value> = notifications
		.iter()
		.filter(|n| n["method"] == "view/update")
		.collect();
	assert_eq!(updates.len(), 3);
	assert!(updates.iter().all(|u| &u["params"]["active"] == seeded));
	assert_eq!(&proc.call("selection/get", json!({}))["active"], seeded);

	let (notifications, _) = proc.call_notified("step/exit", json!({ "step": 5 }));
	assert!(notifications.is_empty());
	let state = proc.call("story/state", json!({}));
	assert_eq!(state["activeStep"], Value::Null);
	assert_eq!(state["visiblePanel"], "text");
}

#[test]
fn authored_override_rebuilds_whole_story() {
	let mut proc = StoryProcess::spawn();
	proc.load(json!({
		"steps": [
			{ "panel": "text", "filter": { "topics": ["Tech"] } },
			{ "panel": "network", "thresholdOverride": 0.9 }
		]
	}));

	let (notifications, result) = proc.call_notified("step/enter", json!({ "step": 1 }));
	assert_eq!(result["transition"], "rebuild");
	assert_eq!(result["threshold"], 0.9);
	assert!(methods(&notifications).contains(&"observer/reset"));
	assert_eq!(rendered_panels(&notifications), vec!["topics", "text", "network"]);

	let steps = proc.call("story/steps", json!({}));
	assert_eq!(steps["steps"].as_array().unwrap().len(), 2);
	assert_eq!(steps["steps"][0]["content"]["kind"], "authored");

	let err = proc.call_err("step/enter", json!({ "step": 7 }));
	assert_eq!(err["data"]["storyCode"], "STORY_UNKNOWN_STEP");
}

#[test]
fn selection_broadcasts_and_filters_popup() {
	let mut proc = StoryProcess::spawn();
	proc.load(json!({}));

	// Position 0 is the Ethics parent node.
	let (notifications, result) = proc.call_notified("selection/click", json!({ "position": 0 }));
	let active = result["active"].as_array().unwrap();
	assert_eq!(active.iter().filter(|a| a.as_bool().unwrap()).count(), 4);
	assert_eq!(methods(&notifications), vec!["view/update"; 3]);

	// Doc 0 is the third node of the document hierarchy.
	let popup = proc.call("doc/popup", json!({ "position": 2 }));
	assert_eq!(popup["chapter"], "Paper 1");
	let subs: Vec<&str> = popup["topics"]
		.as_array()
		.unwrap()
		.iter()
		.map(|t| t["subtopic"].as_str().unwrap())
		.collect();
	assert_eq!(subs, vec!["privacy", "bias"]);

	// Privacy alone off.
	proc.call("selection/toggle", json!({ "position": 1 }));
	let popup = proc.call("doc/popup", json!({ "position": 2 }));
	assert_eq!(popup["topics"].as_array().unwrap().len(), 1);

	let err = proc.call_err("selection/toggleGroup", json!({ "position": 99 }));
	assert_eq!(err["data"]["storyCode"], "STORY_NODE_OUT_OF_RANGE");
	let err = proc.call_err("doc/popup", json!({ "position": 99 }));
	assert_eq!(err["data"]["storyCode"], "STORY_DOC_OUT_OF_RANGE");

	let current = proc.call("selection/get", json!({}));
	assert_eq!(current["active"].as_array().unwrap().len(), 9);
}

#[test]
fn network_and_most_connected() {
	let mut proc = StoryProcess::spawn();
	proc.load(json!({}));

	let network = proc.call("network/get", json!({}));
	assert_eq!(network["empty"], false);
	assert_eq!(network["nodes"][0]["linkCount"], 2);
	assert_eq!(network["links"].as_array().unwrap().len(), 5);

	let top = proc.call("links/mostConnected", json!({ "limit": 2 }));
	assert_eq!(top["mostConnected"]["topic"]["subtopic"], "privacy");
	assert_eq!(top["mostConnected"]["connections"].as_array().unwrap().len(), 2);
}

#[test]
fn malformed_matches_are_dropped() {
	let mut proc = StoryProcess::spawn();
	let mut params = corpus();
	params["matches"]
		.as_array_mut()
		.unwrap()
		.push(json!({ "doc": 42, "topic": 0, "similarity": 0.99 }));
	let state = proc.call("story/load", params);
	assert_eq!(state["droppedMatches"], 1);
	assert_eq!(state["matches"], 10);
	assert_eq!(state["threshold"], 0.75);
}

#[test]
fn empty_story_at_full_threshold() {
	let mut proc = StoryProcess::spawn();
	let (notifications, state) = proc.load(json!({ "threshold": 1.0 }));
	assert_eq!(state["empty"], true);
	for n in notifications.iter().filter(|n| n["method"] == "view/render") {
		assert_eq!(n["params"]["frame"]["empty"], true);
	}
	let steps = proc.call("story/steps", json!({}));
	let kinds: Vec<&str> = steps["steps"]
		.as_array()
		.unwrap()
		.iter()
		.map(|s| s["content"]["kind"].as_str().unwrap())
		.collect();
	assert!(kinds.contains(&"noConnections"));
}

#[test]
fn unknown_columns_fail_the_load() {
	let mut proc = StoryProcess::spawn();
	let mut params = corpus();
	params["topicColumns"] = json!(["topic", "theme"]);
	let err = proc.call_err("story/load", params);
	assert_eq!(err["code"], -32000);
	assert_eq!(err["data"]["storyCode"], "STORY_UNKNOWN_COLUMN");

	let err = proc.call_err("story/state", json!({}));
	assert_eq!(err["data"]["storyCode"], "STORY_NOT_LOADED");
}
