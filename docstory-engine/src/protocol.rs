use serde::Deserialize;

// JSON-RPC 2.0 error codes
pub const INTERNAL_ERROR: i32 = -32603;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const STORY_ERROR: i32 = -32000;

// Outgoing notifications
pub const VIEW_RENDER: &str = "view/render";
pub const VIEW_UPDATE: &str = "view/update";
pub const VIEW_FADE: &str = "view/fade";
pub const OBSERVER_RESET: &str = "observer/reset";

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: serde_json::Value,
}
