use std::io::{self, Write};

use serde::Serialize;

#[derive(Serialize)]
struct JsonRpcResponse<'a> {
	jsonrpc: &'a str,
	id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	result: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<JsonRpcErrorBody>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
	code: i32,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct JsonRpcNotification<'a, P: Serialize> {
	jsonrpc: &'a str,
	method: &'a str,
	params: P,
}

/// Newline-delimited JSON-RPC on stdout. Stateless, so every view can hold
/// its own copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonTransport;

impl NdjsonTransport {
	pub fn new() -> Self {
		Self
	}

	pub fn write_response(&self, id: u64, result: serde_json::Value) {
		if let Err(e) = self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: Some(result),
			error: None,
		}) {
			tracing::error!("Failed to write response: {}", e);
		}
	}

	pub fn write_error(
		&self,
		id: u64,
		code: i32,
		message: impl Into<String>,
		data: Option<serde_json::Value>,
	) {
		if let Err(e) = self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: None,
			error: Some(JsonRpcErrorBody {
				code,
				message: message.into(),
				data,
			}),
		}) {
			tracing::error!("Failed to write error: {}", e);
		}
	}

	/// Notifications drive the renderers on the other end of the pipe, so a
	/// failed write is returned rather than logged.
	pub fn write_notification<P: Serialize>(&self, method: &str, params: P) -> io::Result<()> {
		self.write_line(&JsonRpcNotification {
			jsonrpc: "2.0",
			method,
			params,
		})
	}

	fn write_line(&self, value: &impl Serialize) -> io::Result<()> {
		let mut stdout = io::stdout().lock();
		serde_json::to_writer(&mut stdout, value)?;
		writeln!(stdout)?;
		stdout.flush()
	}
}
