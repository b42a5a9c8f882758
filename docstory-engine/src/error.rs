use thiserror::Error;

use crate::types::Panel;

#[derive(Debug, Error)]
pub enum StoryError {
	#[error("Story not loaded: call story/load first")]
	NotLoaded,
	#[error("Invalid threshold: {0} is outside [0, 1]")]
	InvalidThreshold(f64),
	#[error("Unknown step: {0}")]
	UnknownStep(usize),
	#[error("Topic node {index} out of range (have {len})")]
	NodeOutOfRange { index: usize, len: usize },
	#[error("Document position {index} out of range (have {len})")]
	DocOutOfRange { index: usize, len: usize },
	#[error("Unknown {record} column: {column}")]
	UnknownColumn { record: &'static str, column: String },
	#[error("View error in {panel} panel: {message}")]
	View { panel: Panel, message: String },
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl StoryError {
	pub fn code(&self) -> &str {
		match self {
			Self::NotLoaded => "STORY_NOT_LOADED",
			Self::InvalidThreshold(_) => "STORY_INVALID_THRESHOLD",
			Self::UnknownStep(_) => "STORY_UNKNOWN_STEP",
			Self::NodeOutOfRange { .. } => "STORY_NODE_OUT_OF_RANGE",
			Self::DocOutOfRange { .. } => "STORY_DOC_OUT_OF_RANGE",
			Self::UnknownColumn { .. } => "STORY_UNKNOWN_COLUMN",
			Self::View { .. } => "STORY_VIEW_FAILED",
			Self::Serialization(_) => "STORY_SERIALIZATION",
			Self::Io(_) => "STORY_IO",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"storyCode": self.code(),
			"message": self.to_string(),
		})
	}
}
