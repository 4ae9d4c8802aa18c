//! Request parsing and dispatch for the stdin/stdout surface.
//!
//! Each input line is one JSON object: either an action request tagged by
//! `action_type`, or a query `{"query": "state" | "actions" | "summary" |
//! "joker_order"}`. Each output line is one [`Response`].

use balatro_core::orchestrator::Orchestrator;
use balatro_ipc::Transport;
use balatro_types::ActionRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Tool name reported for lines that could not be parsed.
const INVALID_REQUEST: &str = "invalid_request";

/// A read-only question about the cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// The full snapshot.
    State,
    /// The legal-action set.
    Actions,
    /// The state digest.
    Summary,
    /// Joker positions and the reorder window.
    JokerOrder,
}

impl Query {
    /// Tool name echoed back in the response.
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::State => "get_game_state",
            Self::Actions => "get_available_actions",
            Self::Summary => "get_state_summary",
            Self::JokerOrder => "get_joker_order",
        }
    }
}

#[derive(Deserialize)]
struct QueryLine {
    query: Query,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A question about state.
    Query(Query),
    /// A command for the peer.
    Action(ActionRequest),
}

impl Request {
    /// Parse a single input line.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the line is neither a query nor an action.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        if value.get("query").is_some() {
            let QueryLine { query } = serde_json::from_value(value)?;
            return Ok(Self::Query(query));
        }
        serde_json::from_value(value).map(Self::Action)
    }
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub success: bool,
    /// Why it did not.
    pub error_message: Option<String>,
    /// Which tool handled it.
    pub tool: String,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// Tool-specific fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Response {
    fn ok(tool: &str, payload: Map<String, Value>) -> Self {
        Self {
            success: true,
            error_message: None,
            tool: tool.to_owned(),
            timestamp: Utc::now(),
            payload,
        }
    }

    fn failed(tool: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            tool: tool.to_owned(),
            timestamp: Utc::now(),
            payload: Map::new(),
        }
    }
}

/// Parse `line` and handle it, never failing.
pub async fn handle_line<T: Transport>(orchestrator: &mut Orchestrator<T>, line: &str) -> Response {
    match Request::parse(line) {
        Ok(request) => handle(orchestrator, request).await,
        Err(e) => {
            warn!(error = %e, "unparseable request line");
            Response::failed(INVALID_REQUEST, format!("invalid request: {e}"))
        }
    }
}

/// Handle one parsed request.
pub async fn handle<T: Transport>(orchestrator: &mut Orchestrator<T>, request: Request) -> Response {
    match request {
        Request::Query(query) => answer(orchestrator, query),
        Request::Action(action) => {
            let tool = action.action_type().as_str();
            debug!(tool, "executing action");
            let result = orchestrator
                .execute(&action)
                .await
                .unwrap_or_else(|e| e.to_action_result());
            Response {
                success: result.success,
                error_message: result.error_message,
                tool: tool.to_owned(),
                timestamp: Utc::now(),
                payload: Map::new(),
            }
        }
    }
}

fn answer<T: Transport>(orchestrator: &mut Orchestrator<T>, query: Query) -> Response {
    let tool = query.tool_name();
    let mut payload = Map::new();
    match query {
        Query::State => {
            let Some(snapshot) = orchestrator.current_state() else {
                return Response::failed(tool, "No game state available");
            };
            match serde_json::to_value(snapshot) {
                Ok(value) => payload.insert("game_state".to_owned(), value),
                Err(e) => return Response::failed(tool, e.to_string()),
            };
        }
        Query::Actions => {
            payload.insert(
                "available_actions".to_owned(),
                json!(orchestrator.available_actions()),
            );
        }
        Query::Summary => {
            let Some(summary) = orchestrator.summary() else {
                return Response::failed(tool, "No game state available");
            };
            match serde_json::to_value(summary) {
                Ok(value) => payload.insert("summary".to_owned(), value),
                Err(e) => return Response::failed(tool, e.to_string()),
            };
        }
        Query::JokerOrder => {
            let (jokers, reorder_available) = orchestrator.current_state().map_or_else(
                || (Vec::new(), false),
                |s| {
                    let jokers = s
                        .jokers
                        .iter()
                        .map(|j| json!({ "position": j.position, "name": j.name }))
                        .collect::<Vec<Value>>();
                    (jokers, s.post_hand_joker_reorder_available)
                },
            );
            payload.insert("jokers".to_owned(), Value::Array(jokers));
            payload.insert("reorder_available".to_owned(), json!(reorder_available));
        }
    }
    Response::ok(tool, payload)
}
