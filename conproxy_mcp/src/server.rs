//! Dispatcher: reads length-framed JSON-RPC requests, drives the injection
//! pipeline, and writes responses.
//!
//! # Architecture
//!
//! The server runs in a single process, in a single thread: requests are
//! read from stdin and handled strictly in arrival order, and responses are
//! written in that same order before the next request is read. There is no
//! async runtime and no worker pool — the scheduler, context analyser,
//! trigger matcher, and injector are pure/in-memory and never suspend; only
//! stdio I/O and the event logger's sink write can block, and the sink write
//! is non-blocking by design (see `events`).
//!
//! ```ignore
//! let mut server = McpServer::new(config, library, logger);
//! server.run(&mut stdin.lock(), &mut stdout.lock())?;
//! ```

use crate::events::{Event, EventLogger};
use crate::framing;
use crate::injector;
use crate::protocol::{
    methods, ContentBlock, ErrorCode, HelpResult, InitializeParams, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, RequestId, ServerInfo, ToolCallParams, ToolCallResult, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION,
};
use anyhow::{Context, Result};
use chrono::Utc;
use conproxy_core::{
    schedule, ConstraintLibrary, ContextAnalyser, Decision, ResolvedKind, Resolver, SchedulerConfig,
    Session, TriggerMatcher,
};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything the binary assembles before handing control to the dispatcher:
/// server identity, scheduling cadence, the injector's anchor text, and the
/// per-request deadline.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub server_name: String,
    pub server_version: String,
    pub scheduler: SchedulerConfig,
    pub max_active_constraints: usize,
    pub deadline: Duration,
    pub anchor_prologue: String,
    pub anchor_epilogue: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            server_name: "Constraint Enforcement MCP Server".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            scheduler: SchedulerConfig::default(),
            max_active_constraints: 2,
            deadline: Duration::from_millis(100),
            anchor_prologue: "stay disciplined about the craft practice in force".to_string(),
            anchor_epilogue: "confirm the constraint was actually honoured".to_string(),
        }
    }
}

/// The constraint-reinforcement proxy's dispatcher.
pub struct McpServer {
    config: ProxyConfig,
    library: ConstraintLibrary,
    matcher: TriggerMatcher,
    analyser: ContextAnalyser,
    logger: EventLogger,
    session: Option<Session>,
    shutdown_requested: bool,
}

impl McpServer {
    pub fn new(config: ProxyConfig, library: ConstraintLibrary, logger: EventLogger) -> Self {
        let matcher = TriggerMatcher::new(config.max_active_constraints);
        Self {
            config,
            library,
            matcher,
            analyser: ContextAnalyser::new(),
            logger,
            session: None,
            shutdown_requested: false,
        }
    }

    /// Run the dispatcher loop to completion: reads until EOF or `shutdown`.
    pub fn run<R: BufRead, W: Write>(&mut self, reader: &mut R, writer: &mut W) -> Result<()> {
        info!("constraint proxy dispatcher starting");

        while !self.shutdown_requested {
            let body = match framing::read_message(reader).context("reading framed message")? {
                Some(body) => body,
                None => break,
            };

            debug!("received: {body}");

            let request: JsonRpcRequest = match serde_json::from_str(&body) {
                Ok(req) => req,
                Err(e) => {
                    let response = JsonRpcResponse::error(
                        None,
                        JsonRpcError::new(ErrorCode::ParseError, format!("invalid JSON: {e}")),
                    );
                    self.write_response(writer, &response)?;
                    continue;
                }
            };

            let response = self.handle_request(request);
            if response.is_notification_placeholder() {
                continue;
            }
            self.write_response(writer, &response)?;
        }

        info!("constraint proxy dispatcher shutting down");
        Ok(())
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(
                    ErrorCode::InvalidRequest,
                    format!("invalid jsonrpc version: {}", request.jsonrpc),
                ),
            );
        }

        match request.method.as_str() {
            methods::SERVER_HELP => self.handle_help(request),
            methods::INITIALIZE => self.handle_initialize(request),
            methods::INITIALIZED => JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: None,
                result: None,
                error: None,
            },
            methods::SHUTDOWN => self.handle_shutdown(request),
            methods::TOOLS_LIST => {
                JsonRpcResponse::success(request.id, serde_json::json!({ "tools": [] }))
            }
            methods::RESOURCES_LIST => {
                JsonRpcResponse::success(request.id, serde_json::json!({ "resources": [] }))
            }
            methods::TOOLS_CALL => self.handle_tools_call(request),
            _ => JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(
                    ErrorCode::MethodNotFound,
                    format!("unknown method: {}", request.method),
                ),
            ),
        }
    }

    fn handle_help(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = HelpResult {
            name: self.config.server_name.clone(),
            version: self.config.server_version.clone(),
            purpose: "splice craft-discipline reminders into tool call responses".to_string(),
            commands: vec![
                "initialize".to_string(),
                "shutdown".to_string(),
                "tools/call".to_string(),
                "tools/list".to_string(),
                "resources/list".to_string(),
            ],
            every_n: self.config.scheduler.every_n,
            max_active_constraints: self.config.max_active_constraints,
            dropped_events: self.logger.dropped_count(),
        };
        JsonRpcResponse::success(request.id, serde_json::to_value(result).unwrap())
    }

    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        // Params are accepted but not validated strictly: an absent or
        // malformed `params` object still starts a session, matching the
        // reference policy of "forward unknown shapes, interpret what's
        // understood."
        let _params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let session_id = format!("session-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0));
        self.session = Some(Session::new(session_id));

        let result = serde_json::json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {},
                "notifications": { "constraints": true },
            },
            "serverInfo": ServerInfo {
                name: self.config.server_name.clone(),
                version: self.config.server_version.clone(),
            },
        });

        JsonRpcResponse::success(request.id, result)
    }

    fn handle_shutdown(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.session = None;
        self.shutdown_requested = true;
        JsonRpcResponse::success(request.id, Value::Object(Default::default()))
    }

    fn handle_tools_call(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let Some(session) = self.session.as_mut() else {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::new(ErrorCode::ServerError(-32002), "server not initialized"),
            );
        };

        let params: ToolCallParams = match request.params.clone() {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::new(
                            ErrorCode::InvalidParams,
                            format!("invalid tool call params: {e}"),
                        ),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::new(ErrorCode::InvalidParams, "missing tool call params"),
                );
            }
        };

        let n = session.record_interaction();
        let phase = session.workflow_state.name.clone();
        let decision = schedule(n, &phase, &self.config.scheduler);
        let timestamp = Utc::now();

        let tool_value = match decision {
            Decision::Pass => {
                self.logger.emit(Event::Pass {
                    ts: timestamp,
                    interaction_number: n,
                    reason: "scheduled".to_string(),
                });
                self.passthrough_result(&params)
            }
            Decision::Inject => {
                let started = Instant::now();
                let session_id = self.session.as_ref().map(|s| s.session_id.clone());
                let context =
                    self.analyser
                        .analyse_tool_call(&params.name, &arg_probe(&params.arguments), timestamp, session_id);

                let constraints: Vec<conproxy_core::Constraint> = self
                    .library
                    .iter()
                    .filter(|c| phase_eligible(c, &phase))
                    .collect();
                let activations = self.matcher.top_k(constraints.iter(), &context);

                if started.elapsed() > self.config.deadline {
                    warn!("injection pipeline exceeded deadline, passing through");
                    self.logger.emit(Event::Error {
                        ts: Utc::now(),
                        interaction_number: n,
                        error_message: "deadline_exceeded".to_string(),
                    });
                    self.passthrough_result(&params)
                } else {
                    let resolver = Resolver::new(&self.library);
                    let reminders = collect_reminders(&resolver, &activations);
                    let selected_ids: Vec<String> =
                        activations.iter().map(|a| a.id.to_string()).collect();

                    self.logger.emit(Event::Inject {
                        ts: Utc::now(),
                        interaction_number: n,
                        phase,
                        selected_constraint_ids: selected_ids,
                        reason: "scheduled".to_string(),
                    });

                    self.inject_result(n, &reminders)
                }
            }
        };

        JsonRpcResponse::success(request.id, tool_value)
    }

    fn passthrough_result(&self, params: &ToolCallParams) -> Value {
        let result = ToolCallResult {
            content: vec![ContentBlock::text(format!("{} executed", params.name))],
            is_error: false,
        };
        serde_json::to_value(result).unwrap()
    }

    fn inject_result(&self, n: u32, reminders: &[String]) -> Value {
        let text = injector::format_injection(
            n,
            &self.config.anchor_prologue,
            &self.config.anchor_epilogue,
            reminders,
        );
        let result = ToolCallResult {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        };
        serde_json::to_value(result).unwrap()
    }

    fn write_response<W: Write>(&self, writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
        let json = serde_json::to_string(response)?;
        debug!("sending: {json}");
        framing::write_message(writer, &json)?;
        Ok(())
    }
}

/// Is `constraint` eligible to fire during workflow phase `phase`? A pack
/// constraint carries its eligible phases as `metadata.phases`; a
/// constraint with no such metadata (composites, or atomics loaded outside
/// the pack loader) is always eligible.
fn phase_eligible(constraint: &conproxy_core::Constraint, phase: &str) -> bool {
    let conproxy_core::Constraint::Atomic(atomic) = constraint else {
        return true;
    };
    let Some(metadata) = &atomic.metadata else {
        return true;
    };
    let Some(phases) = metadata.get("phases").and_then(|v| v.as_array()) else {
        return true;
    };
    phases.iter().any(|p| p.as_str() == Some(phase))
}

/// Pull any string-valued leaves out of the tool call arguments so the
/// context analyser can extract keywords/file paths the same way it would
/// from positional arguments.
fn arg_probe(arguments: &Value) -> Vec<Value> {
    match arguments {
        Value::Object(map) => map.values().cloned().collect(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn collect_reminders(
    resolver: &Resolver<'_>,
    activations: &[conproxy_core::ConstraintActivation],
) -> Vec<String> {
    let mut reminders = Vec::new();
    for activation in activations {
        let Ok(resolved) = resolver.resolve(&activation.id) else {
            continue;
        };
        for leaf in conproxy_core::resolver::flatten_leaves(&resolved) {
            if let ResolvedKind::Atomic { reminders: r, .. } = &leaf.kind {
                reminders.extend(r.iter().cloned());
            }
        }
    }
    reminders
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_advertised_server_info() {
        let config = ProxyConfig::default();
        assert_eq!(config.server_name, "Constraint Enforcement MCP Server");
        assert_eq!(config.deadline, Duration::from_millis(100));
        assert_eq!(config.scheduler.every_n, 1);
    }

    #[test]
    fn arg_probe_flattens_object_values() {
        let args = serde_json::json!({"path": "src/lib.rs", "limit": 10});
        let probed = arg_probe(&args);
        assert_eq!(probed.len(), 2);
    }

    #[test]
    fn phase_eligible_filters_by_metadata_phases() {
        use conproxy_core::{AtomicConstraint, Constraint, ConstraintId, Priority, TriggerConfiguration};

        let mut metadata = serde_json::Map::new();
        metadata.insert("phases".into(), serde_json::json!(["red"]));
        let constraint = Constraint::Atomic(
            AtomicConstraint::new(
                ConstraintId::new("a").unwrap(),
                "A",
                Priority::new(0.5).unwrap(),
                TriggerConfiguration::default(),
                vec!["r".into()],
                Some(metadata),
            )
            .unwrap(),
        );

        assert!(phase_eligible(&constraint, "red"));
        assert!(!phase_eligible(&constraint, "green"));
    }

    #[test]
    fn phase_eligible_defaults_true_without_metadata() {
        use conproxy_core::{AtomicConstraint, Constraint, ConstraintId, Priority, TriggerConfiguration};

        let constraint = Constraint::Atomic(
            AtomicConstraint::new(
                ConstraintId::new("a").unwrap(),
                "A",
                Priority::new(0.5).unwrap(),
                TriggerConfiguration::default(),
                vec!["r".into()],
                None,
            )
            .unwrap(),
        );
        assert!(phase_eligible(&constraint, "anything"));
    }
}
