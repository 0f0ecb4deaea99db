//! MCP (Model Context Protocol) dispatcher for the constraint-reinforcement
//! proxy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Coding agent / assistant                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ MCP (JSON-RPC 2.0, length-framed stdio)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       conproxy_mcp::server                       │
//! │                                                                  │
//! │  framing   → Content-Length reader/writer                        │
//! │  protocol  → JSON-RPC + MCP message types                        │
//! │  server    → dispatcher, scheduler call site, session lifecycle  │
//! │  injector  → renders the CONSTRAINT reminder block                │
//! │  events    → NDJSON decision log, non-blocking                    │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                        conproxy_core (pure domain model)
//! ```
//!
//! # Design principles
//!
//! 1. **Single-threaded, strictly ordered.** Requests are handled in arrival
//!    order and responses are written in that same order; there is no
//!    worker pool and no async runtime.
//! 2. **Deterministic scheduling.** Given identical config and request
//!    sequence, the inject/pass decisions are byte-identical.
//! 3. **Never block on logging.** The event logger's sink write is
//!    best-effort; a full channel drops the event rather than stalling the
//!    dispatcher.
//! 4. **Pass-through on doubt.** Malformed input, an unready session, or an
//!    exceeded deadline all degrade to forwarding the call unmodified rather
//!    than failing the request.

pub mod events;
pub mod framing;
pub mod injector;
pub mod protocol;
pub mod server;

pub use events::{Event, EventLogger, EventSink, MemorySink, WriterSink};
pub use protocol::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use server::{McpServer, ProxyConfig};
