//! HTTP gateway and request dispatcher for kube-mcp.
//!
//! Maps `{method, params}` requests onto the operation set, wraps every
//! outcome in the `{success, result, error}` envelope, and serves the
//! `/mcp`, `/health` and `/` endpoints over axum.

pub mod dispatch_audit;
pub mod mcp_dispatch;
pub mod mcp_gateway;

pub use dispatch_audit::*;
pub use mcp_dispatch::*;
pub use mcp_gateway::*;
