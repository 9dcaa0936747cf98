//! # northstar-tenant
//!
//! Tower/Axum middleware that establishes the per-request tenant context
//! (district, optionally school) for the escalation engine.
//!
//! The context is extracted once when a request enters the service stack and
//! stored in the request's extensions. It lives exactly as long as the request
//! does, so it is released on every exit path: success, error, or early return.
//! Nothing is kept in thread-local or global state.
//!
//! ## Features
//!
//! - **Header Extraction**: `X-District-Id` (required) and `X-School-Id` (optional)
//! - **Query Fallback**: `districtId` / `schoolId` query parameters when headers are absent
//! - **Validation**: both identifiers must be UUIDs; malformed ids get a JSON 400
//! - **Fail-Closed**: requests without a district are rejected with a JSON 401
//! - **Composability**: standard Tower Layer/Service
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::{routing::get, Extension, Router};
//! use northstar_tenant::{TenantContext, TenantLayer};
//!
//! async fn unread(Extension(tenant): Extension<TenantContext>) -> String {
//!     format!("district {}", tenant.organization_id())
//! }
//!
//! let app = Router::new()
//!     .route("/notifications/unread", get(unread))
//!     .layer(TenantLayer::new());
//! ```

mod config;
mod error;
mod extract;
mod layer;
mod service;

pub use config::{TenantConfig, TenantConfigBuilder};
pub use error::{ErrorResponse, TenantError};
pub use extract::{extract_tenant_context, TenantContext};
pub use layer::TenantLayer;
pub use service::{TenantFuture, TenantService};
