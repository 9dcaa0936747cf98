//! [`TenantLayer`] wraps a router so every handler sees a `TenantContext`.

use std::sync::Arc;

use tower_layer::Layer;

use crate::config::TenantConfig;
use crate::service::TenantService;

/// Layer that installs [`TenantService`] around an inner service.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/incidents", post(record_incident))
///     .route("/notifications/:admin_id", get(unread_notifications))
///     .layer(TenantLayer::new());
/// ```
///
/// Handlers then read the district and school with
/// `TenantContext::current(req.extensions())` and pass it to the engine.
#[derive(Debug, Clone, Default)]
pub struct TenantLayer {
    config: Arc<TenantConfig>,
}

impl TenantLayer {
    /// Default headers and parameters; requests without a district are rejected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let requests without a district through untouched.
    ///
    /// ```rust
    /// use northstar_tenant::TenantLayer;
    ///
    /// assert!(!TenantLayer::optional().config().require_tenant);
    /// ```
    #[must_use]
    pub fn optional() -> Self {
        Self::with_config(TenantConfig::builder().require_tenant(false).build())
    }

    /// Use custom header and parameter names.
    #[must_use]
    pub fn with_config(config: TenantConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Settings shared by every service this layer builds.
    #[must_use]
    pub fn config(&self) -> &TenantConfig {
        &self.config
    }
}

impl<S> Layer<S> for TenantLayer {
    type Service = TenantService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantService::new(inner, Arc::clone(&self.config))
    }
}
