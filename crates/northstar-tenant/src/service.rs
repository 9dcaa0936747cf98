//! Per-request tenant resolution as a Tower service.

use crate::config::TenantConfig;
use crate::error::TenantError;
use crate::extract::extract_tenant_context;
use axum::response::IntoResponse;
use http::{Method, Request, Response};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_service::Service;
use tracing::{debug, warn};

/// Service that resolves the request's district and school before calling
/// the wrapped service.
///
/// On success the [`TenantContext`](crate::TenantContext) is placed in the
/// request extensions. When a district is required and cannot be read the
/// wrapped service is never called and a JSON rejection is returned.
///
/// The context is owned by the request, so it is released when the request
/// is dropped regardless of how the inner service finishes.
#[derive(Debug, Clone)]
pub struct TenantService<S> {
    inner: S,
    config: Arc<TenantConfig>,
}

impl<S> TenantService<S> {
    /// Wrap `inner` with the given extraction settings.
    pub fn new(inner: S, config: Arc<TenantConfig>) -> Self {
        Self { inner, config }
    }

    /// Extraction settings in effect.
    #[must_use]
    pub fn config(&self) -> &Arc<TenantConfig> {
        &self.config
    }

    /// Swap in a fresh clone so the ready service is the one that is called.
    fn ready_inner(&mut self) -> S
    where
        S: Clone,
    {
        let fresh = self.inner.clone();
        std::mem::replace(&mut self.inner, fresh)
    }

    fn forward<ReqBody, ResBody>(
        &mut self,
        req: Request<ReqBody>,
    ) -> TenantFuture<S, ReqBody, ResBody>
    where
        S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone,
    {
        TenantFuture::Forward {
            future: self.ready_inner().call(req),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TenantService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = TenantFuture<S, ReqBody, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // CORS preflight carries no tenant
        if req.method() == Method::OPTIONS {
            return self.forward(req);
        }

        let err = match extract_tenant_context(&req, &self.config) {
            Ok(ctx) => {
                debug!(
                    organization_id = %ctx.organization_id(),
                    sub_unit_id = ?ctx.sub_unit_id(),
                    "Tenant context extracted"
                );
                req.extensions_mut().insert(ctx);
                return self.forward(req);
            }
            Err(err) => err,
        };

        if !self.config.require_tenant && err == TenantError::MissingDistrict {
            debug!("No district on request, continuing without tenant");
            return self.forward(req);
        }

        warn!(error = %err, path = %req.uri().path(), "Request rejected without tenant");
        TenantFuture::Reject {
            rejection: Some(err),
        }
    }
}

pin_project! {
    /// Response future of [`TenantService`].
    #[project = TenantFutureProj]
    pub enum TenantFuture<S, ReqBody, ResBody>
    where
        S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    {
        /// The wrapped service is handling the request.
        Forward {
            #[pin]
            future: S::Future,
        },
        /// The request was refused before reaching the wrapped service.
        Reject {
            rejection: Option<TenantError>,
        },
    }
}

impl<S, ReqBody, ResBody> Future for TenantFuture<S, ReqBody, ResBody>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Default,
{
    type Output = Result<Response<ResBody>, S::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            TenantFutureProj::Forward { future } => future.poll(cx),
            TenantFutureProj::Reject { rejection } => {
                let rejection = rejection.take().unwrap_or(TenantError::MissingDistrict);
                // Only status and headers survive; the JSON body type is the inner one.
                let (parts, _) = rejection.into_response().into_parts();
                Poll::Ready(Ok(Response::from_parts(parts, ResBody::default())))
            }
        }
    }
}
