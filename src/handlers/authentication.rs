// Authentication middleware for Whisper ASR
//
// Applies the access gate chosen at startup to every request. The gate is
// shared by all workers and never changes after startup.
// OPTIONS requests are always allowed to support CORS pre-flight requests.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::{debug, info, warn};
use std::sync::Arc;

use crate::security::AccessGate;

/// Credential admitted by the gate, stored in the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedKey(pub String);

/// Middleware factory for authentication
#[derive(Clone)]
pub struct Authentication {
    gate: Arc<AccessGate>,
}

impl Authentication {
    pub fn new(gate: Arc<AccessGate>) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        if !self.gate.is_enabled() {
            info!("No API key configured, authentication is disabled");
        }
        ok(AuthenticationMiddleware {
            service,
            gate: Arc::clone(&self.gate),
        })
    }
}

/// Authentication middleware implementation
pub struct AuthenticationMiddleware<S> {
    service: S,
    gate: Arc<AccessGate>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.method() == Method::OPTIONS {
            debug!("OPTIONS request - bypassing authentication check");
            return Box::pin(self.service.call(req));
        }

        let decision = {
            let authorization = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok());
            self.gate.check(authorization)
        };

        match decision {
            Ok(Some(key)) => {
                req.extensions_mut().insert(AuthenticatedKey(key));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Rejected {} {}: {}", req.method(), req.path(), e);
                return Box::pin(async move { Err(e.into()) });
            }
        }

        Box::pin(self.service.call(req))
    }
}
