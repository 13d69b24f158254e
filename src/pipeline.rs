//! Ordered composition of the request gates.
//!
//! Every inbound call passes rate limiting, then bearer-token validation,
//! then authorization, then the business handler; the outcome is appended to
//! the event store and evaluated by the anomaly engine. Each gate
//! short-circuits with its own typed failure, and telemetry failures
//! (event append, alert recording) never fail the request.

use crate::alerts::AlertSink;
use crate::anomaly::{default_rules, AnomalyEngine};
use crate::auth::{Authenticator, Authorizer, CredentialStore, PermissionTable, TokenService};
use crate::clock::SharedClock;
use crate::config::{AppConfig, RouteLimit};
use crate::error::GateError;
use crate::metrics::GatewayMetrics;
use crate::ratelimit::RateLimiter;
use crate::store::EventStore;
use crate::types::event::{details_from, kinds};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Access requirement declared by a route.
#[derive(Debug, Clone)]
pub enum Access {
    /// No authentication; the request is attributed to "anonymous"
    Public,
    /// Caller must hold at least one of these roles
    AnyRole(Vec<String>),
    /// Caller's roles must expand to cover all of these permissions
    Permissions(Vec<String>),
}

/// A guarded route: name, request ceiling, access requirement.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub limit: RouteLimit,
    pub access: Access,
}

impl Route {
    pub fn new(name: &str, limit: RouteLimit, access: Access) -> Self {
        Self {
            name: name.to_string(),
            limit,
            access,
        }
    }
}

/// One inbound request as seen by the gateway.
#[derive(Debug, Clone)]
pub struct GateRequest<'a> {
    /// Client address, the rate-limit key
    pub client_addr: &'a str,
    /// Raw bearer token, with or without the "Bearer " prefix
    pub bearer_token: Option<&'a str>,
    pub method: &'a str,
    pub path: &'a str,
}

/// Identity flowing into handlers after the auth gates.
#[derive(Debug, Clone)]
pub struct Caller {
    pub subject: String,
    pub roles: Vec<String>,
}

impl Caller {
    fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            roles: Vec::new(),
        }
    }
}

/// Token issued by a successful login.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
}

/// The assembled defense pipeline. Explicitly constructed and injected at
/// startup; owns every gate and the detection state behind them.
pub struct SecurityGateway {
    rate_limiter: RateLimiter,
    tokens: TokenService,
    authenticator: Authenticator,
    authorizer: Authorizer,
    events: Arc<EventStore>,
    anomaly: AnomalyEngine,
    metrics: Arc<GatewayMetrics>,
    login_limit: RouteLimit,
    token_ttl: Duration,
}

impl SecurityGateway {
    pub fn new(
        config: &AppConfig,
        credentials: Arc<dyn CredentialStore>,
        events: Arc<EventStore>,
        clock: SharedClock,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        let sink = Arc::new(AlertSink::new(
            events.list_store(),
            Duration::from_secs(config.detection.alert_retention_secs),
        ));
        let anomaly = AnomalyEngine::new(default_rules(), events.clone(), sink, clock.clone());

        Self {
            rate_limiter: RateLimiter::new(clock.clone()),
            tokens: TokenService::new(&config.auth.secret_key, clock),
            authenticator: Authenticator::new(credentials),
            authorizer: Authorizer::new(PermissionTable::defaults()),
            events,
            anomaly,
            metrics,
            login_limit: config.limits.login,
            token_ttl: Duration::from_secs(config.auth.token_ttl_secs),
        }
    }

    /// Authenticate a caller and issue a bearer token.
    ///
    /// Failed attempts are appended as `failed_login` events under the
    /// attempted username and evaluated against the rule table before the
    /// uniform failure is surfaced.
    pub async fn login(
        &self,
        client_addr: &str,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, GateError> {
        let start = Instant::now();

        if let Err(err) = self.rate_limiter.allow(client_addr, "login", self.login_limit) {
            self.metrics.record_denied("rate_limited", start.elapsed());
            return Err(err);
        }

        let user = match self.authenticator.authenticate(username, password) {
            Ok(user) => user,
            Err(err) => {
                self.record_event(
                    username,
                    kinds::FAILED_LOGIN,
                    details_from([("ip", json!(client_addr))]),
                )
                .await;
                self.metrics
                    .record_denied("invalid_credentials", start.elapsed());
                return Err(err);
            }
        };

        self.record_event(
            &user.username,
            kinds::SUCCESSFUL_LOGIN,
            details_from([("ip", json!(client_addr))]),
        )
        .await;

        let access_token = self
            .tokens
            .issue(&user.username, &user.roles, self.token_ttl);
        self.metrics.record_allowed(start.elapsed());

        Ok(IssuedToken {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Run one request through the full gate sequence and into `handler`.
    ///
    /// Handler failures are appended as `error` events with the operation
    /// name and surfaced as an opaque failure; no internal detail reaches
    /// the caller.
    pub async fn handle<T, F, Fut>(
        &self,
        request: GateRequest<'_>,
        route: &Route,
        handler: F,
    ) -> Result<T, GateError>
    where
        F: FnOnce(Caller) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let start = Instant::now();

        if let Err(err) = self
            .rate_limiter
            .allow(request.client_addr, &route.name, route.limit)
        {
            self.metrics.record_denied("rate_limited", start.elapsed());
            return Err(err);
        }

        let caller = match self.authorize(&request, route) {
            Ok(caller) => caller,
            Err(err) => {
                let reason = match err {
                    GateError::Unauthenticated => "unauthenticated",
                    _ => "permission_denied",
                };
                self.metrics.record_denied(reason, start.elapsed());
                return Err(err);
            }
        };

        let result = handler(caller.clone()).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };

        self.record_event(
            &caller.subject,
            kinds::API_REQUEST,
            details_from([
                ("method", json!(request.method)),
                ("path", json!(request.path)),
                ("client", json!(request.client_addr)),
                ("outcome", json!(outcome)),
            ]),
        )
        .await;

        match result {
            Ok(value) => {
                self.metrics.record_allowed(start.elapsed());
                Ok(value)
            }
            Err(err) => {
                self.record_event(
                    &caller.subject,
                    kinds::ERROR,
                    details_from([
                        ("operation", json!(route.name)),
                        ("error", json!(err.to_string())),
                    ]),
                )
                .await;
                self.metrics.record_denied("handler_error", start.elapsed());
                Err(GateError::Handler {
                    operation: route.name.clone(),
                })
            }
        }
    }

    /// Token validation and the role/permission gate. All token failures
    /// collapse into one uniform `Unauthenticated`; the distinction is
    /// logged here and never surfaced.
    fn authorize(&self, request: &GateRequest<'_>, route: &Route) -> Result<Caller, GateError> {
        let required = match &route.access {
            Access::Public => return Ok(Caller::anonymous()),
            other => other,
        };

        let raw = request.bearer_token.ok_or(GateError::Unauthenticated)?;
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);

        let claims = self.tokens.validate(token).map_err(|err| {
            debug!(route = %route.name, reason = %err, "token rejected");
            GateError::Unauthenticated
        })?;

        let allowed = match required {
            Access::AnyRole(roles) => self.authorizer.any_role(&claims.roles, roles),
            Access::Permissions(perms) => self.authorizer.has_permissions(&claims.roles, perms),
            Access::Public => unreachable!("handled above"),
        };
        if !allowed {
            return Err(GateError::PermissionDenied);
        }

        Ok(Caller {
            subject: claims.sub,
            roles: claims.roles,
        })
    }

    /// Append a security event and run anomaly evaluation. Storage failures
    /// are logged and swallowed; they must not fail the request.
    async fn record_event(&self, subject: &str, kind: &str, details: HashMap<String, Value>) {
        match self.events.append(subject, kind, details).await {
            Ok(_) => self.metrics.record_event(),
            Err(err) => {
                warn!(
                    subject = %subject,
                    event_type = %kind,
                    error = %err,
                    "failed to append security event"
                );
                return;
            }
        }

        if self.anomaly.on_event(kind, subject).await {
            self.metrics.record_alert();
        }
    }
}
