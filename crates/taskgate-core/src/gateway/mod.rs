//! Gateway - upstream の前に立つ薄い HTTP 層
//!
//! # ルート
//! - `GET  /api/health` → upstream `/health`（5s timeout、失敗時 503）
//! - `POST /api/tasks` → upstream `POST /todos`（10/min）
//! - `GET  /api/tasks/search?q=` → upstream `/todos/search`
//! - `PUT  /api/tasks/:id/complete` → upstream `PUT /todos/{id}/complete`（20/min）
//! - `GET  /api/tasks/{inbox|today|upcoming}` → upstream `/todos/{list}`
//! - `GET  /api/projects` / `POST /api/projects` → upstream `/projects`（POST は既定の budget）
//! - `GET  /api/projects/:project_name/tasks` → upstream `/projects/{name}/todos`
//! - `GET  /api/areas` → upstream `/areas`
//! - `GET  /api/areas/:area_name` → projects の絞り込み + standalone tasks
//!
//! 書き込み系ルートだけ rate limit middleware を通します。
//! `RATE_LIMIT_WINDOW_MS` / `RATE_LIMIT_MAX` はプロジェクト作成の budget です。

mod error;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::client::{ResilientClient, TaskApi};
use crate::config::{ConfigError, GatewayConfig};
use crate::impls::ReqwestTransport;
use crate::ports::{Clock, SystemClock};
use crate::rate_limit::{RateLimitConfig, RateLimiter, RouteLimit, enforce};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct GatewayState {
    pub api: TaskApi,
    pub limiter: Arc<RateLimiter>,
    pub creation_limit: RateLimitConfig,
    pub completion_limit: RateLimitConfig,
    pub project_limit: RateLimitConfig,
}

impl GatewayState {
    pub fn new(api: TaskApi, limiter: Arc<RateLimiter>) -> Self {
        Self {
            api,
            limiter,
            creation_limit: RateLimitConfig::creation(),
            completion_limit: RateLimitConfig::completion(),
            project_limit: RateLimitConfig::default(),
        }
    }

    /// Take the route budgets from `config`.
    pub fn with_limits(mut self, config: &GatewayConfig) -> Self {
        self.creation_limit = config.creation_limit;
        self.completion_limit = config.completion_limit;
        self.project_limit = config.rate_limit;
        self
    }

    /// Production wiring: reqwest transport, system clock, budgets from `config`.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let client = ResilientClient::new(
            Arc::new(ReqwestTransport::default()),
            config.client.retry_policy(),
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new(
            TaskApi::new(client, config.client.base_url.clone()),
            RateLimiter::new(clock),
        )
        .with_limits(config)
    }
}

pub fn router(state: GatewayState) -> Router {
    let creation = RouteLimit::new(Arc::clone(&state.limiter), state.creation_limit, "create");
    let completion = RouteLimit::new(
        Arc::clone(&state.limiter),
        state.completion_limit,
        "complete",
    );

    let create = Router::new()
        .route("/api/tasks", post(handlers::create_task))
        .route_layer(middleware::from_fn_with_state(creation, enforce));
    let complete = Router::new()
        .route("/api/tasks/:id/complete", put(handlers::complete_task))
        .route_layer(middleware::from_fn_with_state(completion, enforce));
    let project = RouteLimit::new(Arc::clone(&state.limiter), state.project_limit, "project");
    let projects = get(handlers::list_projects).merge(
        post(handlers::create_project)
            .route_layer(middleware::from_fn_with_state(project, enforce)),
    );

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/tasks/search", get(handlers::search_tasks))
        .route("/api/tasks/inbox", get(handlers::inbox))
        .route("/api/tasks/today", get(handlers::today))
        .route("/api/tasks/upcoming", get(handlers::upcoming))
        .route("/api/projects", projects)
        .route(
            "/api/projects/:project_name/tasks",
            get(handlers::project_tasks),
        )
        .route("/api/areas", get(handlers::list_areas))
        .route("/api/areas/:area_name", get(handlers::area_detail))
        .merge(create)
        .merge(complete)
        .with_state(state)
}

pub struct GatewayServer {
    config: GatewayConfig,
    state: GatewayState,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let state = GatewayState::from_config(&config);
        Ok(Self { config, state })
    }

    pub fn with_state(config: GatewayConfig, state: GatewayState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener. The rate-limit sweep runs for the
    /// lifetime of the server.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let limiter = Arc::clone(&self.state.limiter);
        limiter.start(self.config.sweep_interval());

        if let Ok(local) = listener.local_addr() {
            info!(addr = %local, upstream = %self.state.api.base_url(), "gateway listening");
        }

        let result = axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(GatewayError::Serve);

        limiter.stop().await;
        info!("gateway stopped");
        result
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix;
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("received SIGTERM");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
