use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::room::RouterHandle;
use crate::signaling::{SignalingService, ws_handler};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub connections: usize,
    pub rooms: usize,
}

pub fn build_router(service: SignalingService) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/health", get(health))
        .with_state(service)
}

async fn health(State(service): State<SignalingService>) -> Json<HealthReport> {
    let rooms = match service.snapshot().await {
        Ok(snapshot) => snapshot.len(),
        Err(e) => {
            error!("Health check could not reach room router: {}", e);
            0
        }
    };

    Json(HealthReport {
        status: "ok",
        connections: service.connection_count(),
        rooms,
    })
}

/// A bound relay that has not started accepting connections yet.
pub struct RelayServer {
    listener: TcpListener,
    service: SignalingService,
}

impl RelayServer {
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self::from_listener(listener))
    }

    /// Must be called inside a tokio runtime; spawns the room router.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self {
            listener,
            service: SignalingService::new(RouterHandle::spawn()),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn service(&self) -> SignalingService {
        self.service.clone()
    }

    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!("Signaling relay running on ws://{}", addr);

        axum::serve(self.listener, build_router(self.service))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Signaling relay stopped");
        Ok(())
    }
}

pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    RelayServer::bind(&config).await?.run().await
}
