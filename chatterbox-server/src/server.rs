use std::{sync::Arc, time::Duration};

use axum::{
    http::Method,
    middleware,
    response::Response,
    routing::{get, patch},
    Router,
};
use eyre::{Report, Result};
use hyper::Request;
use tokio::sync::oneshot::{channel, Receiver, Sender};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::{
    middleware::metrics::record_metrics,
    routes::{
        messages::{create_message, delete_message, get_messages, update_message},
        metrics::get_metrics,
    },
    state::AppState,
};

pub struct Server {
    state: Arc<AppState>,
    shutdown_rx: Receiver<()>,
}

impl Server {
    pub fn new(state: AppState) -> (Self, Sender<()>) {
        let (shutdown_tx, shutdown_rx) = channel();

        let server = Self {
            state: Arc::new(state),
            shutdown_rx,
        };

        (server, shutdown_tx)
    }

    pub async fn run(self, port: u16) -> Result<()> {
        let Self { state, shutdown_rx } = self;

        let app = Self::chatterbox_app(Arc::clone(&state));

        let server = axum::Server::bind(&([0, 0, 0, 0], port).into())
            .serve(app.with_state(state).into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });

        info!("Running server...");

        if let Err(err) = server.await {
            error!("{:?}", Report::new(err).wrap_err("server failed"));
        }

        Ok(())
    }

    pub(crate) fn chatterbox_app(state: Arc<AppState>) -> Router<Arc<AppState>> {
        let trace = TraceLayer::new_for_http()
            .on_request(|req: &Request<_>, _: &Span| info!("{} {}", req.method(), req.uri().path()))
            .on_response(|res: &Response, latency: Duration, _: &Span| {
                let code = res.status().as_u16();

                if (500..600).contains(&code) {
                    error!("Response: latency={}ms status={code}", latency.as_millis());
                } else {
                    info!("Response: latency={}ms status={code}", latency.as_millis());
                }
            });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers(Any);

        Router::new()
            .route("/messages", get(get_messages).post(create_message))
            .route("/messages/:id", patch(update_message).delete(delete_message))
            .route("/metrics", get(get_metrics))
            .layer(middleware::from_fn_with_state(state, record_metrics))
            .layer(cors)
            .layer(trace)
    }
}
