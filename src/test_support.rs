use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::relay::RelayBody;

/// Runs a throwaway HTTP server on an ephemeral local port, answering every
/// request with the given handler. The server lives until the test's
/// runtime shuts down.
pub async fn spawn_http<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<RelayBody>, Infallible>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let io = TokioIo::new(stream);
            let handler = handler.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| handler(req));
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });
    addr
}

/// Boots the real facade serve loop with the given configuration.
pub async fn spawn_facade(config: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind facade listener");
    let addr = listener.local_addr().expect("facade listener address");
    let config = Arc::new(config);
    tokio::spawn(async move {
        let _ = crate::commands::start::serve(listener, config).await;
    });
    addr
}

/// Boots the real reverse-proxy serve loop with the given configuration.
pub async fn spawn_proxy(config: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind proxy listener");
    let addr = listener.local_addr().expect("proxy listener address");
    let config = Arc::new(config);
    tokio::spawn(async move {
        let _ = crate::commands::proxy::serve(listener, config).await;
    });
    addr
}
