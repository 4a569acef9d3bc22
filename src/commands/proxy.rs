use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::handler::text_response;
use crate::proxy;
use crate::relay::RelayBody;

async fn handle(
    req: Request<Incoming>,
    config: Arc<Config>,
) -> Result<Response<RelayBody>, Infallible> {
    info!("Proxying request: {} {}", req.method(), req.uri().path());
    match proxy::forward(&config, req).await {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("Proxy request failed: {e:#}");
            Ok(text_response(StatusCode::BAD_GATEWAY, "Bad Gateway"))
        }
    }
}

pub async fn serve(listener: TcpListener, config: Arc<Config>) -> Result<(), Error> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let config = config.clone();
        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle(req, config.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

pub async fn run(config: Arc<Config>) -> Result<(), Error> {
    let addr = SocketAddr::new(config.host, config.proxy_port);
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Reverse proxy listening on http://{} -> {}",
        addr, config.backend_origin
    );
    serve(listener, config).await
}
