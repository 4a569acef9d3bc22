use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::handler;

pub async fn serve(listener: TcpListener, config: Arc<Config>) -> Result<(), Error> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let config = config.clone();
        tokio::task::spawn(async move {
            let service = service_fn(move |req| handler::handle(req, peer.ip(), config.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

pub async fn run(config: Arc<Config>) -> Result<(), Error> {
    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    serve(listener, config).await
}
