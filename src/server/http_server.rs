//! HTTP server implementation.

use std::borrow::Borrow;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use log::{debug, error, info, warn};

use crate::parser::{parse_request, Error as ParserError, Method};
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::exchange::Exchange;
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server that dispatches every request through a [`Router`].
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The router requests are dispatched through.
    pub router: Arc<Router<Exchange>>,
}

impl HttpServer {
    /// Create a server around an explicitly owned router.
    pub fn new(config: ServerConfig, router: Arc<Router<Exchange>>) -> Self {
        Self { config, router }
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        serve(&self.config, Arc::clone(&self.router)).await
    }

    /// Handle a single connection.
    ///
    /// Reads until the body declared by `Content-Length` has arrived. A
    /// request that would not fit in `read_buffer_size` bytes is answered
    /// with `413 Payload Too Large`.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        router: &Router<Exchange>,
        read_buffer_size: usize,
    ) -> Result<(), Error> {
        let mut buf = Vec::new();
        let mut chunk = vec![0; read_buffer_size];

        let request = loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 && buf.is_empty() {
                return Ok(()); // Connection closed
            }
            buf.extend_from_slice(&chunk[..n]);

            match parse_request(&buf) {
                Ok(req) => break req,
                // Rest of the body still in flight
                Err(ParserError::IncompleteBody { expected, received }) if n > 0 => {
                    if buf.len() - received + expected > read_buffer_size {
                        let response = HttpResponse::text(
                            StatusCode::PayloadTooLarge,
                            format!("Request exceeds {read_buffer_size} bytes"),
                        );
                        socket.write_all(&response.to_bytes()).await?;
                        return Err(Error::PayloadTooLarge { limit: read_buffer_size });
                    }
                }
                Err(e) => {
                    let response = HttpResponse::text(StatusCode::BadRequest, format!("Error parsing request: {e}"));
                    socket.write_all(&response.to_bytes()).await?;
                    return Err(Error::ParseError(e));
                }
            }
        };

        let is_head = request.method == Method::HEAD;
        let mut exchange = Exchange::new(request);

        if !router.run(&mut exchange) {
            let (method, path) = (exchange.request.method.to_string(), exchange.request.path);
            let response = HttpResponse::text(StatusCode::NotFound, format!("Not found: {method} {path}"));
            socket.write_all(&response.to_bytes()).await?;
            return Err(Error::NotFound { method, path });
        }

        let response = exchange.into_response();
        debug!("Responding {status}", status = response.status);
        if is_head {
            socket.write_all(&response.head_bytes()).await?;
        } else {
            socket.write_all(&response.to_bytes()).await?;
        }

        Ok(())
    }
}

/// A server bound to the process-wide router.
///
/// Routes registered through [`Router::instance`] before or after this is
/// created are all served.
pub struct GlobalHttpServer {
    /// The server configuration.
    pub config: ServerConfig,
}

impl GlobalHttpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn router(&self) -> &'static Router<Exchange> {
        Router::instance()
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        serve(&self.config, Router::instance()).await
    }
}

/// Bind the configured address and serve until Ctrl+C.
async fn serve<T>(config: &ServerConfig, router: T) -> Result<(), Error>
where
    T: Borrow<Router<Exchange>> + Clone + Send + Sync + 'static,
{
    display_server_info(router.borrow());

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Server listening on http://{addr}", addr = config.addr);

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let ctrl_c = setup_ctrl_c_handler(shutdown_tx);

    let result = serve_listener(listener, config.clone(), router, shutdown_rx).await;
    ctrl_c.abort();
    result
}

/// Accept loop shared by owned and process-wide routers.
///
/// Runs until `shutdown_rx` yields or the listener fails fatally. Errors on
/// a single connection are logged and never stop the loop.
pub(crate) async fn serve_listener<T>(
    listener: TcpListener,
    config: ServerConfig,
    router: T,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<(), Error>
where
    T: Borrow<Router<Exchange>> + Clone + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(config.max_connections));
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server...");
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((socket, addr)) => {
                        handle_new_connection(
                            socket,
                            addr,
                            semaphore.clone(),
                            router.clone(),
                            config.read_buffer_size,
                            &mut tasks,
                        ).await;
                    }
                    Err(e) => {
                        if handle_connection_error(e).await {
                            break;
                        }
                    }
                }
            }
        }
    }

    perform_shutdown(&mut tasks).await;

    Ok(())
}

/// Log the registered endpoints in dispatch order.
fn display_server_info(router: &Router<Exchange>) {
    info!("Registered endpoints:");
    for route in router.routes() {
        info!("  {methods} {pattern}", methods = route.methods.join(", "), pattern = route.pattern);
    }
}

/// Set up a Ctrl+C handler for graceful shutdown.
fn setup_ctrl_c_handler(shutdown_tx: mpsc::Sender<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown");
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => {
                error!("Error setting up Ctrl+C handler: {e}");
            }
        }
    })
}

async fn handle_new_connection<T>(
    mut socket: TcpStream,
    addr: SocketAddr,
    semaphore: Arc<Semaphore>,
    router: T,
    read_buffer_size: usize,
    tasks: &mut JoinSet<()>,
) where
    T: Borrow<Router<Exchange>> + Send + Sync + 'static,
{
    let permit = match semaphore.try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            warn!("Connection limit reached, rejecting connection from {addr}");
            let response = HttpResponse::text(
                StatusCode::ServiceUnavailable,
                "Server is at capacity, please try again later",
            );
            let _ = socket.write_all(&response.to_bytes()).await;
            return;
        }
    };

    tasks.spawn(async move {
        // Released when the task completes
        let _permit = permit;
        serve_connection(&mut socket, addr, router.borrow(), read_buffer_size).await;
    });
}

/// Run one accepted connection to completion and log how it ended.
pub(crate) async fn serve_connection(
    socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
    addr: SocketAddr,
    router: &Router<Exchange>,
    read_buffer_size: usize,
) {
    match HttpServer::handle_connection(socket, router, read_buffer_size).await {
        Ok(()) => {}
        Err(e @ Error::NotFound { .. }) => debug!("{addr}: {e}"),
        Err(e @ (Error::ParseError(_) | Error::PayloadTooLarge { .. })) => {
            warn!("Rejected request from {addr}: {e}");
        }
        Err(e) => error!("Error handling connection from {addr}: {e}"),
    }
}

/// Returns true when the accept loop should stop.
async fn handle_connection_error(e: std::io::Error) -> bool {
    error!("Error accepting connection: {e}");

    if e.kind() == std::io::ErrorKind::BrokenPipe {
        error!("Critical error accepting connection, shutting down");
        return true;
    }

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    false
}

async fn perform_shutdown(tasks: &mut JoinSet<()>) {
    info!("Waiting for {len} active connections to complete...", len = tasks.len());
    let shutdown_timeout = tokio::time::Duration::from_secs(30);
    let _ = tokio::time::timeout(shutdown_timeout, async {
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!("Task failed during shutdown: {e}");
            }
        }
    })
    .await;

    info!("Server shutdown complete");
}
