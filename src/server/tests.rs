//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::collections::VecDeque;
    use std::io::{self, Cursor};
    use std::net::SocketAddr;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serde::Serialize;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::{mpsc, Semaphore};
    use log::debug;

    use crate::parser::Method;
    use crate::router::{RouteMatch, Router};
    use crate::parser::Error as ParserError;
    use crate::server::http_server::{serve_connection, serve_listener};
    use crate::server::{Error, Exchange, GlobalHttpServer, HttpResponse, HttpServer, ServerConfig, StatusCode};

    // Mock TcpStream for testing
    struct MockTcpStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl MockTcpStream {
        fn new(read_data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(read_data),
                write_data: Vec::new(),
            }
        }

        fn written(&self) -> String {
            String::from_utf8_lossy(&self.write_data).into_owned()
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = std::io::Read::read(&mut this.read_data, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    // Hands out one queued chunk per read, like a peer writing in pieces
    struct ChunkedStream {
        chunks: VecDeque<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl ChunkedStream {
        fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                write_data: Vec::new(),
            }
        }

        fn written(&self) -> String {
            String::from_utf8_lossy(&self.write_data).into_owned()
        }
    }

    impl AsyncRead for ChunkedStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if let Some(mut chunk) = this.chunks.pop_front() {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    this.chunks.push_front(chunk.split_off(n));
                }
            }
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for ChunkedStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    // Delivers a request, then fails every write as if the peer reset
    struct ResetStream {
        read_data: Cursor<Vec<u8>>,
    }

    impl AsyncRead for ResetStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = std::io::Read::read(&mut this.read_data, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for ResetStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn dispatch(router: &Router<Exchange>, request: &[u8]) -> (Result<(), Error>, String) {
        let mut stream = MockTcpStream::new(request.to_vec());
        let result = HttpServer::handle_connection(&mut stream, router, 1024).await;
        (result, stream.written())
    }

    fn test_router() -> Arc<Router<Exchange>> {
        let router = Arc::new(Router::new());

        router
            .get(r"^/users/(\d+)$", |ex: &mut Exchange, m: &RouteMatch| {
                ex.response.set_header("Content-Type", "text/plain");
                ex.response.set_body(format!("user {}", m.get(1).unwrap_or_default()));
            })
            .unwrap();
        router
            .get("^/users/new$", |ex: &mut Exchange, _: &RouteMatch| {
                ex.response.set_body("new user form");
            })
            .unwrap();
        router
            .post("^/users$", |ex: &mut Exchange, _: &RouteMatch| {
                ex.response.set_status(StatusCode::Created);
                ex.response.set_body(ex.request.body.clone());
            })
            .unwrap();

        router
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            addr: "127.0.0.1:8080".parse().unwrap(),
            max_connections: 100,
            read_buffer_size: 4096,
        };

        let server = HttpServer::new(config.clone(), Arc::new(Router::new()));
        assert_eq!(server.config.addr, config.addr);
        assert_eq!(server.config.max_connections, config.max_connections);
        assert_eq!(server.config.read_buffer_size, config.read_buffer_size);
        assert!(server.router.is_empty());
    }

    #[tokio::test]
    async fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.max_connections, 1024);
        assert_eq!(config.read_buffer_size, 8192);
    }

    #[tokio::test]
    async fn test_handle_connection_dispatches_to_first_match() {
        let router = test_router();

        let (result, response) = dispatch(&router, b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.ends_with("\r\n\r\nuser 42"));
    }

    #[tokio::test]
    async fn test_handle_connection_falls_through_to_later_route() {
        let router = test_router();

        let (result, response) = dispatch(&router, b"GET /users/new HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.contains("new user form"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_body() {
        let router = test_router();

        let request = b"POST /users HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\n\r\nbody";
        let (result, response) = dispatch(&router, request).await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(response.contains("Content-Length: 4\r\n"));
        assert!(response.ends_with("body"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_not_found() {
        let router = test_router();

        let (result, response) = dispatch(&router, b"GET /nonexistent HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(matches!(result, Err(Error::NotFound { ref path, .. }) if path == "/nonexistent"));
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.contains("Not found: GET /nonexistent"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_unrouted_method() {
        let router = test_router();

        let (result, response) = dispatch(&router, b"DELETE /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(matches!(result, Err(Error::NotFound { ref method, .. }) if method == "DELETE"));
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_request() {
        let router = test_router();

        let (result, response) = dispatch(&router, b"INVALID REQUEST").await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Error parsing request:"));
    }

    #[tokio::test]
    async fn test_handle_connection_closed_without_data() {
        let router = test_router();

        let (result, response) = dispatch(&router, b"").await;

        assert!(result.is_ok());
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_head_response_has_no_body() {
        let router = Router::new();
        router
            .head("^/status$", |ex: &mut Exchange, _: &RouteMatch| {
                ex.response.set_body("should not be sent");
            })
            .unwrap();

        let (result, response) = dispatch(&router, b"HEAD /status HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Length: 18\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_route_with_multiple_methods() {
        let router = Router::new();
        router
            .add([Method::GET, Method::POST], "^/multi$", |ex: &mut Exchange, _: &RouteMatch| {
                match ex.request.method {
                    Method::POST => {
                        ex.response.set_status(StatusCode::Created);
                        ex.response.set_body("POST response");
                    }
                    _ => ex.response.set_body("GET response"),
                }
            })
            .unwrap();

        let (get_result, get_response) = dispatch(&router, b"GET /multi HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(get_result.is_ok());
        assert!(get_response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(get_response.contains("GET response"));

        let (post_result, post_response) = dispatch(&router, b"POST /multi HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(post_result.is_ok());
        assert!(post_response.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(post_response.contains("POST response"));
    }

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: &'static str,
    }

    #[tokio::test]
    async fn test_json_handler() {
        let router = Router::new();
        router
            .get(r"^/api/users/(\d+)$", |ex: &mut Exchange, m: &RouteMatch| {
                let id = m.get(1).and_then(|id| id.parse().ok()).unwrap_or_default();
                if let Err(e) = ex.response.set_json(&User { id, name: "Ada" }) {
                    ex.response = HttpResponse::text(StatusCode::InternalServerError, e.to_string());
                }
            })
            .unwrap();

        let (result, response) = dispatch(&router, b"GET /api/users/3 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.contains("Content-Type: application/json\r\n"));
        assert!(response.ends_with(r#"{"id":3,"name":"Ada"}"#));
    }

    #[tokio::test]
    async fn test_global_server_uses_instance() {
        let server = GlobalHttpServer::new(ServerConfig::default());
        assert!(std::ptr::eq(server.router(), Router::instance()));

        server
            .router()
            .get("^/global-server-test$", |ex: &mut Exchange, _: &RouteMatch| {
                ex.response.set_body("global");
            })
            .unwrap();

        let (result, response) = dispatch(Router::instance(), b"GET /global-server-test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result.is_ok());
        assert!(response.ends_with("global"));
    }

    #[tokio::test]
    async fn test_body_split_across_reads() {
        let router = test_router();

        let mut stream = ChunkedStream::new(&[
            "POST /users HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\nhello",
            "wor",
            "ld",
        ]);
        let result = HttpServer::handle_connection(&mut stream, &router, 1024).await;

        assert!(result.is_ok());
        let response = stream.written();
        assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(response.ends_with("\r\n\r\nhelloworld"));
    }

    #[tokio::test]
    async fn test_body_cut_short_by_peer_is_rejected() {
        let router = test_router();

        let request = b"POST /users HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\nhello";
        let (result, response) = dispatch(&router, request).await;

        assert!(matches!(
            result,
            Err(Error::ParseError(ParserError::IncompleteBody { expected: 10, received: 5 }))
        ));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(!response.contains("201 Created"));
    }

    #[tokio::test]
    async fn test_request_larger_than_read_buffer() {
        let router = test_router();

        let mut stream = ChunkedStream::new(&[
            "POST /users HTTP/1.1\r\nHost: localhost\r\nContent-Length: 1000\r\n\r\npartial",
        ]);
        let result = HttpServer::handle_connection(&mut stream, &router, 128).await;

        assert!(matches!(result, Err(Error::PayloadTooLarge { limit: 128 })));
        assert!(stream.written().starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn test_write_failure_is_confined_to_its_connection() {
        let router = test_router();
        let request = b"GET /users/7 HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec();
        let addr: SocketAddr = "127.0.0.1:50000".parse().unwrap();

        let mut stream = ResetStream { read_data: Cursor::new(request.clone()) };
        let result = HttpServer::handle_connection(&mut stream, &router, 1024).await;
        assert!(matches!(result, Err(Error::IoError(ref e)) if e.kind() == io::ErrorKind::ConnectionReset));

        // Logged and swallowed; the router keeps serving
        let mut stream = ResetStream { read_data: Cursor::new(request.clone()) };
        serve_connection(&mut stream, addr, &router, 1024).await;

        let (result, response) = dispatch(&router, &request).await;
        assert!(result.is_ok());
        assert!(response.ends_with("user 7"));
    }

    async fn roundtrip(addr: SocketAddr, request: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(request).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_accept_loop_survives_failed_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = ServerConfig { addr, ..ServerConfig::default() };
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let server = tokio::spawn(serve_listener(listener, config, test_router(), shutdown_rx));

        // Peer that hangs up without sending anything
        drop(TcpStream::connect(addr).await.unwrap());

        let rejected = roundtrip(addr, b"INVALID REQUEST").await;
        assert!(rejected.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        let missing = roundtrip(addr, b"GET /missing HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"));

        let served = roundtrip(addr, b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(served.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(served.ends_with("user 42"));
        assert!(!server.is_finished());

        shutdown_tx.send(()).await.unwrap();
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_status_code_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::NotFound.as_u16(), 404);
        assert_eq!(StatusCode::InternalServerError.reason_phrase(), "Internal Server Error");
        assert_eq!(StatusCode::PayloadTooLarge.to_string(), "413 Payload Too Large");
    }

    #[tokio::test]
    async fn test_response_builders() {
        let response = HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/plain")
            .with_header("X-Custom", "Value")
            .with_body_string("Hello, world!");

        assert_eq!(response.headers.get("Server"), Some(&"regex-router".to_string()));
        assert_eq!(response.headers.get("X-Custom"), Some(&"Value".to_string()));
        assert_eq!(response.headers.get("Content-Length"), Some(&"13".to_string()));

        let bytes = String::from_utf8_lossy(&response.to_bytes()).into_owned();
        assert!(bytes.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(bytes.ends_with("\r\n\r\nHello, world!"));

        let empty = HttpResponse::default();
        assert_eq!(empty.headers.get("Content-Length"), Some(&"0".to_string()));
    }

    #[tokio::test]
    async fn test_connection_limiting() {
        let max_connections = 2;
        let semaphore = Arc::new(Semaphore::new(max_connections));
        let active_connections = Arc::new(AtomicUsize::new(0));

        // Mirrors the permit handling in the accept loop
        async fn handle_connection(
            semaphore: Arc<Semaphore>,
            active_connections: Arc<AtomicUsize>,
            connection_id: usize,
        ) -> Result<(), String> {
            let _permit = semaphore
                .try_acquire_owned()
                .map_err(|_| format!("Connection {connection_id} rejected: limit reached"))?;

            let count = active_connections.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("Connection {connection_id} accepted. Active connections: {count}");

            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;

            active_connections.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        let mut handles = vec![];
        for i in 0..max_connections {
            handles.push(tokio::spawn(handle_connection(semaphore.clone(), active_connections.clone(), i)));
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

        let rejected = tokio::spawn(handle_connection(semaphore.clone(), active_connections.clone(), max_connections))
            .await
            .unwrap();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert!(rejected.unwrap_err().contains("limit reached"));
        assert_eq!(active_connections.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_capacity_response() {
        let mut socket = MockTcpStream::new(Vec::new());

        let response = HttpResponse::text(
            StatusCode::ServiceUnavailable,
            "Server is at capacity, please try again later",
        );
        socket.write_all(&response.to_bytes()).await.unwrap();

        let written = socket.written();
        assert!(written.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(written.contains("Content-Type: text/plain\r\n"));
        assert!(written.contains("Server is at capacity, please try again later"));
    }
}
