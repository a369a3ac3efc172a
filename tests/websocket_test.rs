// Integration tests for the Rusty Chat server
// A real accept loop on an ephemeral port, driven by tokio-tungstenite
// clients, raw TCP clients and the crate's own client session.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

use rusty_chat::client::{ClientSession, SessionEnd};
use rusty_chat::config::ClientConfig;
use rusty_chat::core::frame::{self, Frame};
use rusty_chat::core::{create_registry, ChatServer, TcpRegistry};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

// Start the accept loop on a free port
async fn start_server() -> (SocketAddr, TcpRegistry) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let registry = create_registry();
    let server = ChatServer::with_registry(listener, registry.clone());
    let addr = server.local_addr().expect("Listener has no address");
    server.spawn();
    (addr, registry)
}

async fn connect(addr: SocketAddr) -> Ws {
    let url = format!("ws://{}/chat", addr);
    let (ws, response) = timeout(WAIT, connect_async(url))
        .await
        .expect("WebSocket connection timeout")
        .expect("Failed to establish WebSocket connection");
    assert_eq!(response.status().as_u16(), 101);
    ws
}

async fn next_text(ws: &mut Ws) -> String {
    match timeout(WAIT, ws.next()).await {
        Ok(Some(Ok(msg))) => msg.into_text().expect("Expected a text message"),
        Ok(Some(Err(e))) => panic!("Error receiving message: {}", e),
        Ok(None) => panic!("Connection closed unexpectedly"),
        Err(_) => panic!("Timeout waiting for server message"),
    }
}

async fn assert_silent(ws: &mut Ws) {
    let pending = timeout(Duration::from_millis(100), ws.next()).await;
    assert!(pending.is_err(), "Unexpected message: {:?}", pending);
}

async fn send(ws: &mut Ws, text: &str) {
    ws.send(Message::Text(text.to_string()))
        .await
        .expect("Failed to send message");
}

// Connect and pick a name; returns once the welcome arrived
async fn join(addr: SocketAddr, name: &str) -> Ws {
    let mut ws = connect(addr).await;
    send(&mut ws, name).await;
    assert_eq!(next_text(&mut ws).await, format!("Welcome, {}!", name));
    ws
}

async fn wait_for_count(registry: &TcpRegistry, expected: usize) {
    for _ in 0..200 {
        if registry.lock().await.connection_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Registry never reached {} connections", expected);
}

// Raw upgrade without any WebSocket library
async fn raw_connect(addr: SocketAddr) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"GET /chat HTTP/1.1\r\n\
              Host: localhost\r\n\
              Upgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
              Sec-WebSocket-Version: 13\r\n\r\n",
        )
        .await
        .unwrap();

    let mut stream = BufReader::new(stream);
    let mut response = Vec::new();
    while !response.ends_with(b"\r\n\r\n") {
        response.push(stream.read_u8().await.unwrap());
    }
    let response = String::from_utf8(response).unwrap();
    assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
    stream
}

#[tokio::test]
async fn test_public_chat_between_clients() {
    let (addr, _registry) = start_server().await;

    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    assert_eq!(next_text(&mut alice).await, "bob joined");

    send(&mut alice, "hello bob").await;
    assert_eq!(next_text(&mut bob).await, "alice: hello bob");
    assert_silent(&mut alice).await;

    send(&mut bob, "hi alice, how are you?").await;
    assert_eq!(next_text(&mut alice).await, "bob: hi alice, how are you?");
}

#[tokio::test]
async fn test_private_message_and_confirmation() {
    let (addr, _registry) = start_server().await;

    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    let mut carol = join(addr, "carol").await;
    next_text(&mut alice).await;
    next_text(&mut alice).await;
    next_text(&mut bob).await;

    send(&mut alice, "bob: hi").await;
    assert_eq!(next_text(&mut bob).await, "(Private) alice: hi");
    assert_eq!(next_text(&mut alice).await, "To bob: hi");
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn test_private_message_to_unknown_name() {
    let (addr, _registry) = start_server().await;

    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    next_text(&mut alice).await;

    send(&mut alice, "nobody: are you there?").await;
    let error = next_text(&mut alice).await;
    assert!(error.contains("not found"), "unexpected reply: {}", error);
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_duplicate_names_both_receive() {
    let (addr, _registry) = start_server().await;

    let mut first = join(addr, "bob").await;
    let mut second = join(addr, "bob").await;
    let mut alice = join(addr, "alice").await;
    next_text(&mut first).await;
    next_text(&mut first).await;
    next_text(&mut second).await;

    send(&mut alice, "bob: which one of you?").await;
    assert_eq!(next_text(&mut first).await, "(Private) alice: which one of you?");
    assert_eq!(next_text(&mut second).await, "(Private) alice: which one of you?");
    assert_eq!(next_text(&mut alice).await, "To bob: which one of you?");
    assert_eq!(next_text(&mut alice).await, "To bob: which one of you?");
}

#[tokio::test]
async fn test_disconnect_is_announced_and_cleaned_up() {
    let (addr, registry) = start_server().await;

    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    let mut carol = join(addr, "carol").await;
    next_text(&mut alice).await;
    next_text(&mut alice).await;
    next_text(&mut bob).await;
    wait_for_count(&registry, 3).await;

    drop(bob);
    assert_eq!(next_text(&mut alice).await, "bob has disconnected.");
    assert_eq!(next_text(&mut carol).await, "bob has disconnected.");
    wait_for_count(&registry, 2).await;

    carol.close(None).await.expect("Failed to close connection");
    assert_eq!(next_text(&mut alice).await, "carol has disconnected.");
    wait_for_count(&registry, 1).await;
}

#[tokio::test]
async fn test_extended_length_frame_from_raw_client() {
    let (addr, _registry) = start_server().await;

    let mut alice = join(addr, "alice").await;
    let mut raw = raw_connect(addr).await;

    raw.get_mut()
        .write_all(&frame::encode(b"raw", true).unwrap())
        .await
        .unwrap();
    let welcome = frame::decode(&mut raw).await.unwrap().unwrap();
    assert_eq!(welcome.into_text(), "Welcome, raw!");
    assert_eq!(next_text(&mut alice).await, "raw joined");

    // 300 bytes: 126 marker plus a 16-bit length
    let body = "y".repeat(300);
    let bytes = frame::encode(body.as_bytes(), true).unwrap();
    assert_eq!(bytes[1] & 0x7F, 126);
    raw.get_mut().write_all(&bytes).await.unwrap();

    let received = next_text(&mut alice).await;
    assert_eq!(received, format!("raw: {}", body));
}

#[tokio::test]
async fn test_unsupported_payload_size_drops_only_that_connection() {
    let (addr, registry) = start_server().await;

    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;
    next_text(&mut alice).await;

    let mut raw = raw_connect(addr).await;
    raw.get_mut()
        .write_all(&frame::encode(b"greedy", true).unwrap())
        .await
        .unwrap();
    frame::decode(&mut raw).await.unwrap().unwrap();
    next_text(&mut alice).await;
    next_text(&mut bob).await;

    let mut header = vec![0x81, 0x80 | 127];
    header.extend_from_slice(&(1u64 << 20).to_be_bytes());
    raw.get_mut().write_all(&header).await.unwrap();

    assert_eq!(next_text(&mut alice).await, "greedy has disconnected.");
    wait_for_count(&registry, 2).await;

    // The server keeps serving everybody else
    send(&mut bob, "still alive").await;
    assert_eq!(next_text(&mut alice).await, "bob: still alive");
}

#[tokio::test]
async fn test_missing_key_is_rejected() {
    let (addr, registry) = start_server().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /chat HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .expect("Server kept the connection open")
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"));
    assert_eq!(registry.lock().await.connection_count(), 0);
}

#[tokio::test]
async fn test_client_session_against_server() {
    let (addr, _registry) = start_server().await;
    let mut alice = join(addr, "alice").await;

    let config = ClientConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        path: "/chat".to_string(),
    };
    let session = ClientSession::connect(&config).await.unwrap();

    let (mut input, input_rx) = tokio::io::duplex(1024);
    let (output_tx, output) = tokio::io::duplex(1024);
    let running = tokio::spawn(async move {
        session
            .run("dave", BufReader::new(input_rx), output_tx)
            .await
    });
    let mut console = BufReader::new(output);

    assert_eq!(read_console_line(&mut console).await, "Welcome, dave!");
    assert_eq!(next_text(&mut alice).await, "dave joined");

    input.write_all(b"hello from the console\n").await.unwrap();
    assert_eq!(next_text(&mut alice).await, "dave: hello from the console");

    send(&mut alice, "dave: welcome aboard").await;
    assert_eq!(read_console_line(&mut console).await, "(Private) alice: welcome aboard");
    assert_eq!(next_text(&mut alice).await, "To dave: welcome aboard");

    input.write_all(b"quit\n").await.unwrap();
    let end = timeout(WAIT, running).await.unwrap().unwrap().unwrap();
    assert_eq!(end, SessionEnd::Quit);
    assert_eq!(next_text(&mut alice).await, "dave has disconnected.");
}

async fn read_console_line(console: &mut BufReader<tokio::io::DuplexStream>) -> String {
    let mut line = String::new();
    timeout(WAIT, console.read_line(&mut line))
        .await
        .expect("Timeout waiting for console output")
        .unwrap();
    line.trim_end().to_string()
}

#[tokio::test]
async fn test_close_frame_from_raw_client() {
    let (addr, registry) = start_server().await;
    let mut alice = join(addr, "alice").await;

    let mut raw = raw_connect(addr).await;
    raw.get_mut()
        .write_all(&frame::encode(b"brief", true).unwrap())
        .await
        .unwrap();
    frame::decode(&mut raw).await.unwrap().unwrap();
    next_text(&mut alice).await;

    raw.get_mut()
        .write_all(&Frame::close().encode(true).unwrap())
        .await
        .unwrap();
    assert_eq!(next_text(&mut alice).await, "brief has disconnected.");
    wait_for_count(&registry, 1).await;

    // The server hangs up after the close frame
    assert!(frame::decode(&mut raw).await.unwrap().is_none());
}
