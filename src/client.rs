//! Console chat client session
//!
//! One task prints every frame received from the server while the caller's
//! task forwards console lines as masked text frames.

use log::{debug, warn};
use tokio::io::{
    split, AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
    ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::core::frame::{self, Frame};
use crate::core::handshake;
use crate::error::{Result, RustyChatError};

/// Typing a line that contains this ends the session
pub const QUIT_COMMAND: &str = "quit";
pub const DISCONNECT_NOTICE: &str = "Disconnected from server.";

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed the quit command
    Quit,
    /// Console input reached end of file
    InputClosed,
    /// The server closed the connection
    Disconnected,
}

/// An upgraded connection to the chat server
pub struct ClientSession<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl ClientSession<TcpStream> {
    /// Connect to the configured server and perform the handshake
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
        Self::open(stream, &config.host, &config.path).await
    }
}

impl<S> ClientSession<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Perform the client handshake over an established stream
    pub async fn open(stream: S, host: &str, path: &str) -> Result<Self> {
        let (read_half, mut writer) = split(stream);
        let mut reader = BufReader::new(read_half);
        handshake::request(&mut reader, &mut writer, host, path).await?;
        debug!("Upgraded connection to {}{}", host, path);

        Ok(Self { reader, writer })
    }

    /// Send one masked text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        send_text(&mut self.writer, text).await
    }

    /// Send a close frame and shut the write side down
    pub async fn close(&mut self) -> Result<()> {
        send_close(&mut self.writer).await
    }

    /// Run the session until the user quits, input ends or the server leaves.
    ///
    /// `name` is sent as the first frame. Received messages and the final
    /// disconnect notice are written to `output`, one per line.
    pub async fn run<I, O>(self, name: &str, input: I, output: O) -> Result<SessionEnd>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let Self { reader, mut writer } = self;
        let mut receiver = tokio::spawn(receive_loop(reader, output));

        let result = forward_input(&mut writer, name, input, &mut receiver).await;
        receiver.abort();
        result
    }
}

// Send the name, then every console line, until quit, end of input or the
// receiver finishing
async fn forward_input<W, I>(
    writer: &mut W,
    name: &str,
    input: I,
    receiver: &mut JoinHandle<()>,
) -> Result<SessionEnd>
where
    W: AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
{
    send_text(writer, name).await?;

    let mut lines = input.lines();
    loop {
        tokio::select! {
            _ = &mut *receiver => return Ok(SessionEnd::Disconnected),
            line = lines.next_line() => match line? {
                Some(line) if line.contains(QUIT_COMMAND) => {
                    send_close(writer).await?;
                    return Ok(SessionEnd::Quit);
                }
                Some(line) => match send_text(writer, &line).await {
                    Ok(()) => {}
                    Err(RustyChatError::MessageTooLarge(size)) => {
                        warn!("Message of {} bytes is too large to send", size);
                    }
                    Err(e) => return Err(e),
                },
                None => {
                    send_close(writer).await?;
                    return Ok(SessionEnd::InputClosed);
                }
            },
        }
    }
}

async fn send_text<W>(writer: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    frame::write_frame(writer, &Frame::text(text), true).await
}

async fn send_close<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    frame::write_frame(writer, &Frame::close(), true).await?;
    writer.shutdown().await?;
    Ok(())
}

// Print every received message until the stream ends or breaks
async fn receive_loop<R, O>(mut reader: R, mut output: O)
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    loop {
        match frame::decode(&mut reader).await {
            Ok(Some(frame)) if frame.is_close() => break,
            Ok(Some(frame)) => {
                let line = format!("{}\n", frame.into_text());
                if output.write_all(line.as_bytes()).await.is_err() {
                    return;
                }
                let _ = output.flush().await;
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Receive loop stopped: {}", e);
                break;
            }
        }
    }

    let notice = format!("{}\n", DISCONNECT_NOTICE);
    let _ = output.write_all(notice.as_bytes()).await;
    let _ = output.flush().await;
}
