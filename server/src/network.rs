//! Server network layer: TCP accept, per-connection I/O tasks, and the
//! single event loop that drives the dispatcher

use crate::client_manager::{Connection, ConnectionId, OUTBOUND_QUEUE};
use crate::config::ServerConfig;
use crate::dictionary::Dictionary;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use log::{debug, error, info};
use shared::MAX_BUF;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

const READ_CHUNK: usize = MAX_BUF;
/// Longest a single write may stall before the peer is given up on
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Accepted {
        stream: TcpStream,
        addr: SocketAddr,
    },
    Received {
        id: ConnectionId,
        bytes: Vec<u8>,
    },
    PeerClosed {
        id: ConnectionId,
    },
    ReadFailed {
        id: ConnectionId,
        error: io::Error,
    },
    WriteFailed {
        id: ConnectionId,
    },
}

/// Creates a listening socket on `addr` with the given accept backlog
pub fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

/// Main server owning the listener and the game
pub struct Server {
    listener: Arc<TcpListener>,
    dispatcher: Dispatcher,
    next_connection_id: u64,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig, dictionary: Dictionary) -> Result<Self> {
        config.validate()?;
        let addr = config.bind_addr()?;
        let listener = Arc::new(listen(addr, config.backlog)?);
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            dispatcher: Dispatcher::new(&config, dictionary),
            next_connection_id: 1,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns task that accepts connections and hands them to the main loop
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        info!("A new client is connecting");
                        if let Err(e) = server_tx.send(ServerMessage::Accepted { stream, addr }) {
                            error!("Failed to send connection to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Splits the stream into reader and writer tasks and registers it
    fn register(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;

        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);

        tokio::spawn(write_loop(
            id,
            write_half,
            outbound_rx,
            self.server_tx.clone(),
            WRITE_TIMEOUT,
        ));
        let reader = tokio::spawn(read_loop(id, read_half, self.server_tx.clone()));

        let connection = Connection::new(id, addr, self.dispatcher.name_capacity(), outbound_tx)
            .with_reader(reader.abort_handle());
        self.dispatcher.on_accept(connection);
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Accepted { stream, addr } => self.register(stream, addr),
            ServerMessage::Received { id, bytes } => self.dispatcher.on_bytes(id, &bytes),
            ServerMessage::PeerClosed { id } => self.dispatcher.on_peer_closed(id),
            ServerMessage::ReadFailed { id, error } => self.dispatcher.on_read_error(id, &error),
            ServerMessage::WriteFailed { id } => self.dispatcher.on_write_failed(id),
        }
    }

    /// Main server loop
    ///
    /// Each cycle waits for one event, handles everything else already
    /// queued, then applies the disconnects collected along the way.
    pub async fn run(&mut self) -> Result<()> {
        self.spawn_acceptor();
        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            self.handle_message(message);
            while let Ok(message) = self.server_rx.try_recv() {
                self.handle_message(message);
            }
            self.dispatcher.finish_cycle();
        }

        info!("Server shutting down");
        Ok(())
    }
}

/// Forwards everything read from one connection to the main loop
///
/// Stops after end of stream or the first real read error.
async fn read_loop<R>(id: ConnectionId, mut reader: R, server_tx: mpsc::UnboundedSender<ServerMessage>)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; READ_CHUNK];

    loop {
        let (message, last) = match reader.read(&mut buffer).await {
            Ok(0) => (ServerMessage::PeerClosed { id }, true),
            Ok(len) => (
                ServerMessage::Received {
                    id,
                    bytes: buffer[..len].to_vec(),
                },
                false,
            ),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => (ServerMessage::ReadFailed { id, error }, true),
        };

        if let Err(e) = server_tx.send(message) {
            debug!("[{}] Main loop gone: {}", id, e);
            break;
        }
        if last {
            break;
        }
    }
}

/// Writes queued messages to one connection in order
///
/// The queue closes when the connection is removed; the write half is then
/// shut down. A write that fails or stalls past `write_timeout` is reported
/// and ends the task, which makes further sends to this connection fail.
async fn write_loop<W>(
    id: ConnectionId,
    mut writer: W,
    mut outbound: mpsc::Receiver<String>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    write_timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.recv().await {
        let result = match timeout(write_timeout, writer.write_all(message.as_bytes())).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write stalled")),
        };
        if let Err(e) = result {
            debug!("[{}] Write failed: {}", id, e);
            if let Err(e) = server_tx.send(ServerMessage::WriteFailed { id }) {
                debug!("[{}] Main loop gone: {}", id, e);
            }
            return;
        }
    }

    match timeout(write_timeout, writer.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("[{}] Shutdown failed: {}", id, e),
        Err(_) => debug!("[{}] Shutdown stalled", id),
    }
}
