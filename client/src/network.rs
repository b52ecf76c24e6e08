use log::{debug, info};
use shared::{encode_line, MAX_BUF};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Connects to `addr` and relays between the terminal and the server
pub async fn run(addr: &str) -> io::Result<()> {
    let stream = TcpStream::connect(addr).await?;
    info!("Connected to {}", stream.peer_addr()?);

    let (server_rx, server_tx) = stream.into_split();
    let input = BufReader::new(tokio::io::stdin());

    relay(input, server_rx, server_tx, tokio::io::stdout()).await?;

    info!("Server closed the connection");
    Ok(())
}

/// Pumps `input` lines to the server and server bytes to `output`
///
/// Returns once the server closes its side. Running out of input shuts down
/// the write half but keeps reading, so the final server messages still
/// reach `output`.
pub async fn relay<I, R, W, O>(input: I, mut server_rx: R, mut server_tx: W, mut output: O) -> io::Result<()>
where
    I: AsyncBufRead + Unpin,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut input_open = true;
    let mut buffer = [0u8; MAX_BUF];

    loop {
        tokio::select! {
            read = server_rx.read(&mut buffer) => {
                let len = read?;
                if len == 0 {
                    output.flush().await?;
                    return Ok(());
                }
                output.write_all(&buffer[..len]).await?;
                output.flush().await?;
            }
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) => {
                        debug!("Sending {:?}", line);
                        server_tx.write_all(&encode_line(&line)).await?;
                    }
                    None => {
                        debug!("Input closed");
                        input_open = false;
                        server_tx.shutdown().await?;
                    }
                }
            }
        }
    }
}
