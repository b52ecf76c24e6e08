//! # Word Game Client Library
//!
//! A thin terminal front end for the word game server. The server speaks plain
//! `\r\n`-terminated text, so the client does no parsing of its own: it sends
//! each line typed on standard input and prints whatever the server writes
//! back, exactly as `nc` or `telnet` would.
//!
//! ## Behavior
//!
//! - Every stdin line is sent with the protocol terminator appended
//! - Server output is printed as it arrives, including the unterminated
//!   welcome prompt
//! - End of input half-closes the connection; the client keeps printing
//!   until the server closes its side
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     client::network::run("127.0.0.1:58713").await
//! }
//! ```

pub mod network;
