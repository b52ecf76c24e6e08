//! # Word Game Server Library
//!
//! This library provides the server for a turn-based, multi-player word
//! guessing game played over plain TCP. Players connect with any line-based
//! client (`nc`, `telnet`, or the bundled client), pick a name, and take turns
//! guessing letters of a secret word.
//!
//! ## Core Responsibilities
//!
//! ### Connection Lifecycle
//! - Greeting new connections and collecting a unique player name
//! - Seating named players in join order
//! - Detecting departures through end of stream, read errors, or failed writes
//!
//! ### Game Rules
//! - One secret word per round, drawn from a dictionary file
//! - Only the turn holder may guess; a correct letter keeps the turn, a wrong
//!   letter costs one guess and passes the turn to the next seat
//! - Solving the word or running out of guesses ends the round and a new one
//!   starts right away with the same seating
//!
//! ## Architecture Design
//!
//! ### Single Owning Event Loop
//! Every socket gets a reader task and a writer task, but neither touches game
//! state. Readers forward raw bytes to one main loop over a channel; the main
//! loop owns the registry and the session and is the only place they change.
//! Writers drain a per-connection queue, so sending from the main loop never
//! blocks.
//!
//! ### Deferred Disconnects
//! A failed send does not remove anyone mid-broadcast. The failing connection
//! is skipped for the rest of the cycle and torn down once the cycle's
//! messages are out, with its goodbye and turn handoff run exactly once.
//!
//! ## Module Organization
//!
//! - `client_manager`: connections and the pending/active registry
//! - `game`: round state and guess evaluation
//! - `broadcast`: message fan-out and the deferred-disconnect set
//! - `dispatcher`: turns framed lines into registry and game operations
//! - `network`: TCP listener, per-connection I/O tasks, and the main loop
//! - `dictionary`: the word list
//! - `config` and `error`: settings and error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::{ServerConfig, WordOrder};
//! use server::dictionary::Dictionary;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dictionary = Dictionary::load("words.txt", WordOrder::Random)?;
//!     let mut server = Server::new(ServerConfig::default(), dictionary).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod config;
pub mod dictionary;
pub mod dispatcher;
pub mod error;
pub mod game;
pub mod network;
