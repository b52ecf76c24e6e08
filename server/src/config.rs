//! Server configuration
//!
//! Defaults mirror the protocol constants in `shared`. The binary fills a
//! [`ServerConfig`] from its command line; tests build one directly.

use crate::error::{Result, ServerError};
use clap::ValueEnum;
use shared::{DEFAULT_PORT, MAX_BUF, MAX_GUESSES, MAX_NAME, TERMINATOR};
use std::net::SocketAddr;

pub const DEFAULT_BACKLOG: u32 = 5;

/// How the dictionary picks the secret word for each round
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WordOrder {
    /// Uniform random choice every round
    Random,
    /// Cycle through the word list in file order
    Sequential,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    /// Framer capacity for connections that have not picked a name yet
    pub name_capacity: usize,
    /// Framer capacity for seated players
    pub line_capacity: usize,
    /// Guesses available at the start of every round
    pub max_guesses: u32,
    pub word_order: WordOrder,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            name_capacity: MAX_NAME,
            line_capacity: MAX_BUF,
            max_guesses: MAX_GUESSES,
            word_order: WordOrder::Random,
        }
    }
}

impl ServerConfig {
    /// Checks that every limit leaves room for at least one byte plus terminator
    pub fn validate(&self) -> Result<()> {
        let min_capacity = TERMINATOR.len() + 1;
        if self.name_capacity < min_capacity {
            return Err(ServerError::Config {
                message: format!("name capacity must be at least {}", min_capacity),
            });
        }
        if self.line_capacity < min_capacity {
            return Err(ServerError::Config {
                message: format!("line capacity must be at least {}", min_capacity),
            });
        }
        if self.max_guesses == 0 {
            return Err(ServerError::Config {
                message: "max guesses must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ServerError::Config {
            message: format!("invalid bind address {}", addr),
        })
    }
}
