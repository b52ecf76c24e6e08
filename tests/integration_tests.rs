//! Integration tests for the word game over real TCP connections
//!
//! Each test starts a server on an ephemeral loopback port with a fixed,
//! sequential word list and drives it with plain socket clients.

use server::config::{ServerConfig, WordOrder};
use server::dictionary::Dictionary;
use server::network::Server;
use shared::{
    encode_line, messages, INVALID_GUESS_MSG, INVALID_NAME_MSG, NEW_ROUND_MSG,
    NOT_YOUR_TURN_MSG, NO_MORE_GUESSES_MSG, WELCOME_MSG, YOUR_GUESS_MSG, YOU_WIN_MSG,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn start_server(words: &[&str], max_guesses: u32) -> SocketAddr {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_guesses,
        word_order: WordOrder::Sequential,
        ..ServerConfig::default()
    };
    let dictionary = Dictionary::from_words(words.iter().copied(), WordOrder::Sequential)
        .expect("Failed to build dictionary");
    let mut server = Server::new(config, dictionary)
        .await
        .expect("Failed to start server");
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

struct Player {
    stream: BufReader<TcpStream>,
}

impl Player {
    /// Connects and consumes the welcome prompt
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("Failed to connect");
        let mut stream = BufReader::new(stream);

        let mut welcome = vec![0u8; WELCOME_MSG.len()];
        timeout(WAIT, stream.read_exact(&mut welcome))
            .await
            .expect("Timed out waiting for welcome")
            .unwrap();
        assert_eq!(welcome, WELCOME_MSG.as_bytes());

        Self { stream }
    }

    /// Connects and registers `name`, waiting until the server confirms it
    async fn join(addr: SocketAddr, name: &str) -> Self {
        let mut player = Self::connect(addr).await;
        player.send(name).await;
        player.expect(&messages::joined(name)).await;
        player
    }

    async fn send(&mut self, line: &str) {
        self.stream
            .get_mut()
            .write_all(&encode_line(line))
            .await
            .unwrap();
    }

    async fn next_line(&mut self) -> String {
        let mut line = String::new();
        let read = timeout(WAIT, self.stream.read_line(&mut line))
            .await
            .expect("Timed out waiting for a line")
            .unwrap();
        assert!(read > 0, "Server closed the connection");
        line
    }

    /// Reads lines until `expected` arrives
    async fn expect(&mut self, expected: &str) {
        loop {
            if self.next_line().await == expected {
                return;
            }
        }
    }

    /// The very next line must be `expected`
    async fn expect_next(&mut self, expected: &str) {
        assert_eq!(self.next_line().await, expected);
    }
}

/// JOIN AND NAMING TESTS
mod join_tests {
    use super::*;

    /// First player sees the status block and gets the turn
    #[tokio::test]
    async fn first_player_gets_status_and_turn() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;

        alice.expect_next("***************\r\n").await;
        alice.expect_next("Word to guess: ---\r\n").await;
        alice.expect_next("Guesses remaining: 4\r\n").await;
        alice.expect_next("Letters guessed: \r\n").await;
        alice.expect_next("\r\n").await;
        alice.expect_next("***************\r\n").await;
        alice.expect_next(YOUR_GUESS_MSG).await;
    }

    /// Later players are told whose turn it is; everyone hears the join
    #[tokio::test]
    async fn second_player_sees_current_turn() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;

        let mut bob = Player::join(addr, "bob").await;
        bob.expect(&messages::turn_of("alice")).await;

        alice.expect_next(&messages::joined("bob")).await;
        alice.expect_next(YOUR_GUESS_MSG).await;
    }

    /// A taken name is rejected and the connection may try again
    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;

        let mut other = Player::connect(addr).await;
        other.send("alice").await;
        other.expect_next(INVALID_NAME_MSG).await;

        other.send("bob").await;
        other.expect_next(&messages::joined("bob")).await;
        alice.expect_next(&messages::joined("bob")).await;
    }

    /// A name longer than the pending buffer is refused without a disconnect
    #[tokio::test]
    async fn overlong_name_is_rejected() {
        let addr = start_server(&["cat"], 4).await;
        let mut player = Player::connect(addr).await;

        player.send(&"x".repeat(64)).await;
        player.expect_next(INVALID_NAME_MSG).await;

        player.send("carol").await;
        player.expect_next(&messages::joined("carol")).await;
    }

    /// The end of a refused name line never counts as a name of its own
    #[tokio::test]
    async fn overlong_name_tail_is_dropped() {
        let addr = start_server(&["cat"], 4).await;
        let mut player = Player::connect(addr).await;

        player.send(&format!("{}bob", "x".repeat(40))).await;
        player.expect_next(INVALID_NAME_MSG).await;

        player.send("carol").await;
        player.expect_next(&messages::joined("carol")).await;
    }
}

/// GAMEPLAY TESTS
mod gameplay_tests {
    use super::*;

    /// Only the turn holder may guess
    #[tokio::test]
    async fn out_of_turn_guess_is_refused() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;
        let mut bob = Player::join(addr, "bob").await;
        bob.expect(&messages::turn_of("alice")).await;

        bob.send("a").await;
        bob.expect_next(NOT_YOUR_TURN_MSG).await;

        // An out-of-turn line is refused for the turn, not its content
        bob.send("zz").await;
        bob.expect_next(NOT_YOUR_TURN_MSG).await;
    }

    /// Malformed guesses only reach the sender
    #[tokio::test]
    async fn invalid_guess_is_reported() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;

        alice.send("ab").await;
        alice.expect_next(INVALID_GUESS_MSG).await;
        alice.send("A").await;
        alice.expect_next(INVALID_GUESS_MSG).await;
    }

    /// An overlong guess line is refused once and its end is not played
    #[tokio::test]
    async fn overlong_guess_tail_is_dropped() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;

        alice.send(&format!("{}c", "x".repeat(300))).await;
        alice.expect_next(INVALID_GUESS_MSG).await;

        alice.send("c").await;
        alice.expect_next(&messages::guessed("alice", 'c')).await;
    }

    /// Solving the word ends the round and starts the next one
    #[tokio::test]
    async fn winning_restarts_the_round() {
        let addr = start_server(&["cat", "horse"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;
        let mut bob = Player::join(addr, "bob").await;
        bob.expect(&messages::turn_of("alice")).await;

        for letter in ["c", "a", "t"] {
            alice.send(letter).await;
        }

        alice.expect(&messages::word_was("cat")).await;
        alice.expect_next(YOU_WIN_MSG).await;
        alice.expect_next(NEW_ROUND_MSG).await;

        bob.expect(&messages::word_was("cat")).await;
        bob.expect_next(&messages::winner("alice")).await;
        bob.expect_next(NEW_ROUND_MSG).await;
        bob.expect_next("***************\r\n").await;
        bob.expect_next("Word to guess: -----\r\n").await;
        bob.expect_next("Guesses remaining: 4\r\n").await;
        bob.expect(&messages::turn_of("alice")).await;
    }

    /// Running out of guesses reveals the word and passes the turn
    #[tokio::test]
    async fn losing_restarts_and_advances_turn() {
        let addr = start_server(&["cat", "dog"], 1).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;
        let mut bob = Player::join(addr, "bob").await;
        bob.expect(&messages::turn_of("alice")).await;
        alice.expect(YOUR_GUESS_MSG).await;

        alice.send("z").await;
        alice.expect_next(&messages::not_in_word('z')).await;
        alice.expect_next(NO_MORE_GUESSES_MSG).await;
        alice.expect_next(&messages::word_was("cat")).await;
        alice.expect_next(NEW_ROUND_MSG).await;
        alice.expect(&messages::turn_of("bob")).await;

        bob.expect(NEW_ROUND_MSG).await;
        bob.expect(YOUR_GUESS_MSG).await;
    }
}

/// DISCONNECTION TESTS
mod disconnect_tests {
    use super::*;

    /// When the turn holder leaves, the next seat is told to guess
    #[tokio::test]
    async fn turn_holder_disconnect_passes_turn() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;
        let mut bob = Player::join(addr, "bob").await;
        bob.expect(&messages::turn_of("alice")).await;

        drop(alice);

        bob.expect_next("Goodbye alice\r\n").await;
        bob.expect_next(YOUR_GUESS_MSG).await;

        bob.send("c").await;
        bob.expect_next(&messages::guessed("bob", 'c')).await;
    }

    /// A connection that leaves before naming itself is never announced
    #[tokio::test]
    async fn pending_disconnect_is_silent() {
        let addr = start_server(&["cat"], 4).await;
        let mut alice = Player::join(addr, "alice").await;
        alice.expect(YOUR_GUESS_MSG).await;

        let stranger = Player::connect(addr).await;
        drop(stranger);

        let mut bob = Player::join(addr, "bob").await;
        bob.expect(&messages::turn_of("alice")).await;
        alice.expect_next(&messages::joined("bob")).await;
    }
}
