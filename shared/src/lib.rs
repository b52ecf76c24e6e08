//! Wire protocol shared by the word game server and client
//!
//! The protocol is plain text over a byte stream. Every line in either
//! direction ends with [`TERMINATOR`]; the only exception is the welcome
//! prompt, which leaves the cursor on the same line as the name the player
//! types next.

mod framer;

pub use framer::{FramerError, LineFramer};

pub const TERMINATOR: &[u8; 2] = b"\r\n";
pub const DEFAULT_PORT: u16 = 58713;
pub const MAX_NAME: usize = 30;
pub const MAX_BUF: usize = 256;
pub const MAX_GUESSES: u32 = 4;
pub const PLACEHOLDER: char = '-';

pub const WELCOME_MSG: &str = "Welcome to our word game. What is your name? ";
pub const INVALID_NAME_MSG: &str = "invalid name, please write again\r\n";
pub const INVALID_GUESS_MSG: &str = "invalid guess.\r\n";
pub const NOT_YOUR_TURN_MSG: &str = "It is not your turn to guess.\r\n";
pub const YOUR_GUESS_MSG: &str = "Your guess?\r\n";
pub const NO_MORE_GUESSES_MSG: &str = "No more guesses.\r\n";
pub const NEW_ROUND_MSG: &str = "Let's start a new game\r\n";
pub const YOU_WIN_MSG: &str = "Game over! You win!\r\n";

const STATUS_RULE: &str = "***************";

/// Builders for the server messages that carry a value
pub mod messages {
    use super::STATUS_RULE;

    pub fn joined(name: &str) -> String {
        format!("{} has just joined\r\n", name)
    }

    pub fn goodbye(name: &str) -> String {
        format!("Goodbye {}\r\n", name)
    }

    pub fn turn_of(name: &str) -> String {
        format!("It's {}'s turn.\r\n", name)
    }

    pub fn guessed(name: &str, letter: char) -> String {
        format!("{} guesses: {}\r\n", name, letter)
    }

    pub fn not_in_word(letter: char) -> String {
        format!("{} is not in the word\r\n", letter)
    }

    pub fn word_was(word: &str) -> String {
        format!("The word was {}.\r\n", word)
    }

    pub fn winner(name: &str) -> String {
        format!("Game over! {} won!\r\n", name)
    }

    /// Round summary block sent after joins, guesses and round restarts
    pub fn status<I>(reveal: &str, guesses_left: u32, guessed: I) -> String
    where
        I: IntoIterator<Item = char>,
    {
        let letters: String = guessed.into_iter().map(|c| format!("{} ", c)).collect();
        format!(
            "{rule}\r\nWord to guess: {reveal}\r\nGuesses remaining: {guesses_left}\r\n\
             Letters guessed: \r\n{letters}\r\n{rule}\r\n",
            rule = STATUS_RULE,
        )
    }
}

/// Appends the protocol terminator to an outgoing line
pub fn encode_line(line: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(line.len() + TERMINATOR.len());
    bytes.extend_from_slice(line.as_bytes());
    bytes.extend_from_slice(TERMINATOR);
    bytes
}
