//! Round state for the word guessing game
//!
//! A [`GameSession`] holds the secret word, the masked reveal shown to
//! players, the letters already tried, the remaining guess budget, and whose
//! turn it is. It decides what a guess does; telling players about it is the
//! dispatcher's job.

use crate::client_manager::{ClientRegistry, ConnectionId};
use crate::dictionary::Dictionary;
use crate::error::GuessError;
use log::info;
use shared::{messages, PLACEHOLDER};

/// Observable session states
///
/// A round that is won or lost is replaced by a new round inside the same
/// dispatch step, so those states only surface as a [`GuessOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A seated player holds the turn
    AwaitingGuess,
    /// Nobody is seated; guesses are not processed
    Empty,
}

/// Result of an accepted guess
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Letter is in the word and the round goes on. The turn stays put.
    Hit { letter: char },
    /// Letter is not in the word and the round goes on. The turn must advance.
    Miss { letter: char },
    /// The last hidden letter was revealed
    Won { letter: char, word: String },
    /// The guess budget ran out
    Lost { letter: char, word: String },
}

#[derive(Debug, Clone)]
pub struct GameSession {
    word: String,
    reveal: Vec<u8>,
    guessed: [bool; 26],
    guesses_left: u32,
    max_guesses: u32,
    turn: Option<ConnectionId>,
}

impl GameSession {
    /// Starts the first round with `word`. Nobody holds the turn yet.
    pub fn new(word: String, max_guesses: u32) -> Self {
        let mut session = Self {
            word: String::new(),
            reveal: Vec::new(),
            guessed: [false; 26],
            guesses_left: max_guesses,
            max_guesses,
            turn: None,
        };
        session.reset_round(word);
        session
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// The word with unguessed positions replaced by the placeholder
    pub fn reveal(&self) -> String {
        String::from_utf8_lossy(&self.reveal).into_owned()
    }

    pub fn guesses_left(&self) -> u32 {
        self.guesses_left
    }

    pub fn max_guesses(&self) -> u32 {
        self.max_guesses
    }

    pub fn turn(&self) -> Option<ConnectionId> {
        self.turn
    }

    pub fn state(&self) -> SessionState {
        match self.turn {
            Some(_) => SessionState::AwaitingGuess,
            None => SessionState::Empty,
        }
    }

    pub fn is_guessed(&self, letter: char) -> bool {
        letter_index(letter).is_some_and(|i| self.guessed[i])
    }

    /// Guessed letters in alphabetical order
    pub fn guessed_letters(&self) -> impl Iterator<Item = char> + '_ {
        self.guessed
            .iter()
            .enumerate()
            .filter(|(_, guessed)| **guessed)
            .map(|(i, _)| (b'a' + i as u8) as char)
    }

    fn is_solved(&self) -> bool {
        !self.reveal.contains(&(PLACEHOLDER as u8))
    }

    /// Gives the turn to `id` if nobody holds it
    pub fn seat(&mut self, id: ConnectionId) {
        if self.turn.is_none() {
            self.turn = Some(id);
        }
    }

    pub fn clear_turn(&mut self) {
        self.turn = None;
    }

    /// Processes one input line from `who`
    ///
    /// Checks run in this order, and a rejection leaves the session untouched:
    /// 1. `who` must hold the turn
    /// 2. the line must be exactly one `a`-`z` letter not tried this round
    pub fn submit_guess(&mut self, who: ConnectionId, line: &[u8]) -> Result<GuessOutcome, GuessError> {
        if self.turn != Some(who) {
            return Err(GuessError::NotYourTurn);
        }

        let letter = match line {
            [b] if b.is_ascii_lowercase() => *b as char,
            _ => return Err(GuessError::InvalidGuess),
        };
        let index = (letter as u8 - b'a') as usize;
        if self.guessed[index] {
            return Err(GuessError::InvalidGuess);
        }
        self.guessed[index] = true;

        let mut found = false;
        for (slot, byte) in self.reveal.iter_mut().zip(self.word.bytes()) {
            if byte == letter as u8 {
                *slot = byte;
                found = true;
            }
        }

        if found {
            if self.is_solved() {
                return Ok(GuessOutcome::Won {
                    letter,
                    word: self.word.clone(),
                });
            }
            return Ok(GuessOutcome::Hit { letter });
        }

        self.guesses_left = self.guesses_left.saturating_sub(1);
        info!("Letter {} is not in the word", letter);
        if self.guesses_left == 0 {
            return Ok(GuessOutcome::Lost {
                letter,
                word: self.word.clone(),
            });
        }
        Ok(GuessOutcome::Miss { letter })
    }

    /// Moves the turn to the next seat, wrapping around
    ///
    /// With no turn holder the first seat gets the turn. With nobody seated
    /// the turn becomes `None`.
    pub fn advance_turn(&mut self, registry: &ClientRegistry) {
        self.turn = match self.turn {
            Some(current) => registry.next_seat_after(current),
            None => registry.first_active(),
        };
    }

    /// Draws a new word and resets the round; seating and turn are untouched
    pub fn start_new_round(&mut self, dictionary: &mut Dictionary) {
        self.reset_round(dictionary.next_word());
        info!("New game");
    }

    fn reset_round(&mut self, word: String) {
        self.reveal = vec![PLACEHOLDER as u8; word.len()];
        self.word = word;
        self.guessed = [false; 26];
        self.guesses_left = self.max_guesses;
    }

    /// Status block describing the current round
    pub fn status_message(&self) -> String {
        messages::status(&self.reveal(), self.guesses_left, self.guessed_letters())
    }
}

fn letter_index(letter: char) -> Option<usize> {
    letter
        .is_ascii_lowercase()
        .then(|| (letter as u8 - b'a') as usize)
}
