//! Protocol handling for the event loop
//!
//! The [`Dispatcher`] owns the registry, the game session, the dictionary and
//! the broadcaster. The network layer turns socket activity into calls on it:
//! - [`Dispatcher::on_accept`] for a new connection
//! - [`Dispatcher::on_bytes`] for received data
//! - [`Dispatcher::on_peer_closed`] / [`Dispatcher::on_read_error`] when input ends
//! - [`Dispatcher::on_write_failed`] when a writer task gives up
//! - [`Dispatcher::finish_cycle`] once every ready event has been handled
//!
//! Nothing here blocks or awaits; sends are queued on per-connection channels.

use crate::broadcast::Broadcaster;
use crate::client_manager::{ClientRegistry, Connection, ConnectionId};
use crate::config::ServerConfig;
use crate::dictionary::Dictionary;
use crate::error::{GuessError, RegistryError};
use crate::game::{GameSession, GuessOutcome};
use log::{debug, info, warn};
use shared::{
    messages, INVALID_GUESS_MSG, INVALID_NAME_MSG, NEW_ROUND_MSG, NOT_YOUR_TURN_MSG,
    NO_MORE_GUESSES_MSG, WELCOME_MSG, YOU_WIN_MSG,
};

pub struct Dispatcher {
    registry: ClientRegistry,
    game: GameSession,
    dictionary: Dictionary,
    broadcaster: Broadcaster,
    name_capacity: usize,
    line_capacity: usize,
}

impl Dispatcher {
    /// Creates the dispatcher and draws the first round's word
    pub fn new(config: &ServerConfig, mut dictionary: Dictionary) -> Self {
        let game = GameSession::new(dictionary.next_word(), config.max_guesses);
        info!("First round word has {} letters", game.word().len());
        Self {
            registry: ClientRegistry::new(),
            game,
            dictionary,
            broadcaster: Broadcaster::new(),
            name_capacity: config.name_capacity,
            line_capacity: config.line_capacity,
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    /// Framer capacity to use for connections that still need a name
    pub fn name_capacity(&self) -> usize {
        self.name_capacity
    }

    /// Registers a new connection as pending and greets it
    ///
    /// A connection that cannot even be greeted is dropped on the spot; it
    /// holds no game state.
    pub fn on_accept(&mut self, connection: Connection) {
        let id = connection.id;
        let addr = connection.addr;
        info!("Connection from {}", addr);
        if connection.send(WELCOME_MSG).is_err() {
            warn!("Write to client {} failed", addr);
            connection.close();
            return;
        }
        self.registry.add_pending(connection);
        debug!("Client {} waiting for a name", id);
    }

    /// Feeds received bytes to the connection's framer and handles every
    /// complete line
    pub fn on_bytes(&mut self, id: ConnectionId, bytes: &[u8]) {
        if self.broadcaster.is_deferred(id) {
            debug!("[{}] Ignoring input from departing client", id);
            return;
        }
        let Some(connection) = self.registry.get_mut(id) else {
            debug!("[{}] Input for unknown connection", id);
            return;
        };
        debug!("[{}] Read {} bytes", id, bytes.len());
        connection.framer.feed(bytes);

        // Each line can promote or drop the connection, so look it up again
        while !self.broadcaster.is_deferred(id) {
            let Some(frame) = self
                .registry
                .get_mut(id)
                .and_then(|connection| connection.framer.take_line())
            else {
                break;
            };
            let active = self.registry.is_active(id);

            match frame {
                Ok(line) => {
                    debug!("[{}] Found newline {}", id, String::from_utf8_lossy(&line));
                    if active {
                        self.handle_guess(id, &line);
                    } else {
                        self.handle_name(id, &line);
                    }
                }
                Err(e) => {
                    warn!("[{}] {}", id, e);
                    let notice = if active { INVALID_GUESS_MSG } else { INVALID_NAME_MSG };
                    self.broadcaster.unicast(&self.registry, id, notice);
                }
            }
        }
    }

    /// The peer closed its end of the connection
    pub fn on_peer_closed(&mut self, id: ConnectionId) {
        debug!("[{}] Read 0 bytes", id);
        self.disconnect(id);
    }

    /// A read failed; only this connection is affected
    pub fn on_read_error(&mut self, id: ConnectionId, error: &std::io::Error) {
        warn!("[{}] Read failed: {}", id, error);
        self.disconnect(id);
    }

    /// The writer task for `id` could not write to the socket
    pub fn on_write_failed(&mut self, id: ConnectionId) {
        debug!("[{}] Writer reported a failed write", id);
        self.broadcaster.defer(id);
    }

    /// Tears down every connection that failed during this cycle
    ///
    /// Goodbyes sent here may fail too; those connections join the set and
    /// are handled in the same pass. Each one is disconnected once.
    pub fn finish_cycle(&mut self) {
        let mut index = 0;
        while let Some(id) = self.broadcaster.deferred_at(index) {
            self.disconnect(id);
            index += 1;
        }
        self.broadcaster.clear_deferred();
    }

    fn handle_name(&mut self, id: ConnectionId, line: &[u8]) {
        let Ok(name) = std::str::from_utf8(line) else {
            info!("[{}] Rejected name: not valid UTF-8", id);
            self.broadcaster.unicast(&self.registry, id, INVALID_NAME_MSG);
            return;
        };
        let name = name.to_string();
        match self.registry.promote(id, &name) {
            Ok(()) => {}
            Err(RegistryError::UnknownConnection(_)) => {
                debug!("[{}] Name for a connection that is not pending", id);
                return;
            }
            Err(e) => {
                info!("[{}] Rejected name: {}", id, e);
                self.broadcaster.unicast(&self.registry, id, INVALID_NAME_MSG);
                return;
            }
        }

        if let Some(connection) = self.registry.get_mut(id) {
            connection.framer.set_capacity(self.line_capacity);
        }
        self.game.seat(id);
        info!("{} has just joined.", name);

        self.broadcaster.broadcast(&self.registry, &messages::joined(&name));
        self.broadcaster
            .unicast(&self.registry, id, &self.game.status_message());
        self.broadcaster.announce_turn(&self.registry, self.game.turn());
    }

    fn handle_guess(&mut self, id: ConnectionId, line: &[u8]) {
        let name = self.registry.name_of(id).unwrap_or_default().to_string();

        match self.game.submit_guess(id, line) {
            Err(GuessError::NotYourTurn) => {
                info!("Player {} tried to guess out of turn", name);
                self.broadcaster.unicast(&self.registry, id, NOT_YOUR_TURN_MSG);
            }
            Err(GuessError::InvalidGuess) => {
                self.broadcaster.unicast(&self.registry, id, INVALID_GUESS_MSG);
            }
            Ok(GuessOutcome::Hit { letter }) => {
                self.report_guess(&name, letter);
                self.announce_turn_unless_departing(id);
            }
            Ok(GuessOutcome::Miss { letter }) => {
                self.broadcaster
                    .unicast(&self.registry, id, &messages::not_in_word(letter));
                self.report_guess(&name, letter);
                self.pass_turn(None);
                self.broadcaster.announce_turn(&self.registry, self.game.turn());
            }
            Ok(GuessOutcome::Won { word, .. }) => {
                info!("Game over. {} won!", name);
                self.broadcaster.broadcast(&self.registry, &messages::word_was(&word));
                let winner = messages::winner(&name);
                self.broadcaster.broadcast_each(&self.registry, |connection| {
                    if connection.id == id {
                        YOU_WIN_MSG.to_string()
                    } else {
                        winner.clone()
                    }
                });
                self.restart_round();
                self.announce_turn_unless_departing(id);
            }
            Ok(GuessOutcome::Lost { letter, word }) => {
                info!("Out of guesses. The word was {}", word);
                self.broadcaster
                    .unicast(&self.registry, id, &messages::not_in_word(letter));
                self.broadcaster.broadcast(&self.registry, NO_MORE_GUESSES_MSG);
                self.broadcaster.broadcast(&self.registry, &messages::word_was(&word));
                self.restart_round();
                self.pass_turn(None);
                self.broadcaster.announce_turn(&self.registry, self.game.turn());
            }
        }
    }

    fn report_guess(&mut self, name: &str, letter: char) {
        self.broadcaster
            .broadcast(&self.registry, &messages::guessed(name, letter));
        self.broadcaster
            .broadcast(&self.registry, &self.game.status_message());
    }

    fn restart_round(&mut self) {
        self.broadcaster.broadcast(&self.registry, NEW_ROUND_MSG);
        self.game.start_new_round(&mut self.dictionary);
        self.broadcaster
            .broadcast(&self.registry, &self.game.status_message());
    }

    /// The guesser still holds the turn after a hit or a finished round. If
    /// their connection already failed, the disconnect at the end of the
    /// cycle moves the turn on and announces it instead.
    fn announce_turn_unless_departing(&mut self, guesser: ConnectionId) {
        if !self.broadcaster.is_deferred(guesser) {
            self.broadcaster.announce_turn(&self.registry, self.game.turn());
        }
    }

    /// Moves the turn to the next seat that is staying
    ///
    /// Seats in the deferred set, and `leaving` if given, are passed over.
    /// When nobody is staying the turn is cleared.
    fn pass_turn(&mut self, leaving: Option<ConnectionId>) {
        self.game.advance_turn(&self.registry);
        for _ in 1..self.registry.active_len() {
            match self.game.turn() {
                Some(next) if self.is_departing(next, leaving) => {
                    self.game.advance_turn(&self.registry);
                }
                _ => break,
            }
        }
        if let Some(next) = self.game.turn() {
            if self.is_departing(next, leaving) {
                self.game.clear_turn();
            }
        }
    }

    fn is_departing(&self, id: ConnectionId, leaving: Option<ConnectionId>) -> bool {
        leaving == Some(id) || self.broadcaster.is_deferred(id)
    }

    /// Removes a connection, handing the turn on first if it was theirs
    fn disconnect(&mut self, id: ConnectionId) {
        if self.registry.is_pending(id) {
            self.registry.remove(id);
            return;
        }
        if !self.registry.is_active(id) {
            return;
        }

        if self.game.turn() == Some(id) {
            self.pass_turn(Some(id));
        }

        let name = self.registry.remove(id).unwrap_or_default();
        info!("Goodbye {}", name);
        self.broadcaster.broadcast(&self.registry, &messages::goodbye(&name));
        self.broadcaster.announce_turn(&self.registry, self.game.turn());
    }
}
