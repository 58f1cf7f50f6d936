//! Turn controller for a single game session.
//!
//! A session moves through `ModeSelection -> Active -> GameOver`. Human input
//! arrives as square selections and move attempts; the computer's reply is
//! deferred behind an [`AiTicket`] so the caller can repaint before it lands.
//! Tickets carry the session generation they were issued for, and a ticket
//! from an earlier game is dropped instead of being applied.

use std::fmt;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::ai::MoveSelector;
use crate::board::{Board, Color, Piece, Square};
use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::movegen::{Move, MoveGenerator, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    HumanVsHuman,
    HumanVsComputer,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameMode::HumanVsHuman => write!(f, "human vs human"),
            GameMode::HumanVsComputer => write!(f, "human vs computer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ModeSelection,
    Active,
    GameOver,
}

/// The human's currently chosen piece and where it may go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub square: Square,
    pub piece: Piece,
    pub destinations: Vec<Square>,
}

/// Snapshot of a session handed to callers and callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub active_color: Color,
    pub mode: Option<GameMode>,
    pub phase: Phase,
    pub outcome: Outcome,
    pub selection: Option<Selection>,
    pub ai_thinking: bool,
}

impl GameState {
    pub fn is_check(&self) -> bool {
        self.outcome == Outcome::Check
    }
}

/// A deferred computer move, valid only for the generation it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiTicket {
    pub generation: u64,
    pub ready_at: Instant,
}

pub type AiMoveCallback = Box<dyn FnMut(&Move, &GameState)>;

pub struct GameSession {
    config: SessionConfig,
    move_generator: MoveGenerator,
    selector: MoveSelector,
    board: Board,
    active_color: Color,
    mode: Option<GameMode>,
    phase: Phase,
    outcome: Outcome,
    selection: Option<Selection>,
    history: Vec<Move>,
    generation: u64,
    pending_ai: Option<AiTicket>,
    on_ai_move: Option<AiMoveCallback>,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Self {
        let selector = MoveSelector::new(config.seed);
        Self {
            config,
            move_generator: MoveGenerator::new(),
            selector,
            board: Board::new(),
            active_color: Color::White,
            mode: None,
            phase: Phase::ModeSelection,
            outcome: Outcome::InProgress,
            selection: None,
            history: Vec::new(),
            generation: 0,
            pending_ai: None,
            on_ai_move: None,
        }
    }

    /// Starts an active game from an arbitrary position. Each side needs
    /// exactly one king, and the side not to move must not be in check.
    pub fn from_position(
        config: SessionConfig,
        mode: GameMode,
        board: Board,
        active_color: Color,
    ) -> Result<Self, EngineError> {
        for color in [Color::White, Color::Black] {
            let count = board.count_kings(color);
            if count != 1 {
                return Err(EngineError::KingCount { color, count });
            }
        }
        let waiting = active_color.opposite();
        if MoveGenerator::new().is_king_in_check(&board, waiting) {
            return Err(EngineError::WaitingSideInCheck(waiting));
        }

        let mut session = Self::new(config);
        session.begin(mode, board, active_color);
        Ok(session)
    }

    /// Registers the callback fired after each computer move. Replaces any earlier one.
    pub fn on_ai_move_ready<F>(&mut self, callback: F)
    where
        F: FnMut(&Move, &GameState) + 'static,
    {
        self.on_ai_move = Some(Box::new(callback));
    }

    /// Starts a game in `mode` from the initial layout. A game already in
    /// progress or finished is abandoned first.
    pub fn start_game(&mut self, mode: GameMode) -> GameState {
        if self.phase != Phase::ModeSelection {
            debug!(phase = ?self.phase, "abandoning current game before starting a new one");
            self.new_game();
        }
        self.begin(mode, Board::new(), Color::White);
        self.state()
    }

    /// Returns to mode selection, cancelling any pending computer move.
    pub fn new_game(&mut self) -> GameState {
        if let Some(ticket) = self.pending_ai.take() {
            debug!(generation = ticket.generation, "cancelling pending opponent move");
        }
        self.generation += 1;
        self.board = Board::new();
        self.active_color = Color::White;
        self.mode = None;
        self.phase = Phase::ModeSelection;
        self.outcome = Outcome::InProgress;
        self.selection = None;
        self.history.clear();
        self.state()
    }

    fn begin(&mut self, mode: GameMode, board: Board, active_color: Color) {
        self.generation += 1;
        self.pending_ai = None;
        self.board = board;
        self.active_color = active_color;
        self.mode = Some(mode);
        self.phase = Phase::Active;
        self.selection = None;
        self.history.clear();
        self.outcome = self.move_generator.get_outcome(&self.board, active_color);
        info!(%mode, generation = self.generation, "game started");

        if self.outcome.is_terminal() {
            self.phase = Phase::GameOver;
            info!(outcome = %self.outcome, "game over");
        } else if self.is_computer_turn() {
            self.schedule_ai();
        }
    }

    /// True when a board-mutating human action would be honoured right now.
    fn accepts_human_input(&self) -> bool {
        self.phase == Phase::Active && self.pending_ai.is_none() && !self.is_computer_turn()
    }

    /// Selects the piece on `square` if it belongs to the side to move,
    /// otherwise clears the selection. Never moves anything.
    pub fn select_square(&mut self, square: Square) -> Option<Selection> {
        if !self.accepts_human_input() {
            debug!(%square, "selection ignored");
            return self.selection.clone();
        }

        self.selection = match self.board.get_piece_at(square) {
            Some((piece, color)) if color == self.active_color => Some(Selection {
                square,
                piece,
                destinations: self.move_generator.legal_destinations(&self.board, square),
            }),
            _ => None,
        };
        debug!(%square, selected = self.selection.is_some(), "selection updated");
        self.selection.clone()
    }

    /// Click handling as a board view sees it: a click on a destination of the
    /// current selection plays it, any other click reselects or clears.
    pub fn click_square(&mut self, square: Square) -> GameState {
        let target = self
            .selection
            .as_ref()
            .filter(|selection| selection.destinations.contains(&square))
            .map(|selection| selection.square);

        match target {
            Some(from) => {
                self.attempt_move(from, square);
            }
            None => {
                self.select_square(square);
            }
        }
        self.state()
    }

    /// Plays `from -> to` for the side to move. Returns `None` and changes
    /// nothing when the move is not legal or input is not accepted.
    pub fn attempt_move(&mut self, from: Square, to: Square) -> Option<GameState> {
        if !self.accepts_human_input() {
            debug!(%from, %to, "move ignored outside the human turn");
            return None;
        }
        if self.board.color_at(from) != Some(self.active_color) {
            debug!(%from, %to, "no piece of the side to move on source square");
            return None;
        }
        if !self.move_generator.legal_destinations(&self.board, from).contains(&to) {
            debug!(%from, %to, "illegal move rejected");
            return None;
        }

        let mv = Move::on_board(&self.board, from, to)?;
        self.apply_move(mv);
        Some(self.state())
    }

    fn apply_move(&mut self, mv: Move) {
        self.board.make_move(&mv);
        self.history.push(mv);
        self.selection = None;
        self.active_color = self.active_color.opposite();
        self.outcome = self.move_generator.get_outcome(&self.board, self.active_color);
        info!(color = %mv.color, %mv, outcome = %self.outcome, "move played");

        if self.outcome.is_terminal() {
            self.phase = Phase::GameOver;
            info!(outcome = %self.outcome, "game over");
            return;
        }

        for color in [Color::White, Color::Black] {
            let kings = self.board.count_kings(color);
            if kings != 1 {
                error!(%color, kings, "active game lost its single king");
            }
        }

        if self.is_computer_turn() {
            self.schedule_ai();
        }
    }

    fn schedule_ai(&mut self) {
        let ticket = AiTicket {
            generation: self.generation,
            ready_at: Instant::now() + self.config.think_delay,
        };
        debug!(generation = ticket.generation, "opponent move scheduled");
        self.selection = None;
        self.pending_ai = Some(ticket);
    }

    /// The computer move waiting to be played, if any.
    pub fn pending_ai(&self) -> Option<AiTicket> {
        self.pending_ai
    }

    /// Plays the pending computer move once its delay has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Move> {
        match self.pending_ai {
            Some(ticket) if now >= ticket.ready_at => self.complete_ai(ticket),
            _ => None,
        }
    }

    /// Plays the pending computer move without waiting out the delay.
    pub fn run_pending_ai(&mut self) -> Option<Move> {
        let ticket = self.pending_ai?;
        self.complete_ai(ticket)
    }

    /// Plays the computer move for `ticket`. Tickets from an earlier game, or
    /// ones already completed, are discarded.
    pub fn complete_ai(&mut self, ticket: AiTicket) -> Option<Move> {
        if ticket.generation != self.generation || self.pending_ai != Some(ticket) {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale opponent move"
            );
            return None;
        }
        self.pending_ai = None;

        let color = self.active_color;
        match self.selector.choose_move(&self.board, color) {
            Ok(mv) => {
                self.apply_move(mv);
                let state = self.state();
                if let Some(callback) = self.on_ai_move.as_mut() {
                    callback(&mv, &state);
                }
                Some(mv)
            }
            Err(err) => {
                error!(%err, "opponent asked to move in a finished position");
                self.phase = Phase::GameOver;
                self.outcome = self.move_generator.get_outcome(&self.board, color);
                None
            }
        }
    }

    pub fn is_computer_turn(&self) -> bool {
        self.mode == Some(GameMode::HumanVsComputer) && self.active_color == self.config.ai_color
    }

    pub fn is_ai_thinking(&self) -> bool {
        self.pending_ai.is_some()
    }

    pub fn get_board(&self) -> &Board {
        &self.board
    }

    pub fn get_active_color(&self) -> Color {
        self.active_color
    }

    pub fn get_outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.history.last()
    }

    /// Legal moves for the side to move; empty outside an active game.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        self.move_generator.generate_moves(&self.board, self.active_color)
    }

    pub fn state(&self) -> GameState {
        GameState {
            board: self.board.clone(),
            active_color: self.active_color,
            mode: self.mode,
            phase: self.phase,
            outcome: self.outcome,
            selection: self.selection.clone(),
            ai_thinking: self.is_ai_thinking(),
        }
    }

    /// One-line status for display next to the board.
    pub fn status_text(&self) -> String {
        match self.phase {
            Phase::ModeSelection => "Select a game mode.".to_string(),
            Phase::GameOver => format!("{}.", self.outcome),
            Phase::Active if self.is_ai_thinking() => {
                format!("AI ({}) is thinking...", self.active_color)
            }
            Phase::Active => {
                if self.outcome == Outcome::Check {
                    format!("Check! {} to move.", self.active_color)
                } else {
                    format!("{} to move.", self.active_color)
                }
            }
        }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn instant_config() -> SessionConfig {
        SessionConfig::default()
            .with_think_delay(Duration::ZERO)
            .with_seed(17)
    }

    #[test]
    fn test_starts_in_mode_selection() {
        let session = GameSession::default();

        assert_eq!(session.phase(), Phase::ModeSelection);
        assert_eq!(session.mode(), None);
        assert_eq!(session.status_text(), "Select a game mode.");
        assert!(session.legal_moves().is_empty());
    }

    #[test]
    fn test_input_ignored_before_mode_chosen() {
        let mut session = GameSession::default();
        let before = session.state();

        assert_eq!(session.select_square(sq("e2")), None);
        assert_eq!(session.attempt_move(sq("e2"), sq("e4")), None);
        assert_eq!(session.state(), before);
    }

    #[test]
    fn test_selection_flow() {
        let mut session = GameSession::new(instant_config());
        session.start_game(GameMode::HumanVsHuman);

        let selection = session.select_square(sq("g1")).unwrap();
        assert_eq!(selection.piece, Piece::Knight);
        assert_eq!(selection.destinations.len(), 2);

        // Enemy piece clears the selection
        assert_eq!(session.select_square(sq("e7")), None);
        assert!(session.selection().is_none());

        // Clicking another own piece replaces the selection
        session.click_square(sq("g1"));
        session.click_square(sq("b1"));
        assert_eq!(session.selection().map(|s| s.square), Some(sq("b1")));

        // Clicking a destination plays the move
        let state = session.click_square(sq("c3"));
        assert_eq!(state.active_color, Color::Black);
        assert_eq!(state.selection, None);
        assert_eq!(
            state.board.get_piece_at(sq("c3")),
            Some((Piece::Knight, Color::White))
        );

        // Clicking a square that is not a destination only clears
        session.click_square(sq("e7"));
        let state = session.click_square(sq("e3"));
        assert_eq!(state.selection, None);
        assert_eq!(state.active_color, Color::Black);
    }

    #[test]
    fn test_ai_reply_after_human_move() {
        let mut session = GameSession::new(instant_config());
        session.start_game(GameMode::HumanVsComputer);

        session.attempt_move(sq("e2"), sq("e4")).unwrap();
        assert!(session.is_ai_thinking());
        assert_eq!(session.status_text(), "AI (Black) is thinking...");

        // Human input is ignored while the opponent thinks
        assert_eq!(session.attempt_move(sq("d2"), sq("d4")), None);
        assert_eq!(session.select_square(sq("d2")), None);

        let mv = session.poll(Instant::now()).unwrap();
        assert_eq!(mv.color, Color::Black);
        assert!(!session.is_ai_thinking());
        assert_eq!(session.get_active_color(), Color::White);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.last_move(), Some(&mv));
    }

    #[test]
    fn test_poll_waits_for_think_delay() {
        let config = instant_config().with_think_delay(Duration::from_secs(60));
        let mut session = GameSession::new(config);
        session.start_game(GameMode::HumanVsComputer);
        session.attempt_move(sq("e2"), sq("e4")).unwrap();

        let ticket = session.pending_ai().unwrap();
        assert_eq!(session.poll(Instant::now()), None);
        assert!(session.is_ai_thinking());

        assert!(session.poll(ticket.ready_at).is_some());
        assert!(!session.is_ai_thinking());
    }

    #[test]
    fn test_computer_playing_white_moves_first() {
        let config = instant_config().with_ai_color(Color::White);
        let mut session = GameSession::new(config);

        let state = session.start_game(GameMode::HumanVsComputer);
        assert!(state.ai_thinking);

        let mv = session.run_pending_ai().unwrap();
        assert_eq!(mv.color, Color::White);
        assert_eq!(session.get_active_color(), Color::Black);
    }

    #[test]
    fn test_new_game_cancels_pending_ai_move() {
        let mut session = GameSession::new(instant_config());
        session.start_game(GameMode::HumanVsComputer);
        session.attempt_move(sq("e2"), sq("e4")).unwrap();
        let stale = session.pending_ai().unwrap();

        session.new_game();
        let state = session.start_game(GameMode::HumanVsComputer);

        assert_eq!(session.complete_ai(stale), None);
        assert_eq!(session.state(), state);
        assert_eq!(state.board, Board::new());
    }

    #[test]
    fn test_ticket_cannot_be_replayed() {
        let mut session = GameSession::new(instant_config());
        session.start_game(GameMode::HumanVsComputer);
        session.attempt_move(sq("e2"), sq("e4")).unwrap();
        let ticket = session.pending_ai().unwrap();

        assert!(session.complete_ai(ticket).is_some());
        let after = session.state();
        assert_eq!(session.complete_ai(ticket), None);
        assert_eq!(session.state(), after);
    }

    #[test]
    fn test_opponent_without_moves_ends_the_game() {
        let mut session = GameSession::new(instant_config());
        session.start_game(GameMode::HumanVsComputer);

        // Force a stalemated black side behind the controller's back
        session.board = Board::from_placement("k7/8/1Q6/8/8/8/8/1K6").unwrap();
        session.active_color = Color::Black;
        session.schedule_ai();

        assert_eq!(session.run_pending_ai(), None);
        assert!(session.is_game_over());
        assert_eq!(session.get_outcome(), Outcome::Stalemate);
    }

    #[test]
    fn test_start_game_from_game_over_resets() {
        let board = Board::from_placement("3R2k1/5ppp/8/8/8/8/8/6K1").unwrap();
        let mut session =
            GameSession::from_position(instant_config(), GameMode::HumanVsHuman, board, Color::Black)
                .unwrap();
        assert!(session.is_game_over());
        assert_eq!(session.status_text(), "Checkmate - White wins.");

        let state = session.start_game(GameMode::HumanVsHuman);
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(state.board, Board::new());
        assert_eq!(state.active_color, Color::White);
        assert_eq!(state.outcome, Outcome::InProgress);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_from_position_needs_one_king_each() {
        let missing = Board::from_placement("8/p7/8/8/8/8/8/4RK2").unwrap();
        assert_eq!(
            GameSession::from_position(instant_config(), GameMode::HumanVsHuman, missing, Color::White)
                .err(),
            Some(EngineError::KingCount {
                color: Color::Black,
                count: 0
            })
        );

        let doubled = Board::from_placement("4k3/8/8/8/8/8/8/K3K3").unwrap();
        assert_eq!(
            GameSession::from_position(instant_config(), GameMode::HumanVsHuman, doubled, Color::White)
                .err(),
            Some(EngineError::KingCount {
                color: Color::White,
                count: 2
            })
        );
    }

    #[test]
    fn test_from_position_rejects_capturable_king() {
        // Black is in check with White to move, so Rxe8 would take the king
        let board = Board::from_placement("4k3/p7/8/8/8/8/8/4RK2").unwrap();

        let result =
            GameSession::from_position(instant_config(), GameMode::HumanVsHuman, board, Color::White);
        assert_eq!(result.err(), Some(EngineError::WaitingSideInCheck(Color::Black)));
    }
}
