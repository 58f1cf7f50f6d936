use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::board::{Board, Color, Piece};
use crate::error::EngineError;
use crate::movegen::{Move, MoveGenerator};

/// Material value used to rank captures.
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 1,
        Piece::Knight => 3,
        Piece::Bishop => 3,
        Piece::Rook => 5,
        Piece::Queen => 9,
        Piece::King => 0, // never captured
    }
}

/// Why the selector picked the move it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Evasion,
    GivesCheck,
    Capture,
    Random,
}

/// One-ply heuristic opponent.
///
/// Rules are tried in order and the first that applies decides:
/// evade check at random, give check, take the most valuable piece,
/// otherwise play any legal move.
pub struct MoveSelector {
    move_generator: MoveGenerator,
    rng: StdRng,
}

impl MoveSelector {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            move_generator: MoveGenerator::new(),
            rng,
        }
    }

    pub fn choose_move(&mut self, board: &Board, color: Color) -> Result<Move, EngineError> {
        let moves = self.move_generator.generate_moves(board, color);
        let (mv, reason) = self.select(board, color, &moves)?;
        debug!(%color, %mv, ?reason, candidates = moves.len(), "opponent chose move");
        Ok(mv)
    }

    /// Picks one of `moves`, which must be the legal moves of `color` on `board`.
    pub fn select(
        &mut self,
        board: &Board,
        color: Color,
        moves: &[Move],
    ) -> Result<(Move, Reason), EngineError> {
        if moves.is_empty() {
            return Err(EngineError::NoLegalMoves(color));
        }

        // Every legal move already resolves the check
        if self.move_generator.is_king_in_check(board, color) {
            return self.random(moves, color).map(|mv| (mv, Reason::Evasion));
        }

        let opponent = color.opposite();
        let checking = moves.iter().find(|mv| {
            let mut board_copy = board.clone();
            board_copy.make_move(mv);
            self.move_generator.is_king_in_check(&board_copy, opponent)
        });
        if let Some(&mv) = checking {
            return Ok((mv, Reason::GivesCheck));
        }

        let mut best_capture: Option<(Move, i32)> = None;
        for mv in moves {
            if let Some(captured) = mv.captured_piece {
                let value = piece_value(captured);
                if best_capture.map_or(true, |(_, best)| value > best) {
                    best_capture = Some((*mv, value));
                }
            }
        }
        if let Some((mv, _)) = best_capture {
            return Ok((mv, Reason::Capture));
        }

        self.random(moves, color).map(|mv| (mv, Reason::Random))
    }

    fn random(&mut self, moves: &[Move], color: Color) -> Result<Move, EngineError> {
        moves
            .choose(&mut self.rng)
            .copied()
            .ok_or(EngineError::NoLegalMoves(color))
    }
}
