use std::fmt;

use tracing::warn;

use crate::board::{Board, Color, Piece, Square};
use crate::error::EngineError;

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];

const ORTHOGONALS: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// A move together with what it moved and what it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub color: Color,
    pub captured_piece: Option<Piece>,
    pub promotion: Option<Piece>,
}

impl Move {
    pub fn new(from: Square, to: Square, piece: Piece, color: Color) -> Self {
        let promotion = if piece == Piece::Pawn && to.row() == color.promotion_row() {
            Some(Piece::Queen)
        } else {
            None
        };
        Self {
            from,
            to,
            piece,
            color,
            captured_piece: None,
            promotion,
        }
    }

    /// Builds the move from what currently stands on `from` and `to`.
    pub fn on_board(board: &Board, from: Square, to: Square) -> Option<Self> {
        let (piece, color) = board.get_piece_at(from)?;
        let mut mv = Move::new(from, to, piece, color);
        mv.captured_piece = board
            .get_piece_at(to)
            .filter(|&(_, c)| c != color)
            .map(|(captured, _)| captured);
        Some(mv)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if self.promotion.is_some() {
            write!(f, "q")?;
        }
        Ok(())
    }
}

/// Result of evaluating the side about to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    /// The side to move is in check but has legal replies.
    Check,
    Checkmate(Color), // Color is the winner
    Stalemate,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Checkmate(_) | Outcome::Stalemate)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::InProgress => write!(f, "In progress"),
            Outcome::Check => write!(f, "Check"),
            Outcome::Checkmate(winner) => write!(f, "Checkmate - {} wins", winner),
            Outcome::Stalemate => write!(f, "Stalemate - Draw"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Destinations for the piece on `from`, ignoring the safety of its own king.
    pub fn pseudo_legal_destinations(&self, board: &Board, from: Square) -> Vec<Square> {
        let mut moves = Vec::new();
        let Some((piece, color)) = board.get_piece_at(from) else {
            return moves;
        };

        match piece {
            Piece::Pawn => self.add_pawn_moves(board, from, color, &mut moves),
            Piece::Knight => self.add_step_moves(board, from, color, &KNIGHT_OFFSETS, &mut moves),
            Piece::King => self.add_step_moves(board, from, color, &KING_OFFSETS, &mut moves),
            Piece::Rook => self.add_sliding_moves(board, from, color, &ORTHOGONALS, &mut moves),
            Piece::Bishop => self.add_sliding_moves(board, from, color, &DIAGONALS, &mut moves),
            Piece::Queen => {
                self.add_sliding_moves(board, from, color, &ORTHOGONALS, &mut moves);
                self.add_sliding_moves(board, from, color, &DIAGONALS, &mut moves);
            }
        }
        moves
    }

    fn add_pawn_moves(&self, board: &Board, from: Square, color: Color, moves: &mut Vec<Square>) {
        let forward = color.forward();

        // Pushes
        if let Some(one) = from.offset(forward, 0) {
            if board.get_piece_at(one).is_none() {
                moves.push(one);
                if from.row() == color.pawn_row() {
                    if let Some(two) = from.offset(2 * forward, 0) {
                        if board.get_piece_at(two).is_none() {
                            moves.push(two);
                        }
                    }
                }
            }
        }

        // Captures
        for dc in [-1, 1] {
            if let Some(target) = from.offset(forward, dc) {
                if matches!(board.color_at(target), Some(c) if c != color) {
                    moves.push(target);
                }
            }
        }
    }

    fn add_step_moves(
        &self,
        board: &Board,
        from: Square,
        color: Color,
        offsets: &[(i8, i8)],
        moves: &mut Vec<Square>,
    ) {
        for &(dr, dc) in offsets {
            if let Some(target) = from.offset(dr, dc) {
                if board.color_at(target) != Some(color) {
                    moves.push(target);
                }
            }
        }
    }

    fn add_sliding_moves(
        &self,
        board: &Board,
        from: Square,
        color: Color,
        directions: &[(i8, i8)],
        moves: &mut Vec<Square>,
    ) {
        for &(dr, dc) in directions {
            let mut current = from;
            while let Some(target) = current.offset(dr, dc) {
                match board.color_at(target) {
                    None => moves.push(target),
                    Some(c) => {
                        if c != color {
                            moves.push(target);
                        }
                        break;
                    }
                }
                current = target;
            }
        }
    }

    /// Pseudo-legal destinations that keep the mover's king out of check.
    pub fn legal_destinations(&self, board: &Board, from: Square) -> Vec<Square> {
        let Some((_, color)) = board.get_piece_at(from) else {
            return Vec::new();
        };

        self.pseudo_legal_destinations(board, from)
            .into_iter()
            .filter(|&to| {
                let mut board_copy = board.clone();
                board_copy.move_piece(from, to);
                !self.is_king_in_check(&board_copy, color)
            })
            .collect()
    }

    /// All legal moves for `color`, in row-major order of the moving piece.
    pub fn generate_moves(&self, board: &Board, color: Color) -> Vec<Move> {
        let mut moves = Vec::new();
        for (from, _) in board.pieces(color) {
            for to in self.legal_destinations(board, from) {
                if let Some(mv) = Move::on_board(board, from, to) {
                    moves.push(mv);
                }
            }
        }
        moves
    }

    pub fn has_legal_moves(&self, board: &Board, color: Color) -> bool {
        board
            .pieces(color)
            .any(|(from, _)| !self.legal_destinations(board, from).is_empty())
    }

    pub fn is_square_under_attack(&self, board: &Board, square: Square, attacker_color: Color) -> bool {
        board
            .pieces(attacker_color)
            .any(|(from, _)| self.pseudo_legal_destinations(board, from).contains(&square))
    }

    pub fn is_king_in_check(&self, board: &Board, color: Color) -> bool {
        match board.find_king(color) {
            Some(king_square) => self.is_square_under_attack(board, king_square, color.opposite()),
            None => {
                let err = EngineError::MissingKing(color);
                warn!(%err, "treating missing king as not in check");
                false
            }
        }
    }

    /// Evaluates the position for `color`, the side about to move.
    pub fn get_outcome(&self, board: &Board, color: Color) -> Outcome {
        let in_check = self.is_king_in_check(board, color);

        if !self.has_legal_moves(board, color) {
            if in_check {
                return Outcome::Checkmate(color.opposite());
            }
            return Outcome::Stalemate;
        }

        if in_check {
            Outcome::Check
        } else {
            Outcome::InProgress
        }
    }
}
