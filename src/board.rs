use std::fmt;
use std::str::FromStr;

use crate::error::BoardError;
use crate::movegen::Move;

/// Piece placement of a freshly started game, rank 8 (row 0) first.
pub const INITIAL_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Piece {
    /// Uppercase letter for white, lowercase for black.
    pub fn to_char(self, color: Color) -> char {
        let c = match self {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_char(c: char) -> Option<(Piece, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece = match c.to_ascii_lowercase() {
            'p' => Piece::Pawn,
            'n' => Piece::Knight,
            'b' => Piece::Bishop,
            'r' => Piece::Rook,
            'q' => Piece::Queen,
            'k' => Piece::King,
            _ => return None,
        };
        Some((piece, color))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row a pawn of this color starts on.
    pub fn pawn_row(&self) -> u8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Row a pawn of this color promotes on.
    pub fn promotion_row(&self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Row step a pawn of this color advances by.
    pub fn forward(&self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

/// A board coordinate. Row 0 is black's back rank (rank 8), row 7 is white's.
///
/// Every constructor checks bounds, so a `Square` is always on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    row: u8,
    col: u8,
}

impl Square {
    /// Returns `None` when either coordinate is off the board.
    pub fn new(row: u8, col: u8) -> Option<Self> {
        if row < 8 && col < 8 {
            Some(Self { row, col })
        } else {
            None
        }
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    pub fn offset(&self, dr: i8, dc: i8) -> Option<Square> {
        let row = self.row as i8 + dr;
        let col = self.col as i8 + dc;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|row| (0..8u8).map(move |col| Square { row, col }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, 8 - self.row)
    }
}

impl FromStr for Square {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(BoardError::InvalidSquare(s.to_string()));
        }

        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(BoardError::InvalidSquare(s.to_string()));
        }

        Ok(Square {
            row: b'8' - rank,
            col: file - b'a',
        })
    }
}

/// An 8x8 grid of optional pieces. Holds no turn information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [[Option<(Piece, Color)>; 8]; 8],
}

impl Board {
    /// The standard starting layout.
    pub fn new() -> Self {
        let mut board = Self::empty();
        let back_rank = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (col, &piece) in back_rank.iter().enumerate() {
            board.squares[0][col] = Some((piece, Color::Black));
            board.squares[1][col] = Some((Piece::Pawn, Color::Black));
            board.squares[6][col] = Some((Piece::Pawn, Color::White));
            board.squares[7][col] = Some((piece, Color::White));
        }
        board
    }

    pub fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
        }
    }

    /// Parses the piece-placement field of a FEN string, rank 8 first.
    pub fn from_placement(placement: &str) -> Result<Self, BoardError> {
        let ranks: Vec<&str> = placement.trim().split('/').collect();
        if ranks.len() != 8 {
            return Err(BoardError::InvalidPlacement {
                message: format!("expected 8 ranks, found {}", ranks.len()),
            });
        }

        let mut board = Self::empty();
        for (row, rank) in ranks.iter().enumerate() {
            let mut col = 0usize;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col += skip as usize;
                } else {
                    let piece = Piece::from_char(c).ok_or(BoardError::InvalidPiece(c))?;
                    if col >= 8 {
                        return Err(BoardError::InvalidPlacement {
                            message: format!("rank {} overflows", 8 - row),
                        });
                    }
                    board.squares[row][col] = Some(piece);
                    col += 1;
                }
            }
            if col != 8 {
                return Err(BoardError::InvalidPlacement {
                    message: format!("rank {} has {} files", 8 - row, col),
                });
            }
        }
        Ok(board)
    }

    pub fn get_piece_at(&self, square: Square) -> Option<(Piece, Color)> {
        self.squares[square.row as usize][square.col as usize]
    }

    pub fn color_at(&self, square: Square) -> Option<Color> {
        self.get_piece_at(square).map(|(_, color)| color)
    }

    pub fn set_piece(&mut self, square: Square, piece: Piece, color: Color) {
        self.squares[square.row as usize][square.col as usize] = Some((piece, color));
    }

    pub fn remove_piece(&mut self, square: Square) -> Option<(Piece, Color)> {
        self.squares[square.row as usize][square.col as usize].take()
    }

    pub fn make_move(&mut self, mv: &Move) {
        self.move_piece(mv.from, mv.to);
    }

    /// Moves whatever stands on `from` to `to`, replacing any occupant.
    /// A pawn landing on its far rank becomes a queen.
    pub fn move_piece(&mut self, from: Square, to: Square) {
        let Some((piece, color)) = self.remove_piece(from) else {
            return;
        };

        let placed = if piece == Piece::Pawn && to.row() == color.promotion_row() {
            Piece::Queen
        } else {
            piece
        };
        self.set_piece(to, placed, color);
    }

    /// Every occupied square holding a piece of `color`, in row-major order.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |square| match self.get_piece_at(square) {
            Some((piece, c)) if c == color => Some((square, piece)),
            _ => None,
        })
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.pieces(color)
            .find(|&(_, piece)| piece == Piece::King)
            .map(|(square, _)| square)
    }

    pub fn count_kings(&self, color: Color) -> usize {
        self.pieces(color)
            .filter(|&(_, piece)| piece == Piece::King)
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = String::new();
        for row in 0..8u8 {
            result.push((b'8' - row) as char);
            result.push(' ');
            for col in 0..8u8 {
                let square = Square { row, col };
                match self.get_piece_at(square) {
                    Some((piece, color)) => result.push(piece.to_char(color)),
                    None => result.push('.'),
                }
                if col < 7 {
                    result.push(' ');
                }
            }
            result.push('\n');
        }
        result.push_str("  a b c d e f g h\n");
        write!(f, "{}", result)
    }
}
