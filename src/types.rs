use std::fmt;

use itertools::iproduct;

use crate::error::ChessError;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn from_char(c: char) -> Result<Color, ChessError> {
        match c {
            'w' => Ok(Color::White),
            'b' => Ok(Color::Black),
            other => Err(ChessError::InvalidFen(format!(
                "side to move must be either `w` or `b`, got `{other}`"
            ))),
        }
    }

    /// Uppercase piece letters are white, lowercase are black.
    pub fn from_case(c: char) -> Color {
        if c.is_uppercase() {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn other_color(&self) -> Color {
        if *self == Color::White {
            Color::Black
        } else {
            Color::White
        }
    }

    pub fn to_human(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }

    /// Row delta of a pawn step. White advances towards row 0.
    pub fn pawn_direction(&self) -> i8 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }

    /// Row the pawns of this color start on
    pub fn pawn_start_row(&self) -> u8 {
        match self {
            Self::White => 6,
            Self::Black => 1,
        }
    }

    /// Row on which a pawn of this color promotes
    pub fn promotion_row(&self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    /// Row holding this color's king and rooks at the start
    pub fn back_row(&self) -> u8 {
        match self {
            Self::White => 7,
            Self::Black => 0,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PieceType {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceType {
    /// Case insensitive, `None` for anything that is not one of `prnbqk`.
    pub fn from_char(c: char) -> Option<PieceType> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'r' => Some(PieceType::Rook),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }

    pub fn can_promote_to(&self) -> bool {
        PIECES_CAN_PROMOTE_TO.contains(self)
    }

    pub fn to_human(&self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Rook => "rook",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Rook => 'R',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }
}

pub const PIECES_CAN_PROMOTE_TO: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Piece {
    pub color: Color,
    pub piece_type: PieceType,
}

impl Piece {
    pub fn new(color: Color, piece_type: PieceType) -> Self {
        Self { color, piece_type }
    }

    /// Piece from its FEN letter, eg `K` is the white king and `p` a black pawn
    pub fn from_fen_char(c: char) -> Option<Piece> {
        PieceType::from_char(c).map(|piece_type| Piece {
            color: Color::from_case(c),
            piece_type,
        })
    }

    pub fn to_fen_char(&self) -> char {
        let c = self.piece_type.to_char();
        match self.color {
            Color::White => c,
            Color::Black => c.to_ascii_lowercase(),
        }
    }

    pub fn to_symbol(&self) -> &'static str {
        let is_white = self.color == Color::White;
        match self.piece_type {
            PieceType::Pawn => {
                if is_white {
                    "♙"
                } else {
                    "♟︎"
                }
            }
            PieceType::Rook => {
                if is_white {
                    "♖"
                } else {
                    "♜"
                }
            }
            PieceType::Knight => {
                if is_white {
                    "♘"
                } else {
                    "♞"
                }
            }
            PieceType::Bishop => {
                if is_white {
                    "♗"
                } else {
                    "♝"
                }
            }
            PieceType::Queen => {
                if is_white {
                    "♕"
                } else {
                    "♛"
                }
            }
            PieceType::King => {
                if is_white {
                    "♔"
                } else {
                    "♚"
                }
            }
        }
    }

    pub fn is(&self, color: Color, piece_type: PieceType) -> bool {
        self.color == color && self.piece_type == piece_type
    }
}

/// A square of the board. Row 0 is black's back rank (rank 8), column 0 is the a-file.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub const fn new(row: u8, col: u8) -> Square {
        Square { row, col }
    }

    /// `None` when the coordinates fall off the board
    pub fn try_new(row: i8, col: i8) -> Option<Square> {
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Square> {
        Square::try_new(self.row as i8 + d_row, self.col as i8 + d_col)
    }

    pub fn from_algebraic(s: &str) -> Result<Square, ChessError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ChessError::InvalidSquare(s.to_string()));
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(ChessError::InvalidSquare(s.to_string()));
        }
        Ok(Square {
            row: 8 - (rank - b'0'),
            col: file - b'a',
        })
    }

    /// `Square::new` does not check its coordinates, so squares coming from outside
    /// the crate may not be on the board
    pub fn is_on_board(&self) -> bool {
        self.row < 8 && self.col < 8
    }

    pub fn to_algebraic(&self) -> String {
        if !self.is_on_board() {
            return format!("({},{})", self.row, self.col);
        }
        format!("{}{}", self.file_char(), 8 - self.row)
    }

    pub fn file_char(&self) -> char {
        (b'a' + self.col) as char
    }

    pub fn index(&self) -> usize {
        self.row as usize * 8 + self.col as usize
    }

    pub fn from_index(index: usize) -> Square {
        Square {
            row: (index / 8) as u8,
            col: (index % 8) as u8,
        }
    }

    /// All 64 squares, row by row starting at a8
    pub fn all() -> impl Iterator<Item = Square> {
        iproduct!(0..8u8, 0..8u8).map(|(row, col)| Square { row, col })
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum CastleSide {
    Kingside,
    Queenside,
}

impl CastleSide {
    pub fn rook_home_col(&self) -> u8 {
        match self {
            Self::Kingside => 7,
            Self::Queenside => 0,
        }
    }

    pub fn king_target_col(&self) -> u8 {
        match self {
            Self::Kingside => 6,
            Self::Queenside => 2,
        }
    }

    pub fn rook_target_col(&self) -> u8 {
        match self {
            Self::Kingside => 5,
            Self::Queenside => 3,
        }
    }

    /// Side of a king move that travels two columns, `None` otherwise
    pub fn from_king_move(from: Square, to: Square) -> Option<CastleSide> {
        match to.col as i8 - from.col as i8 {
            2 => Some(Self::Kingside),
            -2 => Some(Self::Queenside),
            _ => None,
        }
    }
}

/// The four castling rights. Once revoked, a right is never granted again.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    pub const NONE: CastlingRights = CastlingRights {
        white_kingside: false,
        white_queenside: false,
        black_kingside: false,
        black_queenside: false,
    };

    pub fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::Kingside) => self.white_kingside,
            (Color::White, CastleSide::Queenside) => self.white_queenside,
            (Color::Black, CastleSide::Kingside) => self.black_kingside,
            (Color::Black, CastleSide::Queenside) => self.black_queenside,
        }
    }

    pub fn revoke(&mut self, color: Color, side: CastleSide) {
        match (color, side) {
            (Color::White, CastleSide::Kingside) => self.white_kingside = false,
            (Color::White, CastleSide::Queenside) => self.white_queenside = false,
            (Color::Black, CastleSide::Kingside) => self.black_kingside = false,
            (Color::Black, CastleSide::Queenside) => self.black_queenside = false,
        }
    }

    pub fn revoke_all(&mut self, color: Color) {
        self.revoke(color, CastleSide::Kingside);
        self.revoke(color, CastleSide::Queenside);
    }

    pub fn from_fen(s: &str) -> Result<CastlingRights, ChessError> {
        if s == "-" {
            return Ok(CastlingRights::NONE);
        }
        let mut rights = CastlingRights::NONE;
        for c in s.chars() {
            match c {
                'K' => rights.white_kingside = true,
                'Q' => rights.white_queenside = true,
                'k' => rights.black_kingside = true,
                'q' => rights.black_queenside = true,
                other => {
                    return Err(ChessError::InvalidFen(format!(
                        "unexpected castling character `{other}`"
                    )))
                }
            }
        }
        Ok(rights)
    }

    pub fn to_fen(&self) -> String {
        let mut s = String::new();
        if self.white_kingside {
            s.push('K');
        }
        if self.white_queenside {
            s.push('Q');
        }
        if self.black_kingside {
            s.push('k');
        }
        if self.black_queenside {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// Terminal status of a game. A game still in progress has no status.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// Contains the winner
    Checkmate(Color),
    Stalemate,
    /// Contains the winner, the loser's flag fell
    TimeForfeit(Color),
}

impl Status {
    pub fn to_human(&self) -> String {
        match self {
            Status::Checkmate(winner) => format!("{} wins by checkmate", winner.to_human()),
            Status::Stalemate => "draw by stalemate".to_string(),
            Status::TimeForfeit(winner) => format!("{} wins on time", winner.to_human()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveFlag {
    Regular,
    CastleKingside,
    CastleQueenside,
    /// Double pawn push. Contains the en passant square
    DoublePawnPush(Square),
    EnPassantCapture,
}

/// A move as requested by a caller: source, destination and an optional promotion choice.
/// Everything else about the move is derived when it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(from: Square, to: Square, promotion: PieceType) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    /// Coordinate notation, eg `e2e4` or `e7e8q`
    pub fn to_uci(&self) -> String {
        format!(
            "{}{}{}",
            self.from.to_algebraic(),
            self.to.to_algebraic(),
            match self.promotion {
                Some(p) => p.to_char().to_ascii_lowercase().to_string(),
                None => "".to_string(),
            }
        )
    }
}

/// What actually happened when a move was applied to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMove {
    pub piece: Piece,
    pub from: Square,
    pub to: Square,
    pub captured: Option<Piece>,
    pub move_flag: MoveFlag,
    pub promoted_to: Option<PieceType>,
}

impl AppliedMove {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    pub fn castle_side(&self) -> Option<CastleSide> {
        match self.move_flag {
            MoveFlag::CastleKingside => Some(CastleSide::Kingside),
            MoveFlag::CastleQueenside => Some(CastleSide::Queenside),
            _ => None,
        }
    }

    pub fn to_human(&self) -> String {
        if let Some(side) = self.castle_side() {
            return format!(
                "{} castles {}",
                self.piece.color.to_human(),
                match side {
                    CastleSide::Kingside => "kingside",
                    CastleSide::Queenside => "queenside",
                }
            );
        }
        let maybe_capture_str = match self.captured {
            Some(p) => format!(" capturing {} {}", p.color.to_human(), p.piece_type.to_human()),
            None => "".to_string(),
        };
        let maybe_en_passant_str = if self.move_flag == MoveFlag::EnPassantCapture {
            " en passant"
        } else {
            ""
        };
        let maybe_promotion_str = match self.promoted_to {
            Some(promoted_to_type) => format!(" promoting to {}", promoted_to_type.to_human()),
            None => "".to_string(),
        };
        format!(
            "{} moves {} from {} to {}{}{}{}",
            self.piece.color.to_human(),
            self.piece.piece_type.to_human(),
            self.from.to_algebraic(),
            self.to.to_algebraic(),
            maybe_capture_str,
            maybe_en_passant_str,
            maybe_promotion_str,
        )
    }
}
