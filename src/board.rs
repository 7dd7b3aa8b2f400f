use itertools::Itertools;
use once_cell::sync::Lazy;

use crate::attacks::is_attacked;
use crate::error::ChessError;
use crate::movegen::MoveGenerator;
use crate::types::*;

pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static STARTING_POSITION: Lazy<Position> = Lazy::new(|| {
    Position::from_fen(STARTING_POSITION_FEN).expect("starting position FEN is valid")
});

const CASTLES: [(Color, CastleSide); 4] = [
    (Color::White, CastleSide::Kingside),
    (Color::White, CastleSide::Queenside),
    (Color::Black, CastleSide::Kingside),
    (Color::Black, CastleSide::Queenside),
];

/// Home square of the rook that castles on `side`
pub fn rook_home(color: Color, side: CastleSide) -> Square {
    Square::new(color.back_row(), side.rook_home_col())
}

/// The 8x8 grid. Row 0 is rank 8, so the array reads top to bottom like a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            cells: [[None; 8]; 8],
        }
    }

    /// `None` for empty and off-board squares alike
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        *self.cells.get(sq.row as usize)?.get(sq.col as usize)?
    }

    pub fn is_empty_at(&self, sq: Square) -> bool {
        self.piece_at(sq).is_none()
    }

    /// Panics when `sq` is off the board
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.cells[sq.row as usize][sq.col as usize] = piece;
    }

    /// Remove and return whatever stands on `sq`
    pub fn take(&mut self, sq: Square) -> Option<Piece> {
        self.cells[sq.row as usize][sq.col as usize].take()
    }

    /// Occupied squares, row by row from a8
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.is(color, PieceType::King))
            .map(|(sq, _)| sq)
    }
}

/// Everything the rules need to know about a game at one instant.
///
/// This is a plain `Copy` value: trying a move means copying the position,
/// applying the move to the copy and throwing the copy away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    board: Board,
    // who's move it is
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    // number of half moves played, the full move number is derived from it
    ply: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    pub fn new() -> Self {
        *STARTING_POSITION
    }

    pub fn from_fen(fen: &str) -> Result<Position, ChessError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&parts.len()) {
            return Err(ChessError::InvalidFen(format!(
                "expected 4 to 6 space delimited fields, got {}",
                parts.len()
            )));
        }

        let board = parse_placement(parts[0])?;
        for color in [Color::White, Color::Black] {
            let kings = board
                .pieces()
                .filter(|(_, p)| p.is(color, PieceType::King))
                .count();
            if kings > 1 {
                return Err(ChessError::InvalidFen(format!(
                    "{} has {} kings",
                    color.to_human(),
                    kings
                )));
            }
        }

        let mut side_chars = parts[1].chars();
        let side_to_move = match (side_chars.next(), side_chars.next()) {
            (Some(c), None) => Color::from_char(c)?,
            _ => {
                return Err(ChessError::InvalidFen(format!(
                    "bad side to move `{}`",
                    parts[1]
                )))
            }
        };

        let castling = CastlingRights::from_fen(parts[2])?;

        let en_passant = if parts[3] == "-" {
            None
        } else {
            let sq = Square::from_algebraic(parts[3])
                .map_err(|_| ChessError::InvalidFen(format!("bad en passant square `{}`", parts[3])))?;
            // the pawn that just double stepped stands right in front of the target
            let mover = side_to_move.other_color();
            let expected_row = mover.pawn_start_row() as i8 + mover.pawn_direction();
            let pawn_sq = sq.offset(mover.pawn_direction(), 0);
            let has_pawn = pawn_sq
                .and_then(|p| board.piece_at(p))
                .is_some_and(|p| p.is(mover, PieceType::Pawn));
            if sq.row as i8 != expected_row || !has_pawn {
                return Err(ChessError::InvalidFen(format!(
                    "en passant square `{}` does not follow a double pawn push",
                    parts[3]
                )));
            }
            Some(sq)
        };

        // the halfmove clock is not tracked, but it still has to be a number
        if let Some(halfmove) = parts.get(4) {
            halfmove
                .parse::<u32>()
                .map_err(|_| ChessError::InvalidFen(format!("bad halfmove clock `{halfmove}`")))?;
        }
        let fullmove: u32 = match parts.get(5) {
            Some(s) => s
                .parse()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ChessError::InvalidFen(format!("bad fullmove number `{s}`")))?,
            None => 1,
        };
        let ply = (fullmove - 1)
            .checked_mul(2)
            .and_then(|ply| ply.checked_add(if side_to_move == Color::Black { 1 } else { 0 }))
            .ok_or_else(|| {
                ChessError::InvalidFen(format!("fullmove number {fullmove} is too large"))
            })?;

        Ok(Position {
            board,
            side_to_move,
            castling,
            en_passant,
            ply,
        })
    }

    /// Single line export handed to the engine. The halfmove clock is always reported as 0.
    pub fn to_fen(&self) -> String {
        let placement = (0..8u8)
            .map(|row| {
                let mut rank = String::new();
                let mut empty = 0;
                for col in 0..8u8 {
                    match self.board.piece_at(Square::new(row, col)) {
                        Some(p) => {
                            if empty > 0 {
                                rank.push_str(&empty.to_string());
                                empty = 0;
                            }
                            rank.push(p.to_fen_char());
                        }
                        None => empty += 1,
                    }
                }
                if empty > 0 {
                    rank.push_str(&empty.to_string());
                }
                rank
            })
            .join("/");
        format!(
            "{} {} {} {} 0 {}",
            placement,
            self.side_to_move.to_char(),
            self.castling.to_fen(),
            self.en_passant
                .map(|sq| sq.to_algebraic())
                .unwrap_or_else(|| "-".to_string()),
            self.fullmove_number()
        )
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board.piece_at(sq)
    }

    /// Get the color of the side to move
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Starts at 1, and gets incremented after every black move
    pub fn fullmove_number(&self) -> u32 {
        1 + self.ply / 2
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.board.find_king(color)
    }

    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        is_attacked(&self.board, sq, by)
    }

    /// A side without a king on the board is never in check.
    pub fn is_in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .is_some_and(|king| self.is_square_attacked(king, color.other_color()))
    }

    pub fn pseudo_legal_moves(&self, from: Square) -> Vec<Square> {
        MoveGenerator::new(self).pseudo_legal_moves(from)
    }

    pub fn legal_moves(&self, from: Square) -> Vec<Square> {
        MoveGenerator::new(self).legal_moves(from)
    }

    pub fn legal_moves_for(&self, color: Color) -> Vec<Move> {
        MoveGenerator::new(self).legal_moves_for(color)
    }

    pub fn any_legal_moves(&self, color: Color) -> bool {
        MoveGenerator::new(self).any_legal_moves(color)
    }

    /// Commit `mv` to the position. Legality is the caller's business: this only requires
    /// a piece on the source square.
    ///
    /// Handles, in order: en passant removal, castling rook relocation, the move itself,
    /// promotion (queen unless told otherwise), the new en passant target, castling rights,
    /// and finally hands the turn over.
    pub fn apply_move(&mut self, mv: Move) -> Result<AppliedMove, ChessError> {
        if let Some(off_board) = [mv.from, mv.to].into_iter().find(|sq| !sq.is_on_board()) {
            return Err(ChessError::InvalidSquare(off_board.to_algebraic()));
        }
        let piece = self
            .board
            .piece_at(mv.from)
            .ok_or_else(|| ChessError::EmptySquare(mv.from.to_algebraic()))?;
        let color = piece.color;
        let mut captured = self.board.piece_at(mv.to);
        let mut move_flag = MoveFlag::Regular;

        if piece.piece_type == PieceType::Pawn
            && mv.from.col != mv.to.col
            && captured.is_none()
            && self.en_passant == Some(mv.to)
        {
            // the captured pawn sits one row behind the target, seen from the mover
            if let Some(passed_pawn) = mv.to.offset(-color.pawn_direction(), 0) {
                captured = self.board.take(passed_pawn);
            }
            move_flag = MoveFlag::EnPassantCapture;
        }

        self.board.set(mv.from, None);
        self.board.set(mv.to, Some(piece));

        if piece.piece_type == PieceType::King {
            if let Some(side) = CastleSide::from_king_move(mv.from, mv.to) {
                let rook = self.board.take(Square::new(mv.from.row, side.rook_home_col()));
                self.board
                    .set(Square::new(mv.from.row, side.rook_target_col()), rook);
                move_flag = match side {
                    CastleSide::Kingside => MoveFlag::CastleKingside,
                    CastleSide::Queenside => MoveFlag::CastleQueenside,
                };
            }
        }

        let mut promoted_to = None;
        if piece.piece_type == PieceType::Pawn && mv.to.row == color.promotion_row() {
            let promotion = mv
                .promotion
                .filter(|p| p.can_promote_to())
                .unwrap_or(PieceType::Queen);
            self.board.set(mv.to, Some(Piece::new(color, promotion)));
            promoted_to = Some(promotion);
        }

        self.en_passant = None;
        if piece.piece_type == PieceType::Pawn && mv.from.row.abs_diff(mv.to.row) == 2 {
            let passed = Square::new((mv.from.row + mv.to.row) / 2, mv.from.col);
            self.en_passant = Some(passed);
            move_flag = MoveFlag::DoublePawnPush(passed);
        }

        if piece.piece_type == PieceType::King {
            self.castling.revoke_all(color);
        }
        for (owner, side) in CASTLES {
            let home = rook_home(owner, side);
            let rook_left = mv.from == home;
            let rook_taken = mv.to == home
                && self.board.piece_at(home) != Some(Piece::new(owner, PieceType::Rook));
            if rook_left || rook_taken {
                self.castling.revoke(owner, side);
            }
        }

        self.side_to_move = color.other_color();
        self.ply = self.ply.saturating_add(1);

        Ok(AppliedMove {
            piece,
            from: mv.from,
            to: mv.to,
            captured,
            move_flag,
            promoted_to,
        })
    }

    pub fn draw_board(&self) -> String {
        self.draw_board_highlighting(None)
    }

    /// Board diagram with rank and file labels; the squares of `highlight` are bracketed.
    pub fn draw_board_highlighting(&self, highlight: Option<(Square, Square)>) -> String {
        let mut string = String::new();
        for row in 0..8u8 {
            string.push_str(&format!("{} ", 8 - row));
            for col in 0..8u8 {
                let sq = Square::new(row, col);
                let symbol = match self.board.piece_at(sq) {
                    Some(p) => p.to_symbol(),
                    None => ".",
                };
                if highlight.is_some_and(|(from, to)| from == sq || to == sq) {
                    string.push_str(&format!("[{symbol}]"));
                } else {
                    string.push_str(&format!(" {symbol} "));
                }
            }
            string.push('\n');
        }
        string.push_str("   a  b  c  d  e  f  g  h\n");
        string
    }

    pub fn draw_to_terminal(&self) {
        println!("{}", self.draw_board());
    }
}

fn parse_placement(placement: &str) -> Result<Board, ChessError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(ChessError::InvalidFen(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    let mut board = Board::empty();
    for (row, rank) in ranks.iter().enumerate() {
        let mut col = 0u8;
        for piece_char in rank.chars() {
            if let Some(skip) = piece_char.to_digit(10).filter(|d| (1..=8).contains(d)) {
                col += skip as u8;
            } else if let Some(piece) = Piece::from_fen_char(piece_char) {
                if col < 8 {
                    board.set(Square::new(row as u8, col), Some(piece));
                }
                col += 1;
            } else {
                return Err(ChessError::InvalidFen(format!(
                    "unexpected char `{piece_char}` in position string"
                )));
            }
            if col > 8 {
                return Err(ChessError::InvalidFen(format!(
                    "rank {} describes more than 8 squares",
                    8 - row
                )));
            }
        }
        if col != 8 {
            return Err(ChessError::InvalidFen(format!(
                "rank {} describes {} squares",
                8 - row,
                col
            )));
        }
    }
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn play(position: &mut Position, uci: &str) -> AppliedMove {
        let mv = crate::uci::parse_coordinate_move(uci).unwrap();
        position.apply_move(mv).unwrap()
    }

    #[test]
    fn build_starting_board() {
        let b = Position::new();
        // in the starting position all castles are enabled
        // (but not technically possible due to obstruction)
        assert_eq!(b.castling(), CastlingRights::ALL);
        assert_eq!(b.side_to_move(), Color::White);
        assert_eq!(b.en_passant(), None);
        assert_eq!(b.fullmove_number(), 1);

        assert_eq!(b.board().pieces().count(), 8 * 4);
        assert_eq!(
            b.board()
                .pieces()
                .filter(|(_, p)| p.piece_type == PieceType::Pawn)
                .count(),
            8 * 2
        );
        for pt in [PieceType::Rook, PieceType::Bishop, PieceType::Knight] {
            assert_eq!(b.board().pieces().filter(|(_, p)| p.piece_type == pt).count(), 4);
        }

        assert_eq!(b.king_square(Color::White), Some(sq("e1")));
        assert_eq!(b.king_square(Color::Black), Some(sq("e8")));
        assert_eq!(
            b.piece_at(sq("d8")),
            Some(Piece::new(Color::Black, PieceType::Queen))
        );
        assert_eq!(b.to_fen(), STARTING_POSITION_FEN);
    }

    #[test]
    fn fen_export_tracks_moves() {
        let mut b = Position::new();
        play(&mut b, "e2e4");
        assert_eq!(
            b.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        play(&mut b, "c7c5");
        play(&mut b, "g1f3");
        assert_eq!(
            b.to_fen(),
            "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 0 2"
        );
    }

    #[test]
    fn fen_import_reads_every_field() {
        let b = Position::from_fen("r3k2r/8/8/3pP3/8/8/8/R3K2R w Kq d6 0 12").unwrap();
        assert_eq!(b.side_to_move(), Color::White);
        assert!(b.castling().white_kingside);
        assert!(!b.castling().white_queenside);
        assert!(!b.castling().black_kingside);
        assert!(b.castling().black_queenside);
        assert_eq!(b.en_passant(), Some(sq("d6")));
        assert_eq!(b.fullmove_number(), 12);
        assert_eq!(b.ply(), 22);
    }

    #[test]
    fn fen_import_rejects_garbage() {
        for fen in [
            "",
            "8/8/8/8/8/8/8 w - - 0 1",
            "9/8/8/8/8/8/8/8 w - - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkz - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e6 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0",
            "4k3/8/8/8/8/8/8/K3K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/4K3 w - - 0 3000000000",
            "4k3/8/8/8/8/8/8/4K3 b - - 0 2147483649",
            "4k3/8/8/8/8/8/8/4K3 w - - 0 99999999999",
            "7k/8/8/8/8/8/8/K6 w - - 0 1",
            "k7Q/8/8/8/8/8/8/K7 w - - 0 1",
        ] {
            assert!(Position::from_fen(fen).is_err(), "`{fen}` should not parse");
        }
        let long_rank = format!("{}/8/8/8/8/8/8/8 w - - 0 1", "8".repeat(40));
        assert!(matches!(
            Position::from_fen(&long_rank),
            Err(ChessError::InvalidFen(_))
        ));
    }

    #[test]
    fn off_board_squares_are_refused() {
        let mut b = Position::new();
        let off_board = Square::new(8, 4);
        assert_eq!(b.piece_at(off_board), None);
        assert!(b.pseudo_legal_moves(off_board).is_empty());
        assert!(!b.is_square_attacked(off_board, Color::White));
        assert_eq!(
            b.apply_move(Move::new(sq("e2"), off_board)),
            Err(ChessError::InvalidSquare("(8,4)".to_string()))
        );
        assert_eq!(b, Position::new());
    }

    #[test]
    fn huge_fullmove_numbers_are_kept() {
        let mut b = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 2147483648").unwrap();
        assert_eq!(b.ply(), u32::MAX);
        play(&mut b, "e8d8");
        assert_eq!(b.fullmove_number(), 2147483648);
    }

    #[test]
    fn en_passant_capture_removes_the_passed_pawn() {
        // . . . . ♚ . . .
        // . . . ♟︎ . . . .
        // . . . . . . . .
        // . . . . ♙ . . .  <- d7d5, then exd6 e.p.
        let mut b = Position::from_fen("4k3/3p4/8/4P3/8/8/8/4K3 b - - 0 1").unwrap();
        let push = play(&mut b, "d7d5");
        assert_eq!(push.move_flag, MoveFlag::DoublePawnPush(sq("d6")));
        assert_eq!(b.en_passant(), Some(sq("d6")));

        let capture = play(&mut b, "e5d6");
        assert_eq!(capture.move_flag, MoveFlag::EnPassantCapture);
        assert_eq!(
            capture.captured,
            Some(Piece::new(Color::Black, PieceType::Pawn))
        );
        assert_eq!(b.piece_at(sq("d5")), None);
        assert_eq!(
            b.piece_at(sq("d6")),
            Some(Piece::new(Color::White, PieceType::Pawn))
        );
        assert_eq!(b.en_passant(), None);
    }

    #[test]
    fn en_passant_target_is_cleared_after_one_ply() {
        let mut b = Position::new();
        play(&mut b, "e2e4");
        assert_eq!(b.en_passant(), Some(sq("e3")));
        play(&mut b, "g8f6");
        assert_eq!(b.en_passant(), None);
    }

    #[test]
    fn castling_moves_the_rook_too() {
        let mut b = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let short = play(&mut b, "e1g1");
        assert_eq!(short.move_flag, MoveFlag::CastleKingside);
        assert_eq!(
            b.piece_at(sq("f1")),
            Some(Piece::new(Color::White, PieceType::Rook))
        );
        assert_eq!(b.piece_at(sq("h1")), None);
        assert!(!b.castling().white_kingside);
        assert!(!b.castling().white_queenside);

        let long = play(&mut b, "e8c8");
        assert_eq!(long.move_flag, MoveFlag::CastleQueenside);
        assert_eq!(
            b.piece_at(sq("d8")),
            Some(Piece::new(Color::Black, PieceType::Rook))
        );
        assert_eq!(b.piece_at(sq("a8")), None);
        assert_eq!(b.castling(), CastlingRights::NONE);
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let mut b = Position::from_fen("8/4P1k1/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let applied = play(&mut b, "e7e8");
        assert_eq!(applied.promoted_to, Some(PieceType::Queen));
        assert_eq!(
            b.piece_at(sq("e8")),
            Some(Piece::new(Color::White, PieceType::Queen))
        );
    }

    #[test]
    fn promotion_honours_an_explicit_choice() {
        let mut b = Position::from_fen("4k3/8/8/8/8/8/1p6/4K3 b - - 0 1").unwrap();
        let applied = play(&mut b, "b2b1n");
        assert_eq!(applied.promoted_to, Some(PieceType::Knight));
        assert_eq!(
            b.piece_at(sq("b1")),
            Some(Piece::new(Color::Black, PieceType::Knight))
        );
    }

    #[test]
    fn rook_moves_revoke_only_their_side() {
        let mut b = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        play(&mut b, "h1h5");
        assert!(!b.castling().white_kingside);
        assert!(b.castling().white_queenside);
        play(&mut b, "a8a1");
        // black rook left a8, and captured the white rook on a1
        assert!(!b.castling().black_queenside);
        assert!(!b.castling().white_queenside);
        assert!(b.castling().black_kingside);
    }

    #[test]
    fn castling_rights_are_never_restored() {
        let mut b = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        play(&mut b, "a1a2");
        play(&mut b, "h8h7");
        play(&mut b, "a2a1");
        play(&mut b, "h7h8");
        assert_eq!(b.castling().to_fen(), "Kq");
        assert_eq!(
            b.piece_at(sq("a1")),
            Some(Piece::new(Color::White, PieceType::Rook))
        );
    }

    #[test]
    fn apply_from_empty_square_is_rejected() {
        let mut b = Position::new();
        let before = b;
        assert_eq!(
            b.apply_move(Move::new(sq("e4"), sq("e5"))),
            Err(ChessError::EmptySquare("e4".to_string()))
        );
        assert_eq!(b, before);
    }

    #[test]
    fn draw_board_has_labels() {
        let drawing = Position::new().draw_board();
        assert!(drawing.starts_with("8 "));
        assert!(drawing.ends_with("   a  b  c  d  e  f  g  h\n"));
        assert_eq!(drawing.lines().count(), 9);
    }
}
