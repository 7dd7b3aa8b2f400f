//! Line level helpers for talking UCI to an external engine.
//!
//! Only the handful of messages a GUI needs: set a position by FEN, search for a fixed
//! time, limit strength, and read back `bestmove`.

use crate::error::ChessError;
use crate::types::{Move, PieceType, Square};

/// Best move token from a `bestmove <move> [ponder <move>]` line.
/// `None` for any other line.
pub fn parse_bestmove(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some("bestmove"), Some(mv)) => Some(mv.to_string()),
        _ => None,
    }
}

/// Coordinate notation as engines emit it: `e2e4`, or `e7e8q` with a promotion letter.
pub fn parse_coordinate_move(s: &str) -> Result<Move, ChessError> {
    let s = s.trim();
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(ChessError::InvalidCoordinateMove(s.to_string()));
    }
    let invalid = |_| ChessError::InvalidCoordinateMove(s.to_string());
    let from = Square::from_algebraic(&s[0..2]).map_err(invalid)?;
    let to = Square::from_algebraic(&s[2..4]).map_err(invalid)?;
    match s.chars().nth(4) {
        None => Ok(Move::new(from, to)),
        Some(c) => {
            let promotion = PieceType::from_char(c)
                .filter(|p| p.can_promote_to())
                .ok_or(ChessError::InvalidPromotion(c))?;
            Ok(Move::with_promotion(from, to, promotion))
        }
    }
}

pub fn position_command(fen: &str) -> String {
    format!("position fen {}", fen)
}

pub fn go_movetime_command(movetime_ms: u64) -> String {
    format!("go movetime {}", movetime_ms)
}

/// Commands limiting the engine to roughly `elo` strength
pub fn elo_commands(elo: u16) -> [String; 2] {
    [
        "setoption name UCI_LimitStrength value true".to_string(),
        format!("setoption name UCI_Elo value {}", elo),
    ]
}
