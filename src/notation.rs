use itertools::Itertools;

use crate::types::*;

/// One line of the move list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Full move number the move belongs to
    pub number: u32,
    pub color: Color,
    pub piece: Piece,
    pub from: Square,
    pub to: Square,
    /// Short algebraic, without disambiguation. eg `Nf3`, `exd5`, `e8=Q#`, `O-O`
    pub san: String,
    /// `e2-e4`, or `e4xd5` for captures
    pub coordinate: String,
}

impl MoveRecord {
    pub fn new(number: u32, applied: &AppliedMove, gives_check: bool, gives_mate: bool) -> Self {
        Self {
            number,
            color: applied.piece.color,
            piece: applied.piece,
            from: applied.from,
            to: applied.to,
            san: san(applied, gives_check, gives_mate),
            coordinate: format!(
                "{}{}{}",
                applied.from,
                if applied.is_capture() { 'x' } else { '-' },
                applied.to
            ),
        }
    }
}

pub fn san(applied: &AppliedMove, gives_check: bool, gives_mate: bool) -> String {
    let mut san = match applied.castle_side() {
        Some(CastleSide::Kingside) => "O-O".to_string(),
        Some(CastleSide::Queenside) => "O-O-O".to_string(),
        None => {
            let mut s = String::new();
            let is_pawn = applied.piece.piece_type == PieceType::Pawn;
            if !is_pawn {
                s.push(applied.piece.piece_type.to_char());
            }
            if applied.is_capture() {
                if is_pawn {
                    s.push(applied.from.file_char());
                }
                s.push('x');
            }
            s.push_str(&applied.to.to_algebraic());
            if let Some(promoted) = applied.promoted_to {
                s.push('=');
                s.push(promoted.to_char());
            }
            s
        }
    };
    if gives_mate {
        san.push('#');
    } else if gives_check {
        san.push('+');
    }
    san
}

/// Plain text move list, one row per full move: `1. e4 e5`.
/// A row that starts with black's move reads `1... e5`.
pub fn format_move_list(records: &[MoveRecord]) -> String {
    records
        .iter()
        .group_by(|r| r.number)
        .into_iter()
        .map(|(number, row)| {
            let row: Vec<&MoveRecord> = row.collect();
            let dots = if row[0].color == Color::Black { "..." } else { "." };
            format!(
                "{}{} {}",
                number,
                dots,
                row.iter().map(|r| r.san.as_str()).join(" ")
            )
        })
        .join("\n")
}
