use crate::attacks::{first_blocker, ATTACK_TABLES};
use crate::board::{rook_home, Position};
use crate::types::*;

/// Upper bound on the number of legal moves in any position
const MAX_MOVES: usize = 218;

/// Move generation over a borrowed position.
///
/// Pseudo-legal moves follow the movement rules of each piece (castling conditions
/// included) without looking at the mover's own king. Legal moves are the pseudo-legal
/// ones that do not leave that king attacked.
pub struct MoveGenerator<'a> {
    position: &'a Position,
}

impl<'a> MoveGenerator<'a> {
    pub fn new(position: &'a Position) -> Self {
        Self { position }
    }

    /// Destinations reachable by the piece on `from`, ignoring the safety of its king.
    /// Empty when `from` is empty.
    pub fn pseudo_legal_moves(&self, from: Square) -> Vec<Square> {
        let Some(piece) = self.position.piece_at(from) else {
            return Vec::new();
        };
        let mut targets = Vec::with_capacity(27);
        match piece.piece_type {
            PieceType::Pawn => self.pawn_targets(from, piece.color, &mut targets),
            PieceType::Knight => {
                self.jump_targets(ATTACK_TABLES.knight_targets(from), piece.color, &mut targets)
            }
            PieceType::King => {
                self.jump_targets(ATTACK_TABLES.king_targets(from), piece.color, &mut targets);
                self.castling_targets(from, piece.color, &mut targets);
            }
            PieceType::Rook | PieceType::Bishop | PieceType::Queen => {
                let rays = ATTACK_TABLES.rays(from);
                if piece.piece_type != PieceType::Bishop {
                    for ray in rays.orthogonal() {
                        self.slide_targets(ray, piece.color, &mut targets);
                    }
                }
                if piece.piece_type != PieceType::Rook {
                    for ray in rays.diagonal() {
                        self.slide_targets(ray, piece.color, &mut targets);
                    }
                }
            }
        }
        targets
    }

    /// Pseudo-legal destinations after which the mover's king is not attacked
    pub fn legal_moves(&self, from: Square) -> Vec<Square> {
        self.pseudo_legal_moves(from)
            .into_iter()
            .filter(|&to| self.leaves_king_safe(Move::new(from, to)))
            .collect()
    }

    /// Every legal move of `color`, with each promoting pawn move listed once per
    /// promotion piece.
    pub fn legal_moves_for(&self, color: Color) -> Vec<Move> {
        let mut moves = Vec::with_capacity(MAX_MOVES);
        for (from, piece) in self.position.board().pieces() {
            if piece.color != color {
                continue;
            }
            let promotes = piece.piece_type == PieceType::Pawn;
            for to in self.legal_moves(from) {
                if promotes && to.row == color.promotion_row() {
                    moves.extend(
                        PIECES_CAN_PROMOTE_TO
                            .iter()
                            .map(|&p| Move::with_promotion(from, to, p)),
                    );
                } else {
                    moves.push(Move::new(from, to));
                }
            }
        }
        moves
    }

    /// Stops at the first legal move found
    pub fn any_legal_moves(&self, color: Color) -> bool {
        self.position
            .board()
            .pieces()
            .filter(|(_, piece)| piece.color == color)
            .any(|(from, _)| {
                self.pseudo_legal_moves(from)
                    .into_iter()
                    .any(|to| self.leaves_king_safe(Move::new(from, to)))
            })
    }

    /// Play the move on a scratch copy and look at the mover's king
    fn leaves_king_safe(&self, mv: Move) -> bool {
        let mut scratch = *self.position;
        match scratch.apply_move(mv) {
            Ok(applied) => !scratch.is_in_check(applied.piece.color),
            Err(_) => false,
        }
    }

    fn pawn_targets(&self, from: Square, color: Color, targets: &mut Vec<Square>) {
        let dir = color.pawn_direction();
        if let Some(one) = from.offset(dir, 0).filter(|&sq| self.is_empty(sq)) {
            targets.push(one);
            if from.row == color.pawn_start_row() {
                if let Some(two) = one.offset(dir, 0).filter(|&sq| self.is_empty(sq)) {
                    targets.push(two);
                }
            }
        }

        for d_col in [-1, 1] {
            let Some(to) = from.offset(dir, d_col) else {
                continue;
            };
            match self.position.piece_at(to) {
                Some(target) if target.color != color => targets.push(to),
                Some(_) => {}
                None if self.is_en_passant_capture(to, color) => targets.push(to),
                None => {}
            }
        }
    }

    /// The target must be the current en passant square, and the pawn that just
    /// double stepped must still be standing behind it.
    fn is_en_passant_capture(&self, to: Square, color: Color) -> bool {
        color == self.position.side_to_move()
            && self.position.en_passant() == Some(to)
            && to
                .offset(-color.pawn_direction(), 0)
                .and_then(|sq| self.position.piece_at(sq))
                .is_some_and(|p| p.is(color.other_color(), PieceType::Pawn))
    }

    fn jump_targets(&self, candidates: &[Square], color: Color, targets: &mut Vec<Square>) {
        targets.extend(
            candidates
                .iter()
                .copied()
                .filter(|&sq| self.position.piece_at(sq).map_or(true, |p| p.color != color)),
        );
    }

    fn slide_targets(&self, ray: &[Square], color: Color, targets: &mut Vec<Square>) {
        match first_blocker(self.position.board(), ray) {
            Some((blocker_sq, blocker)) => {
                targets.extend(ray.iter().copied().take_while(|&sq| sq != blocker_sq));
                if blocker.color != color {
                    targets.push(blocker_sq);
                }
            }
            None => targets.extend_from_slice(ray),
        }
    }

    /// King on its home square, the right still held, the rook at home, nothing in
    /// between, and neither the king's square nor the two squares it crosses attacked.
    fn castling_targets(&self, from: Square, color: Color, targets: &mut Vec<Square>) {
        let home = Square::new(color.back_row(), 4);
        if from != home {
            return;
        }
        let enemy = color.other_color();
        if self.position.is_square_attacked(home, enemy) {
            return;
        }

        for side in [CastleSide::Kingside, CastleSide::Queenside] {
            if !self.position.castling().has(color, side) {
                continue;
            }
            let rook_sq = rook_home(color, side);
            if self.position.piece_at(rook_sq) != Some(Piece::new(color, PieceType::Rook)) {
                continue;
            }

            let (low, high) = if rook_sq.col < home.col {
                (rook_sq.col + 1, home.col)
            } else {
                (home.col + 1, rook_sq.col)
            };
            let path_clear = (low..high).all(|col| self.is_empty(Square::new(home.row, col)));
            if !path_clear {
                continue;
            }

            let transit = Square::new(home.row, side.rook_target_col());
            let target = Square::new(home.row, side.king_target_col());
            if self.position.is_square_attacked(transit, enemy)
                || self.position.is_square_attacked(target, enemy)
            {
                continue;
            }
            targets.push(target);
        }
    }

    fn is_empty(&self, sq: Square) -> bool {
        self.position.board().is_empty_at(sq)
    }
}
