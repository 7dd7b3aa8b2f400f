use once_cell::sync::Lazy;

use crate::board::Board;
use crate::types::*;

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

pub const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Squares reachable from a square along each of the 8 directions, closest first.
/// North is towards rank 8.
#[derive(Debug, Clone, Default)]
pub struct RaysFromSquare {
    pub north: Vec<Square>,
    pub south: Vec<Square>,
    pub east: Vec<Square>,
    pub west: Vec<Square>,
    pub northeast: Vec<Square>,
    pub northwest: Vec<Square>,
    pub southeast: Vec<Square>,
    pub southwest: Vec<Square>,
}

impl RaysFromSquare {
    fn new(sq: Square) -> Self {
        let ray = |d_row: i8, d_col: i8| {
            let mut squares = Vec::with_capacity(7);
            let mut current = sq;
            while let Some(next) = current.offset(d_row, d_col) {
                squares.push(next);
                current = next;
            }
            squares
        };
        Self {
            north: ray(-1, 0),
            south: ray(1, 0),
            east: ray(0, 1),
            west: ray(0, -1),
            northeast: ray(-1, 1),
            northwest: ray(-1, -1),
            southeast: ray(1, 1),
            southwest: ray(1, -1),
        }
    }

    /// Rook directions
    pub fn orthogonal(&self) -> [&[Square]; 4] {
        [&self.north, &self.south, &self.east, &self.west]
    }

    /// Bishop directions
    pub fn diagonal(&self) -> [&[Square]; 4] {
        [
            &self.northeast,
            &self.northwest,
            &self.southeast,
            &self.southwest,
        ]
    }
}

/// Per-square lookups computed once on first use, indexed by `Square::index`.
pub struct AttackTables {
    pub rays: Vec<RaysFromSquare>,
    pub knight: Vec<Vec<Square>>,
    pub king: Vec<Vec<Square>>,
}

impl AttackTables {
    fn new() -> Self {
        let jumps = |sq: Square, offsets: &[(i8, i8)]| -> Vec<Square> {
            offsets
                .iter()
                .filter_map(|&(d_row, d_col)| sq.offset(d_row, d_col))
                .collect()
        };
        let squares: Vec<Square> = (0..64).map(Square::from_index).collect();
        AttackTables {
            rays: squares.iter().map(|&sq| RaysFromSquare::new(sq)).collect(),
            knight: squares.iter().map(|&sq| jumps(sq, &KNIGHT_OFFSETS)).collect(),
            king: squares.iter().map(|&sq| jumps(sq, &KING_OFFSETS)).collect(),
        }
    }

    pub fn rays(&self, sq: Square) -> &RaysFromSquare {
        &self.rays[sq.index()]
    }

    pub fn knight_targets(&self, sq: Square) -> &[Square] {
        &self.knight[sq.index()]
    }

    pub fn king_targets(&self, sq: Square) -> &[Square] {
        &self.king[sq.index()]
    }
}

pub static ATTACK_TABLES: Lazy<AttackTables> = Lazy::new(AttackTables::new);

/// First occupied square along a ray, if any
pub fn first_blocker(board: &Board, ray: &[Square]) -> Option<(Square, Piece)> {
    ray.iter()
        .find_map(|&sq| board.piece_at(sq).map(|piece| (sq, piece)))
}

/// Is `square` attacked by any piece of color `by`?
///
/// Pawns attack diagonally forward only, so they are looked up one row *behind* the
/// square from the attacker's point of view. Castling and en passant never attack.
pub fn is_attacked(board: &Board, square: Square, by: Color) -> bool {
    if !square.is_on_board() {
        return false;
    }
    let tables = &*ATTACK_TABLES;
    let holds = |sq: Square, piece_type: PieceType| {
        board
            .piece_at(sq)
            .is_some_and(|p| p.is(by, piece_type))
    };

    let pawn_attack = [-1, 1].into_iter().any(|d_col| {
        square
            .offset(-by.pawn_direction(), d_col)
            .is_some_and(|sq| holds(sq, PieceType::Pawn))
    });
    if pawn_attack {
        return true;
    }

    if tables
        .knight_targets(square)
        .iter()
        .any(|&sq| holds(sq, PieceType::Knight))
    {
        return true;
    }

    if tables
        .king_targets(square)
        .iter()
        .any(|&sq| holds(sq, PieceType::King))
    {
        return true;
    }

    let rays = tables.rays(square);
    let slider_hit = |ray: &[Square], line_piece: PieceType| {
        matches!(
            first_blocker(board, ray),
            Some((_, p)) if p.color == by && (p.piece_type == line_piece || p.piece_type == PieceType::Queen)
        )
    };
    rays.orthogonal()
        .into_iter()
        .any(|ray| slider_hit(ray, PieceType::Rook))
        || rays
            .diagonal()
            .into_iter()
            .any(|ray| slider_hit(ray, PieceType::Bishop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn ray_lengths_from_corner_and_center() {
        let a1 = ATTACK_TABLES.rays(sq("a1"));
        assert_eq!(a1.north.len(), 7);
        assert_eq!(a1.east.len(), 7);
        assert_eq!(a1.northeast.len(), 7);
        assert!(a1.south.is_empty());
        assert!(a1.west.is_empty());
        assert_eq!(a1.north[0], sq("a2"));

        let d4 = ATTACK_TABLES.rays(sq("d4"));
        assert_eq!(d4.north.len(), 4);
        assert_eq!(d4.south.len(), 3);
        assert_eq!(d4.east.len(), 4);
        assert_eq!(d4.west.len(), 3);
    }

    #[test]
    fn knight_and_king_jumps() {
        assert_eq!(ATTACK_TABLES.knight_targets(sq("a1")).len(), 2);
        assert_eq!(ATTACK_TABLES.knight_targets(sq("e4")).len(), 8);
        assert_eq!(ATTACK_TABLES.king_targets(sq("h8")).len(), 3);
        assert_eq!(ATTACK_TABLES.king_targets(sq("e4")).len(), 8);
    }

    #[test]
    fn pawns_attack_diagonally_forward() {
        let p = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        // white pawn e4 hits d5 and f5
        assert!(p.is_square_attacked(sq("d5"), Color::White));
        assert!(p.is_square_attacked(sq("f5"), Color::White));
        assert!(!p.is_square_attacked(sq("e5"), Color::White));
        // black pawn d5 hits c4 and e4, not d4
        assert!(p.is_square_attacked(sq("e4"), Color::Black));
        assert!(p.is_square_attacked(sq("c4"), Color::Black));
        assert!(!p.is_square_attacked(sq("d4"), Color::Black));
    }

    #[test]
    fn sliders_are_blocked() {
        // rook a1, bishop c1 on the white side; black knight on a4 blocks the file
        let p = Position::from_fen("4k3/8/8/8/n7/8/8/R1B1K3 w - - 0 1").unwrap();
        assert!(p.is_square_attacked(sq("a3"), Color::White));
        assert!(p.is_square_attacked(sq("a4"), Color::White));
        assert!(!p.is_square_attacked(sq("a5"), Color::White));
        assert!(p.is_square_attacked(sq("h6"), Color::White));
        assert!(p.is_square_attacked(sq("b1"), Color::White));
        assert_eq!(
            first_blocker(p.board(), &ATTACK_TABLES.rays(sq("a1")).east),
            Some((sq("c1"), Piece::new(Color::White, PieceType::Bishop)))
        );
        // the knight on a4 covers b2 and c3
        assert!(p.is_square_attacked(sq("b2"), Color::Black));
        assert!(p.is_square_attacked(sq("c3"), Color::Black));
    }

    #[test]
    fn queen_counts_as_both_slider_kinds() {
        let p = Position::from_fen("4k3/8/8/8/3q4/8/8/4K3 w - - 0 1").unwrap();
        assert!(p.is_square_attacked(sq("d1"), Color::Black));
        assert!(p.is_square_attacked(sq("g1"), Color::Black));
        assert!(p.is_square_attacked(sq("a7"), Color::Black));
        assert!(!p.is_square_attacked(sq("e1"), Color::Black));
    }

    #[test]
    fn kings_attack_adjacent_squares() {
        let p = Position::new();
        assert!(p.is_square_attacked(sq("d2"), Color::White));
        assert!(p.is_square_attacked(sq("f3"), Color::White));
        assert!(!p.is_square_attacked(sq("e4"), Color::White));
        assert!(!p.is_in_check(Color::White));
    }
}
