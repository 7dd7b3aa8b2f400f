use rayon::prelude::*;

use crate::board::Position;
use crate::types::Move;

/// Count the leaf nodes of the legal move tree, `depth` plies deep.
pub fn run_perft_test(position: &Position, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = position.legal_moves_for(position.side_to_move());
    if depth == 1 {
        return moves.len() as u64;
    }

    moves
        .into_iter()
        .filter_map(|m| child(position, m))
        .map(|p| run_perft_test(&p, depth - 1))
        .sum()
}

/// Same count, with the root moves spread over the rayon thread pool
pub fn run_perft_parallel(position: &Position, depth: u8) -> u64 {
    if depth <= 1 {
        return run_perft_test(position, depth);
    }
    position
        .legal_moves_for(position.side_to_move())
        .into_par_iter()
        .filter_map(|m| child(position, m))
        .map(|p| run_perft_test(&p, depth - 1))
        .sum()
}

/// Node count below each root move, in coordinate notation, sorted by move
pub fn perft_divide(position: &Position, depth: u8) -> Vec<(String, u64)> {
    let mut counts: Vec<(String, u64)> = position
        .legal_moves_for(position.side_to_move())
        .into_par_iter()
        .filter_map(|m| {
            child(position, m).map(|p| (m.to_uci(), run_perft_test(&p, depth.saturating_sub(1))))
        })
        .collect();
    counts.sort();
    counts
}

fn child(position: &Position, m: Move) -> Option<Position> {
    let mut next = *position;
    next.apply_move(m).ok()?;
    Some(next)
}

/// Perft from starting position
///
/// https://www.chessprogramming.org/Perft_Results
///
/// | Depth | Nodes       | Captures  | E.p. | Castles | Checks  | Checkmates |
/// | ----- | ----------- | --------- | ---- | ------- | ------- | ---------- |
/// | 1     | 20          | 0         | 0    | 0       | 0       | 0          |
/// | 2     | 400         | 0         | 0    | 0       | 0       | 0          |
/// | 3     | 8,902       | 34        | 0    | 0       | 12      | 0          |
/// | 4     | 197,281     | 1576      | 0    | 0       | 469     | 8          |
/// | 5     | 4,865,609   | 82,719    | 258  | 0       | 27,351  | 347        |
/// | 6     | 119,060,324 | 2,812,008 | 5248 | 0       | 809,099 | 10,828     |
pub fn expected_start_node_count(depth: u8) -> Option<u64> {
    match depth {
        0 => Some(1),
        1 => Some(20),
        2 => Some(400),
        3 => Some(8902),
        4 => Some(197_281),
        5 => Some(4_865_609),
        6 => Some(119_060_324),
        _ => None,
    }
}
