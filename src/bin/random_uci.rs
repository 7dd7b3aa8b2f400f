//! A UCI engine that plays random legal moves
//!
//! Handy as an opponent that needs no installation, and as the other end of the
//! engine transport in tests.
//!
//! Usage:
//!   cargo run --release --bin random_uci
//!
//! Example session:
//!   > uci
//!   < id name RandomMover
//!   < uciok
//!   > position startpos moves e2e4
//!   > go movetime 100
//!   < bestmove g8f6

use std::io::{self, BufRead, Write};

use color_eyre::Result;

use chess_board::board::Position;
use chess_board::engine::{Engine, EngineRequest, RandomEngine};
use chess_board::uci::parse_coordinate_move;

const ENGINE_NAME: &str = "RandomMover";
const ENGINE_AUTHOR: &str = "chess_board";

fn main() -> Result<()> {
    color_eyre::install()?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut engine = RandomEngine::new();
    let mut position = Position::new();
    let mut ticket = 0;

    for line in stdin.lock().lines() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = tokens.first() else {
            continue;
        };

        match command {
            "uci" => {
                writeln!(stdout, "id name {}", ENGINE_NAME)?;
                writeln!(stdout, "id author {}", ENGINE_AUTHOR)?;
                writeln!(stdout, "option name UCI_LimitStrength type check default false")?;
                writeln!(stdout, "option name UCI_Elo type spin default 1200 min 100 max 3000")?;
                writeln!(stdout, "uciok")?;
            }
            "isready" => writeln!(stdout, "readyok")?,
            "ucinewgame" => position = Position::new(),
            "position" => match parse_position(&tokens[1..]) {
                Some(p) => position = p,
                None => eprintln!("bad position command: {}", line),
            },
            "go" => {
                ticket += 1;
                engine.submit(EngineRequest {
                    ticket,
                    fen: position.to_fen(),
                    side: position.side_to_move(),
                })?;
                if let Some(reply) = engine.poll() {
                    writeln!(stdout, "bestmove {}", reply.best_move)?;
                }
            }
            "quit" => break,
            // setoption and anything else: a random mover has no knobs
            _ => {}
        }
        stdout.flush()?;
    }
    Ok(())
}

/// `startpos [moves ...]` or `fen <six fields> [moves ...]`
fn parse_position(tokens: &[&str]) -> Option<Position> {
    let moves_at = tokens.iter().position(|t| *t == "moves");
    let (setup, moves) = match moves_at {
        Some(i) => (&tokens[..i], &tokens[i + 1..]),
        None => (tokens, &[][..]),
    };

    let mut position = match setup.split_first() {
        Some((&"startpos", _)) => Position::new(),
        Some((&"fen", fields)) => Position::from_fen(&fields.join(" ")).ok()?,
        _ => return None,
    };
    for m in moves {
        let mv = parse_coordinate_move(m).ok()?;
        if !position.legal_moves(mv.from).contains(&mv.to) {
            return None;
        }
        position.apply_move(mv).ok()?;
    }
    Some(position)
}
