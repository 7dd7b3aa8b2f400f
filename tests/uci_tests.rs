//! The UCI transport, against the bundled random mover
//!
//! Run with: cargo test --test uci_tests

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use chess_board::board::Position;
use chess_board::engine::{Engine, UciEngine, UciEngineConfig};
use chess_board::game::{BotConfig, Game, SessionConfig};
use chess_board::types::{Color, Square};
use chess_board::uci::{parse_bestmove, parse_coordinate_move};

const RANDOM_UCI: &str = env!("CARGO_BIN_EXE_random_uci");

/// Talks to the random mover line by line
struct RawEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl RawEngine {
    fn new() -> Self {
        let mut child = Command::new(RANDOM_UCI)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to start random_uci");

        let stdin = child.stdin.take().unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());

        Self { child, stdin, stdout }
    }

    fn send(&mut self, cmd: &str) {
        writeln!(self.stdin, "{}", cmd).unwrap();
        self.stdin.flush().unwrap();
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.stdout.read_line(&mut line).unwrap();
        line.trim().to_string()
    }

    fn read_until(&mut self, expected: &str) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line();
            let done = line.contains(expected);
            lines.push(line);
            if done {
                break;
            }
        }
        lines
    }

    fn read_bestmove(&mut self) -> String {
        loop {
            if let Some(mv) = parse_bestmove(&self.read_line()) {
                return mv;
            }
        }
    }

    fn quit(mut self) {
        self.send("quit");
        let _ = self.child.wait();
    }
}

impl Drop for RawEngine {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn config() -> UciEngineConfig {
    UciEngineConfig {
        path: RANDOM_UCI.to_string(),
        movetime_ms: 10,
        elo: Some(1500),
    }
}

#[test]
fn handshake() {
    let mut engine = RawEngine::new();
    engine.send("uci");
    let response = engine.read_until("uciok");
    assert!(response.iter().any(|l| l.starts_with("id name")));

    engine.send("isready");
    assert_eq!(engine.read_line(), "readyok");
    engine.quit();
}

#[test]
fn bestmove_after_a_move_list() {
    let mut engine = RawEngine::new();
    engine.send("position startpos moves e2e4 e7e5 g1f3");
    engine.send("go movetime 10");
    let best = engine.read_bestmove();

    let mut position = Position::new();
    for m in ["e2e4", "e7e5", "g1f3"] {
        position.apply_move(parse_coordinate_move(m).unwrap()).unwrap();
    }
    let mv = parse_coordinate_move(&best).unwrap();
    assert_eq!(position.piece_at(mv.from).unwrap().color, Color::Black);
    assert!(position.legal_moves(mv.from).contains(&mv.to));
    engine.quit();
}

#[test]
fn mated_side_answers_none() {
    let mut engine = RawEngine::new();
    engine.send("position fen rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
    engine.send("go movetime 10");
    assert_eq!(engine.read_bestmove(), "(none)");
    engine.quit();
}

#[test]
fn uci_engine_answers_through_the_trait() {
    let mut engine = UciEngine::start(config()).unwrap();
    let mut game = Game::new_silent(SessionConfig {
        bot: Some(BotConfig {
            plays: Color::White,
            elo: 1500,
        }),
        ..SessionConfig::default()
    });

    let request = game.engine_request().unwrap();
    engine.submit(request).unwrap();
    let reply = engine.wait(Duration::from_secs(5)).unwrap();
    let record = game.apply_engine_move(&reply).unwrap();
    assert_eq!(record.color, Color::White);
    assert_eq!(game.side_to_move(), Color::Black);
}

#[test]
fn uci_engine_survives_new_game_and_elo_changes() {
    let mut engine = UciEngine::start(config()).unwrap();
    engine.set_elo(2000).unwrap();
    engine.new_game().unwrap();

    let mut game = Game::new_silent(SessionConfig {
        bot: Some(BotConfig::default()),
        ..SessionConfig::default()
    });
    game.try_move(
        Square::from_algebraic("e2").unwrap(),
        Square::from_algebraic("e4").unwrap(),
        None,
    )
    .unwrap();
    let request = game.engine_request().unwrap();
    let ticket = request.ticket;
    engine.submit(request).unwrap();
    let reply = engine.wait(Duration::from_secs(5)).unwrap();
    assert_eq!(reply.ticket, ticket);
    assert!(game.apply_engine_move(&reply).is_some());
}
