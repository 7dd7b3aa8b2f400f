//! The engine boundary: a position goes in as FEN, a best move comes back as a
//! coordinate string, some time later.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::board::Position;
use crate::error::ChessError;
use crate::types::Color;
use crate::uci;

/// Sent by UCI engines that have no move to play
pub const NO_MOVE: &str = "(none)";

/// Ask for a move in the position described by `fen`. The ticket ties the
/// answer back to the session state it was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    pub ticket: u64,
    pub fen: String,
    pub side: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub ticket: u64,
    pub best_move: String,
}

/// Something that answers move requests, possibly asynchronously.
pub trait Engine {
    /// Queue a search. The answer is picked up with `poll` or `wait`.
    fn submit(&mut self, request: EngineRequest) -> Result<(), ChessError>;

    /// Next finished answer, without blocking
    fn poll(&mut self) -> Option<EngineReply>;

    /// Next finished answer, blocking for at most `timeout`
    fn wait(&mut self, timeout: Duration) -> Option<EngineReply>;

    fn new_game(&mut self) -> Result<(), ChessError> {
        Ok(())
    }

    fn set_elo(&mut self, _elo: u16) -> Result<(), ChessError> {
        Ok(())
    }
}

/// Plays a uniformly random legal move. Answers synchronously.
pub struct RandomEngine {
    rng: StdRng,
    replies: VecDeque<EngineReply>,
}

impl Default for RandomEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomEngine {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            replies: VecDeque::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            replies: VecDeque::new(),
        }
    }
}

impl Engine for RandomEngine {
    fn submit(&mut self, request: EngineRequest) -> Result<(), ChessError> {
        let position =
            Position::from_fen(&request.fen).map_err(|e| ChessError::Engine(e.to_string()))?;
        let moves = position.legal_moves_for(position.side_to_move());
        let best_move = match moves.choose(&mut self.rng) {
            Some(mv) => mv.to_uci(),
            None => NO_MOVE.to_string(),
        };
        self.replies.push_back(EngineReply {
            ticket: request.ticket,
            best_move,
        });
        Ok(())
    }

    fn poll(&mut self) -> Option<EngineReply> {
        self.replies.pop_front()
    }

    fn wait(&mut self, _timeout: Duration) -> Option<EngineReply> {
        self.replies.pop_front()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciEngineConfig {
    /// Path to the engine executable, eg `stockfish`
    pub path: String,
    /// Thinking time per move
    pub movetime_ms: u64,
    /// Strength limit, sent as `UCI_Elo`
    pub elo: Option<u16>,
}

impl Default for UciEngineConfig {
    fn default() -> Self {
        Self {
            path: "stockfish".to_string(),
            movetime_ms: 500,
            elo: Some(1200),
        }
    }
}

/// The engine subprocess and its pipes
struct UciProcess {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl UciProcess {
    fn start(path: &str) -> Result<Self, ChessError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ChessError::Engine(format!("failed to start engine {}: {}", path, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| ChessError::Engine("engine stdin unavailable".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| ChessError::Engine("engine stdout unavailable".to_string()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
        };

        engine.send("uci")?;
        engine.wait_for("uciok")?;
        engine.send("isready")?;
        engine.wait_for("readyok")?;

        Ok(engine)
    }

    fn send(&mut self, cmd: &str) -> Result<(), ChessError> {
        writeln!(self.stdin, "{}", cmd)
            .map_err(|e| ChessError::Engine(format!("failed to send command: {}", e)))?;
        self.stdin
            .flush()
            .map_err(|e| ChessError::Engine(format!("flush failed: {}", e)))
    }

    fn read_line(&mut self) -> Result<String, ChessError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| ChessError::Engine(format!("read failed: {}", e)))?;
        if read == 0 {
            return Err(ChessError::Engine("engine closed its output".to_string()));
        }
        Ok(line)
    }

    fn wait_for(&mut self, expected: &str) -> Result<(), ChessError> {
        loop {
            if self.read_line()?.trim().starts_with(expected) {
                return Ok(());
            }
        }
    }

    fn best_move(&mut self, fen: &str, movetime_ms: u64) -> Result<String, ChessError> {
        self.send(&uci::position_command(fen))?;
        self.send(&uci::go_movetime_command(movetime_ms))?;
        loop {
            if let Some(mv) = uci::parse_bestmove(&self.read_line()?) {
                return Ok(mv);
            }
        }
    }

    fn set_elo(&mut self, elo: u16) -> Result<(), ChessError> {
        for cmd in uci::elo_commands(elo) {
            self.send(&cmd)?;
        }
        self.send("isready")?;
        self.wait_for("readyok")
    }

    fn new_game(&mut self) -> Result<(), ChessError> {
        self.send("ucinewgame")?;
        self.send("isready")?;
        self.wait_for("readyok")
    }

    fn quit(&mut self) {
        let _ = self.send("quit");
        let _ = self.process.wait();
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        self.quit();
    }
}

/// Commands sent from the session side to the engine thread
#[derive(Debug)]
enum EngineCommand {
    Search(EngineRequest),
    NewGame,
    SetElo(u16),
    Quit,
}

/// An external UCI engine driven from a dedicated worker thread, so searching never
/// blocks the caller.
pub struct UciEngine {
    commands: Sender<EngineCommand>,
    replies: Receiver<EngineReply>,
    worker: Option<JoinHandle<()>>,
}

impl UciEngine {
    /// Start the engine process and complete the handshake before returning.
    pub fn start(config: UciEngineConfig) -> Result<Self, ChessError> {
        let mut process = UciProcess::start(&config.path)?;
        if let Some(elo) = config.elo {
            process.set_elo(elo)?;
        }
        process.new_game()?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (reply_tx, reply_rx) = mpsc::channel::<EngineReply>();
        let movetime_ms = config.movetime_ms;
        let worker = thread::spawn(move || {
            engine_thread(process, movetime_ms, cmd_rx, reply_tx);
        });

        Ok(Self {
            commands: cmd_tx,
            replies: reply_rx,
            worker: Some(worker),
        })
    }

    fn send(&self, command: EngineCommand) -> Result<(), ChessError> {
        self.commands
            .send(command)
            .map_err(|_| ChessError::Engine("engine thread has stopped".to_string()))
    }
}

fn engine_thread(
    mut process: UciProcess,
    movetime_ms: u64,
    commands: Receiver<EngineCommand>,
    replies: Sender<EngineReply>,
) {
    while let Ok(command) = commands.recv() {
        let result = match command {
            EngineCommand::Search(request) => process
                .best_move(&request.fen, movetime_ms)
                .map(|best_move| {
                    let _ = replies.send(EngineReply {
                        ticket: request.ticket,
                        best_move,
                    });
                }),
            EngineCommand::NewGame => process.new_game(),
            EngineCommand::SetElo(elo) => process.set_elo(elo),
            EngineCommand::Quit => break,
        };
        if let Err(e) = result {
            eprintln!("{}", e);
        }
    }
}

impl Engine for UciEngine {
    fn submit(&mut self, request: EngineRequest) -> Result<(), ChessError> {
        self.send(EngineCommand::Search(request))
    }

    fn poll(&mut self) -> Option<EngineReply> {
        self.replies.try_recv().ok()
    }

    fn wait(&mut self, timeout: Duration) -> Option<EngineReply> {
        self.replies.recv_timeout(timeout).ok()
    }

    fn new_game(&mut self) -> Result<(), ChessError> {
        self.send(EngineCommand::NewGame)
    }

    fn set_elo(&mut self, elo: u16) -> Result<(), ChessError> {
        self.send(EngineCommand::SetElo(elo))
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.commands.send(EngineCommand::Quit);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
