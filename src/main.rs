//! Terminal chess board
//!
//! Usage:
//!   cargo run --release -- --mode bot-black --engine stockfish --elo 1500
//!   cargo run --release -- --perft 5 --fen "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
//!
//! Moves are typed in coordinate notation (`e2e4`, `e2 e4`, `e7e8n`). Typing a move for
//! the side that is waiting queues it as a premove.

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use chess_board::board::Position;
use chess_board::engine::{Engine, EngineRequest, RandomEngine, UciEngine, UciEngineConfig};
use chess_board::error::ChessError;
use chess_board::game::{BotConfig, Game, SessionConfig, DEFAULT_BOT_ELO};
use chess_board::perft::perft_divide;
use chess_board::types::{Color, Move, Square};
use chess_board::uci::parse_coordinate_move;

/// Give up on an engine after this many unusable answers in a row
const MAX_REJECTED_ENGINE_MOVES: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Two players at one keyboard
    Pvp,
    /// The engine plays white
    BotWhite,
    /// The engine plays black
    BotBlack,
}

#[derive(Parser, Debug)]
#[command(name = "chess_board")]
#[command(about = "Play chess in the terminal, against a friend or a UCI engine")]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Pvp)]
    mode: Mode,

    /// Path to a UCI engine. Without one the bot plays random legal moves
    #[arg(long)]
    engine: Option<String>,

    /// Engine strength
    #[arg(long, default_value_t = DEFAULT_BOT_ELO)]
    elo: u16,

    /// Engine thinking time per move, in milliseconds
    #[arg(long, default_value_t = 500)]
    movetime: u64,

    /// Minutes on each clock
    #[arg(long, default_value_t = 3)]
    minutes: u64,

    /// Start from this position instead of the initial one
    #[arg(long)]
    fen: Option<String>,

    /// Seed for the random mover
    #[arg(long)]
    seed: Option<u64>,

    /// Print perft node counts to this depth and exit
    #[arg(long)]
    perft: Option<u8>,
}

enum Outcome {
    Continue,
    Quit,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Some(depth) = args.perft {
        return run_perft(args.fen.as_deref(), depth);
    }

    let bot = match args.mode {
        Mode::Pvp => None,
        Mode::BotWhite => Some(BotConfig {
            plays: Color::White,
            elo: args.elo,
        }),
        Mode::BotBlack => Some(BotConfig {
            plays: Color::Black,
            elo: args.elo,
        }),
    };
    let config = SessionConfig {
        clock_time: Duration::from_secs(args.minutes * 60),
        bot,
    };

    let mut game = match &args.fen {
        Some(fen) => Game::new_from_fen(fen, config).wrap_err("could not load --fen")?,
        None => Game::new(config),
    };
    let mut engine = bot.map(|_| start_engine(&args));

    print_help();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut last_tick = Instant::now();
    let mut rejected = 0;

    loop {
        if let Some(engine) = engine.as_mut() {
            if let Some(request) = game.engine_request() {
                if play_bot_turn(&mut game, &mut **engine, request, &mut last_tick)? {
                    rejected = 0;
                } else if !game.is_over() {
                    rejected += 1;
                    if rejected >= MAX_REJECTED_ENGINE_MOVES {
                        return Err(eyre!("the engine keeps answering with unusable moves"));
                    }
                    continue;
                }
            }
        }

        draw(&game);
        print!("{} > ", game.side_to_move());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let now = Instant::now();
        game.tick(now - last_tick);
        last_tick = now;

        match handle_command(&mut game, engine.as_deref_mut(), line.trim()) {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Continue) => {}
            Err(e) => println!("{}", e),
        }
    }
    Ok(())
}

/// Ask the engine, waiting for the answer while the bot's clock runs.
/// Returns whether the engine's move was played.
fn play_bot_turn(
    game: &mut Game,
    engine: &mut dyn Engine,
    request: EngineRequest,
    last_tick: &mut Instant,
) -> Result<bool> {
    engine.submit(request)?;
    while game.pending_request().is_some() {
        let reply = engine.wait(Duration::from_millis(100));
        let now = Instant::now();
        game.tick(now - *last_tick);
        *last_tick = now;
        if let Some(reply) = reply {
            return Ok(game.apply_engine_move(&reply).is_some());
        }
    }
    Ok(false)
}

fn start_engine(args: &Args) -> Box<dyn Engine> {
    if let Some(path) = &args.engine {
        let config = UciEngineConfig {
            path: path.clone(),
            movetime_ms: args.movetime,
            elo: Some(args.elo),
        };
        match UciEngine::start(config) {
            Ok(engine) => return Box::new(engine),
            Err(e) => eprintln!("{}, the bot will play random moves instead", e),
        }
    }
    match args.seed {
        Some(seed) => Box::new(RandomEngine::with_seed(seed)),
        None => Box::new(RandomEngine::new()),
    }
}

fn handle_command(
    game: &mut Game,
    engine: Option<&mut (dyn Engine + 'static)>,
    line: &str,
) -> Result<Outcome> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&first) = tokens.first() else {
        return Ok(Outcome::Continue);
    };

    match first {
        "quit" | "exit" => return Ok(Outcome::Quit),
        "help" => print_help(),
        "fen" => println!("{}", game.fen()),
        "list" => println!("{}\n", game.move_list()),
        "reset" => {
            game.reset();
            if let Some(engine) = engine {
                engine.new_game()?;
            }
        }
        "moves" => {
            let sq = Square::from_algebraic(tokens.get(1).copied().unwrap_or_default())?;
            let targets: Vec<String> = game
                .legal_destinations(sq)
                .iter()
                .map(|t| t.to_algebraic())
                .collect();
            println!("{}: {}", sq, targets.join(" "));
        }
        "premove" => match tokens.get(1) {
            Some(&"clear") => game.clear_premove(),
            _ => {
                let mv = parse_move_tokens(&tokens[1..])?;
                queue_premove(game, mv)?;
            }
        },
        "arrow" => {
            let mv = parse_move_tokens(&tokens[1..])?;
            game.toggle_arrow(mv.from, mv.to);
        }
        "arrows" => game.clear_arrows(),
        "show" => {
            let ply: usize = tokens
                .get(1)
                .and_then(|n| n.parse().ok())
                .filter(|&n| n >= 1)
                .ok_or_else(|| eyre!("usage: show <ply>, counting from 1"))?;
            if !game.highlight_history(ply - 1) {
                return Err(eyre!("no move {} in the game yet", ply));
            }
        }
        _ => {
            let mv = parse_move_tokens(&tokens)?;
            let waiting = game.side_to_move().other_color();
            if game.piece_at(mv.from).is_some_and(|p| p.color == waiting) {
                queue_premove(game, mv)?;
            } else {
                game.try_move(mv.from, mv.to, mv.promotion)?;
            }
        }
    }
    Ok(Outcome::Continue)
}

fn queue_premove(game: &mut Game, mv: Move) -> Result<()> {
    if game.set_premove(mv.from, mv.to, mv.promotion) {
        println!("premove {} queued", mv.to_uci());
        Ok(())
    } else {
        Err(eyre!("cannot queue {} as a premove", mv.to_uci()))
    }
}

/// `e2e4`, or the two squares as separate words: `e2 e4`
fn parse_move_tokens(tokens: &[&str]) -> Result<Move, ChessError> {
    parse_coordinate_move(&tokens.concat())
}

fn draw(game: &Game) {
    println!();
    println!(
        "{}",
        game.position().draw_board_highlighting(game.last_move())
    );
    for color in [Color::Black, Color::White] {
        println!("{:>6} {}", color.to_human(), game.clock().format_remaining(color));
    }
    if let Some(premove) = game.premove() {
        println!("premove: {}{}", premove.from, premove.to);
    }
    if !game.arrows().is_empty() {
        let arrows: Vec<String> = game
            .arrows()
            .iter()
            .map(|a| format!("{}->{}", a.from, a.to))
            .collect();
        println!("arrows: {}", arrows.join(" "));
    }
    match game.status() {
        Some(status) => println!("{} (type `reset` to play again)", status.to_human()),
        None if game.is_in_check() => println!("{} is in check", game.side_to_move()),
        None => {}
    }
}

fn print_help() {
    println!("commands:");
    println!("  e2e4 | e2 e4 | e7e8n   play a move, or premove for the waiting side");
    println!("  moves <square>         legal destinations of a piece");
    println!("  premove <move>|clear   queue or drop a premove");
    println!("  arrow <move>           toggle an arrow");
    println!("  arrows                 clear all arrows");
    println!("  show <ply>             highlight an earlier move again");
    println!("  fen | list             current position / move list");
    println!("  reset | help | quit");
}

fn run_perft(fen: Option<&str>, depth: u8) -> Result<()> {
    let position = match fen {
        Some(fen) => Position::from_fen(fen).wrap_err("could not load --fen")?,
        None => Position::new(),
    };
    position.draw_to_terminal();

    let depth = depth.max(1);
    let now = Instant::now();
    let divided = perft_divide(&position, depth);
    let elapsed = now.elapsed().as_secs_f32();
    for (mv, nodes) in &divided {
        println!("{}: {}", mv, nodes);
    }
    let total: u64 = divided.iter().map(|(_, n)| n).sum();
    println!();
    println!("depth {} nodes {} (elapsed: {:.3}s)", depth, total, elapsed);
    Ok(())
}
