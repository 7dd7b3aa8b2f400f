//! Whole games against an engine, through the `Engine` trait
//!
//! Run with: cargo test --test engine_tests

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use chess_board::engine::{Engine, EngineReply, RandomEngine, NO_MOVE};
use chess_board::game::{BotConfig, Game, SessionConfig};
use chess_board::notation::format_move_list;
use chess_board::types::*;

const MAX_PLIES: usize = 300;

/// Random human against the random engine, until the game ends or runs too long
fn play_out(bot: Color, seed: u64) -> Game {
    let mut game = Game::new_silent(SessionConfig {
        bot: Some(BotConfig {
            plays: bot,
            elo: 1200,
        }),
        ..SessionConfig::default()
    });
    let mut engine = RandomEngine::with_seed(seed);
    let mut human = StdRng::seed_from_u64(seed + 1);

    for _ in 0..MAX_PLIES {
        if game.is_over() {
            break;
        }
        if let Some(request) = game.engine_request() {
            engine.submit(request).unwrap();
            let reply = engine.wait(Duration::from_millis(10)).unwrap();
            assert!(game.apply_engine_move(&reply).is_some(), "{:?}", reply);
        } else {
            let side = game.side_to_move();
            let moves = game.position().legal_moves_for(side);
            let mv = moves.choose(&mut human).unwrap();
            game.try_move(mv.from, mv.to, mv.promotion).unwrap();
        }
    }
    game
}

#[test]
fn random_engine_plays_black() {
    let game = play_out(Color::Black, 11);
    let history = game.history();
    assert!(!history.is_empty());
    for (ply, record) in history.iter().enumerate() {
        assert_eq!(record.number as usize, ply / 2 + 1);
        let expected = if ply % 2 == 0 { Color::White } else { Color::Black };
        assert_eq!(record.color, expected);
    }
}

#[test]
fn random_engine_plays_white() {
    let game = play_out(Color::White, 23);
    let history = game.history();
    assert_eq!(history[0].color, Color::White);
    // colors alternate strictly
    assert!(history
        .windows(2)
        .all(|pair| pair[0].color != pair[1].color));
}

#[test]
fn finished_games_end_in_a_terminal_status() {
    for seed in 0..4 {
        let game = play_out(Color::Black, seed);
        if let Some(status) = game.status() {
            let side = game.side_to_move();
            assert!(!game.position().any_legal_moves(side));
            match status {
                Status::Checkmate(winner) => {
                    assert_eq!(winner, side.other_color());
                    assert!(game.history().last().unwrap().san.ends_with('#'));
                }
                Status::Stalemate => assert!(!game.is_in_check()),
                Status::TimeForfeit(_) => panic!("nobody ticked the clock"),
            }
        } else {
            assert_eq!(game.history().len(), MAX_PLIES);
        }
        assert!(!format_move_list(game.history()).is_empty());
    }
}

#[test]
fn no_move_reply_is_ignored() {
    let mut game = Game::new_silent(SessionConfig {
        bot: Some(BotConfig::default()),
        ..SessionConfig::default()
    });
    game.try_move(
        Square::from_algebraic("d2").unwrap(),
        Square::from_algebraic("d4").unwrap(),
        None,
    )
    .unwrap();
    let request = game.engine_request().unwrap();
    let reply = EngineReply {
        ticket: request.ticket,
        best_move: NO_MOVE.to_string(),
    };
    assert_eq!(game.apply_engine_move(&reply), None);
    assert_eq!(game.side_to_move(), Color::Black);
}
