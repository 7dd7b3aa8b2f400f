pub mod types;
pub mod error;
pub mod attacks;
pub mod movegen;
pub mod board;
pub mod notation;
pub mod clock;
pub mod game;
pub mod uci;
pub mod engine;
pub mod perft;
