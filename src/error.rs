use thiserror::Error;

/// Everything the rules engine, the session or the engine bridge can reject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChessError {
    #[error("no piece on {0}")]
    EmptySquare(String),

    #[error("it is {0}'s turn")]
    NotYourTurn(String),

    #[error("illegal move: {from} -> {to}")]
    IllegalMove { from: String, to: String },

    #[error("game is already over: {0}")]
    GameOver(String),

    #[error("invalid promotion piece: {0}")]
    InvalidPromotion(char),

    #[error("invalid square notation: {0}")]
    InvalidSquare(String),

    #[error("invalid FEN string: {0}")]
    InvalidFen(String),

    #[error("invalid coordinate move: {0}")]
    InvalidCoordinateMove(String),

    #[error("engine error: {0}")]
    Engine(String),
}
