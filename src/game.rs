use chrono::prelude::*;
use std::time::Duration;

use crate::board::*;
use crate::clock::{Clock, DEFAULT_CLOCK_TIME};
use crate::engine::{EngineReply, EngineRequest};
use crate::error::ChessError;
use crate::notation::{format_move_list, MoveRecord};
use crate::types::*;
use crate::uci::parse_coordinate_move;

pub const DEFAULT_BOT_ELO: u16 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckState {
    pub white_in_check: bool,
    pub black_in_check: bool,
}

impl CheckState {
    pub fn of(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_in_check,
            Color::Black => self.black_in_check,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub check: CheckState,
    /// `None` while the game goes on
    pub status: Option<Status>,
}

/// Check for both sides, then whether the side to move has anything left.
pub fn evaluate(position: &Position) -> Evaluation {
    let check = CheckState {
        white_in_check: position.is_in_check(Color::White),
        black_in_check: position.is_in_check(Color::Black),
    };
    let side = position.side_to_move();
    let status = if position.any_legal_moves(side) {
        None
    } else if check.of(side) {
        Some(Status::Checkmate(side.other_color()))
    } else {
        Some(Status::Stalemate)
    };
    Evaluation { check, status }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotConfig {
    /// The color the engine plays
    pub plays: Color,
    pub elo: u16,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            plays: Color::Black,
            elo: DEFAULT_BOT_ELO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Starting time on each clock
    pub clock_time: Duration,
    /// `None` for two human players
    pub bot: Option<BotConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock_time: DEFAULT_CLOCK_TIME,
            bot: None,
        }
    }
}

/// A move queued by the side that is not to move, tried right after the opponent moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Premove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arrow {
    pub from: Square,
    pub to: Square,
}

/// One game from start to finish (and again, after `reset`).
///
/// All state changes go through the commands below. Rejected commands leave the game
/// untouched.
pub struct Game {
    position: Position,
    start_position: Position,
    config: SessionConfig,
    check: CheckState,
    status: Option<Status>,
    history: Vec<MoveRecord>,
    last_move: Option<(Square, Square)>,
    premove: Option<Premove>,
    arrows: Vec<Arrow>,
    clock: Clock,
    pending_request: Option<EngineRequest>,
    next_ticket: u64,
    game_start_time: DateTime<Local>,
    silent: bool,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Game {
    fn from_position(start_position: Position, config: SessionConfig, silent: bool) -> Self {
        let evaluation = evaluate(&start_position);
        Self {
            position: start_position,
            start_position,
            config,
            check: evaluation.check,
            status: evaluation.status,
            history: Vec::new(),
            last_move: None,
            premove: None,
            arrows: Vec::new(),
            clock: Clock::new(config.clock_time),
            pending_request: None,
            next_ticket: 1,
            game_start_time: Local::now(),
            silent,
        }
    }

    pub fn new(config: SessionConfig) -> Self {
        Game::from_position(Position::new(), config, false)
    }

    pub fn new_silent(config: SessionConfig) -> Self {
        Game::from_position(Position::new(), config, true)
    }

    pub fn new_from_fen(start_fen: &str, config: SessionConfig) -> Result<Self, ChessError> {
        Ok(Game::from_position(Position::from_fen(start_fen)?, config, false))
    }

    pub fn new_from_fen_silent(start_fen: &str, config: SessionConfig) -> Result<Self, ChessError> {
        Ok(Game::from_position(Position::from_fen(start_fen)?, config, true))
    }

    // ---- queries ----

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.position.piece_at(sq)
    }

    /// Where the piece on `from` may legally go. Nothing once the game is over.
    pub fn legal_destinations(&self, from: Square) -> Vec<Square> {
        if self.is_over() {
            return Vec::new();
        }
        self.position.legal_moves(from)
    }

    /// Is the side to move in check?
    pub fn is_in_check(&self) -> bool {
        self.check.of(self.side_to_move())
    }

    pub fn check_state(&self) -> CheckState {
        self.check
    }

    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status.is_some()
    }

    pub fn fen(&self) -> String {
        self.position.to_fen()
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn premove(&self) -> Option<Premove> {
        self.premove
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn pending_request(&self) -> Option<&EngineRequest> {
        self.pending_request.as_ref()
    }

    /// Is it the engine's turn to play?
    pub fn is_bot_turn(&self) -> bool {
        self.config
            .bot
            .is_some_and(|bot| bot.plays == self.side_to_move())
    }

    /// Move list with a short header, like
    ///
    /// ```text
    /// Game started 2023.11.20 18:04
    ///
    /// 1. e4 e5
    /// 2. Nf3
    /// ```
    pub fn move_list(&self) -> String {
        let mut list = String::new();
        list.push_str(&format!(
            "Game started {}\n",
            self.game_start_time.format("%Y.%m.%d %H:%M")
        ));
        if self.start_position != Position::new() {
            list.push_str(&format!("Start position {}\n", self.start_position.to_fen()));
        }
        list.push('\n');
        list.push_str(&format_move_list(&self.history));
        list
    }

    // ---- commands ----

    /// A player's move. Only the side to move may move, and only to a legal square.
    /// Returns the record of the move; a queued premove may be played right after it.
    pub fn try_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<MoveRecord, ChessError> {
        if let Some(status) = self.status {
            return Err(ChessError::GameOver(status.to_human()));
        }
        let piece = self
            .position
            .piece_at(from)
            .ok_or_else(|| ChessError::EmptySquare(from.to_algebraic()))?;
        let side = self.side_to_move();
        if piece.color != side {
            return Err(ChessError::NotYourTurn(side.to_human().to_string()));
        }
        if self.is_bot_turn() {
            return Err(ChessError::NotYourTurn("the engine".to_string()));
        }
        if let Some(p) = promotion.filter(|p| !p.can_promote_to()) {
            return Err(ChessError::InvalidPromotion(p.to_char()));
        }
        if !self.position.legal_moves(from).contains(&to) {
            return Err(ChessError::IllegalMove {
                from: from.to_algebraic(),
                to: to.to_algebraic(),
            });
        }

        let record = self.commit(Move { from, to, promotion })?;
        self.try_apply_premove();
        Ok(record)
    }

    /// Queue a move for the side that is waiting. Replaces any earlier premove.
    /// The move itself is only checked when it is tried.
    pub fn set_premove(&mut self, from: Square, to: Square, promotion: Option<PieceType>) -> bool {
        if self.is_over()
            || !to.is_on_board()
            || promotion.is_some_and(|p| !p.can_promote_to())
        {
            return false;
        }
        let Some(piece) = self.position.piece_at(from) else {
            return false;
        };
        let waiting = self.side_to_move().other_color();
        if piece.color != waiting || self.config.bot.is_some_and(|bot| bot.plays == waiting) {
            return false;
        }
        self.premove = Some(Premove {
            from,
            to,
            promotion,
            color: waiting,
        });
        true
    }

    pub fn clear_premove(&mut self) {
        self.premove = None;
    }

    /// Add an arrow, or remove it if the same one is already drawn. Returns true when added.
    pub fn toggle_arrow(&mut self, from: Square, to: Square) -> bool {
        if from == to || !from.is_on_board() || !to.is_on_board() {
            return false;
        }
        let arrow = Arrow { from, to };
        match self.arrows.iter().position(|a| *a == arrow) {
            Some(index) => {
                self.arrows.remove(index);
                false
            }
            None => {
                self.arrows.push(arrow);
                true
            }
        }
    }

    pub fn clear_arrows(&mut self) {
        self.arrows.clear();
    }

    /// Highlight an earlier move of the history (0 is the first ply) instead of the
    /// latest one. The next move played takes the highlight back.
    pub fn highlight_history(&mut self, index: usize) -> bool {
        match self.history.get(index) {
            Some(record) => {
                self.last_move = Some((record.from, record.to));
                true
            }
            None => false,
        }
    }

    /// Run the side to move's clock. Returns the new status if its flag fell.
    pub fn tick(&mut self, elapsed: Duration) -> Option<Status> {
        if self.is_over() {
            return None;
        }
        let side = self.side_to_move();
        if self.clock.tick(side, elapsed) {
            self.finish(Status::TimeForfeit(side.other_color()));
            return self.status;
        }
        None
    }

    /// `color` ran out of time according to some outside clock
    pub fn report_flag_fall(&mut self, color: Color) {
        if !self.is_over() {
            self.finish(Status::TimeForfeit(color.other_color()));
        }
    }

    /// The request to hand to the engine, when the engine should be thinking and is not
    /// already. At most one request is outstanding; any move or reset supersedes it.
    pub fn engine_request(&mut self) -> Option<EngineRequest> {
        if self.is_over() || !self.is_bot_turn() || self.pending_request.is_some() {
            return None;
        }
        let request = EngineRequest {
            ticket: self.next_ticket,
            fen: self.fen(),
            side: self.side_to_move(),
        };
        self.next_ticket += 1;
        self.pending_request = Some(request.clone());
        Some(request)
    }

    /// Play the engine's answer. Answers to superseded requests, unparsable moves and
    /// illegal moves are dropped without touching the game.
    pub fn apply_engine_move(&mut self, reply: &EngineReply) -> Option<MoveRecord> {
        match &self.pending_request {
            Some(pending) if pending.ticket == reply.ticket => {}
            _ => {
                self.diagnostic(&format!(
                    "ignoring engine reply {} for stale request {}",
                    reply.best_move, reply.ticket
                ));
                return None;
            }
        }
        let request = self.pending_request.take()?;
        if self.is_over() || request.side != self.side_to_move() {
            return None;
        }

        let mv = match parse_coordinate_move(&reply.best_move) {
            Ok(mv) => mv,
            Err(e) => {
                self.diagnostic(&format!("ignoring engine reply: {}", e));
                return None;
            }
        };
        let is_own_piece = self
            .position
            .piece_at(mv.from)
            .is_some_and(|p| p.color == request.side);
        if !is_own_piece || !self.position.legal_moves(mv.from).contains(&mv.to) {
            self.diagnostic(&format!(
                "ignoring illegal engine move {}",
                reply.best_move
            ));
            return None;
        }

        let record = self.commit(mv).ok()?;
        self.try_apply_premove();
        Some(record)
    }

    /// Back to the start position with fresh clocks. Tickets keep counting up, so
    /// replies to requests from before the reset are recognised as stale.
    /// Telling the engine about the new game is up to the caller.
    pub fn reset(&mut self) {
        let evaluation = evaluate(&self.start_position);
        self.position = self.start_position;
        self.check = evaluation.check;
        self.status = evaluation.status;
        self.history.clear();
        self.last_move = None;
        self.premove = None;
        self.arrows.clear();
        self.clock.reset();
        self.pending_request = None;
        self.game_start_time = Local::now();
    }

    // ---- internals ----

    fn commit(&mut self, mv: Move) -> Result<MoveRecord, ChessError> {
        let number = self.position.fullmove_number();
        let applied = self.position.apply_move(mv)?;
        self.pending_request = None;

        let evaluation = evaluate(&self.position);
        self.check = evaluation.check;
        self.status = evaluation.status;
        if self.status.is_some() {
            self.clock.stop();
        } else if !self.clock.is_running() {
            self.clock.start();
        }

        let opponent = self.position.side_to_move();
        let record = MoveRecord::new(
            number,
            &applied,
            self.check.of(opponent),
            matches!(self.status, Some(Status::Checkmate(_))),
        );
        self.history.push(record.clone());
        self.last_move = Some((applied.from, applied.to));

        if !self.silent {
            println!("move {}: {} ({})", number, applied.to_human(), record.san);
            if let Some(status) = self.status {
                println!("{}", status.to_human());
            }
        }
        Ok(record)
    }

    /// A queued premove is tried exactly once, right after the opponent's move.
    fn try_apply_premove(&mut self) -> Option<MoveRecord> {
        let premove = self.premove.take()?;
        if self.is_over() || premove.color != self.side_to_move() {
            return None;
        }
        let still_ours = self
            .position
            .piece_at(premove.from)
            .is_some_and(|p| p.color == premove.color);
        if !still_ours || !self.position.legal_moves(premove.from).contains(&premove.to) {
            return None;
        }
        self.commit(Move {
            from: premove.from,
            to: premove.to,
            promotion: premove.promotion,
        })
        .ok()
    }

    fn finish(&mut self, status: Status) {
        self.status = Some(status);
        self.clock.stop();
        self.pending_request = None;
        self.premove = None;
        if !self.silent {
            println!("{}", status.to_human());
        }
    }

    fn diagnostic(&self, message: &str) {
        if !self.silent {
            eprintln!("{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn play(game: &mut Game, from: &str, to: &str) -> MoveRecord {
        game.try_move(sq(from), sq(to), None).unwrap()
    }

    #[test]
    fn test_game() {
        let mut game = Game::new_silent(SessionConfig::default());
        play(&mut game, "e2", "e4");
        play(&mut game, "e7", "e5");
        play(&mut game, "g1", "f3");
        assert_eq!(game.history().len(), 3);
        assert_eq!(game.side_to_move(), Color::Black);
        assert_eq!(game.last_move(), Some((sq("g1"), sq("f3"))));
        assert!(game.move_list().ends_with("1. e4 e5\n2. Nf3"));
        assert!(game.move_list().starts_with("Game started "));
    }

    #[test]
    fn evaluate_start_position() {
        let evaluation = evaluate(&Position::new());
        assert_eq!(evaluation.check, CheckState::default());
        assert_eq!(evaluation.status, None);
    }

    #[test]
    fn evaluate_checkmate_and_stalemate() {
        let mated = Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .unwrap();
        let evaluation = evaluate(&mated);
        assert!(evaluation.check.white_in_check);
        assert!(!evaluation.check.black_in_check);
        assert_eq!(evaluation.status, Some(Status::Checkmate(Color::Black)));

        // black king in the corner, boxed in by the white queen
        let stalemate = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let evaluation = evaluate(&stalemate);
        assert_eq!(evaluation.check, CheckState::default());
        assert_eq!(evaluation.status, Some(Status::Stalemate));
    }

    #[test]
    fn clock_starts_after_the_first_move() {
        let mut game = Game::new_silent(SessionConfig::default());
        assert_eq!(game.tick(Duration::from_secs(10)), None);
        assert_eq!(game.clock().remaining(Color::White), DEFAULT_CLOCK_TIME);

        play(&mut game, "d2", "d4");
        assert!(game.clock().is_running());
        game.tick(Duration::from_secs(10));
        assert_eq!(
            game.clock().remaining(Color::Black),
            DEFAULT_CLOCK_TIME - Duration::from_secs(10)
        );
        assert_eq!(game.clock().remaining(Color::White), DEFAULT_CLOCK_TIME);
    }

    #[test]
    fn premove_rejected_for_the_side_to_move() {
        let mut game = Game::new_silent(SessionConfig::default());
        assert!(!game.set_premove(sq("e2"), sq("e4"), None));
        assert!(!game.set_premove(sq("e4"), sq("e5"), None));
        assert!(game.set_premove(sq("e7"), sq("e5"), None));
        assert_eq!(game.premove().map(|p| p.color), Some(Color::Black));
        game.clear_premove();
        assert_eq!(game.premove(), None);
    }

    #[test]
    fn arrows_toggle() {
        let mut game = Game::new_silent(SessionConfig::default());
        assert!(game.toggle_arrow(sq("e2"), sq("e4")));
        assert!(game.toggle_arrow(sq("g1"), sq("f3")));
        assert!(!game.toggle_arrow(sq("e2"), sq("e4")));
        assert_eq!(
            game.arrows(),
            &[Arrow {
                from: sq("g1"),
                to: sq("f3")
            }]
        );
        assert!(!game.toggle_arrow(sq("a1"), sq("a1")));
        game.clear_arrows();
        assert!(game.arrows().is_empty());
    }
}
