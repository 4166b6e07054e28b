/* =======================================================================
Kauri is a chess playing engine.
Copyright (C) 2024-2026, the Kauri developers

Kauri is written in the Rust programming language. It is an original
work, not derived from any engine that came before it. However, it does
use a lot of concepts which are well-known and are in use by most if not
all classical alpha/beta-based chess engines.

Kauri is free software: you can redistribute it and/or modify it under
the terms of the GNU General Public License version 3 as published by
the Free Software Foundation.

Kauri is distributed in the hope that it will be useful, but WITHOUT
ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License
for more details.

You should have received a copy of the GNU General Public License along
with this program.  If not, see <http://www.gnu.org/licenses/>.
======================================================================= */

mod about;
pub mod book;
pub mod defs;
pub mod transposition;

use self::book::{NullBook, OpeningBook};
use self::defs::{EngineState, ErrNormal, Settings};
use self::transposition::TranspositionTable;
use crate::bitbase::BitBases;
use crate::board::{Board, History, UndoInfo};
use crate::comm::console::Console;
use crate::comm::{san, Command, GameResult};
use crate::defs::{EngineRunResult, Side, Sides, MAX_SEARCH_PLY};
use crate::evaluation::pawnhash::PawnHashTable;
use crate::evaluation::{evaluate_position, EvalCache};
use crate::misc::cmdline::CmdLine;
use crate::misc::perft;
use crate::movegen::defs::{Move, MoveList};
use crate::movegen::MoveGenerator;
use crate::recognizer::{Bound, Recognizer};
use crate::search::defs::{
    SearchInfo, SearchMode, SearchRefs, MAX_NOT_IN_BOOK_MOVES,
};
use crate::search::time::TimeManager;
use crate::search::Search;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::collections::VecDeque;

/*
    The engine driver: owns the board, all tables, and the protocol
    adapter, and runs the single-threaded cooperative loop. While idle
    it blocks on the command channel; during a search the same channel
    is polled from inside the recursion every ~20 000 nodes.
*/
pub struct Engine {
    board: Board,
    tt: TranspositionTable,
    pawn_hash: PawnHashTable,
    eval_cache: EvalCache,
    recognizer: Recognizer,
    bitbases: BitBases,
    history: History,
    info: SearchInfo,
    time_manager: TimeManager,
    book: Box<dyn OpeningBook>,
    moves_not_in_book: u32,
    comm: Console,
    tx: Sender<Command>,
    rx: Receiver<Command>,
    queue: VecDeque<Command>,
    settings: Settings,
    cmdline: CmdLine,
    state: EngineState,
    engine_color: Side,
    game_over: bool,
    undo_stack: Vec<(Move, UndoInfo)>,
    last_own_score: Option<i32>,
    analysis_fresh: bool,
}

impl Engine {
    pub fn new() -> Self {
        let cmdline = CmdLine::new();
        let (tx, rx) = unbounded();

        let settings = Settings {
            quiet: cmdline.quiet(),
            tt_size_mb: cmdline.hash(),
            bitbase_dir: cmdline.bitbase_dir(),
            ..Settings::new()
        };

        let bitbases = BitBases::new(&settings.bitbase_dir);

        Self {
            board: Board::new(),
            tt: TranspositionTable::new(settings.tt_size_mb),
            pawn_hash: PawnHashTable::new(Settings::PAWN_HASH_ENTRIES),
            eval_cache: EvalCache::new(),
            recognizer: Recognizer::new(),
            bitbases,
            history: History::new(),
            info: SearchInfo::new(),
            time_manager: TimeManager::new(),
            book: Box::new(NullBook),
            moves_not_in_book: 0,
            comm: Console::new(),
            tx,
            rx,
            queue: VecDeque::new(),
            settings,
            cmdline,
            state: EngineState::Observing,
            engine_color: Sides::BLACK,
            game_over: false,
            undo_stack: Vec::new(),
            last_own_score: None,
            analysis_fresh: false,
        }
    }

    pub fn run(&mut self) -> EngineRunResult {
        self.print_about();

        // Force table construction up front, not inside the first search.
        let _ = MoveGenerator::get();

        self.setup_position()?;

        let perft_depth = self.cmdline.perft();
        if perft_depth > 0 {
            let mut board = self.board.clone();
            perft::divide(&mut board, perft_depth);
            return Ok(());
        }

        self.bitbases.load_all();

        let reader = self.comm.start_reader(self.tx.clone());
        self.main_loop();
        // The reader wakes up on the quit line (or EOF) and exits.
        drop(reader);

        Ok(())
    }

    fn setup_position(&mut self) -> EngineRunResult {
        let fen = if self.cmdline.has_kiwipete() {
            String::from(crate::defs::FEN_KIWIPETE_POSITION)
        } else {
            self.cmdline.fen()
        };

        self.board
            .fen_read(Some(&fen))
            .map_err(|e| format!("invalid FEN on the command line: {e}"))
    }

    fn main_loop(&mut self) {
        while self.state != EngineState::Quitting {
            if self.engine_should_move() {
                self.think(false);
                continue;
            }

            if self.state == EngineState::Analyzing && self.analysis_fresh {
                self.analysis_fresh = false;
                self.think(true);
                continue;
            }

            let command = match self.queue.pop_front() {
                Some(command) => Ok(command),
                None => self.rx.recv().map_err(|_| ()),
            };

            match command {
                Ok(command) => self.handle_command(command),
                Err(_) => self.state = EngineState::Quitting,
            }
        }
    }

    fn engine_should_move(&self) -> bool {
        self.state == EngineState::Playing
            && !self.game_over
            && self.board.us() == self.engine_color
            && self.queue.is_empty()
    }

    fn handle_command(&mut self, command: Command) {
        let changes_position = matches!(
            &command,
            Command::UserMove(_)
                | Command::SetBoard(_)
                | Command::New
                | Command::UndoHalfMove
                | Command::UndoFullMove
                | Command::Analyze
        );

        match command {
            Command::Quit => self.state = EngineState::Quitting,

            Command::Protover(_) => self.comm.identify(),

            Command::Ping(n) => self.comm.pong(n),

            Command::New => self.new_game(),

            Command::Force => self.state = EngineState::Observing,

            Command::Go => {
                self.engine_color = self.board.us();
                self.state = EngineState::Playing;
            }

            Command::GoPlayOther => {
                self.engine_color = self.board.opponent();
                self.state = EngineState::Playing;
            }

            Command::Analyze => {
                self.state = EngineState::Analyzing;
                self.analysis_fresh = true;
            }

            Command::LeaveAnalyze => self.state = EngineState::Observing,

            Command::SetBoard(fen) => match self.board.fen_read(Some(&fen)) {
                Ok(()) => {
                    self.start_from_current_position();
                }
                Err(e) => {
                    self.comm.error(ErrNormal::FEN_FAILED, &e.to_string());
                }
            },

            Command::UserMove(text) => self.user_move(&text),

            Command::SetClock(centiseconds) => {
                self.info.time.time_on_clock_ms = centiseconds * 10;
            }

            Command::SetOpponentClock(_) => (),

            Command::SetFixedTime(seconds) => {
                self.info.time.mode = SearchMode::FixedTime;
                self.info.time.fixed_time_ms = seconds * 1000;
            }

            Command::SetFixedDepth(depth) => {
                self.info.time.mode = SearchMode::FixedDepth;
                self.info.time.fixed_depth = depth.clamp(1, MAX_SEARCH_PLY as i32);
            }

            Command::SetLevel {
                moves,
                seconds,
                increment,
            } => {
                self.time_manager.reset();
                self.time_manager.add_control(moves, seconds, increment);
                self.info.time.mode = SearchMode::TimeControl;
                if self.info.time.time_on_clock_ms == 0 {
                    self.info.time.time_on_clock_ms = seconds * 1000;
                }
            }

            Command::PonderOn => self.settings.ponder = true,
            Command::PonderOff => self.settings.ponder = false,

            Command::Post => self.info.post = true,
            Command::NoPost => self.info.post = false,

            Command::DisplayStatus => {
                let stat = self.info.root_stat;
                self.comm.show_current_move(
                    stat.depth,
                    self.info.elapsed_ms(),
                    self.info.nodes,
                    stat.moves_remaining,
                    stat.moves_total,
                    stat.current_move,
                );
            }

            Command::ShowHint => {
                let hint = self.info.move_to_play.best_move();
                if !hint.is_null() && self.board.is_valid_move(&hint) {
                    self.comm.hint(&self.board, hint);
                }
            }

            Command::ShowBook => {
                let entries = self.book.probe(self.board.game_state.zobrist_key);
                if entries.is_empty() {
                    self.comm.info("no book moves for this position");
                } else {
                    for entry in entries {
                        let m = Move::from_u32(entry.packed_move);
                        self.comm
                            .info(&format!("book: {} ({})", m.as_string(), entry.weight));
                    }
                }
            }

            Command::GameResult(text) => {
                debug!("game result received: {text}");
                self.state = EngineState::Observing;
            }

            Command::OpponentOffersDraw => {
                // Declined by silence; a draw is accepted only when the
                // game ends on the board.
                debug!("draw offer ignored");
            }

            Command::OpponentIsComputer => self.settings.opponent_is_computer = true,

            Command::UndoHalfMove => self.undo_half_move(),

            Command::UndoFullMove => {
                self.undo_half_move();
                self.undo_half_move();
            }

            Command::Perft(depth) => {
                let mut board = self.board.clone();
                perft::divide(&mut board, depth);
            }

            Command::GenerateBitbases => {
                // Generation bootstraps from an external tablebase
                // oracle, and none is wired into this build.
                self.comm
                    .info("bitbase generation needs an external endgame oracle");
                warn!("genbb requested but no endgame oracle is registered");
            }

            Command::Help => self.comm.help(),

            Command::Evaluate => {
                let score = evaluate_position(
                    &self.board,
                    MoveGenerator::get(),
                    &mut self.pawn_hash,
                    &mut self.eval_cache,
                );
                let relative = if self.board.white_to_move() { score } else { -score };
                self.comm.info(&format!(
                    "static evaluation: {score} for white, {relative} for the side to move"
                ));
            }

            Command::BestMove => self.show_move_evaluations(),

            Command::SetOption { name, value } => self.set_option(&name, &value),

            Command::MoveNow | Command::Ignore => (),
        }

        // Anything that changed the position restarts a running analysis.
        if self.state == EngineState::Analyzing && changes_position {
            self.analysis_fresh = true;
        }
    }

    fn set_option(&mut self, name: &str, value: &str) {
        match name {
            "hash" => match value.parse::<usize>() {
                Ok(mb) => {
                    self.settings.tt_size_mb = mb;
                    self.tt.resize(mb);
                }
                Err(_) => self.comm.error("set hash", ErrNormal::NOT_INT),
            },
            "resign" => match value.parse::<i32>() {
                Ok(threshold) => self.settings.resign_threshold = -threshold.abs(),
                Err(_) => self.comm.error("set resign", ErrNormal::NOT_INT),
            },
            "nullmove" => self.info.null_move_enabled = value != "0",
            "futility" => self.info.futility_enabled = value != "0",
            "historypruning" => self.info.history_pruning_enabled = value != "0",
            _ => {
                warn!("unknown option '{name}' discarded");
            }
        }
    }

    /*
        Debug dump for the bestm command: the static evaluation and the
        recognizer verdict after every legal move. Handy for spotting an
        evaluation term that pulls a move the wrong way.
    */
    fn show_move_evaluations(&mut self) {
        let mg = MoveGenerator::get();
        let mut legal = MoveList::new();
        mg.generate_valid_moves(&self.board, &mut legal);

        let static_eval =
            evaluate_position(&self.board, mg, &mut self.pawn_hash, &mut self.eval_cache);
        self.comm.info(&format!(
            "static eval = {static_eval}, {} moves",
            legal.len()
        ));

        let mut scratch = self.board.clone();
        for i in 0..legal.len() {
            let mut m = legal.get(i);
            let san = san::move_to_san(&self.board, m);
            let undo = UndoInfo::new(&scratch);

            if scratch.do_move(&mut m).is_ok() {
                let eval =
                    evaluate_position(&scratch, mg, &mut self.pawn_hash, &mut self.eval_cache);

                let mut line = format!("  {san:7} = {eval:7}");
                if let Some(info) = self.recognizer.probe(&scratch, &self.bitbases) {
                    let tag = match info.bound {
                        Bound::Exact => "=",
                        Bound::LowerBound => ">=",
                        Bound::UpperBound => "<=",
                    };
                    line.push_str(&format!(", recog {} {}", tag, info.value));
                }
                self.comm.info(&line);
            }
            scratch.undo_move(&m, &undo);
        }
    }

    fn new_game(&mut self) {
        self.board
            .fen_read(None)
            .expect(defs::ErrFatal::NEW_GAME);
        self.start_from_current_position();

        // Per protocol: after new the engine plays black and waits.
        self.engine_color = Sides::BLACK;
        self.state = EngineState::Playing;
    }

    // Common reset when the board was replaced wholesale.
    fn start_from_current_position(&mut self) {
        self.history.clear();
        self.undo_stack.clear();
        self.tt.clear();
        self.pawn_hash.clear();
        self.eval_cache.clear();
        self.info.move_to_play.reset();
        self.moves_not_in_book = 0;
        self.last_own_score = None;
        self.game_over = false;
        self.info.time.last_game_move_was_capture = false;
        self.info.time.have_played_moves = false;
    }

    fn user_move(&mut self, text: &str) {
        if self.game_over {
            self.comm.reject_move(text, "the game is over");
            return;
        }

        match san::text_to_move(&self.board, text) {
            Some(m) => {
                self.apply_move(m);
                self.announce_game_end();
            }
            None => self.comm.reject_move(text, ErrNormal::NOT_LEGAL),
        }
    }

    // Applies a validated move and keeps all game records in sync.
    fn apply_move(&mut self, m: Move) {
        let mut m = m;
        let undo = UndoInfo::new(&self.board);

        if self.board.do_move(&mut m).is_err() {
            self.board.undo_move(&m, &undo);
            warn!("refused to apply illegal move {}", m.as_string());
            return;
        }

        self.undo_stack.push((m, undo));
        self.history.push_game_move(
            self.board.game_state.zobrist_key,
            self.board.game_state.material_score,
        );
        self.info.time.last_game_move_was_capture = m.is_capture();
        self.info.time.have_played_moves = self.history.game_index() >= 2;
        self.time_manager.go_next_move();
    }

    fn undo_half_move(&mut self) {
        if let Some((m, undo)) = self.undo_stack.pop() {
            self.board.undo_move(&m, &undo);
            self.history.pop_game_move();
            self.time_manager.go_prev_move();
            self.game_over = false;
            self.info.time.last_game_move_was_capture = self
                .undo_stack
                .last()
                .map(|(last, _)| last.is_capture())
                .unwrap_or(false);
        }
    }

    /*
        One engine move: consult the book, otherwise run the search and
        play (or just analyze). Commands that arrived mid-search are
        queued for the main loop; a command that replaced the position
        also cancels playing the found move.
    */
    fn think(&mut self, analyzing: bool) {
        if !analyzing && self.moves_not_in_book < MAX_NOT_IN_BOOK_MOVES {
            if let Some(book_move) = book::pick_book_move(self.book.as_ref(), &self.board) {
                info!("playing from book");
                self.moves_not_in_book = 0;
                self.comm.play_move(book_move);
                self.apply_move(book_move);
                self.announce_game_end();
                return;
            }
            self.moves_not_in_book += 1;
        }

        self.info.reset_for_search();
        self.info.quiet = self.settings.quiet;
        self.info.time.analyzing = analyzing;
        self.info.time.previous_score = self.last_own_score.unwrap_or(0);

        let max_depth = if !analyzing && self.info.time.mode == SearchMode::FixedDepth {
            self.info.time.fixed_depth
        } else {
            MAX_SEARCH_PLY as i32
        };

        if !analyzing && self.info.time.mode == SearchMode::TimeControl {
            let moves_to_go = self.time_manager.moves_left_in_control();
            let increment_ms = self.time_manager.current_control().increment_s * 1000;
            Search::set_time_target(&mut self.info.time, moves_to_go, increment_ms);
        }

        let initial_score = self.last_own_score.unwrap_or(0);

        let score = {
            let mut refs = SearchRefs {
                board: &mut self.board,
                mg: MoveGenerator::get(),
                tt: &mut self.tt,
                pawn_hash: &mut self.pawn_hash,
                eval_cache: &mut self.eval_cache,
                recognizer: &self.recognizer,
                bitbases: &self.bitbases,
                history: &mut self.history,
                info: &mut self.info,
                comm: &self.comm,
                rx: &self.rx,
            };
            Search::search_position(&mut refs, initial_score, max_depth)
        };

        // Commands the search could not handle are processed next.
        let position_invalidated = self
            .info
            .pending
            .iter()
            .any(|command| command.interrupts_search());
        while let Some(command) = self.info.pending.pop_front() {
            self.queue.push_back(command);
        }

        if analyzing || position_invalidated {
            return;
        }

        let best = self.info.move_to_play.best_move();
        if best.is_null() {
            // No legal moves: the game ended before we were asked.
            self.announce_game_end();
            return;
        }

        // Two bad scores in a row and the engine gives up.
        if score <= self.settings.resign_threshold
            && self
                .last_own_score
                .map_or(false, |s| s <= self.settings.resign_threshold)
        {
            self.comm
                .resign(self.engine_color == Sides::WHITE, "resigns");
            self.state = EngineState::Observing;
            return;
        }

        self.last_own_score = Some(score);
        self.comm.play_move(best);
        self.apply_move(best);
        self.announce_game_end();
    }

    // Detects and announces a finished game; returns true if over.
    fn announce_game_end(&mut self) -> bool {
        if self.game_over {
            return true;
        }

        let mut legal = MoveList::new();
        MoveGenerator::get().generate_valid_moves(&self.board, &mut legal);

        let result = if legal.is_empty() {
            if self.board.game_state.side_to_move_in_check() {
                if self.board.white_to_move() {
                    Some((GameResult::BlackWins, "Black mates"))
                } else {
                    Some((GameResult::WhiteWins, "White mates"))
                }
            } else {
                Some((GameResult::Draw, "Stalemate"))
            }
        } else if self.board.is_draw_by_insufficient_material() {
            Some((GameResult::Draw, "Draw by insufficient material"))
        } else if self.board.game_state.half_move_clock() >= 100 {
            Some((GameResult::Draw, "Draw by 50-move rule"))
        } else if self
            .history
            .repetitions_in_game(self.board.game_state.zobrist_key)
            >= 3
        {
            Some((GameResult::Draw, "Draw by repetition"))
        } else {
            None
        };

        if let Some((result, reason)) = result {
            self.comm.send_result(result, reason);
            self.game_over = true;
        }

        self.game_over
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The engine constructor wires everything; building it must not
    // panic and must put the driver in observing state.
    // (CmdLine parses the test binary's arguments, so Engine::new is
    // exercised indirectly through component construction here.)
    #[test]
    fn components_construct() {
        let board = Board::new();
        let tt = TranspositionTable::new(8);
        let pawn_hash = PawnHashTable::new(1024);
        assert_eq!(board.game_state.fullmove_number, 1);
        assert!(tt.entries() > 0);
        assert!(pawn_hash.entries() > 0);
    }
}
