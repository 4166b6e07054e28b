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

pub mod defs;
mod movehandler;
mod negamax;
mod quiesce;
mod root;
pub mod time;

pub use movehandler::{GenMode, MoveHandler};

use self::defs::{SearchRefs, MAX_PV};
use crate::board::defs::Flags;
use crate::comm::Command;
use crate::defs::Score;
use crate::evaluation;
use crate::movegen::defs::Move;

// The search itself is stateless; everything lives in SearchRefs.
pub struct Search;

impl Search {
    // Static evaluation from the side to move's point of view.
    pub fn relative_evaluation(refs: &mut SearchRefs) -> i32 {
        let score = evaluation::evaluate_position(
            refs.board,
            refs.mg,
            refs.pawn_hash,
            refs.eval_cache,
        );
        if refs.board.white_to_move() {
            score
        } else {
            -score
        }
    }

    /*
        Draw detection inside the tree: the 50-move rule, a single
        repetition anywhere in the game-plus-search history (two-fold
        counts as a draw during search), and dead material.
    */
    pub fn draw_score(refs: &SearchRefs, ply: i32) -> Option<i32> {
        let game_state = &refs.board.game_state;

        if game_state.flags & Flags::REPEAT_POSSIBLE != 0 {
            let half_move_clock = game_state.half_move_clock() as i32;

            if half_move_clock >= 100 {
                return Some(Score::DRAW);
            }

            let base = refs.history.game_index() as i32 + ply;
            let mut n = base - 4;
            let end = (base - half_move_clock).max(0);

            while n >= end {
                if refs.history.at(n as usize).hash == game_state.zobrist_key {
                    return Some(Score::DRAW);
                }
                n -= 2;
            }
        }

        if refs.board.is_draw_by_insufficient_material() {
            return Some(Score::DRAW);
        }

        None
    }

    /*
        The cooperative suspension point: roughly every 20 000 nodes the
        search reads pending commands and checks the clock. Commands the
        search can answer are serviced inline; the rest set the
        interrupt flag and are queued for the driver.
    */
    pub fn is_search_over(refs: &mut SearchRefs) -> bool {
        refs.info.nodes_until_input_check = defs::NODES_BETWEEN_INPUT_CHECKS;

        Search::poll_input(refs);

        if !refs.info.interrupted && Search::is_time_out(refs) {
            refs.info.interrupted = true;
        }

        refs.info.interrupted
    }

    fn poll_input(refs: &mut SearchRefs) {
        while let Ok(command) = refs.rx.try_recv() {
            match command {
                Command::Ping(n) => refs.comm.pong(n),
                Command::Post => refs.info.post = true,
                Command::NoPost => refs.info.post = false,
                Command::SetClock(centi) => {
                    refs.info.time.time_on_clock_ms = centi * 10;
                }
                Command::SetOpponentClock(_) | Command::Ignore => (),
                Command::DisplayStatus => {
                    let stat = refs.info.root_stat;
                    refs.comm.show_current_move(
                        stat.depth,
                        refs.info.elapsed_ms(),
                        refs.info.nodes,
                        stat.moves_remaining,
                        stat.moves_total,
                        stat.current_move,
                    );
                }
                Command::ShowHint => {
                    let hint = refs.info.move_to_play.best_move();
                    if !hint.is_null() {
                        refs.comm.hint(&refs.info.root_position, hint);
                    }
                }
                Command::MoveNow => refs.info.interrupted = true,
                other => {
                    if other.interrupts_search() {
                        refs.info.interrupted = true;
                    }
                    refs.info.pending.push_back(other);
                }
            }
        }
    }

    /*
        Remember the move the search wants to play, refresh its
        principal variation from the hash table, and post a thinking
        line when something changed.
    */
    pub fn set_move_to_play(
        refs: &mut SearchRefs,
        m: Move,
        score: i32,
        depth: i32,
        max_depth: i32,
        nodes: u64,
    ) {
        let elapsed = refs.info.elapsed_ms();

        let show = refs.info.post
            && !refs.info.quiet
            && (refs.info.move_to_play.pv[0] != m
                || refs.info.move_to_play.depth != depth
                || elapsed.saturating_sub(refs.info.last_display_ms) >= 3000);

        refs.info.move_to_play.score = score;
        refs.info.move_to_play.depth = depth;
        refs.info.move_to_play.max_depth = max_depth;
        refs.info.move_to_play.nodes = nodes;
        refs.info.move_to_play.time_ms = elapsed;
        refs.info.move_to_play.pv[0] = m;
        let pv_tail = Search::update_principal_variation(refs, m);
        refs.info.move_to_play.pv_len = 1 + pv_tail;

        if show {
            refs.info.last_display_ms = elapsed;
            let info = &refs.info.move_to_play;
            refs.comm.show_thinking(
                &refs.info.root_position,
                info.depth,
                info.score,
                info.time_ms,
                info.nodes,
                &info.pv[..info.pv_len],
            );
        }
    }

    // Extend the PV past the root move by walking the hash chain.
    fn update_principal_variation(refs: &mut SearchRefs, first: Move) -> usize {
        let mut board = refs.info.root_position.clone();
        let mut filled = first;
        let undo = crate::board::UndoInfo::new(&board);
        if board.do_move(&mut filled).is_err() {
            board.undo_move(&filled, &undo);
            return 0;
        }

        let mut length = 0;
        while length < MAX_PV - 1 {
            let entry = match refs.tt.probe(board.game_state.zobrist_key) {
                Some(entry) => entry,
                None => break,
            };

            let m = entry.best_move();
            if m.is_null() || !board.is_valid_move(&m) {
                break;
            }

            let mut next = m;
            let undo = crate::board::UndoInfo::new(&board);
            if board.do_move(&mut next).is_err() {
                board.undo_move(&next, &undo);
                break;
            }

            refs.info.move_to_play.pv[1 + length] = next;
            length += 1;
        }

        length
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::defs::{SearchInfo, SearchRefs};
    use crate::bitbase::BitBases;
    use crate::board::{Board, History};
    use crate::comm::console::Console;
    use crate::comm::Command;
    use crate::engine::transposition::TranspositionTable;
    use crate::evaluation::pawnhash::PawnHashTable;
    use crate::evaluation::EvalCache;
    use crate::movegen::MoveGenerator;
    use crate::recognizer::Recognizer;
    use crossbeam_channel::{unbounded, Receiver, Sender};

    // Owns every search collaborator so tests can borrow a SearchRefs.
    pub struct Fixture {
        pub board: Board,
        pub tt: TranspositionTable,
        pub pawn_hash: PawnHashTable,
        pub eval_cache: EvalCache,
        pub recognizer: Recognizer,
        pub bitbases: BitBases,
        pub history: History,
        pub info: SearchInfo,
        pub comm: Console,
        pub tx: Sender<Command>,
        pub rx: Receiver<Command>,
    }

    pub fn refs_fixture(fen: &str) -> Fixture {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();

        let (tx, rx) = unbounded();
        let mut info = SearchInfo::new();
        info.root_position = board.clone();
        info.post = false;

        Fixture {
            board,
            tt: TranspositionTable::new(8),
            pawn_hash: PawnHashTable::new(1 << 14),
            eval_cache: EvalCache::new(),
            recognizer: Recognizer::new(),
            bitbases: BitBases::empty(),
            history: History::new(),
            info,
            comm: Console::new(),
            tx,
            rx,
        }
    }

    impl Fixture {
        pub fn refs(&mut self) -> SearchRefs<'_> {
            SearchRefs {
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
            }
        }
    }

    use super::Search;
    use crate::defs::Score;

    #[test]
    fn relative_evaluation_flips_for_black() {
        let mut white = refs_fixture("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let mut refs = white.refs();
        let score_white = Search::relative_evaluation(&mut refs);

        let mut black = refs_fixture("4k3/8/8/8/8/8/8/R3K3 b - - 0 1");
        let mut refs = black.refs();
        let score_black = Search::relative_evaluation(&mut refs);

        assert!(score_white > 0);
        assert!(score_black < 0);
    }

    #[test]
    fn repetition_inside_search_history_is_a_draw() {
        let mut fixture = refs_fixture("4k3/8/8/8/8/8/8/R3K3 w - - 8 1");
        // Plant the current hash four plies back.
        let hash = fixture.board.game_state.zobrist_key;
        fixture.history.set(
            0,
            crate::board::HistoryEntry {
                hash,
                rep_count: 0,
                material_score: 0,
            },
        );
        // Pretend four game moves were played since.
        for _ in 0..4 {
            fixture.history.push_game_move(1, 0);
        }
        let refs = fixture.refs();
        assert_eq!(Search::draw_score(&refs, 0), Some(Score::DRAW));
    }

    #[test]
    fn fresh_position_is_not_a_draw() {
        let fixture = &mut refs_fixture("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let refs = fixture.refs();
        assert_eq!(Search::draw_score(&refs, 0), None);
    }

    #[test]
    fn search_finds_mate_in_one() {
        use crate::search::defs::FULL_PLY;
        let mut fixture = refs_fixture("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1");
        let mut refs = fixture.refs();

        // A fail-soft null-window scan around the mate score.
        let score = Search::negamax(&mut refs, Score::MATE - 10, 3 * FULL_PLY, 0);
        assert!(score >= Score::MATE - 10, "got {score}");
    }

    #[test]
    fn interrupt_command_unwinds_the_search() {
        let mut fixture = refs_fixture("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        fixture.tx.send(Command::Quit).unwrap();
        let mut refs = fixture.refs();
        assert!(Search::is_search_over(&mut refs));
        assert!(refs.info.interrupted);
        assert_eq!(refs.info.pending.len(), 1);
    }
}
