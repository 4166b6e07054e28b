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

use super::defs::*;
use super::Search;
use crate::board::{HistoryEntry, UndoInfo};
use crate::defs::{Score, MAX_SEARCH_PLY};
use crate::engine::transposition::EntryFlag;
use crate::movegen::defs::{Move, MoveList};

impl Search {
    /*
        Iterative deepening driver. Seeds the root move list, loops MTD(f)
        from depth 3 upward and keeps the last completed result. When a
        search is cut short the hash table is scrubbed of the now
        untrustworthy variations and reseeded with the last good PV, so
        the next search starts from a clean slate.
    */
    pub fn search_position(refs: &mut SearchRefs, initial_score: i32, max_depth: i32) -> i32 {
        refs.info.root_position = refs.board.clone();

        // The root entry anchors the recapture extension and the
        // repetition scan.
        let game_index = refs.history.game_index();
        refs.history.set(
            game_index,
            HistoryEntry {
                hash: refs.board.game_state.zobrist_key,
                rep_count: 0,
                material_score: refs.board.game_state.material_score,
            },
        );

        let mut move_list = Search::initialize_search(refs);

        if move_list.is_empty() {
            return 0;
        }

        // Only one move: no point in searching, play it.
        if move_list.len() == 1 && !refs.info.time.analyzing {
            let m = move_list[0].m;
            Search::set_move_to_play(refs, m, 0, 0, 0, 0);
            return 0;
        }

        // Have something playable even if the very first iteration is
        // cut short.
        refs.info.move_to_play.pv[0] = move_list[0].m;
        refs.info.move_to_play.pv_len = 1;

        let mut f = initial_score;
        let max_depth = max_depth.max(3);

        for depth in 3..=max_depth {
            for root_move in move_list.iter_mut() {
                root_move.nodes = 0;
            }

            let score = Search::mtdf(refs, f, depth, &mut move_list);

            if refs.info.interrupted {
                Search::scrub_hash_table(refs, &move_list);
                break;
            }

            f = score;

            // A mate was found: stop unless analyzing, or unless a
            // previous iteration already promised a faster mate that
            // we have to keep chasing.
            if !refs.info.time.analyzing {
                if f >= Score::MATE_HI {
                    if initial_score < Score::MATE_HI || f > initial_score {
                        break;
                    }
                } else if f <= Score::MATE_LO {
                    break;
                }
            }

            if Search::is_search_over(refs) {
                break;
            }
        }

        f
    }

    /*
        MTD(f): a sequence of null-window searches homing in on the true
        score by shrinking [lower, upper]. The score quantization in the
        evaluation keeps the number of passes small.
    */
    pub fn mtdf(refs: &mut SearchRefs, f: i32, depth: i32, move_list: &mut RootMoveList) -> i32 {
        let mut result = f;
        let mut g = f;
        let mut lower = Score::MIN;
        let mut upper = Score::MAX;
        let mut gamma = if g == lower { g + 1 } else { g };

        refs.info.max_search_ply =
            (MAX_SEARCH_DEPTH_FACTOR * depth).min(MAX_SEARCH_PLY as i32);
        refs.info.max_depth_reached = 0;

        let fractional_depth = depth * FULL_PLY + INITIAL_EXTENSION_BONUS;

        loop {
            g = Search::negamax_root(refs, gamma, fractional_depth, move_list);

            if refs.info.interrupted {
                break;
            }

            let old_span = upper - lower;

            if g < gamma {
                upper = g;
                gamma = g;
            } else {
                lower = g;
                gamma = g + 1;
            }

            // The interval must shrink or the driver would never stop.
            debug_assert!(upper - lower < old_span);

            let max_depth_reached = refs.info.max_depth_reached;
            let nodes = refs.info.nodes;
            Search::set_move_to_play(refs, move_list[0].m, g, depth, max_depth_reached, nodes);

            result = g;

            if lower >= upper {
                break;
            }
        }

        result
    }

    /*
        The root node iterates an explicit move list and reorders it:
        a fail-high move is hoisted to the front, and the rest is sorted
        by the node count spent on it. Refuting good moves takes work,
        so node count is a decent proxy for move quality in the next
        iteration.
    */
    pub fn negamax_root(
        refs: &mut SearchRefs,
        gamma: i32,
        depth: i32,
        move_list: &mut RootMoveList,
    ) -> i32 {
        if move_list.is_empty() {
            return if refs.board.game_state.side_to_move_in_check() {
                -Score::MATE
            } else {
                0
            };
        }

        let mut failed_high = false;
        let mut result = Score::MIN;
        let mut best_move = Move::NULL;
        let undo = UndoInfo::new(refs.board);

        refs.info.root_stat.depth = depth / FULL_PLY;
        refs.info.root_stat.moves_total = move_list.len();

        for i in 0..move_list.len() {
            let mut m = move_list[i].m;

            refs.info.root_stat.moves_remaining = move_list.len() - 1 - i;
            refs.info.root_stat.current_move = m;

            let nodes_before = refs.info.nodes;

            // Root moves were pre-validated, so this cannot fail.
            if refs.board.do_move(&mut m).is_err() {
                refs.board.undo_move(&m, &undo);
                continue;
            }

            let score = -Search::negamax(refs, 1 - gamma, depth - FULL_PLY, 1);

            refs.board.undo_move(&m, &undo);

            if refs.info.interrupted {
                break;
            }

            move_list[i].nodes += refs.info.nodes - nodes_before;
            move_list[i].value = score;

            if score > result {
                best_move = m;
                result = score;

                if result >= gamma {
                    failed_high = true;
                    break;
                }
            }
        }

        // Bring the cutting move to the front.
        if failed_high || refs.info.move_to_play.pv_len == 0 {
            if let Some(index) = move_list.iter().position(|rm| rm.m == best_move) {
                let best = move_list.remove(index);
                move_list.insert(0, best);
            }
        }

        // Stable sort by node count, keeping the front move in place.
        if move_list.len() > 2 {
            move_list[1..].sort_by(|a, b| b.nodes.cmp(&a.nodes));
        }

        result
    }

    /*
        Build the root move list: every legal move, ordered by a shallow
        tactical estimate, with the hash move forced to the front.
    */
    pub fn initialize_search(refs: &mut SearchRefs) -> RootMoveList {
        refs.tt.bump_search_id();

        // A valid hash move is examined first at the root.
        let mut hash_move = Move::NULL;
        if let Some(entry) = refs.tt.probe(refs.board.game_state.zobrist_key) {
            let m = entry.best_move();
            if refs.board.is_valid_move(&m) {
                let undo = UndoInfo::new(refs.board);
                let mut trial = m;
                if refs.board.do_move(&mut trial).is_ok() {
                    hash_move = trial;
                }
                refs.board.undo_move(&trial, &undo);
            }
        }

        let mut legal = MoveList::new();
        refs.mg.generate_valid_moves(refs.board, &mut legal);

        let mut move_list: RootMoveList = Vec::with_capacity(legal.len());
        let undo = UndoInfo::new(refs.board);

        for i in 0..legal.len() {
            let mut m = legal.get(i);

            let value = if m == hash_move {
                Score::MAX
            } else {
                // A quick quiescence estimate orders the first pass.
                let mut value = 0;
                if refs.board.do_move(&mut m).is_ok() {
                    value = -Search::quiesce(refs, Score::MAX, 1, 0);
                }
                refs.board.undo_move(&m, &undo);
                value
            };

            move_list.push(RootMove {
                m,
                nodes: 0,
                value,
            });
        }

        move_list.sort_by(|a, b| b.value.cmp(&a.value));
        refs.info.move_to_play.reset();

        move_list
    }

    /*
        After an interrupt the hash table holds half-searched lines for
        this position. Walking each root move's PV chain and dropping
        the entries, then reinserting the last known good PV, prevents
        the next search from being led down a bad hash line it would
        then play.
    */
    fn scrub_hash_table(refs: &mut SearchRefs, move_list: &RootMoveList) {
        for root_move in move_list.iter() {
            let mut board = refs.info.root_position.clone();
            let mut m = root_move.m;
            let undo = UndoInfo::new(&board);
            if board.do_move(&mut m).is_err() {
                board.undo_move(&m, &undo);
                continue;
            }

            loop {
                let entry = match refs.tt.probe(board.game_state.zobrist_key) {
                    Some(entry) => entry,
                    None => break,
                };

                let next = entry.best_move();
                if next.is_null() || !board.is_valid_move(&next) {
                    break;
                }

                refs.tt.clean(board.game_state.zobrist_key);

                let mut filled = next;
                let undo = UndoInfo::new(&board);
                if board.do_move(&mut filled).is_err() {
                    board.undo_move(&filled, &undo);
                    break;
                }
            }
        }

        refs.tt.clean(refs.info.root_position.game_state.zobrist_key);

        // Reinsert the PV we trust.
        let mut board = refs.info.root_position.clone();
        let mut score = refs.info.move_to_play.score;

        for i in 0..refs.info.move_to_play.pv_len {
            let m = refs.info.move_to_play.pv[i];

            refs.tt
                .store(board.game_state.zobrist_key, m, score, EntryFlag::LOWER_BOUND, 0);

            score = -score;

            let mut filled = m;
            let undo = UndoInfo::new(&board);
            if board.do_move(&mut filled).is_err() {
                board.undo_move(&filled, &undo);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::refs_fixture;

    #[test]
    fn mate_in_one_is_played() {
        let mut fixture = refs_fixture("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1");
        fixture.info.time.fixed_depth = 3;
        let mut refs = fixture.refs();

        let score = Search::search_position(&mut refs, 0, 3);

        assert!(score >= Score::MATE_HI, "got {score}");
        let best = refs.info.move_to_play.best_move();
        assert_eq!(best.to(), crate::board::defs::Squares::A8);
    }

    #[test]
    fn root_list_is_seeded_and_sorted() {
        let mut fixture = refs_fixture("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1");
        let mut refs = fixture.refs();
        let move_list = Search::initialize_search(&mut refs);

        assert!(!move_list.is_empty());
        // The queen capture must be at the front of the first pass.
        assert_eq!(move_list[0].m.to(), crate::board::defs::Squares::D5);
        for pair in move_list.windows(2) {
            assert!(pair[0].value >= pair[1].value);
        }
    }

    #[test]
    fn only_move_returns_immediately() {
        // The white king has exactly one legal move: taking the rook.
        let mut fixture = refs_fixture("k7/8/8/8/8/8/1r5p/K7 w - - 0 1");
        let mut refs = fixture.refs();
        let mut move_list = MoveList::new();
        refs.mg.generate_valid_moves(refs.board, &mut move_list);
        assert_eq!(move_list.len(), 1);

        let score = Search::search_position(&mut refs, 0, 20);
        assert_eq!(score, 0);
        assert!(!refs.info.move_to_play.best_move().is_null());
    }

    #[test]
    fn mtdf_interval_converges() {
        let mut fixture = refs_fixture("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        fixture.info.quiet = true;
        let mut refs = fixture.refs();

        let score = Search::search_position(&mut refs, 0, 4);
        assert!(score.abs() < 200, "got {score}");
        assert!(!refs.info.move_to_play.best_move().is_null());
    }

    #[test]
    fn start_position_prefers_a_main_line_opening() {
        let mut fixture = refs_fixture("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        fixture.info.quiet = true;
        let mut refs = fixture.refs();

        let score = Search::search_position(&mut refs, 0, 5);
        let best = refs.info.move_to_play.best_move().as_string();

        assert!(score > -50 && score < 50, "score {score}");
        assert!(
            ["e2e4", "d2d4", "g1f3", "c2c4", "b1c3", "e2e3", "d2d3"].contains(&best.as_str()),
            "unexpected opening move {best}"
        );
    }
}
