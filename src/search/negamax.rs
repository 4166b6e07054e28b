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
use super::movehandler::{GenMode, MoveHandler};
use super::Search;
use crate::board::defs::{piece_type, square_rank, Pieces};
use crate::board::{HistoryEntry, UndoInfo};
use crate::defs::Score;
use crate::engine::transposition::EntryFlag;
use crate::movegen::defs::Move;
use crate::recognizer::Bound;

impl Search {
    /*
        Fail-soft negamax on a null window [gamma-1, gamma], with depth
        in fractional plies. The full bag of tricks lives here: hash
        probe, endgame recognizers, null move, internal iterative
        deepening, extensions, futility and history pruning.
    */
    pub fn negamax(refs: &mut SearchRefs, gamma: i32, mut depth: i32, ply: i32) -> i32 {
        refs.info.nodes_until_input_check -= 1;
        if refs.info.nodes_until_input_check <= 0 {
            Search::is_search_over(refs);
        }

        if refs.info.interrupted {
            return 0;
        }

        refs.info.nodes += 1;

        // Out of depth: drop into quiescence.
        if depth < FULL_PLY || ply >= refs.info.max_search_ply {
            if ply > refs.info.max_depth_reached {
                refs.info.max_depth_reached = ply;
            }
            return Search::quiesce(refs, gamma, ply, 1);
        }

        if let Some(draw_score) = Search::draw_score(refs, ply) {
            return draw_score;
        }

        // Record this node in the shared repetition history.
        let history_index = refs.history.game_index() + ply as usize;
        refs.history.set(
            history_index,
            HistoryEntry {
                hash: refs.board.game_state.zobrist_key,
                rep_count: 0,
                material_score: refs.board.game_state.material_score,
            },
        );

        // ---------------- Transposition table ----------------
        let mut hash_move = Move::NULL;
        let mut has_single_reply = false;
        let mut has_mate_threat = false;
        let mut hash_entry = refs.tt.probe(refs.board.game_state.zobrist_key);

        if let Some(entry) = hash_entry {
            let m = entry.best_move();
            if !m.is_null() && !refs.board.is_valid_move(&m) {
                // Stale entry from a colliding position.
                hash_entry = None;
            }
        }

        if let Some(entry) = hash_entry {
            let mut value = entry.value();
            if value < Score::MATE_LO {
                value += ply;
            } else if value > Score::MATE_HI {
                value -= ply;
            }

            if entry.depth() >= depth {
                if entry.is_upper_bound() {
                    if value < gamma {
                        return value;
                    }
                } else if value >= gamma {
                    return value;
                }
            }

            hash_move = entry.best_move();
            has_single_reply = entry.has_single_reply();
            has_mate_threat = entry.has_mate_threat();
        }

        // ---------------- Endgame recognizers ----------------
        if let Some(info) = refs.recognizer.probe(refs.board, refs.bitbases) {
            match info.bound {
                Bound::Exact => return info.adjust(ply),
                Bound::LowerBound if info.value >= gamma => return info.value,
                Bound::UpperBound if info.value < gamma => return info.value,
                _ => (),
            }
        }

        let undo = UndoInfo::new(refs.board);
        let side = refs.board.us();
        let in_check = refs.board.game_state.side_to_move_in_check();
        let side_has_few_pieces = refs.board.num_pieces(side) < 2;

        // ---------------- Null move ----------------
        if refs.info.null_move_enabled
            && !Score::is_mate(gamma)
            && !in_check
            && depth >= NULL_MOVE_MIN_DEPTH
            && !has_mate_threat
            && !side_has_few_pieces
        {
            let mut null_depth =
                NULL_MOVE_MIN_REDUCTION + (depth - NULL_MOVE_MIN_DEPTH) / 3;
            if null_depth > NULL_MOVE_MAX_REDUCTION {
                null_depth = NULL_MOVE_MAX_REDUCTION;
            }
            null_depth = (depth - null_depth).max(0);

            // Skip the try when the hash already shows the score is
            // well below gamma at sufficient depth.
            let mut skip = false;
            if let Some(entry) = hash_entry {
                if !hash_move.is_null() && entry.depth() > null_depth && entry.value() + 25 < gamma
                {
                    skip = true;
                }
            }

            if !skip {
                refs.board.do_null_move();

                let res = if null_depth < FULL_PLY {
                    -Search::quiesce(refs, 1 - gamma, ply + 1, 1)
                } else {
                    -Search::negamax(refs, 1 - gamma, null_depth, ply + 1)
                };

                refs.board.undo_null_move(&undo);

                if refs.info.interrupted {
                    return 0;
                }

                if res >= gamma {
                    refs.tt.store(
                        refs.board.game_state.zobrist_key,
                        hash_move,
                        res,
                        EntryFlag::LOWER_BOUND,
                        depth,
                    );
                    return res;
                }

                // Passing walks into mate: extend the defence.
                has_mate_threat = res == ply + 2 - Score::MATE;
            }
        }

        // ---------------- Internal iterative deepening ----------------
        if hash_move.is_null() && depth >= 4 * FULL_PLY {
            Search::negamax(refs, gamma, depth - 2 * FULL_PLY, ply);

            if refs.info.interrupted {
                return 0;
            }

            if let Some(entry) = refs.tt.probe(refs.board.game_state.zobrist_key) {
                let m = entry.best_move();
                if refs.board.is_valid_move(&m) {
                    hash_move = m;
                }
            }
        }

        // Extensions that apply to every move of this node.
        let mut base_extension = 0;
        if in_check {
            base_extension += EXTEND_CHECK;
        }
        if has_mate_threat {
            base_extension += EXTEND_THREAT;
        }
        if has_single_reply {
            base_extension += EXTEND_SINGLE_REPLY;
        }

        // ---------------- Move loop ----------------
        let mut handler = MoveHandler::new(ply as usize, GenMode::Search, hash_move);
        let mut best_move = Move::NULL;
        let mut valid_moves = 0;
        let mut failed_high = false;
        let mut result = Score::MIN;

        while let Some(mut m) = handler.next(refs.board, refs.info) {
            if refs.board.do_move(&mut m).is_err() {
                refs.board.undo_move(&m, &undo);
                continue;
            }

            valid_moves += 1;

            let mut depth_extension = base_extension;

            // A pawn arriving on the 7th (or 2nd) rank.
            let to = m.to();
            let arrived = refs.board.piece_list[to];
            if (square_rank(to) == 1 || square_rank(to) == 6)
                && piece_type(arrived) == Pieces::PAWN
            {
                depth_extension += EXTEND_PAWN_ON_7TH;
            }

            if ply >= 2 && m.is_capture() {
                // A recapture that restores the material balance.
                let trade = refs.history.at(refs.history.game_index()).material_score
                    - refs.board.game_state.material_score;
                if (-RECAPTURE_MARGIN..=RECAPTURE_MARGIN).contains(&trade) {
                    depth_extension += EXTEND_RECAPTURE;
                }

                // Entering a pure pawn endgame a pawn or more up (or
                // down) deserves a full look.
                if refs.board.num_pieces(crate::defs::Sides::WHITE) == 0
                    && refs.board.num_pieces(crate::defs::Sides::BLACK) == 0
                {
                    let material = (refs
                        .history
                        .at(refs.history.game_index() + ply as usize - 1)
                        .material_score
                        - refs.board.game_state.material_score)
                        .abs();
                    if material > Score::PAWN {
                        depth += EXTEND_PAWN_ENDGAME;
                    }
                }
            }

            if depth_extension > MAX_EXTENSION_PER_PLY {
                depth_extension = MAX_EXTENSION_PER_PLY;
            }

            let gives_check = refs.board.game_state.side_to_move_in_check();

            /*
                Futility: near the horizon, a quiet non-checking move
                with no extension is skipped when even an optimistic
                margin over the material balance cannot reach gamma.
            */
            if refs.info.futility_enabled
                && depth_extension == 0
                && depth < 3 * FULL_PLY
                && result != Score::MIN
                && !side_has_few_pieces
                && !gives_check
                && !m.is_capture_or_promotion()
            {
                let material_score = if side == crate::defs::Sides::BLACK {
                    -refs.board.game_state.material_score
                } else {
                    refs.board.game_state.material_score
                };
                let margin = if depth < 2 * FULL_PLY {
                    FUTILITY_MARGIN_FRONTIER
                } else {
                    FUTILITY_MARGIN_PRE_FRONTIER
                };

                if material_score + margin < gamma {
                    refs.board.undo_move(&m, &undo);
                    continue;
                }
            }

            // History pruning: quiet moves that rarely fail high are
            // searched a ply shallower, with a verification re-search.
            let hist_piece = (piece_type(arrived) >> 1) - 1;
            let hist_index = hist_piece * 64 + to;

            if refs.info.history_pruning_enabled
                && depth_extension == 0
                && valid_moves >= 4
                && !m.is_capture_or_promotion()
                && !gives_check
                && depth >= 4 * FULL_PLY
            {
                let counter = &refs.info.hist[hist_index];
                if counter.fail_high < counter.count / 8 {
                    depth_extension = -FULL_PLY;
                }
            }

            let mut temp;
            loop {
                temp = -Search::negamax(refs, 1 - gamma, depth + depth_extension - FULL_PLY, ply + 1);

                if refs.info.interrupted {
                    refs.board.undo_move(&m, &undo);
                    return 0;
                }

                // A reduced move that fails high gets the full-depth
                // verification search.
                if temp >= gamma && depth_extension < 0 {
                    depth_extension = 0;
                    continue;
                }
                break;
            }

            if temp >= gamma {
                refs.info.hist[hist_index].fail_high += 1;
            }
            refs.info.hist[hist_index].count += 1;

            if temp > result || best_move.is_null() {
                best_move = m;
                result = temp;

                if result >= gamma {
                    failed_high = true;
                    refs.board.undo_move(&m, &undo);
                    break;
                }
            }

            refs.board.undo_move(&m, &undo);
        }

        if valid_moves == 0 {
            // No legal move: mate or stalemate.
            return if in_check { ply - Score::MATE } else { 0 };
        }

        /*
            Reward the cutoff move. Only fail highs feed the killer and
            history tables; rewarding every best move dilutes them.
        */
        if failed_high && !best_move.is_capture_or_promotion() {
            refs.info.add_killer(best_move, ply as usize);
            refs.info.update_history(side, best_move, depth);
        }

        if failed_high || !Score::is_mate(gamma) {
            let mut hash_result = result;
            if hash_result > Score::MATE_HI {
                hash_result += ply;
            } else if hash_result < Score::MATE_LO {
                hash_result -= ply;
            }

            let mut flags = if result >= gamma {
                EntryFlag::LOWER_BOUND
            } else {
                EntryFlag::UPPER_BOUND
            };

            if (!failed_high && valid_moves == 1) || has_single_reply {
                flags |= EntryFlag::SINGLE_REPLY;
            }
            if has_mate_threat {
                flags |= EntryFlag::MATE_THREAT;
            }

            refs.tt.store(
                refs.board.game_state.zobrist_key,
                best_move,
                hash_result,
                flags,
                depth,
            );
        }

        result
    }
}
