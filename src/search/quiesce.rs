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

use super::defs::SearchRefs;
use super::movehandler::{GenMode, MoveHandler};
use super::Search;
use crate::board::defs::{piece_type, Pieces, BB_SQUARES};
use crate::board::UndoInfo;
use crate::defs::Score;
use crate::engine::transposition::EntryFlag;
use crate::movegen::defs::Move;
use crate::movegen::Direction;
use crate::recognizer::Bound;

impl Search {
    /*
        Null-window, fail-soft quiescence over captures and promotions,
        plus selected checking non-captures while checks_depth lasts.
        Scores are relative to the side on move.
    */
    pub fn quiesce(refs: &mut SearchRefs, gamma: i32, ply: i32, checks_depth: i32) -> i32 {
        refs.info.nodes_until_input_check -= 1;
        if refs.info.nodes_until_input_check <= 0 {
            Search::is_search_over(refs);
        }

        if refs.info.interrupted {
            return 0;
        }

        if let Some(draw_score) = Search::draw_score(refs, ply) {
            return draw_score;
        }

        if ply >= refs.info.max_search_ply.min(crate::defs::MAX_SEARCH_PLY as i32) {
            return Search::relative_evaluation(refs);
        }

        // Hash probe: depth does not matter at the horizon, only the
        // bound direction.
        if let Some(entry) = refs.tt.probe(refs.board.game_state.zobrist_key) {
            let mut value = entry.value();
            if value < Score::MATE_LO {
                value += ply;
            } else if value > Score::MATE_HI {
                value -= ply;
            }

            if entry.is_upper_bound() {
                if value < gamma {
                    return value;
                }
            } else if value >= gamma {
                return value;
            }
        }

        let in_check = refs.board.game_state.side_to_move_in_check();
        let mut result = Score::MIN;

        // Stand pat on the static evaluation when not in check.
        if !in_check {
            result = Search::relative_evaluation(refs);
            if result >= gamma {
                return result;
            }
        }

        if let Some(info) = refs.recognizer.probe(refs.board, refs.bitbases) {
            match info.bound {
                Bound::Exact => return info.adjust(ply),
                Bound::LowerBound if info.value >= gamma => return info.value,
                Bound::UpperBound if info.value < gamma => return info.value,
                _ => (),
            }
        }

        let mut handler = MoveHandler::new(ply as usize, GenMode::Quiesce, Move::NULL);
        let undo = UndoInfo::new(refs.board);
        let mut best_move = Move::NULL;

        while let Some(mut m) = handler.next(refs.board, refs.info) {
            if refs.board.do_move(&mut m).is_ok() {
                let temp = -Search::quiesce(refs, 1 - gamma, ply + 1, checks_depth - 1);

                if temp > result {
                    result = temp;
                    best_move = m;

                    if result >= gamma {
                        refs.board.undo_move(&m, &undo);
                        break;
                    }
                }
            }
            refs.board.undo_move(&m, &undo);
        }

        if refs.info.interrupted {
            return 0;
        }

        /*
            No cutoff from tactics: try the quiet moves that can
            plausibly give check. The pre-filter is geometric; only
            moves that really check after do_move get searched.
        */
        if !in_check && result < gamma && checks_depth > 0 {
            let moves = handler.discarded_moves();
            refs.mg.generate_non_tactical(refs.board, moves);

            let enemy_king = refs.board.king_square[refs.board.opponent()];

            for i in 0..moves.len() {
                let mut m = moves.get(i);

                let mut possible = m.is_en_passant();

                if !possible {
                    possible = refs.mg.at.dir(m.to(), enemy_king) != Direction::None
                        || refs.mg.at.dir(m.from(), enemy_king) != Direction::None;

                    if piece_type(refs.board.piece_list[m.from()]) == Pieces::KNIGHT
                        && refs.mg.at.knight[m.to()] & BB_SQUARES[enemy_king] != 0
                    {
                        possible = true;
                    }
                }

                if !possible {
                    continue;
                }

                if refs.board.do_move(&mut m).is_ok()
                    && refs.board.game_state.side_to_move_in_check()
                {
                    let temp = -Search::quiesce(refs, 1 - gamma, ply + 1, checks_depth - 1);

                    if temp > result {
                        result = temp;
                        best_move = m;

                        if result >= gamma {
                            refs.board.undo_move(&m, &undo);
                            break;
                        }
                    }
                }
                refs.board.undo_move(&m, &undo);
            }
        }

        // In check with no legal reply: mated here.
        if in_check && result == Score::MIN {
            result = ply - Score::MATE;
        }

        if result >= gamma && !refs.info.interrupted {
            let mut hash_result = result;
            if hash_result > Score::MATE_HI {
                hash_result += ply;
            } else if hash_result < Score::MATE_LO {
                hash_result -= ply;
            }
            refs.tt.store(
                refs.board.game_state.zobrist_key,
                best_move,
                hash_result,
                EntryFlag::LOWER_BOUND,
                0,
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::refs_fixture;

    #[test]
    fn stand_pat_bounds_quiet_positions() {
        let mut fixture = refs_fixture("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let mut refs = fixture.refs();
        let score = Search::quiesce(&mut refs, -Score::MAX, 0, 1);
        assert!(score.abs() < 100, "got {score}");
    }

    #[test]
    fn hanging_queen_is_captured() {
        // White to move wins the undefended queen on d5.
        let mut fixture = refs_fixture("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1");
        let mut refs = fixture.refs();
        let score = Search::quiesce(&mut refs, Score::QUEEN / 2, 0, 1);
        assert!(score >= Score::QUEEN / 2, "got {score}");
    }

    #[test]
    fn mate_when_checked_with_no_escape() {
        // Back-rank mate already on the board, black to move.
        let mut fixture = refs_fixture("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1");
        let mut refs = fixture.refs();
        let score = Search::quiesce(&mut refs, 0, 0, 1);
        assert_eq!(score, -Score::MATE);
    }

    #[test]
    fn fifty_move_rule_returns_draw() {
        let mut fixture = refs_fixture("4k3/8/8/8/8/8/8/R3K3 w - - 100 1");
        let mut refs = fixture.refs();
        assert_eq!(Search::quiesce(&mut refs, 0, 0, 1), 0);
    }
}
