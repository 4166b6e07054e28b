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

use super::{RecognizerInfo};
use crate::bitbase::{self, flip_file, flip_rank, BitBaseId, BitBases};
use crate::board::defs::{file_rank_to_square, square_file, square_rank, Squares};
use crate::board::Board;
use crate::defs::{Sides, Square};
use crate::misc::bits;
use crate::movegen::MoveGenerator;

pub const KPK_WIN_SCORE: i32 = 700;
pub const KPPK_WIN_SCORE: i32 = 750;

#[derive(PartialEq, Clone, Copy)]
enum KpkOutcome {
    Draw,      // at least a draw for the pawn side
    ExactDraw, // provably drawn
    Win,
    Unknown,
}

fn distance(a: Square, b: Square) -> i32 {
    MoveGenerator::get().at.distance[a][b] as i32
}

fn linear(a: i32, b: i32) -> i32 {
    (a - b).abs()
}

fn kpk_win_value(wk: Square, wp: Square, bk: Square) -> i32 {
    KPK_WIN_SCORE - 12 * (7 - square_rank(wp) as i32) - 4 * distance(wk, wp)
        + 2 * linear(square_file(bk) as i32, square_file(wp) as i32)
}

/*
    KP vs K. The bitbase answers exactly when present; otherwise a
    hand-coded evaluator covers the classic patterns: the king-in-square
    rule, the effective-square rule, opposition, rook pawns and the
    known stalemate traps. Positions it cannot certify stay unknown.

    All coordinates are from the pawn side's point of view ("white").
*/
fn evaluate_kpk(
    bases: &BitBases,
    mut wk: Square,
    mut wp: Square,
    mut bk: Square,
    wtm: bool,
) -> KpkOutcome {
    if let Some(bb) = bases.get(BitBaseId::Kpk, wtm) {
        let (mut fwk, mut fbk, mut fwp) = (wk, bk, wp);
        bitbase::mirror_wk3(&mut fwk, &mut fbk, &mut fwp);
        return if bb.get(bitbase::index3(BitBaseId::Kpk, fwk, fbk, fwp)) != 0 {
            KpkOutcome::Win
        } else {
            KpkOutcome::ExactDraw
        };
    }

    // Mirror the position for pawn files E..H.
    if square_file(wp) >= 4 {
        wk = flip_file(wk);
        wp = flip_file(wp);
        bk = flip_file(bk);
    }

    let wkf = square_file(wk) as i32;
    let wkr = square_rank(wk) as i32;
    let wpf = square_file(wp) as i32;
    let wpr = square_rank(wp) as i32;
    let bkf = square_file(bk) as i32;
    let bkr = square_rank(bk) as i32;

    // Distance of the kings from the pawn, adjusted for the tempo.
    let mut bk_distance = distance(wp, bk);
    let mut wk_distance = distance(wp, wk);
    if wtm {
        wk_distance -= 1;
    } else {
        bk_distance -= 1;
    }

    // Black snaps up the undefended pawn right now.
    if !wtm && bk_distance <= 0 && wk_distance > 1 {
        return KpkOutcome::ExactDraw;
    }

    // Pawn on the 7th rank.
    if wpr == 6 {
        if wtm {
            if wpf != 0
                && bk == wp + 8
                && ((wpf > 0 && distance(wk, wp - 9) == 1)
                    || (wpf < 7 && distance(wk, wp - 7) == 1))
            {
                return KpkOutcome::Win;
            }
            if wpf > 0 && bk == wp + 1 && distance(wk, wp - 1) <= 1 {
                return KpkOutcome::Win;
            }
            if wpf < 7 && bk + 1 == wp && distance(wk, wp + 1) <= 1 {
                return KpkOutcome::Win;
            }
        } else {
            let front_left = wpf > 0;
            let front_right = wpf < 7;
            if (front_left && wk == wp + 7) || (front_right && wk == wp + 9) {
                return KpkOutcome::Win;
            }
        }
    }

    // Black blocks the file and gets to the pawn first.
    if wtm && bkf == wpf && bkr > wpr && wkr > bkr {
        return KpkOutcome::ExactDraw;
    }

    // A stalemate trap that would otherwise read as a win.
    if bk == Squares::A8 && wp == Squares::B6 && (wk == Squares::C8 || wk == Squares::C7) {
        return if wtm {
            KpkOutcome::Win
        } else {
            KpkOutcome::ExactDraw
        };
    }

    // Rook pawns need special care before the general rules apply.
    if wpf == 0 {
        if bkf <= 1 && bkr > wpr {
            return KpkOutcome::ExactDraw;
        }

        if wk == Squares::A8 && wp == Squares::A7 {
            if bk == Squares::C8
                || bk == Squares::C7
                || (!wtm && distance(bk, Squares::C7) <= 1)
            {
                return KpkOutcome::ExactDraw;
            }
        }
    }

    // The king sits in the pawn's effective zone.
    let effective = wkf >= wpf - 1
        && wkf <= wpf + 1
        && wkr >= wpr + 1 + i32::from(wpr < 4)
        && wpf != 0;

    // A double step from the start square may win the race outright.
    if wtm
        && wpr == 1
        && wk != wp + 8
        && bk != wp + 8
        && wk != wp + 16
        && bk != wp + 16
    {
        let wp1 = wp + 16;
        if distance(wp1, bk) >= distance(wp1, wk) && effective {
            return KpkOutcome::Win;
        }
    }

    // The square rule: black is simply too far from the queening square.
    let wp_to_goal = 7 - wpr - i32::from(wpr == 1);
    let goal = file_rank_to_square(wpf as usize, 7);
    let bk_to_goal = distance(bk, goal) - i32::from(!wtm);

    if bk_to_goal > wp_to_goal {
        return KpkOutcome::Win;
    }

    // White king between the pawn and the black king.
    if (bkf < wkf && wkf < wpf) || (bkf > wkf && wkf > wpf) {
        if (((bkr == 7) || (bkr == 6 && wtm)) && wkr >= 6)
            || (wtm && linear(bkr, wkr) <= 1)
            || (wkr >= bkr && wpr >= wkr - 1)
        {
            return KpkOutcome::Win;
        }
    }

    // In the square and closer to the pawn: black holds.
    if bk_distance < wk_distance {
        return KpkOutcome::Draw;
    }

    if effective {
        return KpkOutcome::Win;
    }

    // The white king reaches the effective zone before black can.
    if wtm && wkr > wpr && (bk != Squares::A8 || wp != Squares::B6) {
        let mut win = false;
        win |= wkf < wpf && bkf > wpf && linear(wkf, wpf - 2) <= linear(bkf, wpf + 1);
        win |= wkf > wpf && bkf < wpf && linear(wkf, wpf + 2) <= linear(bkf, wpf - 1);
        win |= wkf < wpf && bkf < wkf;
        win |= wkf > wpf && bkf > wkf && (wpf != 0 || (7 - wpr) <= bkf);

        if win {
            return KpkOutcome::Win;
        }
    }

    // Relatively effective zone: white still needs the opposition.
    let eff_rank = wpr + i32::from(wpr < 4);
    if !wtm && wpr != 4 && wkf >= wpf - 1 && wkf <= wpf + 1 && wkr >= eff_rank && wpf != 0 {
        let df = linear(wkf, bkf);
        let dr = linear(wkr, bkr);
        if (df == 0 || df == 2) && (dr == 0 || dr == 2 || dr == 4) {
            return KpkOutcome::Win;
        }
    }

    KpkOutcome::Unknown
}

fn kpk_info(
    bases: &BitBases,
    wk: Square,
    wp: Square,
    bk: Square,
    wtm: bool,
) -> Option<RecognizerInfo> {
    match evaluate_kpk(bases, wk, wp, bk, wtm) {
        KpkOutcome::Draw => Some(RecognizerInfo::lower(0)),
        KpkOutcome::ExactDraw => Some(RecognizerInfo::exact(0)),
        KpkOutcome::Win => Some(RecognizerInfo::lower(kpk_win_value(wk, wp, bk))),
        KpkOutcome::Unknown => None,
    }
}

fn edge_distance(sq: Square) -> i32 {
    let f = square_file(sq) as i32;
    let r = square_rank(sq) as i32;
    f.min(7 - f).min(r.min(7 - r))
}

// KPPK: bitbase only. `mirror` flips ranks first (for the black side).
fn kppk_info(
    bases: &BitBases,
    mut wk: Square,
    mut bk: Square,
    pawns: u64,
    wtm: bool,
    mirror: bool,
) -> Option<RecognizerInfo> {
    let bb = bases.get(BitBaseId::Kppk, wtm)?;

    let mut pawns = pawns;
    let mut p1 = bits::next(&mut pawns);
    let mut p2 = bits::first(pawns);

    if mirror {
        wk = flip_rank(wk);
        bk = flip_rank(bk);
        p1 = flip_rank(p1);
        p2 = flip_rank(p2);
    }

    bitbase::mirror_wk4(&mut wk, &mut bk, &mut p1, &mut p2);

    if bb.get(bitbase::index4(BitBaseId::Kppk, wk, bk, p1, p2)) != 0 {
        let best_rank = square_rank(p1).max(square_rank(p2)) as i32;
        Some(RecognizerInfo::lower(
            KPPK_WIN_SCORE + 20 * best_rank - 12 * edge_distance(bk) - 6 * distance(wk, bk),
        ))
    } else {
        Some(RecognizerInfo::exact(0))
    }
}

// KBPK: bitbase only; without it the search has to work it out.
fn kbpk_info(
    bases: &BitBases,
    mut wk: Square,
    mut bk: Square,
    mut wb: Square,
    mut wp: Square,
    wtm: bool,
) -> Option<RecognizerInfo> {
    let bb = bases.get(BitBaseId::Kbpk, wtm)?;

    bitbase::mirror_wk4(&mut wk, &mut bk, &mut wb, &mut wp);

    if bb.get(bitbase::index4(BitBaseId::Kbpk, wk, bk, wb, wp)) != 0 {
        Some(RecognizerInfo::lower(kpk_win_value(wk, wp, bk)))
    } else {
        Some(RecognizerInfo::exact(0))
    }
}

// Handlers. Results are relative to the side on move.

pub fn white_pawns(board: &Board, bases: &BitBases) -> Option<RecognizerInfo> {
    let result = match board.num_pawns(Sides::WHITE) {
        1 => {
            let pawn = bits::first(board.bb_pawns[Sides::WHITE]);
            kpk_info(
                bases,
                board.king_square[Sides::WHITE],
                pawn,
                board.king_square[Sides::BLACK],
                board.white_to_move(),
            )
        }
        2 => kppk_info(
            bases,
            board.king_square[Sides::WHITE],
            board.king_square[Sides::BLACK],
            board.bb_pawns[Sides::WHITE],
            board.white_to_move(),
            false,
        ),
        _ => None,
    }?;

    Some(if board.white_to_move() {
        result
    } else {
        result.negate()
    })
}

pub fn black_pawns(board: &Board, bases: &BitBases) -> Option<RecognizerInfo> {
    // The evaluator only knows the white-strong shape; mirror the board.
    let result = match board.num_pawns(Sides::BLACK) {
        1 => {
            let pawn = bits::first(board.bb_pawns[Sides::BLACK]);
            kpk_info(
                bases,
                flip_rank(board.king_square[Sides::BLACK]),
                flip_rank(pawn),
                flip_rank(board.king_square[Sides::WHITE]),
                !board.white_to_move(),
            )
        }
        2 => kppk_info(
            bases,
            board.king_square[Sides::BLACK],
            board.king_square[Sides::WHITE],
            board.bb_pawns[Sides::BLACK],
            !board.white_to_move(),
            true,
        ),
        _ => None,
    }?;

    Some(if board.white_to_move() {
        result.negate()
    } else {
        result
    })
}

pub fn white_bishop_pawn(board: &Board, bases: &BitBases) -> Option<RecognizerInfo> {
    if board.num_bishops(Sides::WHITE) != 1 || board.num_pawns(Sides::WHITE) != 1 {
        return None;
    }

    let result = kbpk_info(
        bases,
        board.king_square[Sides::WHITE],
        board.king_square[Sides::BLACK],
        bits::first(board.bb_queens_bishops[Sides::WHITE]),
        bits::first(board.bb_pawns[Sides::WHITE]),
        board.white_to_move(),
    )?;

    Some(if board.white_to_move() {
        result
    } else {
        result.negate()
    })
}

pub fn black_bishop_pawn(board: &Board, bases: &BitBases) -> Option<RecognizerInfo> {
    if board.num_bishops(Sides::BLACK) != 1 || board.num_pawns(Sides::BLACK) != 1 {
        return None;
    }

    let result = kbpk_info(
        bases,
        flip_rank(board.king_square[Sides::BLACK]),
        flip_rank(board.king_square[Sides::WHITE]),
        flip_rank(bits::first(board.bb_queens_bishops[Sides::BLACK])),
        flip_rank(bits::first(board.bb_pawns[Sides::BLACK])),
        !board.white_to_move(),
    )?;

    Some(if board.white_to_move() {
        result.negate()
    } else {
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::Bound;

    fn board_from(fen: &str) -> Board {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        board
    }

    #[test]
    fn square_rule_win() {
        // Black king hopelessly far from the queening square.
        let board = board_from("8/8/8/8/3P4/8/k3K3/8 w - - 0 1");
        let info = white_pawns(&board, &BitBases::empty()).unwrap();
        assert_eq!(info.bound, Bound::LowerBound);
        assert!(info.value >= KPK_WIN_SCORE - 200);
    }

    #[test]
    fn rook_pawn_corner_is_drawn() {
        // Black king in front of the a-pawn: dead draw.
        let board = board_from("k7/8/8/8/P7/8/8/K7 w - - 0 1");
        let info = white_pawns(&board, &BitBases::empty()).unwrap();
        assert_eq!(info, RecognizerInfo::exact(0));
    }

    #[test]
    fn effective_square_win() {
        let board = board_from("4k3/8/4K3/4P3/8/8/8/8 w - - 0 1");
        let info = white_pawns(&board, &BitBases::empty()).unwrap();
        assert_eq!(info.bound, Bound::LowerBound);
        assert!(info.value > 0);
    }

    #[test]
    fn black_pawn_mirrors_correctly() {
        // Black pawn on e4 with the black king escorting: winning for
        // black, and black is on move, so the score is positive.
        let board = board_from("8/8/8/8/4p3/4k3/8/4K3 b - - 0 1");
        let info = black_pawns(&board, &BitBases::empty());
        if let Some(info) = info {
            assert!(info.value > 0, "got {info:?}");
        }
    }

    #[test]
    fn pawn_capture_draw_is_exact() {
        // Black to move, takes the pawn: draw.
        let board = board_from("8/8/8/8/2k5/8/2P5/K7 b - - 0 1");
        let info = white_pawns(&board, &BitBases::empty()).unwrap();
        assert_eq!(info.value, 0);
    }

    #[test]
    fn kbpk_without_bitbase_is_unknown() {
        let board = board_from("4k3/8/8/8/8/8/P7/2B1K3 w - - 0 1");
        assert!(white_bishop_pawn(&board, &BitBases::empty()).is_none());
    }
}
