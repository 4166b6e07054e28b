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

use super::RecognizerInfo;
use crate::bitbase::{self, flip_rank, BitBaseId, BitBases};
use crate::board::defs::{square_file, square_rank, Squares, BB_SQUARES};
use crate::board::Board;
use crate::defs::{Bitboard, Score, Sides, Square};
use crate::misc::bits;
use crate::movegen::MoveGenerator;

pub const KBBK_WIN_SCORE: i32 = 800;
pub const KBNK_WIN_SCORE: i32 = 800;

fn distance(a: Square, b: Square) -> i32 {
    MoveGenerator::get().at.distance[a][b] as i32
}

fn is_edge_square(sq: Square) -> bool {
    square_file(sq) == 0 || square_file(sq) == 7 || square_rank(sq) == 0 || square_rank(sq) == 7
}

fn flip_a1h8(sq: Square) -> Square {
    (sq >> 3) | ((sq & 7) << 3)
}

fn flip_a8h1(sq: Square) -> Square {
    63 - flip_a1h8(sq)
}

fn flip_file(sq: Square) -> Square {
    sq ^ 7
}

// Mirror a file about the pivot's file. A square whose mirror falls
// off the board maps to H8, which matches none of the patterns below.
fn flip_file_relative(sq: Square, pivot: Square) -> Square {
    let file = 2 * square_file(pivot) as i32 - square_file(sq) as i32;
    if (0..8).contains(&file) {
        (square_rank(sq) << 3) | file as usize
    } else {
        Squares::H8
    }
}

fn is_light_square(sq: Square) -> bool {
    (square_file(sq) + square_rank(sq)) & 1 != 0
}

fn edge_distance(sq: Square) -> i32 {
    let f = square_file(sq) as i32;
    let r = square_rank(sq) as i32;
    f.min(7 - f).min(r.min(7 - r))
}

fn corner_distance(sq: Square) -> i32 {
    distance(sq, Squares::A1)
        .min(distance(sq, Squares::A8))
        .min(distance(sq, Squares::H1))
        .min(distance(sq, Squares::H8))
}

// Distance to the nearest corner of the given square color.
fn colored_corner_distance(sq: Square, light: bool) -> i32 {
    if light {
        distance(sq, Squares::H1).min(distance(sq, Squares::A8))
    } else {
        distance(sq, Squares::A1).min(distance(sq, Squares::H8))
    }
}

// Bring the defending king to the A1-D1 strip, flipping everything
// along; when it lands on A1, also fold the attacking king into the
// lower octant.
fn defender_king_to_a1_d1(bk: &mut Square, wk: &mut Square, w1: &mut Square, w2: &mut Square) {
    let apply = |f: fn(Square) -> Square,
                 bk: &mut Square,
                 wk: &mut Square,
                 w1: &mut Square,
                 w2: &mut Square| {
        *bk = f(*bk);
        *wk = f(*wk);
        *w1 = f(*w1);
        *w2 = f(*w2);
    };

    if square_file(*bk) == 0 {
        apply(flip_a1h8, bk, wk, w1, w2);
    } else if square_file(*bk) == 7 {
        apply(flip_a8h1, bk, wk, w1, w2);
    } else if square_rank(*bk) == 7 {
        apply(flip_rank, bk, wk, w1, w2);
    }

    if square_rank(*bk) == 0 {
        if *bk >= Squares::E1 {
            apply(flip_file, bk, wk, w1, w2);
        }

        if *bk == Squares::A1 && square_rank(*wk) > square_file(*wk) {
            apply(flip_a1h8, bk, wk, w1, w2);
        }
    }
}

/*
    A perfect evaluator for KNNK. Out of more than 25 million positions
    everything is a draw except 240 checkmates and 1232 mates in one,
    which are recognized explicitly after normalizing the defending
    king to the A1-D1 strip.
*/
fn evaluate_knnk(
    mut wk: Square,
    mut bk: Square,
    knights: Bitboard,
    wtm: bool,
) -> RecognizerInfo {
    let mut rest = knights;
    let mut n1 = bits::next(&mut rest);
    let mut n2 = bits::first(rest);

    // Nearly everything is a draw.
    let mut result = RecognizerInfo::exact(0);

    if !is_edge_square(bk) {
        return result;
    }

    defender_king_to_a1_d1(&mut bk, &mut wk, &mut n1, &mut n2);

    if bk == Squares::B1 {
        return result;
    }

    if bk == Squares::C1 && (square_file(n1) == 7 || square_file(n2) == 7) {
        // The relative file flip below is not safe here and would
        // produce a couple of false positives.
        return result;
    }

    if bk >= Squares::C1 && square_rank(bk) == 0 && square_file(wk) < square_file(bk) {
        wk = flip_file_relative(wk, bk);
        n1 = flip_file_relative(n1, bk);
        n2 = flip_file_relative(n2, bk);
    }

    if n1 > n2 {
        std::mem::swap(&mut n1, &mut n2);
    }

    use Squares as Sq;

    if !wtm {
        // The defender may already be mated.
        let mated = if bk == Sq::A1 {
            let nb3b4 = n1 == Sq::B3 && n2 == Sq::B4;
            let nb3c3 = n1 == Sq::B3 && n2 == Sq::C3;

            (wk == Sq::C2 && (nb3b4 || nb3c3 || (n1 == Sq::C1 && n2 == Sq::B3)))
                || (wk == Sq::C1
                    && (nb3b4 || nb3c3 || (n1 == Sq::C2 && (n2 == Sq::C3 || n2 == Sq::B4))))
        } else {
            (bk == Sq::C1 && (wk == Sq::E1 || wk == Sq::E2) && n1 == Sq::A3 && n2 == Sq::D3)
                || (bk == Sq::D1 && (wk == Sq::F1 || wk == Sq::F2) && n1 == Sq::B3 && n2 == Sq::E3)
        };

        if mated {
            result = RecognizerInfo::exact(-Score::MATE);
        }
    } else {
        // Or there is a mate in one.
        let win = if bk == Sq::A1 {
            let n2_c3b4 = n2 == Sq::C3 || n2 == Sq::B4;

            let nn_both = (n1 == Sq::D2 && n2_c3b4)
                || (n1 == Sq::C3 && (n2 == Sq::A5 || n2 == Sq::C5 || n2 == Sq::D4))
                || (n1 == Sq::B4 && (n2 == Sq::D4 || n2 == Sq::A5 || n2 == Sq::C5));

            if wk == Sq::C1 {
                nn_both
                    || ((n1 == Sq::A3 || n1 == Sq::E1) && n2_c3b4)
                    || (n1 == Sq::C3 && (n2 == Sq::E3 || n2 == Sq::B4))
                    || (n1 == Sq::E3 && n2 == Sq::B4)
            } else if wk == Sq::C2 {
                nn_both
                    || (n1 == Sq::C1
                        && (n2 == Sq::D2 || n2_c3b4 || n2 == Sq::D4 || n2 == Sq::A5 || n2 == Sq::C5))
            } else {
                false
            }
        } else if bk == Sq::C1 {
            let nn_both = ((n1 == Sq::B2 || n1 == Sq::F2) && n2 == Sq::A3)
                || (n1 == Sq::A3
                    && (n2 == Sq::B4 || n2 == Sq::C5 || n2 == Sq::E5 || n2 == Sq::F4));

            (wk == Sq::E1 && nn_both) || (wk == Sq::E2 && (nn_both || (n1 == Sq::E1 && n2 == Sq::A3)))
        } else if bk == Sq::D1 {
            let nn_both = ((n1 == Sq::C2 || n1 == Sq::G2) && n2 == Sq::B3)
                || (n1 == Sq::B3
                    && (n2 == Sq::C4 || n2 == Sq::D5 || n2 == Sq::F5 || n2 == Sq::G4));

            (wk == Sq::F1 && nn_both) || (wk == Sq::F2 && (nn_both || (n1 == Sq::F1 && n2 == Sq::B3)))
        } else {
            false
        };

        if win {
            result = RecognizerInfo::exact(Score::MATE - 2);
        }
    }

    result
}

fn kbbk_win_value(wk: Square, bk: Square) -> i32 {
    let edge = edge_distance(bk);
    let mut result = KBBK_WIN_SCORE - 16 * edge - 8 * distance(bk, wk);

    if edge == 0 {
        result += 100 - 16 * corner_distance(bk);
    }

    result
}

/*
    A near-perfect KBBK evaluator. Same-colored bishops never win;
    opposite-colored bishops win unless the defender grabs a loose
    bishop right away or a known stalemate cage appears in the corner.
*/
fn evaluate_kbbk(
    mut wk: Square,
    mut bk: Square,
    bishops: Bitboard,
    wtm: bool,
) -> RecognizerInfo {
    let mut rest = bishops;
    let mut b1 = bits::next(&mut rest);
    let mut b2 = bits::first(rest);

    if is_light_square(b1) == is_light_square(b2) {
        return RecognizerInfo::exact(0);
    }

    // The B2-G8 half diagonal; part of the known corner cage.
    const D_B2G8: Bitboard = 0x4020_1008_0402_0000;

    if wtm {
        let mut draw = false;

        if is_edge_square(bk) {
            defender_king_to_a1_d1(&mut bk, &mut wk, &mut b1, &mut b2);

            if bk == Squares::A1 {
                draw = (wk == Squares::C1 || wk == Squares::C2)
                    && (b1 == Squares::A2 || b2 == Squares::A2);
            } else if bk == Squares::B1 {
                draw = (wk == Squares::D1 || wk == Squares::D2 || wk == Squares::C3)
                    && (b1 == Squares::A1 || b2 == Squares::A1)
                    && (D_B2G8 & BB_SQUARES[b1] != 0 || D_B2G8 & BB_SQUARES[b2] != 0);
            }
        }

        if draw {
            RecognizerInfo::exact(0)
        } else {
            RecognizerInfo::lower(kbbk_win_value(wk, bk))
        }
    } else {
        let mut draw = false;

        // A loose bishop next to the defending king is simply lost.
        if distance(bk, b1) <= 1 && distance(wk, b1) > 1 {
            draw = true;
        }
        if distance(bk, b2) <= 1 && distance(wk, b2) > 1 {
            draw = true;
        }

        if !draw && is_edge_square(bk) && distance(bk, wk) == 2 {
            // Possible stalemate: check the cage properly.
            defender_king_to_a1_d1(&mut bk, &mut wk, &mut b1, &mut b2);

            let attacked = bishop_pair_attacks(wk, b1, b2);

            let mut stale = attacked & BB_SQUARES[bk + 8] != 0
                && attacked & BB_SQUARES[bk + 9] != 0
                && attacked & BB_SQUARES[bk + 1] != 0;

            if bk > Squares::A1 {
                stale = stale
                    && attacked & BB_SQUARES[bk + 7] != 0
                    && attacked & BB_SQUARES[bk - 1] != 0;
            }

            if stale && attacked & BB_SQUARES[bk] == 0 {
                draw = true;
            } else if bk == Squares::C1
                && wk == Squares::C3
                && (b1 == Squares::A1 || b2 == Squares::A1)
                && (D_B2G8 & BB_SQUARES[b1] != 0 || D_B2G8 & BB_SQUARES[b2] != 0)
            {
                draw = true;
            }
        }

        if draw {
            RecognizerInfo::exact(0)
        } else {
            RecognizerInfo::upper(-kbbk_win_value(wk, bk))
        }
    }
}

// Squares covered by the attacking king and both bishops; bishop rays
// are blocked by the attacking king only, which is all the stalemate
// scan needs.
fn bishop_pair_attacks(wk: Square, b1: Square, b2: Square) -> Bitboard {
    let mg = MoveGenerator::get();
    let mut attacked = mg.at.king[wk];

    for bishop in [b1, b2] {
        for (df, dr) in [(-1i32, -1i32), (1, -1), (-1, 1), (1, 1)] {
            let mut f = square_file(bishop) as i32 + df;
            let mut r = square_rank(bishop) as i32 + dr;
            while (0..8).contains(&f) && (0..8).contains(&r) {
                let sq = (r as usize) << 3 | f as usize;
                if sq == wk {
                    break;
                }
                attacked |= BB_SQUARES[sq];
                f += df;
                r += dr;
            }
        }
    }

    attacked
}

fn kbnk_info(
    bases: &BitBases,
    mut wk: Square,
    mut bk: Square,
    mut wb: Square,
    mut wn: Square,
    wtm: bool,
) -> Option<RecognizerInfo> {
    let bb = bases.get(BitBaseId::Kbnk, wtm)?;

    let bishop_light = is_light_square(wb);
    bitbase::mirror_wk4(&mut wk, &mut bk, &mut wb, &mut wn);

    if bb.get(bitbase::index4(BitBaseId::Kbnk, wk, bk, wb, wn)) != 0 {
        Some(RecognizerInfo::lower(
            KBNK_WIN_SCORE - 8 * distance(wk, bk) - 16 * colored_corner_distance(bk, bishop_light),
        ))
    } else {
        Some(RecognizerInfo::exact(0))
    }
}

// Handlers. Scores are relative to the side on move; the KNNK and KBBK
// evaluators achieve that by taking the strong side's to-move flag.

pub fn white_knights(board: &Board, _bases: &BitBases) -> Option<RecognizerInfo> {
    match board.num_knights(Sides::WHITE) {
        1 => Some(RecognizerInfo::exact(0)),
        2 => Some(evaluate_knnk(
            board.king_square[Sides::WHITE],
            board.king_square[Sides::BLACK],
            board.bb_knights[Sides::WHITE],
            board.white_to_move(),
        )),
        _ => None,
    }
}

pub fn black_knights(board: &Board, _bases: &BitBases) -> Option<RecognizerInfo> {
    match board.num_knights(Sides::BLACK) {
        1 => Some(RecognizerInfo::exact(0)),
        2 => Some(evaluate_knnk(
            board.king_square[Sides::BLACK],
            board.king_square[Sides::WHITE],
            board.bb_knights[Sides::BLACK],
            !board.white_to_move(),
        )),
        _ => None,
    }
}

pub fn white_bishops(board: &Board, _bases: &BitBases) -> Option<RecognizerInfo> {
    match board.num_bishops(Sides::WHITE) {
        1 => Some(RecognizerInfo::exact(0)),
        2 => Some(evaluate_kbbk(
            board.king_square[Sides::WHITE],
            board.king_square[Sides::BLACK],
            board.bb_queens_bishops[Sides::WHITE],
            board.white_to_move(),
        )),
        _ => None,
    }
}

pub fn black_bishops(board: &Board, _bases: &BitBases) -> Option<RecognizerInfo> {
    match board.num_bishops(Sides::BLACK) {
        1 => Some(RecognizerInfo::exact(0)),
        2 => Some(evaluate_kbbk(
            board.king_square[Sides::BLACK],
            board.king_square[Sides::WHITE],
            board.bb_queens_bishops[Sides::BLACK],
            !board.white_to_move(),
        )),
        _ => None,
    }
}

pub fn white_bishop_knight(board: &Board, bases: &BitBases) -> Option<RecognizerInfo> {
    if board.num_bishops(Sides::WHITE) != 1 || board.num_knights(Sides::WHITE) != 1 {
        return None;
    }

    let result = kbnk_info(
        bases,
        board.king_square[Sides::WHITE],
        board.king_square[Sides::BLACK],
        bits::first(board.bb_queens_bishops[Sides::WHITE]),
        bits::first(board.bb_knights[Sides::WHITE]),
        board.white_to_move(),
    )?;

    Some(if board.white_to_move() {
        result
    } else {
        result.negate()
    })
}

pub fn black_bishop_knight(board: &Board, bases: &BitBases) -> Option<RecognizerInfo> {
    if board.num_bishops(Sides::BLACK) != 1 || board.num_knights(Sides::BLACK) != 1 {
        return None;
    }

    let result = kbnk_info(
        bases,
        flip_rank(board.king_square[Sides::BLACK]),
        flip_rank(board.king_square[Sides::WHITE]),
        flip_rank(bits::first(board.bb_queens_bishops[Sides::BLACK])),
        flip_rank(bits::first(board.bb_knights[Sides::BLACK])),
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
    fn knnk_ordinary_position_is_draw() {
        let board = board_from("4k3/8/8/8/8/8/8/1NN1K3 w - - 0 1");
        let info = white_knights(&board, &BitBases::empty()).unwrap();
        assert_eq!(info, RecognizerInfo::exact(0));
    }

    #[test]
    fn knnk_corner_mate_is_recognized() {
        // Black king a1, white king c2, knights b3 and b4: mate.
        let board = board_from("8/8/8/8/1N6/1N6/2K5/k7 b - - 0 1");
        assert!(board.game_state.side_to_move_in_check());
        let info = white_knights(&board, &BitBases::empty()).unwrap();
        assert_eq!(info, RecognizerInfo::exact(-Score::MATE));
    }

    #[test]
    fn knnk_mate_in_one_is_recognized() {
        // White to move: Nc1-b3 is mate (king a1 boxed by Kc2).
        let board = board_from("8/8/8/8/8/8/2K5/k1N4N w - - 0 1");
        let info = white_knights(&board, &BitBases::empty());
        // N1 = c1 n2 = h1: not a known mate pattern, must be a draw.
        assert_eq!(info.unwrap(), RecognizerInfo::exact(0));

        let board = board_from("8/8/8/8/1N6/8/2K5/k1N5 w - - 0 1");
        let info = white_knights(&board, &BitBases::empty()).unwrap();
        assert_eq!(info, RecognizerInfo::exact(Score::MATE - 2));
    }

    #[test]
    fn same_colored_bishops_draw() {
        // Both bishops on dark squares.
        let board = board_from("4k3/8/8/8/8/8/8/B1B1K3 w - - 0 1");
        let info = white_bishops(&board, &BitBases::empty()).unwrap();
        assert_eq!(info, RecognizerInfo::exact(0));
    }

    #[test]
    fn opposite_bishops_press_the_win() {
        let board = board_from("4k3/8/8/8/8/8/8/BB2K3 w - - 0 1");
        let info = white_bishops(&board, &BitBases::empty()).unwrap();
        assert_eq!(info.bound, Bound::LowerBound);
        assert!(info.value > 0);
    }

    #[test]
    fn loose_bishop_capture_is_draw() {
        // Black king next to two undefended bishops, black to move.
        let board = board_from("8/8/8/8/8/8/1k6/1BB2K2 b - - 0 1");
        let info = white_bishops(&board, &BitBases::empty()).unwrap();
        assert_eq!(info, RecognizerInfo::exact(0));
    }

    #[test]
    fn kbnk_without_bitbase_is_unknown() {
        let board = board_from("4k3/8/8/8/8/8/8/1BN1K3 w - - 0 1");
        assert!(white_bishop_knight(&board, &BitBases::empty()).is_none());
    }

    #[test]
    fn black_strong_side_mirrors() {
        let board = board_from("4k1nn/8/8/8/8/8/8/4K3 b - - 0 1");
        let info = black_knights(&board, &BitBases::empty()).unwrap();
        assert_eq!(info, RecognizerInfo::exact(0));
    }
}
