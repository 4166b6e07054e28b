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

use super::genbb::PositionEnumerator;
use super::packed::PackedArray;
use super::{index3, index4, info_for, AdjustOp, BitBaseId, BitBases};
use crate::board::defs::{square_file, square_rank, Squares, BB_SQUARES};
use crate::movegen::MoveGenerator;

/*
    Predictor XOR: before encoding, every stored bit is replaced with
    bit XOR predicted, where the prediction comes from simpler endgames
    or static rules. Correct predictions turn into zeros, and the RLE
    pass then compresses the long zero runs. Decoding applies the same
    XOR again. Encode and decode must walk the identical position set,
    or the transform would not be an involution.
*/

// KPPK is predicted from KPK for each pawn separately, with extra rules
// for second-rank and connected pawns.
pub fn adjust_kppk(
    pa: &mut PackedArray,
    bases: &BitBases,
    white_to_move: bool,
    _op: AdjustOp,
) -> Result<(), String> {
    let kpk_wtm = bases
        .get(BitBaseId::Kpk, true)
        .ok_or_else(|| String::from("KPPK predictor needs the KPK bitbase (wtm)"))?;
    let kpk_btm = bases
        .get(BitBaseId::Kpk, false)
        .ok_or_else(|| String::from("KPPK predictor needs the KPK bitbase (btm)"))?;

    // With white to move, the black-to-move table of this same endgame
    // is consulted as well (it is loaded first).
    let kppk_btm = if white_to_move {
        bases.get(BitBaseId::Kppk, false)
    } else {
        None
    };

    let mut pos_enum = PositionEnumerator::new();
    for &piece in info_for(BitBaseId::Kppk).pieces {
        pos_enum.add_piece(piece);
    }

    loop {
        if square_file(pos_enum.white_king_pos()) < 4 {
            if pos_enum.is_valid_position(white_to_move) {
                let wk = pos_enum.white_king_pos();
                let bk = pos_enum.black_king_pos();
                let index = index4(
                    BitBaseId::Kppk,
                    wk,
                    bk,
                    pos_enum.piece_pos(2),
                    pos_enum.piece_pos(3),
                );

                let mut p1 = pos_enum.piece_pos(2);
                let mut p2 = pos_enum.piece_pos(3);
                if p1 > p2 {
                    std::mem::swap(&mut p1, &mut p2);
                }

                let mut predicted = kpk_wtm.get(index3(BitBaseId::Kpk, wk, bk, p1))
                    | kpk_wtm.get(index3(BitBaseId::Kpk, wk, bk, p2))
                    | kpk_btm.get(index3(BitBaseId::Kpk, wk, bk, p1))
                    | kpk_btm.get(index3(BitBaseId::Kpk, wk, bk, p2));

                // An extra pawn still on its home rank nearly always wins.
                if square_rank(p1) == 1 || square_rank(p2) == 1 {
                    predicted = 1;
                }

                // So do connected or nearly connected pawns.
                if square_file(p1) < 7 && p2 == p1 + 1 {
                    predicted = 1;
                }
                if square_file(p1) < 6 && p2 == p1 + 2 {
                    predicted = 1;
                }
                if square_file(p1) < 5 && p2 == p1 + 3 {
                    predicted = 1;
                }

                if let Some(btm) = kppk_btm {
                    predicted |= btm.get(index);
                }

                pa.set(index, pa.get(index) ^ (predicted & 1));
            }
        }

        if !pos_enum.goto_next_position() {
            break;
        }
    }

    Ok(())
}

// KBPK: almost always won; the exceptions cluster around the wrong
// colored bishop with a rook pawn and loose pieces next to the black
// king.
pub fn adjust_kbpk(
    pa: &mut PackedArray,
    _bases: &BitBases,
    white_to_move: bool,
    _op: AdjustOp,
) -> Result<(), String> {
    let mg = MoveGenerator::get();

    let mut pos_enum = PositionEnumerator::new();
    for &piece in info_for(BitBaseId::Kbpk).pieces {
        pos_enum.add_piece(piece);
    }

    loop {
        if square_file(pos_enum.white_king_pos()) < 4 {
            let wk = pos_enum.white_king_pos();
            let bk = pos_enum.black_king_pos();
            let wb = pos_enum.piece_pos(2);
            let wp = pos_enum.piece_pos(3);
            let index = index4(BitBaseId::Kbpk, wk, bk, wb, wp);

            let mut predicted = 1u8;

            if pos_enum.is_valid_position(white_to_move) {
                let is_light_bishop = (square_file(wb) + square_rank(wb)) & 1 != 0;
                let a_file_pawn = square_file(wp) == 0;

                if !white_to_move {
                    // Wrong-colored bishop on the rook file: the black
                    // king reaches the promotion corner in time.
                    if a_file_pawn
                        && !is_light_bishop
                        && mg.at.distance[bk][Squares::A8] < mg.at.distance[wk][Squares::A8]
                        && mg.at.distance[bk][Squares::A8] <= mg.at.distance[wp][Squares::A8]
                    {
                        predicted = 0;
                    }

                    // The pawn is loose and the black king snaps it up.
                    if mg.at.distance[bk][wp] == 1
                        && mg.at.bishop_empty[wb] & BB_SQUARES[wp] == 0
                        && mg.at.king[wk] & BB_SQUARES[wp] == 0
                    {
                        predicted = 0;
                    }
                } else if a_file_pawn
                    && !is_light_bishop
                    && mg.at.distance[bk][Squares::A8] < mg.at.distance[wk][Squares::A8] - 1
                    && mg.at.distance[bk][Squares::A8] < mg.at.distance[wp][Squares::A8]
                {
                    predicted = 0;
                }
            }

            pa.set(index, pa.get(index) ^ predicted);
        }

        if !pos_enum.goto_next_position() {
            break;
        }
    }

    Ok(())
}

// KBNK: always won, unless the black king immediately wins a loose
// piece.
pub fn adjust_kbnk(
    pa: &mut PackedArray,
    _bases: &BitBases,
    white_to_move: bool,
    _op: AdjustOp,
) -> Result<(), String> {
    let mg = MoveGenerator::get();

    let mut pos_enum = PositionEnumerator::new();
    for &piece in info_for(BitBaseId::Kbnk).pieces {
        pos_enum.add_piece(piece);
    }

    loop {
        if square_file(pos_enum.white_king_pos()) < 4 {
            let wk = pos_enum.white_king_pos();
            let bk = pos_enum.black_king_pos();
            let wb = pos_enum.piece_pos(2);
            let wn = pos_enum.piece_pos(3);
            let index = index4(BitBaseId::Kbnk, wk, bk, wb, wn);

            let mut predicted = 1u8;

            if !white_to_move && pos_enum.is_valid_position(false) {
                if mg.at.distance[bk][wb] <= 1
                    && mg.at.distance[wk][wb] > 1
                    && mg.at.knight[wn] & BB_SQUARES[wb] == 0
                {
                    predicted = 0;
                }
                if mg.at.distance[bk][wn] <= 1
                    && mg.at.distance[wk][wn] > 1
                    && mg.at.bishop_empty[wb] & BB_SQUARES[wn] == 0
                {
                    predicted = 0;
                }
            }

            pa.set(index, pa.get(index) ^ predicted);
        }

        if !pos_enum.goto_next_position() {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbase::index_range;

    // The predictor pass must be an involution: applying it twice gives
    // back the original data.
    fn involution(adjust: super::super::AdjustFn, id: BitBaseId, bases: &BitBases) {
        let mut pa = PackedArray::new(index_range(id), 1);
        // A few scattered bits.
        for i in (0..pa.elements()).step_by(9973) {
            pa.set(i, 1);
        }
        let original = pa.clone();

        adjust(&mut pa, bases, false, AdjustOp::Encode).unwrap();
        adjust(&mut pa, bases, false, AdjustOp::Decode).unwrap();

        assert_eq!(pa.raw_data(), original.raw_data());
    }

    #[test]
    fn kbpk_adjust_is_an_involution() {
        involution(adjust_kbpk, BitBaseId::Kbpk, &BitBases::empty());
    }

    #[test]
    fn kbnk_adjust_is_an_involution() {
        involution(adjust_kbnk, BitBaseId::Kbnk, &BitBases::empty());
    }

    #[test]
    fn kppk_adjust_requires_kpk() {
        let mut pa = PackedArray::new(index_range(BitBaseId::Kppk), 1);
        let result = adjust_kppk(&mut pa, &BitBases::empty(), false, AdjustOp::Decode);
        assert!(result.is_err());
    }

    #[test]
    fn kppk_adjust_is_an_involution_with_kpk_loaded() {
        let mut bases = BitBases::empty();
        bases.insert(
            BitBaseId::Kpk,
            true,
            PackedArray::new(index_range(BitBaseId::Kpk), 1),
        );
        bases.insert(
            BitBaseId::Kpk,
            false,
            PackedArray::new(index_range(BitBaseId::Kpk), 1),
        );
        involution(adjust_kppk, BitBaseId::Kppk, &bases);
    }
}
