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

use super::packed::PackedArray;
use super::{index4, index_range, info_for, BbFlags, BitBaseId};
use crate::board::defs::{piece_type, square_file, Pieces, BB_SQUARES};
use crate::board::Board;
use crate::defs::{Bitboard, Piece, Square};
use crate::movegen::MoveGenerator;

struct EnumPiece {
    piece: Piece,
    min_pos: usize,
    max_pos: usize,
    pos: usize,
}

// Enumerates all placements of a small piece set: white king, black
// king, then any added pieces, odometer style. Pawns are restricted to
// ranks 2-7.
pub struct PositionEnumerator {
    pieces: Vec<EnumPiece>,
    exhausted: bool,
}

impl PositionEnumerator {
    pub fn new() -> Self {
        let kings = vec![
            EnumPiece {
                piece: Pieces::WHITE_KING,
                min_pos: 0,
                max_pos: 63,
                pos: 0,
            },
            EnumPiece {
                piece: Pieces::BLACK_KING,
                min_pos: 0,
                max_pos: 63,
                pos: 0,
            },
        ];
        Self {
            pieces: kings,
            exhausted: false,
        }
    }

    pub fn add_piece(&mut self, piece: Piece) {
        let (min_pos, max_pos) = if piece_type(piece) == Pieces::PAWN {
            (8, 55)
        } else {
            (0, 63)
        };
        self.pieces.push(EnumPiece {
            piece,
            min_pos,
            max_pos,
            pos: min_pos,
        });
    }

    pub fn has_more_positions(&self) -> bool {
        !self.exhausted
    }

    pub fn goto_next_position(&mut self) -> bool {
        // Increment from the last piece backwards.
        for i in (0..self.pieces.len()).rev() {
            if self.pieces[i].pos < self.pieces[i].max_pos {
                self.pieces[i].pos += 1;
                return true;
            }
            self.pieces[i].pos = self.pieces[i].min_pos;
        }
        self.exhausted = true;
        false
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn white_king_pos(&self) -> Square {
        self.pieces[0].pos
    }

    pub fn black_king_pos(&self) -> Square {
        self.pieces[1].pos
    }

    pub fn piece_pos(&self, index: usize) -> Square {
        self.pieces[index].pos
    }

    pub fn piece(&self, index: usize) -> Piece {
        self.pieces[index].piece
    }

    /*
        A placement is a legal position with the given side to move when
        no two pieces overlap, the kings do not touch, and the side that
        is not on move is not in check. Only white carries extra pieces
        in the shipped bitbases, so the latter test reduces to "white
        does not attack the black king" when white is on move.
    */
    pub fn is_valid_position(&self, white_to_move: bool) -> bool {
        let mg = MoveGenerator::get();

        let mut occupancy: Bitboard = 0;
        for p in &self.pieces {
            if occupancy & BB_SQUARES[p.pos] != 0 {
                return false;
            }
            occupancy |= BB_SQUARES[p.pos];
        }

        let wk = self.white_king_pos();
        let bk = self.black_king_pos();
        if mg.at.distance[wk][bk] <= 1 {
            return false;
        }

        if white_to_move {
            for p in &self.pieces[2..] {
                if attacks_square(mg, p.piece, p.pos, occupancy, bk) {
                    return false;
                }
            }
        }

        true
    }

    // Builds a real Board for the current placement, for oracle probes.
    pub fn to_board(&self, white_to_move: bool) -> Board {
        let mut board = Board::new();
        board.reset();

        let mut piece_list = [Pieces::NONE; 64];
        for p in &self.pieces {
            piece_list[p.pos] = p.piece;
        }

        board.piece_list = piece_list;
        board.game_state.active_color = if white_to_move { 1 } else { 0 };
        board.init();

        if board.is_side_in_check(board.us()) {
            board.game_state.flags |= crate::board::defs::Flags::SIDE_TO_MOVE_IN_CHECK;
        }

        board
    }
}

impl Default for PositionEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

fn attacks_square(
    mg: &MoveGenerator,
    piece: Piece,
    from: Square,
    occupancy: Bitboard,
    target: Square,
) -> bool {
    let target_bit = BB_SQUARES[target];
    match piece_type(piece) {
        Pieces::PAWN => {
            mg.at.pawn_capts[crate::board::defs::piece_side(piece)][from] & target_bit != 0
        }
        Pieces::KNIGHT => mg.at.knight[from] & target_bit != 0,
        Pieces::BISHOP => slider_hits(mg, from, target, occupancy, true),
        Pieces::ROOK => slider_hits(mg, from, target, occupancy, false),
        Pieces::QUEEN => {
            slider_hits(mg, from, target, occupancy, true)
                || slider_hits(mg, from, target, occupancy, false)
        }
        _ => mg.at.king[from] & target_bit != 0,
    }
}

fn slider_hits(
    mg: &MoveGenerator,
    from: Square,
    target: Square,
    occupancy: Bitboard,
    diagonal: bool,
) -> bool {
    use crate::movegen::Direction;

    let dir = mg.at.dir(from, target);
    let on_line = match dir {
        Direction::Rank | Direction::File => !diagonal,
        Direction::DiagA1H8 | Direction::DiagA8H1 => diagonal,
        Direction::None => false,
    };

    on_line && mg.at.between[from][target] & occupancy == 0
}

// Probes an external tablebase-like oracle: a positive score means the
// side with the extra material (white) wins. None leaves the default.
pub trait EndgameOracle {
    fn probe(&self, board: &Board) -> Option<i32>;
}

/*
    Builds a bitbase by bootstrapping from an external oracle: every
    placement with the white king on files A-D is probed, and the win
    bit written into the packed array. The caller then runs save(),
    which applies the predictor XOR and the RLE packing.
*/
pub fn generate_bitbase(
    id: BitBaseId,
    white_to_move: bool,
    oracle: &dyn EndgameOracle,
) -> PackedArray {
    let info = info_for(id);
    let mut pa = PackedArray::new(index_range(id), info.bits);

    if info.flags & BbFlags::DEFAULT_IS_1 != 0 {
        pa.set_all();
    }

    let mut pos_enum = PositionEnumerator::new();
    for &piece in info.pieces {
        pos_enum.add_piece(piece);
    }

    loop {
        if square_file(pos_enum.white_king_pos()) < 4
            && pos_enum.is_valid_position(white_to_move)
        {
            let wk = pos_enum.white_king_pos();
            let bk = pos_enum.black_king_pos();
            let index = if info.pieces.len() == 1 {
                super::index3(id, wk, bk, pos_enum.piece_pos(2))
            } else {
                index4(id, wk, bk, pos_enum.piece_pos(2), pos_enum.piece_pos(3))
            };

            let board = pos_enum.to_board(white_to_move);
            if let Some(score) = oracle.probe(&board) {
                pa.set(index, (score > 0) as u8);
            }
        }

        if !pos_enum.goto_next_position() {
            break;
        }
    }

    pa
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerator_visits_every_two_king_placement() {
        let mut pos_enum = PositionEnumerator::new();
        let mut count = 1usize;
        while pos_enum.goto_next_position() {
            count += 1;
        }
        assert_eq!(count, 64 * 64);
    }

    #[test]
    fn adjacent_kings_are_invalid() {
        let mut pos_enum = PositionEnumerator::new();
        // wk = 0 (A1), advance bk to 1 (B1).
        pos_enum.goto_next_position();
        assert_eq!(pos_enum.white_king_pos(), 0);
        assert_eq!(pos_enum.black_king_pos(), 1);
        assert!(!pos_enum.is_valid_position(true));
    }

    #[test]
    fn pawn_positions_are_rank_limited() {
        let mut pos_enum = PositionEnumerator::new();
        pos_enum.add_piece(Pieces::WHITE_PAWN);
        assert_eq!(pos_enum.piece_pos(2), 8);
    }

    #[test]
    fn check_on_the_side_not_to_move_is_invalid() {
        let mut pos_enum = PositionEnumerator::new();
        pos_enum.add_piece(Pieces::WHITE_PAWN);
        // wk A1, bk D4 (27), white pawn C3 (18) attacks D4.
        while !(pos_enum.white_king_pos() == 0
            && pos_enum.black_king_pos() == 27
            && pos_enum.piece_pos(2) == 18)
        {
            if !pos_enum.goto_next_position() {
                panic!("target placement not reached");
            }
        }
        assert!(!pos_enum.is_valid_position(true));
        assert!(pos_enum.is_valid_position(false));
    }
}
