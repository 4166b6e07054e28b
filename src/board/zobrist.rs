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

use crate::defs::{NrOf, Piece, Side, Sides, Square};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

pub type ZobristKey = u64;

const RNG_SEED: [u8; 32] = [125; 32];

// All sides and piece types, plus castling, en-passant and side to move,
// get their own random key. Keys are generated from a fixed seed so that
// every board instance hashes identically.
pub struct ZobristRandoms {
    rnd_pieces: [[[u64; NrOf::SQUARES]; NrOf::PIECE_TYPES + 1]; Sides::BOTH],
    rnd_castling: [u64; 16],
    rnd_sides: [u64; Sides::BOTH],
    rnd_en_passant: [u64; NrOf::SQUARES + 1],
}

impl ZobristRandoms {
    pub fn new() -> Self {
        let mut random = ChaCha20Rng::from_seed(RNG_SEED);
        let mut zobrist_randoms = Self {
            rnd_pieces: [[[0; NrOf::SQUARES]; NrOf::PIECE_TYPES + 1]; Sides::BOTH],
            rnd_castling: [0; 16],
            rnd_sides: [0; Sides::BOTH],
            rnd_en_passant: [0; NrOf::SQUARES + 1],
        };

        zobrist_randoms.rnd_pieces.iter_mut().for_each(|side| {
            side.iter_mut().for_each(|piece| {
                piece
                    .iter_mut()
                    .for_each(|square| *square = random.next_u64())
            })
        });

        zobrist_randoms
            .rnd_castling
            .iter_mut()
            .for_each(|permission| *permission = random.next_u64());

        zobrist_randoms
            .rnd_sides
            .iter_mut()
            .for_each(|side| *side = random.next_u64());

        zobrist_randoms
            .rnd_en_passant
            .iter_mut()
            .for_each(|ep| *ep = random.next_u64());

        zobrist_randoms
    }

    // Key for a piece code on a square. The piece code carries its own
    // side bit, so this is the only lookup the board needs.
    pub fn piece(&self, piece: Piece, square: Square) -> ZobristKey {
        let side = super::defs::piece_side(piece);
        let piece_type = super::defs::piece_type(piece) >> 1;
        self.rnd_pieces[side][piece_type][square]
    }

    pub fn castling(&self, castling_permissions: u8) -> ZobristKey {
        self.rnd_castling[castling_permissions as usize]
    }

    pub fn side(&self, side: Side) -> ZobristKey {
        self.rnd_sides[side]
    }

    pub fn en_passant(&self, en_passant: Option<u8>) -> ZobristKey {
        match en_passant {
            Some(ep) => self.rnd_en_passant[ep as usize],
            None => self.rnd_en_passant[NrOf::SQUARES],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Pieces;

    #[test]
    fn keys_are_deterministic() {
        let a = ZobristRandoms::new();
        let b = ZobristRandoms::new();
        assert_eq!(a.piece(Pieces::WHITE_KNIGHT, 12), b.piece(Pieces::WHITE_KNIGHT, 12));
        assert_eq!(a.castling(0b1010), b.castling(0b1010));
        assert_eq!(a.en_passant(Some(20)), b.en_passant(Some(20)));
    }

    #[test]
    fn keys_differ_between_features() {
        let zr = ZobristRandoms::new();
        assert_ne!(zr.piece(Pieces::WHITE_PAWN, 8), zr.piece(Pieces::BLACK_PAWN, 8));
        assert_ne!(zr.side(Sides::WHITE), zr.side(Sides::BLACK));
        assert_ne!(zr.en_passant(None), zr.en_passant(Some(0)));
    }
}
