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

use crate::board::defs::{file_rank_to_square, make_piece, Pieces};
use crate::defs::{Piece, Side, Square};
use if_chain::if_chain;

// A move as typed by the user or a GUI in long algebraic notation:
// from, to, and an optional promotion piece type.
pub type PotentialMove = (Square, Square, Piece);

// Turns "e2e4" / "e7e8q" into square numbers and a promotion piece type.
// The promotion piece is returned side-less; the caller adds the side.
pub fn algebraic_move_to_number(text: &str) -> Result<PotentialMove, ()> {
    let bytes = text.as_bytes();

    if_chain! {
        if bytes.len() == 4 || bytes.len() == 5;
        if let Some(from) = square_from_bytes(bytes[0], bytes[1]);
        if let Some(to) = square_from_bytes(bytes[2], bytes[3]);
        then {
            let promotion = if bytes.len() == 5 {
                match bytes[4].to_ascii_lowercase() {
                    b'q' => Pieces::QUEEN,
                    b'r' => Pieces::ROOK,
                    b'b' => Pieces::BISHOP,
                    b'n' => Pieces::KNIGHT,
                    _ => return Err(()),
                }
            } else {
                Pieces::NONE
            };
            Ok((from, to, promotion))
        } else {
            Err(())
        }
    }
}

pub fn promotion_with_side(promotion: Piece, side: Side) -> Piece {
    if promotion == Pieces::NONE {
        Pieces::NONE
    } else {
        make_piece(side, promotion)
    }
}

fn square_from_bytes(file: u8, rank: u8) -> Option<Square> {
    let file = file.to_ascii_lowercase();
    if (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank) {
        Some(file_rank_to_square((file - b'a') as usize, (rank - b'1') as usize))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Squares;

    #[test]
    fn parses_plain_and_promotion_moves() {
        assert_eq!(algebraic_move_to_number("e2e4"), Ok((Squares::E2, Squares::E4, Pieces::NONE)));
        assert_eq!(
            algebraic_move_to_number("e7e8q"),
            Ok((Squares::E7, Squares::E8, Pieces::QUEEN))
        );
        assert_eq!(
            algebraic_move_to_number("a7a8N"),
            Ok((Squares::A7, Squares::A8, Pieces::KNIGHT))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(algebraic_move_to_number("e2").is_err());
        assert!(algebraic_move_to_number("e2e9").is_err());
        assert!(algebraic_move_to_number("i2e4").is_err());
        assert!(algebraic_move_to_number("e7e8x").is_err());
    }
}
