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

use crate::board::{Board, UndoInfo, ZobristKey};
use crate::movegen::defs::Move;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/*
    The opening book is an external collaborator: a keyed store from
    position hash to weighted moves. Only the interface lives here; a
    real backing file is somebody else's problem, so the engine ships
    with the null implementation.
*/
#[derive(Clone, Copy)]
pub struct BookEntry {
    // From, to and promotion, as in Move::to_u24().
    pub packed_move: u32,
    pub weight: u32,
}

pub trait OpeningBook {
    fn probe(&self, key: ZobristKey) -> Vec<BookEntry>;
}

pub struct NullBook;

impl OpeningBook for NullBook {
    fn probe(&self, _key: ZobristKey) -> Vec<BookEntry> {
        Vec::new()
    }
}

// Picks a legal book move, weight-proportionally.
pub fn pick_book_move(book: &dyn OpeningBook, board: &Board) -> Option<Move> {
    let entries = book.probe(board.game_state.zobrist_key);
    if entries.is_empty() {
        return None;
    }

    // Keep only entries that decode to a legal move in this position.
    let mut candidates: Vec<(Move, u32)> = Vec::new();
    let mut scratch = board.clone();

    for entry in entries {
        let m = Move::from_u32(entry.packed_move & 0x00FF_FFFF);
        if !scratch.is_valid_move(&m) {
            continue;
        }

        let mut filled = m;
        let undo = UndoInfo::new(&scratch);
        let legal = scratch.do_move(&mut filled).is_ok();
        scratch.undo_move(&filled, &undo);

        if legal {
            candidates.push((filled, entry.weight.max(1)));
        }
    }

    if candidates.is_empty() {
        return None;
    }

    let total: u64 = candidates.iter().map(|(_, w)| *w as u64).sum();
    let mut pick = SmallRng::from_entropy().gen_range(0..total);

    for (m, weight) in candidates {
        if pick < weight as u64 {
            return Some(m);
        }
        pick -= weight as u64;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Squares;

    struct OneMoveBook(u32);

    impl OpeningBook for OneMoveBook {
        fn probe(&self, _key: ZobristKey) -> Vec<BookEntry> {
            vec![
                BookEntry {
                    packed_move: self.0,
                    weight: 10,
                },
                // An illegal suggestion that must be filtered out.
                BookEntry {
                    packed_move: Move::new(Squares::A1, Squares::H8).to_u24(),
                    weight: 100,
                },
            ]
        }
    }

    #[test]
    fn null_book_has_no_moves() {
        let mut board = Board::new();
        board.fen_read(None).unwrap();
        assert!(pick_book_move(&NullBook, &board).is_none());
    }

    #[test]
    fn legal_book_moves_are_picked_and_illegal_ones_dropped() {
        let mut board = Board::new();
        board.fen_read(None).unwrap();

        let wanted = Move::new(Squares::E2, Squares::E4);
        let book = OneMoveBook(wanted.to_u24());

        let picked = pick_book_move(&book, &board).unwrap();
        assert_eq!(picked, wanted);
    }
}
