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

use crate::board::defs::{
    piece_type, square_file, square_name, square_rank, Pieces, Squares, PIECE_CHAR,
};
use crate::board::{Board, UndoInfo};
use crate::defs::Sides;
use crate::movegen::defs::{Move, MoveList};
use crate::movegen::MoveGenerator;

// Standard Algebraic Notation for a move in the given position. The
// move must be legal; check and mate suffixes come from a trial run.
pub fn move_to_san(board: &Board, m: Move) -> String {
    let mut board = board.clone();
    let piece = board.piece_list[m.from()];
    let mut san = String::new();

    let is_castle_king = piece_type(piece) == Pieces::KING && m.to() == m.from() + 2;
    let is_castle_queen = piece_type(piece) == Pieces::KING && m.to() + 2 == m.from();

    if is_castle_king {
        san.push_str("O-O");
    } else if is_castle_queen {
        san.push_str("O-O-O");
    } else {
        let is_pawn = piece_type(piece) == Pieces::PAWN;
        let is_capture = m.is_capture()
            || (is_pawn && board.piece_list[m.to()] != Pieces::NONE)
            || (is_pawn && board.game_state.en_passant_square() == Some(m.to()));

        if !is_pawn {
            san.push(PIECE_CHAR[piece_type(piece) | Sides::WHITE]);
            san.push_str(&disambiguation(&board, m, piece));
        } else if is_capture {
            san.push((b'a' + square_file(m.from()) as u8) as char);
        }

        if is_capture {
            san.push('x');
        }

        san.push_str(&square_name(m.to()));

        if m.is_promotion() {
            san.push('=');
            san.push(PIECE_CHAR[piece_type(m.promoted()) | Sides::WHITE]);
        }
    }

    // Suffix: '+' for check, '#' for mate.
    let mut trial = m;
    let undo = UndoInfo::new(&board);
    if board.do_move(&mut trial).is_ok() && board.game_state.side_to_move_in_check() {
        let mut replies = MoveList::new();
        MoveGenerator::get().generate_valid_moves(&board, &mut replies);
        san.push(if replies.is_empty() { '#' } else { '+' });
    }
    board.undo_move(&trial, &undo);

    san
}

// File or rank prefix when two same-type pieces can reach the square.
fn disambiguation(board: &Board, m: Move, piece: usize) -> String {
    let mg = MoveGenerator::get();
    let mut candidates = MoveList::new();
    mg.generate_moves_to_square(board, m.to(), &mut candidates);

    let mut same_file = false;
    let mut same_rank = false;
    let mut others = false;

    for other in candidates.iter() {
        if other.from() == m.from() || board.piece_list[other.from()] != piece {
            continue;
        }

        // Only legal alternatives force disambiguation.
        let mut scratch = board.clone();
        let mut trial = *other;
        let undo = UndoInfo::new(&scratch);
        let legal = scratch.do_move(&mut trial).is_ok();
        scratch.undo_move(&trial, &undo);
        if !legal {
            continue;
        }

        others = true;
        if square_file(other.from()) == square_file(m.from()) {
            same_file = true;
        }
        if square_rank(other.from()) == square_rank(m.from()) {
            same_rank = true;
        }
    }

    if !others {
        String::new()
    } else if !same_file {
        format!("{}", (b'a' + square_file(m.from()) as u8) as char)
    } else if !same_rank {
        format!("{}", (b'1' + square_rank(m.from()) as u8) as char)
    } else {
        square_name(m.from())
    }
}

// Accepts long algebraic ("e2e4", "e7e8q") and the usual castle
// spellings. Returns a fully validated move or None.
pub fn text_to_move(board: &Board, text: &str) -> Option<Move> {
    let text = text.trim().trim_end_matches(['+', '#']);

    let castle = match text {
        "O-O" | "o-o" | "0-0" => Some(true),
        "O-O-O" | "o-o-o" | "0-0-0" => Some(false),
        _ => None,
    };

    let m = if let Some(king_side) = castle {
        let home = if board.us() == Sides::WHITE {
            Squares::E1
        } else {
            Squares::E8
        };
        let to = if king_side { home + 2 } else { home - 2 };
        Move::new(home, to)
    } else {
        let (from, to, promotion) = crate::misc::parse::algebraic_move_to_number(text).ok()?;
        let promotion = crate::misc::parse::promotion_with_side(promotion, board.us());
        if promotion == Pieces::NONE {
            Move::new(from, to)
        } else {
            Move::new_promotion(from, to, promotion)
        }
    };

    if !board.is_valid_move(&m) {
        return None;
    }

    // Fill in moved/captured/en-passant and reject self-check.
    let mut scratch = board.clone();
    let mut filled = m;
    let undo = UndoInfo::new(&scratch);
    let legal = scratch.do_move(&mut filled).is_ok();
    scratch.undo_move(&filled, &undo);

    if legal {
        Some(filled)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::FEN_START_POSITION;

    fn board_from(fen: &str) -> Board {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        board
    }

    fn san_of(fen: &str, lan: &str) -> String {
        let board = board_from(fen);
        let m = text_to_move(&board, lan).expect("legal move");
        move_to_san(&board, m)
    }

    #[test]
    fn pawn_and_piece_moves() {
        assert_eq!(san_of(FEN_START_POSITION, "e2e4"), "e4");
        assert_eq!(san_of(FEN_START_POSITION, "g1f3"), "Nf3");
    }

    #[test]
    fn captures_and_promotions() {
        assert_eq!(
            san_of("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2", "e4d5"),
            "exd5"
        );
        assert_eq!(san_of("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7a8q"), "a8=Q+");
    }

    #[test]
    fn castling_text() {
        let board = board_from("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let short = text_to_move(&board, "O-O").unwrap();
        assert_eq!(move_to_san(&board, short), "O-O");
        let long = text_to_move(&board, "0-0-0").unwrap();
        assert_eq!(move_to_san(&board, long), "O-O-O");
    }

    #[test]
    fn knight_disambiguation() {
        // Both knights can reach d2.
        let board = board_from("4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1");
        let m = text_to_move(&board, "b1d2").unwrap();
        assert_eq!(move_to_san(&board, m), "Nbd2");
        let m = text_to_move(&board, "f3d2").unwrap();
        assert_eq!(move_to_san(&board, m), "Nfd2");
    }

    #[test]
    fn mate_suffix() {
        let board = board_from("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1");
        let m = text_to_move(&board, "a1a8").unwrap();
        assert_eq!(move_to_san(&board, m), "Ra8#");
    }

    #[test]
    fn illegal_text_is_rejected() {
        let board = board_from(FEN_START_POSITION);
        assert!(text_to_move(&board, "e2e5").is_none());
        assert!(text_to_move(&board, "banana").is_none());
        assert!(text_to_move(&board, "O-O").is_none());
    }
}
