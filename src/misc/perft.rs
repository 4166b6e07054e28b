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

use crate::board::{Board, UndoInfo};
use crate::movegen::defs::MoveList;
use crate::movegen::MoveGenerator;
use std::time::Instant;

// Counts leaf nodes of the legal move tree. This is the canonical test
// for the board, the generators, and do/undo.
pub fn perft(board: &mut Board, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mg = MoveGenerator::get();
    let mut list = MoveList::new();
    if board.game_state.side_to_move_in_check() {
        mg.generate_check_escapes(board, &mut list);
    } else {
        mg.generate_moves(board, &mut list);
    }

    let mut leaves = 0;
    for i in 0..list.len() {
        let mut m = list.get(i);
        let undo = UndoInfo::new(board);
        if board.do_move(&mut m).is_ok() {
            leaves += perft(board, depth - 1);
        }
        board.undo_move(&m, &undo);
    }

    leaves
}

// Perft with a per-root-move breakdown, printed the way most engines do.
pub fn divide(board: &mut Board, depth: u8) -> u64 {
    let mg = MoveGenerator::get();
    let mut list = MoveList::new();
    mg.generate_valid_moves(board, &mut list);

    let start = Instant::now();
    let mut total = 0;

    for i in 0..list.len() {
        let mut m = list.get(i);
        let undo = UndoInfo::new(board);
        if board.do_move(&mut m).is_ok() {
            let leaves = if depth > 1 { perft(board, depth - 1) } else { 1 };
            total += leaves;
            println!("{}: {}", m.as_string(), leaves);
        }
        board.undo_move(&m, &undo);
    }

    let elapsed = start.elapsed().as_millis().max(1);
    println!(
        "Total: {} moves, {} leaves ({} ms, {} leaves/sec)",
        list.len(),
        total,
        elapsed,
        total as u128 * 1000 / elapsed
    );

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FEN_KIWIPETE_POSITION, FEN_START_POSITION};

    fn perft_from(fen: &str, depth: u8) -> u64 {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        perft(&mut board, depth)
    }

    #[test]
    fn start_position_shallow() {
        assert_eq!(perft_from(FEN_START_POSITION, 1), 20);
        assert_eq!(perft_from(FEN_START_POSITION, 2), 400);
        assert_eq!(perft_from(FEN_START_POSITION, 3), 8_902);
        assert_eq!(perft_from(FEN_START_POSITION, 4), 197_281);
    }

    #[test]
    fn kiwipete_shallow() {
        assert_eq!(perft_from(FEN_KIWIPETE_POSITION, 1), 48);
        assert_eq!(perft_from(FEN_KIWIPETE_POSITION, 2), 2_039);
        assert_eq!(perft_from(FEN_KIWIPETE_POSITION, 3), 97_862);
    }

    #[test]
    fn en_passant_discoveries() {
        // Exercises en-passant check evasion and pins.
        let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
        assert_eq!(perft_from(fen, 1), 14);
        assert_eq!(perft_from(fen, 2), 191);
        assert_eq!(perft_from(fen, 3), 2_812);
        assert_eq!(perft_from(fen, 4), 43_238);
        assert_eq!(perft_from(fen, 5), 674_624);
    }

    #[test]
    fn promotion_heavy_position() {
        let fen = "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1";
        assert_eq!(perft_from(fen, 1), 24);
        assert_eq!(perft_from(fen, 2), 496);
        assert_eq!(perft_from(fen, 3), 9_483);
        assert_eq!(perft_from(fen, 4), 182_838);
    }

    #[test]
    fn castling_rights_position() {
        // Position 5 from the usual perft table.
        let fen = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
        assert_eq!(perft_from(fen, 1), 44);
        assert_eq!(perft_from(fen, 2), 1_486);
        assert_eq!(perft_from(fen, 3), 62_379);
    }

    // The deep reference counts. Slow in debug builds, so ignored by
    // default; run with `cargo test --release -- --ignored`.
    #[test]
    #[ignore]
    fn start_position_deep() {
        assert_eq!(perft_from(FEN_START_POSITION, 5), 4_865_609);
        assert_eq!(perft_from(FEN_START_POSITION, 6), 119_060_324);
    }

    #[test]
    #[ignore]
    fn kiwipete_deep() {
        assert_eq!(perft_from(FEN_KIWIPETE_POSITION, 4), 4_085_603);
    }

    #[test]
    #[ignore]
    fn en_passant_deep() {
        assert_eq!(perft_from("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 6), 11_030_083);
    }
}
