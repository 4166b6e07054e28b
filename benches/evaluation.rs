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

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kauri::board::Board;
use kauri::evaluation::pawnhash::PawnHashTable;
use kauri::evaluation::{evaluate_position, EvalCache};
use kauri::misc::perft::perft;
use kauri::movegen::MoveGenerator;

const POSITIONS: [&str; 4] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
];

fn bench_evaluation(c: &mut Criterion) {
    let mg = MoveGenerator::get();
    let boards: Vec<Board> = POSITIONS
        .iter()
        .map(|fen| {
            let mut board = Board::new();
            board.fen_read(Some(fen)).unwrap();
            board
        })
        .collect();

    c.bench_function("evaluate_position", |b| {
        let mut pawn_hash = PawnHashTable::new(1 << 14);
        let mut cache = EvalCache::new();
        b.iter(|| {
            for board in &boards {
                black_box(evaluate_position(board, mg, &mut pawn_hash, &mut cache));
            }
        })
    });

    c.bench_function("perft_3_start", |b| {
        let mut board = boards[0].clone();
        b.iter(|| black_box(perft(&mut board, 3)))
    });
}

criterion_group!(benches, bench_evaluation);
criterion_main!(benches);
