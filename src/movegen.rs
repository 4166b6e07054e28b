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

pub mod defs;
pub mod masks;
pub mod tables;

use self::defs::{Move, MoveList, MoveType};
use self::masks::Masks;
use self::tables::{d1_occ, d2_occ, file_occ, rank_occ, AttackTables};
use crate::board::defs::{
    make_piece, square_rank, Flags, Pieces, Squares, BB_SQUARES,
};
use crate::board::Board;
use crate::defs::{Bitboard, Piece, Side, Sides, Square};
use crate::misc::bits;
use std::sync::OnceLock;

static INSTANCE: OnceLock<MoveGenerator> = OnceLock::new();

// The move generator owns every precomputed table the engine needs:
// attack tables, geometry tables and the evaluation masks. It is built
// once at startup and never changes afterwards.
pub struct MoveGenerator {
    pub at: AttackTables,
    pub masks: Masks,
}

impl MoveGenerator {
    pub fn new() -> Self {
        Self {
            at: AttackTables::new(),
            masks: Masks::new(),
        }
    }

    pub fn get() -> &'static MoveGenerator {
        INSTANCE.get_or_init(MoveGenerator::new)
    }
}

// Attack lookups.
impl MoveGenerator {
    pub fn rook_attacks(&self, board: &Board, square: Square) -> Bitboard {
        self.at.rook_rank[square][rank_occ(board.bb_all, square)]
            | self.at.rook_file[square][file_occ(board.bb_all_rot_t, square)]
    }

    pub fn bishop_attacks(&self, board: &Board, square: Square) -> Bitboard {
        self.at.bishop_d1[square][d1_occ(board.bb_all_rot_d1, square)]
            | self.at.bishop_d2[square][d2_occ(board.bb_all_rot_d2, square)]
    }

    pub fn queen_attacks(&self, board: &Board, square: Square) -> Bitboard {
        self.rook_attacks(board, square) | self.bishop_attacks(board, square)
    }

    // Rook attacks against explicitly supplied occupancies; used by the
    // evaluation to x-ray through own queens and rooks.
    pub fn rook_attacks_occ(
        &self,
        square: Square,
        bb_all: Bitboard,
        bb_all_rot_t: Bitboard,
    ) -> Bitboard {
        self.at.rook_rank[square][rank_occ(bb_all, square)]
            | self.at.rook_file[square][file_occ(bb_all_rot_t, square)]
    }

    // All pieces of `side` that attack `square`.
    pub fn attackers_to(&self, board: &Board, side: Side, square: Square) -> Bitboard {
        let opponent = side ^ 1;
        (self.at.pawn_capts[opponent][square] & board.bb_pawns[side])
            | (self.at.knight[square] & board.bb_knights[side])
            | (self.at.king[square] & BB_SQUARES[board.king_square[side]])
            | (self.bishop_attacks(board, square) & board.bb_queens_bishops[side])
            | (self.rook_attacks(board, square) & board.bb_queens_rooks[side])
    }

    pub fn square_attacked(&self, board: &Board, attacker: Side, square: Square) -> bool {
        let opponent = attacker ^ 1;

        self.at.pawn_capts[opponent][square] & board.bb_pawns[attacker] != 0
            || self.at.knight[square] & board.bb_knights[attacker] != 0
            || self.at.king[square] & BB_SQUARES[board.king_square[attacker]] != 0
            || self.bishop_attacks(board, square) & board.bb_queens_bishops[attacker] != 0
            || self.rook_attacks(board, square) & board.bb_queens_rooks[attacker] != 0
    }
}

// Move generation. All generators produce pseudo-legal moves; the caller
// filters self-check with a trial do_move.
impl MoveGenerator {
    pub fn generate_moves(&self, board: &Board, list: &mut MoveList) {
        self.pieces(board, MoveType::All, list);
        self.pawns(board, MoveType::All, list);
        self.castling(board, list);
    }

    // Captures and promotions only.
    pub fn generate_tactical(&self, board: &Board, list: &mut MoveList) {
        self.pieces(board, MoveType::Tactical, list);
        self.pawns(board, MoveType::Tactical, list);
    }

    pub fn generate_non_tactical(&self, board: &Board, list: &mut MoveList) {
        self.pieces(board, MoveType::NonTactical, list);
        self.pawns(board, MoveType::NonTactical, list);
        self.castling(board, list);
    }

    /*
        Check evasions. With a single checker the only candidates are king
        moves, captures of the checker, and interpositions on the squares
        between checker and king; with two checkers only the king can move.
    */
    pub fn generate_check_escapes(&self, board: &Board, list: &mut MoveList) {
        let us = board.us();
        let king = board.king_square[us];
        let checkers = self.attackers_to(board, board.opponent(), king);

        debug_assert!(checkers != 0);

        self.king_moves(board, !board.bb_side[us], list);

        if checkers.count_ones() == 1 {
            let checker = checkers.trailing_zeros() as Square;
            let targets = checkers | self.at.between[king][checker];

            self.piece_moves_to_targets(board, targets, list);
            self.pawn_moves_to_targets(board, targets, checker, list);
        }
    }

    // All pseudo-legal moves whose destination is the given square; used
    // for SAN disambiguation.
    pub fn generate_moves_to_square(&self, board: &Board, to: Square, list: &mut MoveList) {
        let mut all = MoveList::new();
        self.generate_moves(board, &mut all);
        for m in all.iter() {
            if m.to() == to {
                list.push(*m);
            }
        }
    }

    // Fully legal moves: pseudo-legal filtered by a trial do_move.
    pub fn generate_valid_moves(&self, board: &Board, list: &mut MoveList) {
        let mut pseudo = MoveList::new();

        if board.game_state.side_to_move_in_check() {
            self.generate_check_escapes(board, &mut pseudo);
        } else {
            self.generate_moves(board, &mut pseudo);
        }

        let mut scratch = board.clone();
        for i in 0..pseudo.len() {
            let mut m = pseudo.get(i);
            let undo = crate::board::UndoInfo::new(&scratch);
            if scratch.do_move(&mut m).is_ok() {
                list.push(m);
            }
            scratch.undo_move(&m, &undo);
        }
    }
}

// Per-piece generation internals.
impl MoveGenerator {
    fn target_mask(board: &Board, mt: MoveType) -> Bitboard {
        match mt {
            MoveType::All => !board.bb_side[board.us()],
            MoveType::Tactical => board.bb_side[board.opponent()],
            MoveType::NonTactical => !board.bb_all,
        }
    }

    fn pieces(&self, board: &Board, mt: MoveType, list: &mut MoveList) {
        let us = board.us();
        let targets = Self::target_mask(board, mt);

        let mut knights = board.bb_knights[us];
        while knights > 0 {
            let from = bits::next(&mut knights);
            self.add_moves(board, make_piece(us, Pieces::KNIGHT), from, self.at.knight[from] & targets, list);
        }

        let mut bishops = board.bb_bishops(us);
        while bishops > 0 {
            let from = bits::next(&mut bishops);
            self.add_moves(board, make_piece(us, Pieces::BISHOP), from, self.bishop_attacks(board, from) & targets, list);
        }

        let mut rooks = board.bb_rooks(us);
        while rooks > 0 {
            let from = bits::next(&mut rooks);
            self.add_moves(board, make_piece(us, Pieces::ROOK), from, self.rook_attacks(board, from) & targets, list);
        }

        let mut queens = board.bb_queens(us);
        while queens > 0 {
            let from = bits::next(&mut queens);
            self.add_moves(board, make_piece(us, Pieces::QUEEN), from, self.queen_attacks(board, from) & targets, list);
        }

        self.king_moves(board, targets, list);
    }

    fn king_moves(&self, board: &Board, targets: Bitboard, list: &mut MoveList) {
        let us = board.us();
        let from = board.king_square[us];
        self.add_moves(board, make_piece(us, Pieces::KING), from, self.at.king[from] & targets, list);
    }

    fn add_moves(&self, board: &Board, piece: Piece, from: Square, mut targets: Bitboard, list: &mut MoveList) {
        while targets > 0 {
            let to = bits::next(&mut targets);
            let mut m = Move::new(from, to);
            m.set_moved(piece);
            m.set_captured(board.piece_list[to]);
            list.push(m);
        }
    }

    fn pawns(&self, board: &Board, mt: MoveType, list: &mut MoveList) {
        let us = board.us();
        let piece = make_piece(us, Pieces::PAWN);
        let enemy = board.bb_side[board.opponent()];
        let ep_square = board.game_state.en_passant_square();

        let (up, start_rank, promo_rank): (i32, usize, usize) = if us == Sides::WHITE {
            (8, 1, 7)
        } else {
            (-8, 6, 0)
        };

        let quiets = mt != MoveType::Tactical;
        let tacticals = mt != MoveType::NonTactical;

        let mut pawns = board.bb_pawns[us];
        while pawns > 0 {
            let from = bits::next(&mut pawns);
            let push = (from as i32 + up) as Square;

            if board.bb_all & BB_SQUARES[push] == 0 {
                if square_rank(push) == promo_rank {
                    if tacticals {
                        self.add_promotions(piece, from, push, Pieces::NONE, list);
                    }
                } else {
                    if quiets {
                        let mut m = Move::new(from, push);
                        m.set_moved(piece);
                        list.push(m);
                    }
                    if quiets && square_rank(from) == start_rank {
                        let double = (push as i32 + up) as Square;
                        if board.bb_all & BB_SQUARES[double] == 0 {
                            let mut m = Move::new(from, double);
                            m.set_moved(piece);
                            list.push(m);
                        }
                    }
                }
            }

            if tacticals {
                let mut attacks = self.at.pawn_capts[us][from] & enemy;
                while attacks > 0 {
                    let to = bits::next(&mut attacks);
                    if square_rank(to) == promo_rank {
                        self.add_promotions(piece, from, to, board.piece_list[to], list);
                    } else {
                        let mut m = Move::new(from, to);
                        m.set_moved(piece);
                        m.set_captured(board.piece_list[to]);
                        list.push(m);
                    }
                }

                if let Some(ep) = ep_square {
                    if self.at.pawn_capts[us][from] & BB_SQUARES[ep] != 0 {
                        let mut m = Move::new(from, ep);
                        m.set_moved(piece);
                        m.set_captured(make_piece(board.opponent(), Pieces::PAWN));
                        m.set_en_passant();
                        list.push(m);
                    }
                }
            }
        }
    }

    fn add_promotions(&self, piece: Piece, from: Square, to: Square, captured: Piece, list: &mut MoveList) {
        let side = crate::board::defs::piece_side(piece);
        for promoted_type in [Pieces::QUEEN, Pieces::ROOK, Pieces::BISHOP, Pieces::KNIGHT] {
            let mut m = Move::new_promotion(from, to, make_piece(side, promoted_type));
            m.set_moved(piece);
            m.set_captured(captured);
            list.push(m);
        }
    }

    /*
        Castling. The corridor must be empty and neither the king square
        nor any square the king crosses may be attacked. Rights are
        maintained by do_move, so a present right implies king and rook
        are still at home.
    */
    fn castling(&self, board: &Board, list: &mut MoveList) {
        let us = board.us();
        let flags = board.game_state.flags;
        let occupancy = board.bb_all;
        let opponent = board.opponent();

        if us == Sides::WHITE {
            if flags & Flags::WHITE_CASTLE_KING != 0
                && occupancy & self.masks.white_cross_castle_king == 0
                && !self.square_attacked(board, opponent, Squares::E1)
                && !self.square_attacked(board, opponent, Squares::F1)
                && !self.square_attacked(board, opponent, Squares::G1)
            {
                let mut m = Move::new(Squares::E1, Squares::G1);
                m.set_moved(Pieces::WHITE_KING);
                list.push(m);
            }
            if flags & Flags::WHITE_CASTLE_QUEEN != 0
                && occupancy & self.masks.white_cross_castle_queen == 0
                && !self.square_attacked(board, opponent, Squares::E1)
                && !self.square_attacked(board, opponent, Squares::D1)
                && !self.square_attacked(board, opponent, Squares::C1)
            {
                let mut m = Move::new(Squares::E1, Squares::C1);
                m.set_moved(Pieces::WHITE_KING);
                list.push(m);
            }
        } else {
            if flags & Flags::BLACK_CASTLE_KING != 0
                && occupancy & self.masks.black_cross_castle_king == 0
                && !self.square_attacked(board, opponent, Squares::E8)
                && !self.square_attacked(board, opponent, Squares::F8)
                && !self.square_attacked(board, opponent, Squares::G8)
            {
                let mut m = Move::new(Squares::E8, Squares::G8);
                m.set_moved(Pieces::BLACK_KING);
                list.push(m);
            }
            if flags & Flags::BLACK_CASTLE_QUEEN != 0
                && occupancy & self.masks.black_cross_castle_queen == 0
                && !self.square_attacked(board, opponent, Squares::E8)
                && !self.square_attacked(board, opponent, Squares::D8)
                && !self.square_attacked(board, opponent, Squares::C8)
            {
                let mut m = Move::new(Squares::E8, Squares::C8);
                m.set_moved(Pieces::BLACK_KING);
                list.push(m);
            }
        }
    }

    // Non-king piece moves restricted to a target set (check evasion).
    fn piece_moves_to_targets(&self, board: &Board, targets: Bitboard, list: &mut MoveList) {
        let us = board.us();

        let mut knights = board.bb_knights[us];
        while knights > 0 {
            let from = bits::next(&mut knights);
            self.add_moves(board, make_piece(us, Pieces::KNIGHT), from, self.at.knight[from] & targets, list);
        }

        let mut bishops = board.bb_bishops(us);
        while bishops > 0 {
            let from = bits::next(&mut bishops);
            self.add_moves(board, make_piece(us, Pieces::BISHOP), from, self.bishop_attacks(board, from) & targets, list);
        }

        let mut rooks = board.bb_rooks(us);
        while rooks > 0 {
            let from = bits::next(&mut rooks);
            self.add_moves(board, make_piece(us, Pieces::ROOK), from, self.rook_attacks(board, from) & targets, list);
        }

        let mut queens = board.bb_queens(us);
        while queens > 0 {
            let from = bits::next(&mut queens);
            self.add_moves(board, make_piece(us, Pieces::QUEEN), from, self.queen_attacks(board, from) & targets, list);
        }
    }

    fn pawn_moves_to_targets(&self, board: &Board, targets: Bitboard, checker: Square, list: &mut MoveList) {
        let us = board.us();
        let piece = make_piece(us, Pieces::PAWN);
        let (up, start_rank, promo_rank): (i32, usize, usize) = if us == Sides::WHITE {
            (8, 1, 7)
        } else {
            (-8, 6, 0)
        };

        let mut pawns = board.bb_pawns[us];
        while pawns > 0 {
            let from = bits::next(&mut pawns);

            // Captures of the checker.
            if self.at.pawn_capts[us][from] & BB_SQUARES[checker] != 0 {
                if square_rank(checker) == promo_rank {
                    self.add_promotions(piece, from, checker, board.piece_list[checker], list);
                } else {
                    let mut m = Move::new(from, checker);
                    m.set_moved(piece);
                    m.set_captured(board.piece_list[checker]);
                    list.push(m);
                }
            }

            // Interpositions.
            let push = (from as i32 + up) as Square;
            if board.bb_all & BB_SQUARES[push] == 0 {
                if targets & BB_SQUARES[push] != 0 {
                    if square_rank(push) == promo_rank {
                        self.add_promotions(piece, from, push, Pieces::NONE, list);
                    } else {
                        let mut m = Move::new(from, push);
                        m.set_moved(piece);
                        list.push(m);
                    }
                }
                if square_rank(from) == start_rank {
                    let double = (push as i32 + up) as Square;
                    if board.bb_all & BB_SQUARES[double] == 0 && targets & BB_SQUARES[double] != 0 {
                        let mut m = Move::new(from, double);
                        m.set_moved(piece);
                        list.push(m);
                    }
                }
            }
        }

        // En-passant capture of a double-stepped checker pawn.
        if let Some(ep) = board.game_state.en_passant_square() {
            let victim = if us == Sides::WHITE { ep - 8 } else { ep + 8 };
            if victim == checker {
                let mut candidates = self.at.pawn_capts[us ^ 1][ep] & board.bb_pawns[us];
                while candidates > 0 {
                    let from = bits::next(&mut candidates);
                    let mut m = Move::new(from, ep);
                    m.set_moved(piece);
                    m.set_captured(make_piece(board.opponent(), Pieces::PAWN));
                    m.set_en_passant();
                    list.push(m);
                }
            }
        }
    }
}

impl Default for MoveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// Re-export for callers that match on line directions in xray scans.
pub use self::tables::Direction;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FEN_KIWIPETE_POSITION, FEN_START_POSITION};

    fn moves_for(fen: &str) -> MoveList {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        let mut list = MoveList::new();
        MoveGenerator::get().generate_moves(&board, &mut list);
        list
    }

    #[test]
    fn start_position_has_20_moves() {
        assert_eq!(moves_for(FEN_START_POSITION).len(), 20);
    }

    #[test]
    fn kiwipete_has_48_legal_moves() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_KIWIPETE_POSITION)).unwrap();
        let mut list = MoveList::new();
        MoveGenerator::get().generate_valid_moves(&board, &mut list);
        assert_eq!(list.len(), 48);
    }

    #[test]
    fn tactical_plus_non_tactical_equals_all() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_KIWIPETE_POSITION)).unwrap();
        let mg = MoveGenerator::get();

        let mut all = MoveList::new();
        let mut tactical = MoveList::new();
        let mut quiet = MoveList::new();
        mg.generate_moves(&board, &mut all);
        mg.generate_tactical(&board, &mut tactical);
        mg.generate_non_tactical(&board, &mut quiet);

        assert_eq!(all.len(), tactical.len() + quiet.len());
        for m in tactical.iter() {
            assert!(all.contains(*m));
            assert!(m.is_capture_or_promotion());
        }
        for m in quiet.iter() {
            assert!(all.contains(*m));
            assert!(!m.is_capture_or_promotion());
        }
    }

    #[test]
    fn check_escapes_are_subset_of_all_moves() {
        // White king in check from a rook; block, capture or run.
        let fen = "4k3/8/8/8/4r3/8/3N4/4K3 w - - 0 1";
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        let mg = MoveGenerator::get();

        let mut escapes = MoveList::new();
        mg.generate_check_escapes(&board, &mut escapes);
        let mut all = MoveList::new();
        mg.generate_moves(&board, &mut all);

        assert!(!escapes.is_empty());
        for m in escapes.iter() {
            assert!(all.contains(*m));
        }

        // Every legal move must be among the generated escapes.
        let mut valid = MoveList::new();
        mg.generate_valid_moves(&board, &mut valid);
        for m in valid.iter() {
            assert!(escapes.contains(*m));
        }
    }

    #[test]
    fn double_check_generates_king_moves_only() {
        // Knight on f3 and rook on e4 both give check.
        let fen = "4k3/8/8/8/4r3/5n2/8/4KB2 w - - 0 1";
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        let mut escapes = MoveList::new();
        MoveGenerator::get().generate_check_escapes(&board, &mut escapes);
        for m in escapes.iter() {
            assert_eq!(crate::board::defs::piece_type(m.moved()), Pieces::KING);
        }
    }

    #[test]
    fn moves_to_square_filters_destination() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let mut list = MoveList::new();
        MoveGenerator::get().generate_moves_to_square(&board, Squares::E4, &mut list);
        // e2e4 only.
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).as_string(), "e2e4");
    }
}
