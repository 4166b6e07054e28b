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

use super::defs::{
    make_piece, piece_side, piece_type, square_file, square_rank, Flags, Pieces, Squares,
    BB_SQUARES,
};
use super::gamestate::GameState;
use super::Board;
use crate::defs::{Bitboard, Sides, Square};
use crate::movegen::{defs::Move, Direction, MoveGenerator};

// The move left the mover's own king in check. All state changes have
// been performed; the caller must still undo the move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IllegalMove;

/*
    Everything undo_move cannot reconstruct by replaying the move shape:
    the four occupancy projections and the packed scalar state (flags,
    hashes, material signature and score, PST accumulators, side to move).
    Per-piece bitboards, counters, king squares and the board array are
    reversed move-shape-wise.
*/
#[derive(Clone, Copy)]
pub struct UndoInfo {
    bb_all: Bitboard,
    bb_all_rot_t: Bitboard,
    bb_all_rot_d1: Bitboard,
    bb_all_rot_d2: Bitboard,
    game_state: GameState,
}

impl UndoInfo {
    pub fn new(board: &Board) -> Self {
        Self {
            bb_all: board.bb_all,
            bb_all_rot_t: board.bb_all_rot_t,
            bb_all_rot_d1: board.bb_all_rot_d1,
            bb_all_rot_d2: board.bb_all_rot_d2,
            game_state: board.game_state,
        }
    }
}

// Castling right cleared when a rook moves from, or is captured on, a
// corner square.
fn corner_castle_right(square: Square) -> u32 {
    match square {
        Squares::A1 => Flags::WHITE_CASTLE_QUEEN,
        Squares::H1 => Flags::WHITE_CASTLE_KING,
        Squares::A8 => Flags::BLACK_CASTLE_QUEEN,
        Squares::H8 => Flags::BLACK_CASTLE_KING,
        _ => 0,
    }
}

impl Board {
    /*
        Applies a move. The move must come from a generator or have been
        vetted by is_valid_move. Returns Err(IllegalMove) when the move
        leaves the mover's own king in check; all state changes have been
        performed in that case too, so the caller undoes with the same
        UndoInfo either way.
    */
    pub fn do_move(&mut self, m: &mut Move) -> Result<(), IllegalMove> {
        let us = self.us();
        let opponent = self.opponent();
        let from = m.from();
        let to = m.to();
        let piece = self.piece_list[from];
        let was_in_check = self.game_state.side_to_move_in_check();

        m.set_moved(piece);

        let old_ep = self.game_state.en_passant_square();
        self.clear_ep_square();

        // The clock counts on; a pawn move or capture resets it below.
        self.game_state.flags =
            (self.game_state.flags & !Flags::SIDE_TO_MOVE_IN_CHECK) + Flags::HALF_MOVE_CLOCK_UNIT;

        // A pawn landing on the just-cleared en-passant square captures
        // the pawn on the rank behind it.
        let is_en_passant =
            piece_type(piece) == Pieces::PAWN && (m.is_en_passant() || old_ep == Some(to));
        let mut captured = self.piece_list[to];
        let mut captured_square = to;

        if is_en_passant {
            m.set_en_passant();
            captured = make_piece(opponent, Pieces::PAWN);
            captured_square = if us == Sides::WHITE { to - 8 } else { to + 8 };
        }
        m.set_captured(captured);

        if captured != Pieces::NONE {
            self.remove_piece(captured, captured_square);
            self.game_state.flags &= !Flags::HALF_MOVE_CLOCK_MASK;

            let lost_right = corner_castle_right(captured_square);
            if lost_right != 0 && piece_type(captured) == Pieces::ROOK {
                let rights = (self.game_state.flags & !lost_right) >> Flags::CASTLE_SHIFT;
                self.update_castling_permissions((rights & 0x0F) as u8);
            }
        }

        match piece_type(piece) {
            Pieces::PAWN => {
                self.game_state.flags &= !Flags::HALF_MOVE_CLOCK_MASK;

                let promotion_rank = if us == Sides::WHITE { 7 } else { 0 };
                if square_rank(to) == promotion_rank {
                    self.remove_piece(piece, from);
                    self.put_piece(m.promoted(), to);
                } else {
                    self.move_piece(piece, from, to);

                    // A double step next to an enemy pawn opens an
                    // en-passant opportunity.
                    let two_up = if us == Sides::WHITE { 16 } else { -16i32 as usize };
                    if to.wrapping_sub(from) == two_up {
                        let ep_square = (from + to) / 2;
                        let mg = MoveGenerator::get();
                        if mg.at.pawn_capts[us][ep_square] & self.bb_pawns[opponent] != 0 {
                            self.set_ep_square(ep_square);
                        }
                    }
                }
            }
            Pieces::KING => {
                self.move_piece(piece, from, to);

                let (own_rights, home) = if us == Sides::WHITE {
                    (Flags::WHITE_CASTLE_KING | Flags::WHITE_CASTLE_QUEEN, Squares::E1)
                } else {
                    (Flags::BLACK_CASTLE_KING | Flags::BLACK_CASTLE_QUEEN, Squares::E8)
                };

                if self.game_state.flags & own_rights != 0 {
                    let rights = (self.game_state.flags & !own_rights) >> Flags::CASTLE_SHIFT;
                    self.update_castling_permissions((rights & 0x0F) as u8);
                }

                // Castling also moves the rook and marks the side as
                // having castled.
                if from == home && to == from + 2 {
                    self.move_piece(make_piece(us, Pieces::ROOK), from + 3, from + 1);
                    self.set_has_castled(us);
                } else if from == home && to + 2 == from {
                    self.move_piece(make_piece(us, Pieces::ROOK), from - 4, from - 1);
                    self.set_has_castled(us);
                }
            }
            Pieces::ROOK => {
                self.move_piece(piece, from, to);

                let lost_right = corner_castle_right(from);
                if lost_right != 0 && self.game_state.flags & lost_right != 0 {
                    let rights = (self.game_state.flags & !lost_right) >> Flags::CASTLE_SHIFT;
                    self.update_castling_permissions((rights & 0x0F) as u8);
                }
            }
            _ => self.move_piece(piece, from, to),
        }

        if us == Sides::BLACK {
            self.game_state.fullmove_number += 1;
        }

        self.swap_side();

        /*
            Incremental in-check update. When the mover was already in
            check, moved the king, or captured en passant, only a full
            attack query settles whether its king is safe; otherwise the
            only danger is a discovered attack along the line through the
            vacated square.
        */
        let mover_in_check = if was_in_check || piece_type(piece) == Pieces::KING || is_en_passant
        {
            self.is_side_in_check(us)
        } else {
            MoveGenerator::get().at.dir(from, self.king_square[us]) != Direction::None
                && self.is_side_in_check(us)
        };

        if self.is_side_in_check(self.us()) {
            self.game_state.flags |= Flags::SIDE_TO_MOVE_IN_CHECK;
        }

        if mover_in_check {
            Err(IllegalMove)
        } else {
            Ok(())
        }
    }

    // Restores the position as it was before do_move, regardless of
    // whether do_move succeeded or reported an illegal move.
    pub fn undo_move(&mut self, m: &Move, undo: &UndoInfo) {
        self.bb_all = undo.bb_all;
        self.bb_all_rot_t = undo.bb_all_rot_t;
        self.bb_all_rot_d1 = undo.bb_all_rot_d1;
        self.bb_all_rot_d2 = undo.bb_all_rot_d2;
        self.game_state = undo.game_state;

        let piece = m.moved();
        let us = piece_side(piece);
        let from = m.from();
        let to = m.to();

        if piece_type(piece) == Pieces::PAWN && m.is_promotion() {
            self.remove_piece_raw(m.promoted(), to);
            self.put_piece_raw(piece, from);
        } else {
            self.move_piece_raw(piece, to, from);

            // Take the castling rook back home.
            if piece_type(piece) == Pieces::KING {
                let home = if us == Sides::WHITE { Squares::E1 } else { Squares::E8 };
                if from == home && to == from + 2 {
                    self.move_piece_raw(make_piece(us, Pieces::ROOK), from + 1, from + 3);
                } else if from == home && to + 2 == from {
                    self.move_piece_raw(make_piece(us, Pieces::ROOK), from - 1, from - 4);
                }
            }
        }

        if m.is_capture() {
            let captured_square = if m.is_en_passant() {
                if us == Sides::WHITE {
                    to - 8
                } else {
                    to + 8
                }
            } else {
                to
            };
            self.put_piece_raw(m.captured(), captured_square);
        }
    }

    // Null move: pass the turn. Not allowed when in check.
    pub fn do_null_move(&mut self) {
        debug_assert!(!self.game_state.side_to_move_in_check());
        self.clear_ep_square();
        self.swap_side();
    }

    pub fn undo_null_move(&mut self, undo: &UndoInfo) {
        self.game_state = undo.game_state;
    }

    fn set_has_castled(&mut self, side: crate::defs::Side) {
        self.game_state.flags |= if side == Sides::WHITE {
            Flags::WHITE_HAS_CASTLED
        } else {
            Flags::BLACK_HAS_CASTLED
        };
    }

    /*
        Full validation of an externally supplied move (hash table,
        killer slot, book, user input): ownership, movement shape, clear
        path, pawn geometry, castling legality. Self-check is left to
        do_move.
    */
    pub fn is_valid_move(&self, m: &Move) -> bool {
        let mg = MoveGenerator::get();
        let us = self.us();
        let from = m.from();
        let to = m.to();
        let piece = self.piece_list[from];

        if m.is_null() && from == to {
            return false;
        }

        if piece == Pieces::NONE || piece_side(piece) != us {
            return false;
        }

        let destination = self.piece_list[to];
        if destination != Pieces::NONE
            && (piece_side(destination) == us || piece_type(destination) == Pieces::KING)
        {
            return false;
        }

        let promoted = m.promoted();
        if promoted != Pieces::NONE {
            let promotion_rank = if us == Sides::WHITE { 7 } else { 0 };
            if piece_type(piece) != Pieces::PAWN
                || square_rank(to) != promotion_rank
                || piece_side(promoted) != us
                || !matches!(
                    piece_type(promoted),
                    Pieces::KNIGHT | Pieces::BISHOP | Pieces::ROOK | Pieces::QUEEN
                )
            {
                return false;
            }
        }

        match piece_type(piece) {
            Pieces::PAWN => self.is_valid_pawn_move(m, us),
            Pieces::KNIGHT => mg.at.knight[from] & BB_SQUARES[to] != 0,
            Pieces::BISHOP => mg.bishop_attacks(self, from) & BB_SQUARES[to] != 0,
            Pieces::ROOK => mg.rook_attacks(self, from) & BB_SQUARES[to] != 0,
            Pieces::QUEEN => mg.queen_attacks(self, from) & BB_SQUARES[to] != 0,
            Pieces::KING => {
                if mg.at.king[from] & BB_SQUARES[to] != 0 {
                    return true;
                }
                self.is_valid_castle(from, to, us)
            }
            _ => false,
        }
    }

    fn is_valid_pawn_move(&self, m: &Move, us: crate::defs::Side) -> bool {
        let mg = MoveGenerator::get();
        let from = m.from();
        let to = m.to();
        let (up, start_rank, promotion_rank): (i32, usize, usize) = if us == Sides::WHITE {
            (8, 1, 7)
        } else {
            (-8, 6, 0)
        };

        // Promotions must name the piece; other moves must not.
        if (square_rank(to) == promotion_rank) != (m.promoted() != Pieces::NONE) {
            return false;
        }

        let single = (from as i32 + up) as Square;

        if self.piece_list[to] != Pieces::NONE {
            return mg.at.pawn_capts[us][from] & BB_SQUARES[to] != 0;
        }

        // En-passant: diagonal move to the current en-passant square.
        if mg.at.pawn_capts[us][from] & BB_SQUARES[to] != 0 {
            return self.game_state.en_passant_square() == Some(to);
        }

        if to == single {
            return true;
        }

        square_rank(from) == start_rank
            && to as i32 == from as i32 + 2 * up
            && self.piece_list[single] == Pieces::NONE
    }

    fn is_valid_castle(&self, from: Square, to: Square, us: crate::defs::Side) -> bool {
        let mg = MoveGenerator::get();
        let masks = &mg.masks;
        let opponent = us ^ 1;
        let flags = self.game_state.flags;

        let (home, king_right, queen_right, cross_king, cross_queen) = if us == Sides::WHITE {
            (
                Squares::E1,
                Flags::WHITE_CASTLE_KING,
                Flags::WHITE_CASTLE_QUEEN,
                masks.white_cross_castle_king,
                masks.white_cross_castle_queen,
            )
        } else {
            (
                Squares::E8,
                Flags::BLACK_CASTLE_KING,
                Flags::BLACK_CASTLE_QUEEN,
                masks.black_cross_castle_king,
                masks.black_cross_castle_queen,
            )
        };

        if from != home {
            return false;
        }

        if to == home + 2 {
            flags & king_right != 0
                && self.bb_all & cross_king == 0
                && !mg.square_attacked(self, opponent, home)
                && !mg.square_attacked(self, opponent, home + 1)
                && !mg.square_attacked(self, opponent, home + 2)
        } else if to + 2 == home {
            flags & queen_right != 0
                && self.bb_all & cross_queen == 0
                && !mg.square_attacked(self, opponent, home)
                && !mg.square_attacked(self, opponent, home - 1)
                && !mg.square_attacked(self, opponent, home - 2)
        } else {
            false
        }
    }
}

// Quick file distance check used by the pawn shape test above; kept here
// to guard against A/H file wrap-arounds in externally supplied moves.
#[allow(dead_code)]
fn file_distance(a: Square, b: Square) -> usize {
    square_file(a).abs_diff(square_file(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FEN_KIWIPETE_POSITION, FEN_START_POSITION};
    use crate::movegen::defs::MoveList;

    fn board_from(fen: &str) -> Board {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        board
    }

    // Applying do_move then undo_move must restore the position byte
    // for byte, for every pseudo-legal move, legal or not.
    fn roundtrip_all_moves(fen: &str) {
        let mut board = board_from(fen);
        let reference = board.clone();
        let mg = MoveGenerator::get();

        let mut list = MoveList::new();
        if board.game_state.side_to_move_in_check() {
            mg.generate_check_escapes(&board, &mut list);
        } else {
            mg.generate_moves(&board, &mut list);
        }

        for i in 0..list.len() {
            let mut m = list.get(i);
            let undo = UndoInfo::new(&board);
            let _ = board.do_move(&mut m);
            board.undo_move(&m, &undo);
            assert!(board == reference, "roundtrip failed for {} in {}", m.as_string(), fen);
            assert_eq!(board.game_state.zobrist_key, board.init_zobrist_key());
            assert_eq!(board.game_state.pawn_key, board.init_pawn_key());
        }
    }

    #[test]
    fn do_undo_restores_position() {
        roundtrip_all_moves(FEN_START_POSITION);
        roundtrip_all_moves(FEN_KIWIPETE_POSITION);
        roundtrip_all_moves("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
        roundtrip_all_moves("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 b - - 0 1");
        roundtrip_all_moves("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R b KQkq - 0 1");
        // Promotion-heavy position.
        roundtrip_all_moves("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1");
    }

    #[test]
    fn illegal_move_is_reported_and_reversible() {
        // The e-file pin: moving the e4 pawn exposes the white king.
        let mut board = board_from("4r1k1/8/8/8/4P3/8/8/4K3 w - - 0 1");
        let reference = board.clone();

        let mut m = Move::new(Squares::E4, Squares::E5);
        let undo = UndoInfo::new(&board);
        assert_eq!(board.do_move(&mut m), Err(IllegalMove));
        board.undo_move(&m, &undo);
        assert!(board == reference);
    }

    #[test]
    fn en_passant_capture_removes_the_right_pawn() {
        let mut board =
            board_from("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
        let mut m = Move::new(Squares::E5, Squares::F6);
        let undo = UndoInfo::new(&board);
        assert!(board.do_move(&mut m).is_ok());
        assert!(m.is_en_passant());
        assert_eq!(board.piece_list[Squares::F5], Pieces::NONE);
        assert_eq!(board.piece_list[Squares::F6], Pieces::WHITE_PAWN);
        board.undo_move(&m, &undo);
        assert_eq!(board.piece_list[Squares::F5], Pieces::BLACK_PAWN);
    }

    #[test]
    fn castling_moves_rook_and_clears_rights() {
        let mut board = board_from("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mut m = Move::new(Squares::E1, Squares::G1);
        assert!(board.do_move(&mut m).is_ok());
        assert_eq!(board.piece_list[Squares::F1], Pieces::WHITE_ROOK);
        assert_eq!(board.piece_list[Squares::H1], Pieces::NONE);
        assert_eq!(
            board.game_state.flags & (Flags::WHITE_CASTLE_KING | Flags::WHITE_CASTLE_QUEEN),
            0
        );
        assert!(board.game_state.flags & Flags::WHITE_HAS_CASTLED != 0);
    }

    #[test]
    fn rook_capture_clears_opponent_castling_right() {
        let mut board = board_from("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let mut m = Move::new(Squares::A1, Squares::A8);
        assert!(board.do_move(&mut m).is_ok());
        assert_eq!(board.game_state.flags & Flags::BLACK_CASTLE_QUEEN, 0);
        assert_ne!(board.game_state.flags & Flags::BLACK_CASTLE_KING, 0);
    }

    #[test]
    fn half_move_clock_resets_on_pawn_move_and_capture() {
        let mut board = board_from("4k3/8/8/8/8/8/4P3/4K2R w - - 10 1");
        let mut m = Move::new(Squares::H1, Squares::H2);
        board.do_move(&mut m).unwrap();
        assert_eq!(board.game_state.half_move_clock(), 11);

        let mut board = board_from("4k3/8/8/8/8/8/4P3/4K2R w - - 10 1");
        let mut m = Move::new(Squares::E2, Squares::E4);
        board.do_move(&mut m).unwrap();
        assert_eq!(board.game_state.half_move_clock(), 0);
    }

    #[test]
    fn valid_move_rejects_garbage() {
        let board = board_from(FEN_START_POSITION);
        // Empty square.
        assert!(!board.is_valid_move(&Move::new(Squares::E4, Squares::E5)));
        // Opponent's piece.
        assert!(!board.is_valid_move(&Move::new(Squares::E7, Squares::E5)));
        // Knight shape.
        assert!(!board.is_valid_move(&Move::new(Squares::B1, Squares::B3)));
        // Blocked slider.
        assert!(!board.is_valid_move(&Move::new(Squares::A1, Squares::A3)));
        // Legal ones pass.
        assert!(board.is_valid_move(&Move::new(Squares::B1, Squares::C3)));
        assert!(board.is_valid_move(&Move::new(Squares::E2, Squares::E4)));
    }

    #[test]
    fn generated_moves_are_all_valid() {
        for fen in [FEN_START_POSITION, FEN_KIWIPETE_POSITION] {
            let board = board_from(fen);
            let mut list = MoveList::new();
            MoveGenerator::get().generate_moves(&board, &mut list);
            for m in list.iter() {
                assert!(board.is_valid_move(m), "{} flagged invalid in {}", m.as_string(), fen);
            }
        }
    }

    // The generator and the validator must agree: every valid (from,
    // to) pair appears in the generated list, and everything generated
    // validates.
    #[test]
    fn generator_and_validator_agree() {
        for fen in [
            FEN_START_POSITION,
            FEN_KIWIPETE_POSITION,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
        ] {
            let board = board_from(fen);
            let mut generated = MoveList::new();
            MoveGenerator::get().generate_moves(&board, &mut generated);

            for from in 0..64 {
                for to in 0..64 {
                    let m = Move::new(from, to);
                    if board.is_valid_move(&m) {
                        assert!(
                            generated.contains(m),
                            "{}{} valid but not generated in {}",
                            crate::board::defs::square_name(from),
                            crate::board::defs::square_name(to),
                            fen
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn null_move_round_trips() {
        let mut board = board_from(FEN_KIWIPETE_POSITION);
        let reference = board.clone();
        let undo = UndoInfo::new(&board);
        board.do_null_move();
        assert_ne!(board.us(), reference.us());
        board.undo_null_move(&undo);
        assert!(board == reference);
    }
}
