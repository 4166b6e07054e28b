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

mod kpk;
mod minor;

use crate::bitbase::BitBases;
use crate::board::defs::Signature;
use crate::board::Board;
use crate::defs::Score;

/*
    Interior-node endgame recognizers, after "Efficient Interior-Node
    Recognition" (E. A. Heinz, ICCA Journal 21). Each handled material
    signature gets an evaluator returning an exact score or a bound,
    always relative to the side on move. A bitmap over the 5-bit short
    signatures gates the lookup so that the common case costs a single
    AND.
*/

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Bound {
    LowerBound,
    UpperBound,
    Exact,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RecognizerInfo {
    pub value: i32,
    pub bound: Bound,
}

impl RecognizerInfo {
    pub fn exact(value: i32) -> Self {
        Self {
            value,
            bound: Bound::Exact,
        }
    }

    pub fn lower(value: i32) -> Self {
        Self {
            value,
            bound: Bound::LowerBound,
        }
    }

    pub fn upper(value: i32) -> Self {
        Self {
            value,
            bound: Bound::UpperBound,
        }
    }

    // Negating a bound inverts it.
    pub fn negate(self) -> Self {
        let bound = match self.bound {
            Bound::LowerBound => Bound::UpperBound,
            Bound::UpperBound => Bound::LowerBound,
            Bound::Exact => Bound::Exact,
        };
        Self {
            value: -self.value,
            bound,
        }
    }

    // Mate scores are stored relative to the recognized position; shift
    // them by the ply where the probe happened.
    pub fn adjust(self, ply: i32) -> i32 {
        if self.bound == Bound::Exact {
            if self.value < Score::MATE_LO {
                return self.value + ply;
            }
            if self.value > Score::MATE_HI {
                return self.value - ply;
            }
        }
        self.value
    }
}

pub type RecognizerHandler = fn(&Board, &BitBases) -> Option<RecognizerInfo>;

const SIGNATURE_SLOTS: usize = 1 << 10;

pub struct Recognizer {
    known_short: u32,
    handlers: [Option<RecognizerHandler>; SIGNATURE_SLOTS],
}

impl Recognizer {
    pub fn new() -> Self {
        let mut recognizer = Self {
            known_short: 0,
            handlers: [None; SIGNATURE_SLOTS],
        };

        recognizer.register(Signature::WHITE_PAWN, kpk::white_pawns);
        recognizer.register(Signature::BLACK_PAWN, kpk::black_pawns);

        recognizer.register(Signature::WHITE_PAWN | Signature::WHITE_BISHOP, kpk::white_bishop_pawn);
        recognizer.register(Signature::BLACK_PAWN | Signature::BLACK_BISHOP, kpk::black_bishop_pawn);

        recognizer.register(Signature::WHITE_KNIGHT, minor::white_knights);
        recognizer.register(Signature::BLACK_KNIGHT, minor::black_knights);

        recognizer.register(Signature::WHITE_BISHOP, minor::white_bishops);
        recognizer.register(Signature::BLACK_BISHOP, minor::black_bishops);

        recognizer.register(
            Signature::WHITE_BISHOP | Signature::WHITE_KNIGHT,
            minor::white_bishop_knight,
        );
        recognizer.register(
            Signature::BLACK_BISHOP | Signature::BLACK_KNIGHT,
            minor::black_bishop_knight,
        );

        recognizer
    }

    fn register(&mut self, signature: u32, handler: RecognizerHandler) {
        let signature = (signature >> Signature::OFFSET) as usize;
        let short_signature = (signature & 0x1F) | ((signature >> 5) & 0x1F);

        self.known_short |= 1 << short_signature;
        self.handlers[signature] = Some(handler);
    }

    // Returns a score relative to the side on move, or None when the
    // material configuration has no handler (or the handler passes).
    pub fn probe(&self, board: &Board, bases: &BitBases) -> Option<RecognizerInfo> {
        let short_signature = board.game_state.short_material_signature();
        if self.known_short & (1 << short_signature) == 0 {
            return None;
        }

        let handler = self.handlers[board.game_state.material_signature_bits()]?;
        handler(board, bases)
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_fen(fen: &str) -> Option<RecognizerInfo> {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        Recognizer::new().probe(&board, &BitBases::empty())
    }

    #[test]
    fn unhandled_material_returns_none() {
        // Queen endgames have no handler.
        assert!(probe_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").is_none());
        // Nor does a full opening position.
        assert!(probe_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_none());
    }

    #[test]
    fn knk_is_an_exact_draw() {
        let info = probe_fen("4k3/8/8/8/8/8/8/3NK3 w - - 0 1").unwrap();
        assert_eq!(info, RecognizerInfo::exact(0));
    }

    #[test]
    fn kpk_center_pawn_win_is_recognized() {
        // The supported e-pawn is a textbook win.
        let info = probe_fen("4k3/8/4K3/4P3/8/8/8/8 w - - 0 1").unwrap();
        assert_eq!(info.bound, Bound::LowerBound);
        assert!(info.value > 0, "got {info:?}");
    }

    #[test]
    fn kpk_score_is_side_relative() {
        // Same material, black on move and far white king: black sees
        // at worst a draw from its own perspective.
        let info = probe_fen("8/8/8/4k3/8/8/4P3/K7 b - - 0 1").unwrap();
        match info.bound {
            // White's "at least draw" becomes "at most draw" for black.
            Bound::UpperBound | Bound::Exact => assert!(info.value <= 0),
            Bound::LowerBound => panic!("unexpected bound {info:?}"),
        }
    }

    #[test]
    fn negate_flips_bounds() {
        assert_eq!(
            RecognizerInfo::lower(30).negate(),
            RecognizerInfo::upper(-30)
        );
        assert_eq!(RecognizerInfo::exact(0).negate(), RecognizerInfo::exact(0));
    }

    #[test]
    fn mate_scores_adjust_by_ply() {
        let mate_in_two = RecognizerInfo::exact(Score::MATE - 2);
        assert_eq!(mate_in_two.adjust(4), Score::MATE - 6);
        let mated = RecognizerInfo::exact(-Score::MATE);
        assert_eq!(mated.adjust(3), -Score::MATE + 3);
        let plain = RecognizerInfo::exact(120);
        assert_eq!(plain.adjust(9), 120);
    }
}
