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

use crate::bitbase::BitBases;
use crate::board::{Board, History};
use crate::comm::console::Console;
use crate::comm::Command;
use crate::defs::MAX_SEARCH_PLY;
use crate::engine::transposition::TranspositionTable;
use crate::evaluation::pawnhash::PawnHashTable;
use crate::evaluation::EvalCache;
use crate::movegen::defs::Move;
use crate::movegen::MoveGenerator;
use crate::recognizer::Recognizer;
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::time::Instant;

/*
    Depth is measured in fractional plies: one full ply is 60 units,
    divisible by 2, 3, 4, 5, 6 and 10, which leaves plenty of freedom
    for choosing extension values.
*/
pub const FULL_PLY: i32 = 60;

pub const NODES_BETWEEN_INPUT_CHECKS: i32 = 20_000;

// The selective depth never exceeds three times the nominal depth.
pub const MAX_SEARCH_DEPTH_FACTOR: i32 = 3;

// Null move parameters.
pub const NULL_MOVE_MIN_DEPTH: i32 = 2 * FULL_PLY;
pub const NULL_MOVE_MIN_REDUCTION: i32 = 2 * FULL_PLY;
pub const NULL_MOVE_MAX_REDUCTION: i32 = 4 * FULL_PLY;

// Extensions, in fractional plies, capped per ply.
pub const INITIAL_EXTENSION_BONUS: i32 = 0;
pub const MAX_EXTENSION_PER_PLY: i32 = FULL_PLY;
pub const EXTEND_CHECK: i32 = FULL_PLY;
pub const EXTEND_PAWN_ON_7TH: i32 = FULL_PLY;
pub const EXTEND_THREAT: i32 = FULL_PLY * 2 / 4;
pub const EXTEND_RECAPTURE: i32 = FULL_PLY * 2 / 4;
pub const EXTEND_SINGLE_REPLY: i32 = FULL_PLY;
pub const EXTEND_PAWN_ENDGAME: i32 = 2 * FULL_PLY;

// A recapture restores material when the trade balance stays inside
// this margin.
pub const RECAPTURE_MARGIN: i32 = 20;

// Futility margins (tuned values, exposed as options).
pub const FUTILITY_MARGIN_FRONTIER: i32 = 100;
pub const FUTILITY_MARGIN_PRE_FRONTIER: i32 = 300;

// Principal variation kept for display and TT reinjection.
pub const MAX_PV: usize = 10;

// Killer slots; quiescence plies can run past the nominal limit.
pub const MAX_KILLER_PLY: usize = MAX_SEARCH_PLY + 65;

pub const RESIGN_THRESHOLD: i32 = -700;

// Stop consulting the book after this many consecutive misses.
pub const MAX_NOT_IN_BOOK_MOVES: u32 = 3;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SearchMode {
    FixedTime,
    FixedDepth,
    TimeControl,
}

// Time management margins (milliseconds and centipawns).
pub const SAFETY_TIME_PER_MOVE: i64 = 250;
pub const SCORE_MARGIN_AT_1ST_CHECK: i32 = 0;
pub const SCORE_MARGIN_AT_2ND_CHECK: i32 = 25;
pub const SCORE_MARGIN_AT_3RD_CHECK: i32 = 100;

// The move the search wants to play, with its principal variation.
#[derive(Clone, Copy)]
pub struct MoveInfo {
    pub score: i32,
    pub depth: i32,
    pub max_depth: i32,
    pub time_ms: u128,
    pub nodes: u64,
    pub pv: [Move; MAX_PV],
    pub pv_len: usize,
}

impl MoveInfo {
    pub fn new() -> Self {
        Self {
            score: 0,
            depth: 0,
            max_depth: 0,
            time_ms: 0,
            nodes: 0,
            pv: [Move::NULL; MAX_PV],
            pv_len: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pv[0] = Move::NULL;
        self.pv_len = 0;
    }

    pub fn best_move(&self) -> Move {
        self.pv[0]
    }
}

impl Default for MoveInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub struct RootMove {
    pub m: Move,
    pub nodes: u64,
    pub value: i32,
}

pub type RootMoveList = Vec<RootMove>;

// Progress of the current root iteration, for the status display.
#[derive(Clone, Copy)]
pub struct RootMoveStat {
    pub depth: i32,
    pub moves_remaining: usize,
    pub moves_total: usize,
    pub current_move: Move,
}

impl RootMoveStat {
    pub fn new() -> Self {
        Self {
            depth: 0,
            moves_remaining: 0,
            moves_total: 0,
            current_move: Move::NULL,
        }
    }
}

impl Default for RootMoveStat {
    fn default() -> Self {
        Self::new()
    }
}

// Per-(piece, to-square) fail-high statistics driving history pruning.
#[derive(Clone, Copy, Default)]
pub struct HistCounter {
    pub count: u32,
    pub fail_high: u32,
}

// Time control state for the running search; set up by the driver.
#[derive(Clone, Copy)]
pub struct TimeControlState {
    pub mode: SearchMode,
    pub analyzing: bool,
    pub fixed_depth: i32,
    pub fixed_time_ms: i64,
    pub time_on_clock_ms: i64,
    pub default_target_ms: i64,
    pub current_target_ms: i64,
    pub stage: u32,
    pub previous_score: i32,
    pub last_game_move_was_capture: bool,
    pub have_played_moves: bool,
}

impl TimeControlState {
    pub fn new() -> Self {
        Self {
            mode: SearchMode::FixedDepth,
            analyzing: false,
            fixed_depth: 6,
            fixed_time_ms: 0,
            time_on_clock_ms: 0,
            default_target_ms: 0,
            current_target_ms: 0,
            stage: 0,
            previous_score: 0,
            last_game_move_was_capture: false,
            have_played_moves: false,
        }
    }
}

impl Default for TimeControlState {
    fn default() -> Self {
        Self::new()
    }
}

// All mutable search state that lives across the recursion.
pub struct SearchInfo {
    pub nodes: u64,
    pub max_depth_reached: i32,
    pub max_search_ply: i32,
    pub interrupted: bool,
    pub nodes_until_input_check: i32,

    pub killers1: [Move; MAX_KILLER_PLY],
    pub killers2: [Move; MAX_KILLER_PLY],
    // Quiet-move ordering: [side][from-to], bumped by depth squared on
    // a fail high, halved when it saturates.
    pub history: [[i32; 4096]; 2],
    // Fail-high rate per (piece type, to square), for history pruning.
    pub hist: [HistCounter; 6 * 64],

    pub move_to_play: MoveInfo,
    pub root_stat: RootMoveStat,
    pub root_position: Board,
    pub start_time: Instant,
    pub last_display_ms: u128,

    pub time: TimeControlState,

    pub post: bool,
    pub quiet: bool,

    pub null_move_enabled: bool,
    pub futility_enabled: bool,
    pub history_pruning_enabled: bool,

    // Commands received mid-search that the driver handles afterwards.
    pub pending: VecDeque<Command>,
}

impl SearchInfo {
    pub fn new() -> Self {
        Self {
            nodes: 0,
            max_depth_reached: 0,
            max_search_ply: MAX_SEARCH_PLY as i32,
            interrupted: false,
            nodes_until_input_check: NODES_BETWEEN_INPUT_CHECKS,
            killers1: [Move::NULL; MAX_KILLER_PLY],
            killers2: [Move::NULL; MAX_KILLER_PLY],
            history: [[0; 4096]; 2],
            hist: [HistCounter::default(); 6 * 64],
            move_to_play: MoveInfo::new(),
            root_stat: RootMoveStat::new(),
            root_position: Board::new(),
            start_time: Instant::now(),
            last_display_ms: 0,
            time: TimeControlState::new(),
            post: true,
            quiet: false,
            null_move_enabled: true,
            futility_enabled: true,
            history_pruning_enabled: true,
            pending: VecDeque::new(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    pub fn reset_for_search(&mut self) {
        self.nodes = 0;
        self.max_depth_reached = 0;
        self.interrupted = false;
        self.nodes_until_input_check = NODES_BETWEEN_INPUT_CHECKS;
        self.killers1 = [Move::NULL; MAX_KILLER_PLY];
        self.killers2 = [Move::NULL; MAX_KILLER_PLY];
        self.history = [[0; 4096]; 2];
        self.hist = [HistCounter::default(); 6 * 64];
        self.move_to_play.reset();
        self.root_stat = RootMoveStat::new();
        self.start_time = Instant::now();
        self.last_display_ms = 0;
        self.time.stage = 0;
    }

    pub fn is_killer(&self, m: Move, ply: usize) -> bool {
        self.killers1[ply] == m || self.killers2[ply] == m
    }

    pub fn add_killer(&mut self, m: Move, ply: usize) {
        let killer = self.killers1[ply];
        if killer != m {
            if !killer.is_null() {
                self.killers2[ply] = killer;
            }
            self.killers1[ply] = m;
        }
    }

    pub fn update_history(&mut self, side: usize, m: Move, depth: i32) {
        let entry = &mut self.history[side][m.to_u12()];
        *entry += depth * depth;

        // Scale down a counter that grows too much, so other moves
        // still get a chance.
        if *entry & 0x4000_0000 != 0 {
            *entry >>= 1;
        }
    }
}

impl Default for SearchInfo {
    fn default() -> Self {
        Self::new()
    }
}

// Everything the search recursion needs, threaded as one context.
pub struct SearchRefs<'a> {
    pub board: &'a mut Board,
    pub mg: &'a MoveGenerator,
    pub tt: &'a mut TranspositionTable,
    pub pawn_hash: &'a mut PawnHashTable,
    pub eval_cache: &'a mut EvalCache,
    pub recognizer: &'a Recognizer,
    pub bitbases: &'a BitBases,
    pub history: &'a mut History,
    pub info: &'a mut SearchInfo,
    pub comm: &'a Console,
    pub rx: &'a Receiver<Command>,
}
