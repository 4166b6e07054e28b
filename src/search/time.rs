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

use super::defs::*;
use super::Search;

/*
    Up to three time control segments (moves / time / increment), as set
    with the level command. The manager tracks which control the game is
    in and how many moves remain before the next one.
*/
#[derive(Clone, Copy, Default)]
pub struct TimeControl {
    pub moves: i32,
    pub time_s: i64,
    pub increment_s: i64,
}

pub const MAX_TIME_CONTROLS: usize = 3;

pub struct TimeManager {
    controls: [TimeControl; MAX_TIME_CONTROLS],
    num_controls: usize,
    current: usize,
    moves_left_in_control: i32,
}

impl TimeManager {
    pub fn new() -> Self {
        Self {
            controls: [TimeControl::default(); MAX_TIME_CONTROLS],
            num_controls: 0,
            current: 0,
            moves_left_in_control: 0,
        }
    }

    pub fn reset(&mut self) {
        self.num_controls = 0;
        self.current = 0;
        self.moves_left_in_control = 0;
    }

    pub fn add_control(&mut self, moves: i32, time_s: i64, increment_s: i64) -> bool {
        if self.num_controls >= MAX_TIME_CONTROLS {
            return false;
        }
        self.controls[self.num_controls] = TimeControl {
            moves,
            time_s,
            increment_s,
        };
        self.num_controls += 1;
        if self.num_controls == 1 {
            self.moves_left_in_control = moves;
        }
        true
    }

    pub fn current_control(&self) -> TimeControl {
        self.controls[self.current.min(self.num_controls.saturating_sub(1))]
    }

    pub fn moves_left_in_control(&self) -> i32 {
        self.moves_left_in_control
    }

    // Advance after a played move; returns true when a new control
    // period starts.
    pub fn go_next_move(&mut self) -> bool {
        if self.num_controls == 0 {
            return false;
        }

        self.moves_left_in_control -= 1;
        if self.moves_left_in_control == 0 {
            if self.current + 1 < self.num_controls {
                self.current += 1;
            }
            self.moves_left_in_control = self.controls[self.current].moves;
            return true;
        }
        false
    }

    pub fn go_prev_move(&mut self) {
        if self.num_controls == 0 {
            return;
        }

        self.moves_left_in_control += 1;
        if self.moves_left_in_control > self.controls[self.current].moves {
            self.moves_left_in_control = 1;
            if self.current > 0 {
                self.current -= 1;
            }
        }
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Search {
    /*
        The three-stage exit policy. The target for a move is
        (remaining - safety + increment * (movesToGo - 1)) / movesToGo;
        at half that budget the search stops early only for an on-track
        recapture, at the full budget it stops unless the score dropped,
        at twice the budget the allowed drop grows, and at four times
        the budget the move is forced out.
    */
    pub fn is_time_out(refs: &mut SearchRefs) -> bool {
        let elapsed = refs.info.start_time.elapsed().as_millis() as i64;
        let current_score = refs.info.move_to_play.score;
        let best_is_capture = refs.info.move_to_play.best_move().is_capture();
        let time = &mut refs.info.time;

        if time.analyzing {
            return false;
        }

        match time.mode {
            SearchMode::FixedDepth => false,

            SearchMode::FixedTime => {
                elapsed >= (time.fixed_time_ms - SAFETY_TIME_PER_MOVE).max(1)
            }

            SearchMode::TimeControl => {
                let mut result = false;
                let old_score = time.previous_score;

                while elapsed >= time.current_target_ms && !result {
                    match time.stage {
                        0 => {
                            // An uncomplicated recapture can be played
                            // at half time.
                            if time.have_played_moves
                                && best_is_capture
                                && time.last_game_move_was_capture
                                && current_score >= 0
                                && current_score >= old_score - SCORE_MARGIN_AT_1ST_CHECK
                            {
                                result = true;
                            }
                            time.stage = 1;
                            time.current_target_ms = time.default_target_ms;
                        }
                        1 => {
                            if current_score >= old_score - SCORE_MARGIN_AT_2ND_CHECK {
                                result = true;
                            }
                            time.stage = 2;
                            time.current_target_ms = time.default_target_ms * 2;
                        }
                        2 => {
                            if current_score >= old_score - SCORE_MARGIN_AT_3RD_CHECK {
                                result = true;
                            }
                            time.stage = 3;
                            time.current_target_ms = time.default_target_ms * 4;
                        }
                        _ => result = true,
                    }

                    // Force the move when the next stage does not fit
                    // in what is left on the clock.
                    if time.current_target_ms + 1000 >= time.time_on_clock_ms {
                        result = true;
                    }
                }

                if result {
                    // All later polls must time out as well.
                    time.current_target_ms = 0;
                }

                result
            }
        }
    }

    // Compute the per-move budget before a timed search starts.
    pub fn set_time_target(
        time: &mut TimeControlState,
        moves_to_go: i32,
        increment_ms: i64,
    ) {
        // Sudden death: spread the clock over an assumed game length.
        let moves_to_go = if moves_to_go <= 0 { 30 } else { moves_to_go } as i64;

        let mut target = (time.time_on_clock_ms - 1000 + increment_ms * (moves_to_go - 1))
            / moves_to_go;

        if target < 0 || target >= time.time_on_clock_ms {
            target = 0;
        }

        time.default_target_ms = target;
        time.current_target_ms = target / 2;
        time.stage = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::refs_fixture;

    #[test]
    fn manager_walks_through_controls() {
        let mut tm = TimeManager::new();
        tm.add_control(2, 300, 0);
        tm.add_control(4, 60, 0);

        assert_eq!(tm.moves_left_in_control(), 2);
        assert!(!tm.go_next_move());
        assert!(tm.go_next_move());
        assert_eq!(tm.moves_left_in_control(), 4);
        assert_eq!(tm.current_control().time_s, 60);
    }

    #[test]
    fn undo_steps_the_manager_back() {
        let mut tm = TimeManager::new();
        tm.add_control(2, 300, 0);
        tm.go_next_move();
        tm.go_next_move();
        tm.go_prev_move();
        assert!(tm.moves_left_in_control() >= 1);
    }

    #[test]
    fn target_spreads_clock_over_moves() {
        let mut time = TimeControlState::new();
        time.time_on_clock_ms = 61_000;
        Search::set_time_target(&mut time, 30, 0);
        assert_eq!(time.default_target_ms, 2_000);
        assert_eq!(time.current_target_ms, 1_000);
        assert_eq!(time.stage, 0);
    }

    #[test]
    fn fixed_depth_never_times_out() {
        let mut fixture = refs_fixture("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        fixture.info.time.mode = SearchMode::FixedDepth;
        let mut refs = fixture.refs();
        assert!(!Search::is_time_out(&mut refs));
    }

    #[test]
    fn analyze_mode_never_times_out() {
        let mut fixture = refs_fixture("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        fixture.info.time.mode = SearchMode::TimeControl;
        fixture.info.time.analyzing = true;
        fixture.info.time.current_target_ms = 0;
        let mut refs = fixture.refs();
        assert!(!Search::is_time_out(&mut refs));
    }

    #[test]
    fn exhausted_stages_force_the_move() {
        let mut fixture = refs_fixture("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        fixture.info.time.mode = SearchMode::TimeControl;
        fixture.info.time.default_target_ms = 0;
        fixture.info.time.current_target_ms = 0;
        fixture.info.time.time_on_clock_ms = 500;
        fixture.info.time.stage = 0;
        let mut refs = fixture.refs();
        // Stage machine runs dry immediately with a zero target.
        assert!(Search::is_time_out(&mut refs));
        // And stays timed out.
        assert!(Search::is_time_out(&mut refs));
    }
}
