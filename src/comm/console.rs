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

use super::{san, Command, GameResult};
use crate::board::Board;
use crate::defs::About;
use crate::movegen::defs::Move;
use crossbeam_channel::Sender;
use log::{debug, warn};
use std::io::BufRead;
use std::thread::JoinHandle;

/*
    The text protocol adapter (xboard flavoured). A reader thread parses
    one line at a time and sends Commands over a channel; the engine
    polls that channel, blockingly when idle and non-blockingly from
    inside the search. Output is written synchronously by whoever holds
    the Console.
*/
pub struct Console;

type VerbParser = fn(&str) -> Command;

// Sorted by verb; looked up with a binary search. Unknown verbs fall
// back to "user move" with the verb text as the move.
#[rustfmt::skip]
const VERBS: [(&str, VerbParser); 40] = [
    (".",         |_| Command::DisplayStatus),
    ("?",         |_| Command::MoveNow),
    ("accepted",  |_| Command::Ignore),
    ("analyze",   |_| Command::Analyze),
    ("bestm",     |_| Command::BestMove),
    ("bk",        |_| Command::ShowBook),
    ("computer",  |_| Command::OpponentIsComputer),
    ("draw",      |_| Command::OpponentOffersDraw),
    ("easy",      |_| Command::PonderOff),
    ("eval",      |_| Command::Evaluate),
    ("exit",      |_| Command::LeaveAnalyze),
    ("force",     |_| Command::Force),
    ("genbb",     |_| Command::GenerateBitbases),
    ("go",        |_| Command::Go),
    ("hard",      |_| Command::PonderOn),
    ("help",      |_| Command::Help),
    ("hint",      |_| Command::ShowHint),
    ("level",     parse_level),
    ("new",       |_| Command::New),
    ("nopost",    |_| Command::NoPost),
    ("otim",      |args| Command::SetOpponentClock(parse_int(args))),
    ("perft",     |args| Command::Perft(parse_int(args) as u8)),
    ("ping",      |args| Command::Ping(parse_int(args) as i32)),
    ("playother", |_| Command::GoPlayOther),
    ("post",      |_| Command::Post),
    ("protover",  |args| Command::Protover(parse_int(args) as i32)),
    ("quit",      |_| Command::Quit),
    ("random",    |_| Command::Ignore),
    ("rejected",  |_| Command::Ignore),
    ("remove",    |_| Command::UndoFullMove),
    ("result",    |args| Command::GameResult(args.trim().to_string())),
    ("sd",        |args| Command::SetFixedDepth(parse_int(args) as i32)),
    ("set",       parse_set_option),
    ("setboard",  |args| Command::SetBoard(args.trim().to_string())),
    ("st",        |args| Command::SetFixedTime(parse_int(args))),
    ("suite",     |_| Command::Ignore),
    ("time",      |args| Command::SetClock(parse_int(args))),
    ("undo",      |_| Command::UndoHalfMove),
    ("usermove",  |args| Command::UserMove(args.trim().to_string())),
    ("xboard",    |_| Command::Ignore),
];

fn parse_int(args: &str) -> i64 {
    args.split_whitespace()
        .next()
        .and_then(|t| t.parse::<i64>().ok())
        .unwrap_or_else(|| {
            debug!("discarding malformed numeric argument: '{args}'");
            0
        })
}

// "level 40 5 0" or "level 0 2:30 12": moves per control, base time in
// minutes (or minutes:seconds), increment in seconds.
fn parse_level(args: &str) -> Command {
    let mut parts = args.split_whitespace();
    let moves = parts.next().and_then(|t| t.parse::<i32>().ok());
    let base = parts.next().map(|t| {
        let mut pieces = t.split(':');
        let minutes = pieces.next().and_then(|m| m.parse::<i64>().ok()).unwrap_or(0);
        let seconds = pieces.next().and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
        minutes * 60 + seconds
    });
    let increment = parts.next().and_then(|t| t.parse::<i64>().ok());

    match (moves, base, increment) {
        (Some(moves), Some(seconds), Some(increment)) => Command::SetLevel {
            moves,
            seconds,
            increment,
        },
        _ => {
            warn!("discarding malformed level command: '{args}'");
            Command::Ignore
        }
    }
}

fn parse_set_option(args: &str) -> Command {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(name), Some(value)) => Command::SetOption {
            name: name.to_string(),
            value: value.to_string(),
        },
        _ => {
            warn!("discarding malformed set command: '{args}'");
            Command::Ignore
        }
    }
}

pub fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Ignore;
    }

    let (verb, args) = match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], &line[pos..]),
        None => (line, ""),
    };

    match VERBS.binary_search_by(|entry| entry.0.cmp(verb)) {
        Ok(index) => (VERBS[index].1)(args),
        // Unknown token: treat it as a move typed directly.
        Err(_) => Command::UserMove(verb.to_string()),
    }
}

impl Console {
    pub fn new() -> Self {
        Console
    }

    // Spawns the stdin reader. The channel sender is moved into the
    // thread; EOF turns into Quit so the engine shuts down cleanly.
    pub fn start_reader(&self, tx: Sender<Command>) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        let command = parse_line(&line);
                        let quit = command == Command::Quit;
                        if command != Command::Ignore && tx.send(command).is_err() {
                            break;
                        }
                        if quit {
                            break;
                        }
                    }
                    Err(_) => {
                        let _ = tx.send(Command::Quit);
                        break;
                    }
                }
            }
            let _ = tx.send(Command::Quit);
        })
    }

    pub fn identify(&self) {
        println!("feature myname=\"{} {}\"", About::ENGINE, About::VERSION);
        println!(
            "feature colors=0 ping=1 playother=1 setboard=1 sigint=0 sigterm=0 usermove=1"
        );
        println!("feature done=1");
    }

    pub fn play_move(&self, m: Move) {
        println!("move {}", m.as_string());
    }

    pub fn reject_move(&self, text: &str, reason: &str) {
        println!("Illegal move ({reason}): {text}");
    }

    pub fn send_result(&self, result: GameResult, reason: &str) {
        match result {
            GameResult::WhiteWins => println!("1-0 {{{reason}}}"),
            GameResult::BlackWins => println!("0-1 {{{reason}}}"),
            GameResult::Draw => println!("1/2-1/2 {{{reason}}}"),
        }
    }

    pub fn resign(&self, white_resigns: bool, reason: &str) {
        if white_resigns {
            println!("0-1 {{{reason}}}");
        } else {
            println!("1-0 {{{reason}}}");
        }
    }

    pub fn hint(&self, board: &Board, m: Move) {
        println!("Hint: {}", san::move_to_san(board, m));
    }

    // Post line: depth, score (centipawns), time (centiseconds), nodes,
    // principal variation in SAN.
    pub fn show_thinking(
        &self,
        board: &Board,
        depth: i32,
        score: i32,
        time_ms: u128,
        nodes: u64,
        pv: &[Move],
    ) {
        let mut line = format!("{} {} {} {}", depth, score, time_ms / 10, nodes);

        let mut scratch = board.clone();
        for &m in pv {
            line.push(' ');
            line.push_str(&san::move_to_san(&scratch, m));
            let mut filled = m;
            let undo = crate::board::UndoInfo::new(&scratch);
            if scratch.do_move(&mut filled).is_err() {
                scratch.undo_move(&filled, &undo);
                break;
            }
        }

        println!("{line}");
    }

    // Analyze-mode status line.
    pub fn show_current_move(
        &self,
        depth: i32,
        time_ms: u128,
        nodes: u64,
        moves_remaining: usize,
        moves_total: usize,
        current: Move,
    ) {
        println!(
            "stat01: {} {} {} {} {} {}",
            time_ms / 10,
            nodes,
            depth,
            moves_remaining,
            moves_total,
            current.as_string()
        );
    }

    pub fn pong(&self, n: i32) {
        println!("pong {n}");
    }

    pub fn help(&self) {
        println!("Supported commands:");
        println!("  analyze, bestm, bk, eval, exit, force, genbb, go, hint,");
        println!("  level MPS BASE INC, new, perft N, ping N, playother, post, nopost,");
        println!("  protover N, quit, remove, result R, sd N, set NAME VALUE,");
        println!("  setboard FEN, st SECONDS, time CENTISECONDS, undo, usermove MOVE,");
        println!("  . (search status), ? (move now)");
        println!("Anything else is tried as a move: e2e4, e7e8q, O-O.");
    }

    pub fn error(&self, what: &str, detail: &str) {
        println!("Error ({what}): {detail}");
    }

    pub fn info(&self, text: &str) {
        println!("# {text}");
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_table_is_sorted() {
        for pair in VERBS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn parses_known_verbs() {
        assert_eq!(parse_line("go"), Command::Go);
        assert_eq!(parse_line("help"), Command::Help);
        assert_eq!(parse_line("eval"), Command::Evaluate);
        assert_eq!(parse_line("bestm"), Command::BestMove);
        assert_eq!(parse_line("ping 7"), Command::Ping(7));
        assert_eq!(parse_line("time 12345"), Command::SetClock(12345));
        assert_eq!(parse_line("sd 9"), Command::SetFixedDepth(9));
        assert_eq!(
            parse_line("setboard 8/8/8/8/8/8/8/8 w - - 0 1"),
            Command::SetBoard(String::from("8/8/8/8/8/8/8/8 w - - 0 1"))
        );
        assert_eq!(
            parse_line("level 40 5 0"),
            Command::SetLevel {
                moves: 40,
                seconds: 300,
                increment: 0
            }
        );
        assert_eq!(
            parse_line("level 0 2:30 12"),
            Command::SetLevel {
                moves: 0,
                seconds: 150,
                increment: 12
            }
        );
        assert_eq!(parse_line("usermove e2e4"), Command::UserMove(String::from("e2e4")));
    }

    #[test]
    fn unknown_verbs_become_user_moves() {
        assert_eq!(parse_line("e2e4"), Command::UserMove(String::from("e2e4")));
        assert_eq!(parse_line("O-O"), Command::UserMove(String::from("O-O")));
    }
}
