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

use crate::defs::{About, FEN_START_POSITION};
use crate::engine::defs::Settings;
use clap::{value_parser, Arg, ArgAction, ArgMatches};

struct CmdLineArgs;
impl CmdLineArgs {
    const FEN_LONG: &'static str = "fen";
    const FEN_SHORT: char = 'f';
    const FEN_HELP: &'static str = "Set up the given position";

    const PERFT_LONG: &'static str = "perft";
    const PERFT_SHORT: char = 'p';
    const PERFT_HELP: &'static str = "Run perft to the given depth";
    const PERFT_DEFAULT: u8 = 0;

    const HASH_LONG: &'static str = "hash";
    const HASH_SHORT: char = 'h';
    const HASH_HELP: &'static str = "Transposition table size in MB";

    const KIWI_LONG: &'static str = "kiwipete";
    const KIWI_SHORT: char = 'k';
    const KIWI_HELP: &'static str = "Set up the KiwiPete position (ignore --fen)";

    const QUIET_LONG: &'static str = "quiet";
    const QUIET_SHORT: char = 'q';
    const QUIET_HELP: &'static str = "No intermediate search stats updates";

    const BITBASE_LONG: &'static str = "bitbases";
    const BITBASE_SHORT: char = 'b';
    const BITBASE_HELP: &'static str = "Directory holding the endgame bitbase files";
}

pub struct CmdLine {
    arguments: ArgMatches,
}

impl CmdLine {
    pub fn new() -> Self {
        Self {
            arguments: Self::get(),
        }
    }

    pub fn fen(&self) -> String {
        self.arguments
            .get_one::<String>(CmdLineArgs::FEN_LONG)
            .cloned()
            .unwrap_or_else(|| String::from(FEN_START_POSITION))
    }

    pub fn perft(&self) -> u8 {
        *self
            .arguments
            .get_one::<u8>(CmdLineArgs::PERFT_LONG)
            .unwrap_or(&CmdLineArgs::PERFT_DEFAULT)
    }

    pub fn hash(&self) -> usize {
        *self
            .arguments
            .get_one::<usize>(CmdLineArgs::HASH_LONG)
            .unwrap_or(&Settings::HASH_MB_DEFAULT)
    }

    pub fn has_kiwipete(&self) -> bool {
        self.arguments.get_flag(CmdLineArgs::KIWI_LONG)
    }

    pub fn quiet(&self) -> bool {
        self.arguments.get_flag(CmdLineArgs::QUIET_LONG)
    }

    pub fn bitbase_dir(&self) -> String {
        self.arguments
            .get_one::<String>(CmdLineArgs::BITBASE_LONG)
            .cloned()
            .unwrap_or_else(|| String::from("."))
    }

    fn get() -> ArgMatches {
        clap::Command::new(About::ENGINE)
            .version(About::VERSION)
            .author(About::AUTHOR)
            .arg(
                Arg::new(CmdLineArgs::FEN_LONG)
                    .long(CmdLineArgs::FEN_LONG)
                    .short(CmdLineArgs::FEN_SHORT)
                    .help(CmdLineArgs::FEN_HELP)
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::PERFT_LONG)
                    .long(CmdLineArgs::PERFT_LONG)
                    .short(CmdLineArgs::PERFT_SHORT)
                    .help(CmdLineArgs::PERFT_HELP)
                    .value_parser(value_parser!(u8))
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::HASH_LONG)
                    .long(CmdLineArgs::HASH_LONG)
                    .short(CmdLineArgs::HASH_SHORT)
                    .help(CmdLineArgs::HASH_HELP)
                    .value_parser(value_parser!(usize))
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::KIWI_LONG)
                    .long(CmdLineArgs::KIWI_LONG)
                    .short(CmdLineArgs::KIWI_SHORT)
                    .help(CmdLineArgs::KIWI_HELP)
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(CmdLineArgs::QUIET_LONG)
                    .long(CmdLineArgs::QUIET_LONG)
                    .short(CmdLineArgs::QUIET_SHORT)
                    .help(CmdLineArgs::QUIET_HELP)
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(CmdLineArgs::BITBASE_LONG)
                    .long(CmdLineArgs::BITBASE_LONG)
                    .short(CmdLineArgs::BITBASE_SHORT)
                    .help(CmdLineArgs::BITBASE_HELP)
                    .num_args(1),
            )
            .get_matches()
    }
}

impl Default for CmdLine {
    fn default() -> Self {
        Self::new()
    }
}
