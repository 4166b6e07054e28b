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

use crate::board::ZobristKey;
use crate::movegen::defs::Move;

/*
    One entry is 16 bytes:

    Bits    Bytes   Description
    ----    -----   -----------
    24      3       Move (from, to, promotion)
    4       -       Search id (aging)
    1       -       Exact bound
    1       -       Null move reported a mate threat
    1       -       There is only one valid move in this position
    1       -       Value type (0 = lower bound, 1 = upper bound)
    16      2       Value, biased by 0x8000
    16      2       Depth, in fractional-ply units
    64      8       Hash key

    Entries live in buckets of four; the whole table is a power of two
    of buckets.
*/
pub struct EntryFlag;
impl EntryFlag {
    pub const LOWER_BOUND: u32 = 0;
    pub const UPPER_BOUND: u32 = 0x8000_0000;
    pub const SINGLE_REPLY: u32 = 0x4000_0000;
    pub const MATE_THREAT: u32 = 0x2000_0000;
    pub const EXACT_BOUND: u32 = 0x1000_0000;
    pub const SEARCH_ID_INCREMENT: u32 = 0x0100_0000;
    pub const SEARCH_ID_MASK: u32 = 0x0F00_0000;
}

const VALUE_BIAS: i32 = 0x8000;
const BUCKET_SIZE: usize = 4;

#[derive(Clone, Copy, Default, PartialEq)]
pub struct HashEntry {
    key: ZobristKey,
    data1: u32,
    data2: u32,
}

impl HashEntry {
    pub fn is_upper_bound(&self) -> bool {
        self.data1 & EntryFlag::UPPER_BOUND != 0
    }

    pub fn has_single_reply(&self) -> bool {
        self.data1 & EntryFlag::SINGLE_REPLY != 0
    }

    pub fn has_mate_threat(&self) -> bool {
        self.data1 & EntryFlag::MATE_THREAT != 0
    }

    pub fn value(&self) -> i32 {
        (self.data2 & 0xFFFF) as i32 - VALUE_BIAS
    }

    pub fn depth(&self) -> i32 {
        (self.data2 >> 16) as i32
    }

    pub fn search_id(&self) -> u32 {
        self.data1 & EntryFlag::SEARCH_ID_MASK
    }

    pub fn best_move(&self) -> Move {
        Move::from_u32(self.data1 & 0x00FF_FFFF)
    }

    fn is_empty(&self) -> bool {
        self.key == 0 && self.data1 == 0 && self.data2 == 0
    }
}

pub struct TranspositionTable {
    table: Box<[HashEntry]>,
    bucket_mask: usize,
    search_id: u32,
}

impl TranspositionTable {
    // Sized in megabytes; rounded down to a power-of-two bucket count.
    pub fn new(megabytes: usize) -> Self {
        let bytes = megabytes.max(1) * 1024 * 1024;
        let max_buckets = bytes / (BUCKET_SIZE * std::mem::size_of::<HashEntry>());
        let buckets = if max_buckets.is_power_of_two() {
            max_buckets
        } else {
            max_buckets.next_power_of_two() >> 1
        };
        let buckets = buckets.max(1024);

        Self {
            table: vec![HashEntry::default(); buckets * BUCKET_SIZE].into_boxed_slice(),
            bucket_mask: buckets - 1,
            search_id: 0,
        }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(|e| *e = HashEntry::default());
        self.search_id = 0;
    }

    pub fn resize(&mut self, megabytes: usize) {
        *self = TranspositionTable::new(megabytes);
    }

    // Once per root search, so entries of older searches age out.
    pub fn bump_search_id(&mut self) {
        self.search_id =
            (self.search_id + EntryFlag::SEARCH_ID_INCREMENT) & EntryFlag::SEARCH_ID_MASK;
    }

    fn bucket(&self, hash: ZobristKey) -> usize {
        (hash as usize & self.bucket_mask) * BUCKET_SIZE
    }

    pub fn probe(&self, hash: ZobristKey) -> Option<HashEntry> {
        let base = self.bucket(hash);
        self.table[base..base + BUCKET_SIZE]
            .iter()
            .find(|e| e.key == hash && !e.is_empty())
            .copied()
    }

    /*
        Replacement: an entry for the same position is updated in place;
        otherwise the shallowest entry of an older search is taken, and
        only if all four slots belong to the current search may a
        shallower current-search entry be overwritten.
    */
    pub fn store(&mut self, hash: ZobristKey, m: Move, value: i32, flags: u32, depth: i32) {
        let base = self.bucket(hash);
        let mut replace: Option<usize> = None;
        let mut replace_depth = i32::MAX;
        let mut replace_old_search = false;

        for i in base..base + BUCKET_SIZE {
            let entry = &self.table[i];

            if entry.is_empty() || entry.key == hash {
                replace = Some(i);
                break;
            }

            let is_old = entry.search_id() != self.search_id;
            if is_old && !replace_old_search {
                replace = Some(i);
                replace_depth = entry.depth();
                replace_old_search = true;
            } else if is_old == replace_old_search && entry.depth() < replace_depth {
                replace = Some(i);
                replace_depth = entry.depth();
            }
        }

        if let Some(i) = replace {
            let incumbent = &self.table[i];
            // Within the current search, keep the deeper entry.
            if !incumbent.is_empty()
                && incumbent.key != hash
                && incumbent.search_id() == self.search_id
                && incumbent.depth() > depth
            {
                return;
            }

            let value = value.clamp(-VALUE_BIAS, VALUE_BIAS - 1);
            self.table[i] = HashEntry {
                key: hash,
                data1: flags | self.search_id | m.to_u24(),
                data2: ((value + VALUE_BIAS) as u32) | ((depth.max(0) as u32) << 16),
            };
        }
    }

    // Drop the entry for this position, if any (used by the PV scrub
    // after an interrupted search).
    pub fn clean(&mut self, hash: ZobristKey) {
        let base = self.bucket(hash);
        for i in base..base + BUCKET_SIZE {
            if self.table[i].key == hash {
                self.table[i] = HashEntry::default();
            }
        }
    }

    pub fn entries(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Squares;

    fn test_move() -> Move {
        Move::new(Squares::E2, Squares::E4)
    }

    #[test]
    fn probe_returns_only_matching_keys() {
        let mut tt = TranspositionTable::new(1);
        let m = test_move();

        tt.store(0x1234_5678_9ABC_DEF0, m, 42, EntryFlag::LOWER_BOUND, 60);
        let entry = tt.probe(0x1234_5678_9ABC_DEF0).unwrap();
        assert_eq!(entry.value(), 42);
        assert_eq!(entry.depth(), 60);
        assert_eq!(entry.best_move(), m);
        assert!(!entry.is_upper_bound());

        // A different hash mapping to the same bucket must miss.
        assert!(tt.probe(0x1234_5678_9ABC_DEF0 ^ (1 << 60)).is_none());
    }

    #[test]
    fn negative_and_mate_values_round_trip() {
        let mut tt = TranspositionTable::new(1);
        tt.store(1, test_move(), -19500, EntryFlag::UPPER_BOUND, 0);
        let entry = tt.probe(1).unwrap();
        assert_eq!(entry.value(), -19500);
        assert!(entry.is_upper_bound());
    }

    #[test]
    fn same_position_updates_in_place() {
        let mut tt = TranspositionTable::new(1);
        tt.store(7, test_move(), 10, EntryFlag::LOWER_BOUND, 60);
        tt.store(7, test_move(), 20, EntryFlag::LOWER_BOUND, 120);
        let entry = tt.probe(7).unwrap();
        assert_eq!(entry.value(), 20);
        assert_eq!(entry.depth(), 120);
    }

    #[test]
    fn flags_survive_packing() {
        let mut tt = TranspositionTable::new(1);
        tt.store(
            9,
            test_move(),
            0,
            EntryFlag::UPPER_BOUND | EntryFlag::SINGLE_REPLY | EntryFlag::MATE_THREAT,
            60,
        );
        let entry = tt.probe(9).unwrap();
        assert!(entry.is_upper_bound());
        assert!(entry.has_single_reply());
        assert!(entry.has_mate_threat());
    }

    #[test]
    fn clean_removes_the_entry() {
        let mut tt = TranspositionTable::new(1);
        tt.store(11, test_move(), 5, EntryFlag::LOWER_BOUND, 60);
        assert!(tt.probe(11).is_some());
        tt.clean(11);
        assert!(tt.probe(11).is_none());
    }

    #[test]
    fn old_search_entries_are_replaced_first() {
        let mut tt = TranspositionTable::new(1);
        let buckets = tt.entries() / 4;

        // Fill one bucket with four entries from the current search.
        let base_hash = 5u64;
        for i in 0..4u64 {
            tt.store(
                base_hash + (i * buckets as u64 * 4),
                test_move(),
                1,
                EntryFlag::LOWER_BOUND,
                100 + i as i32,
            );
        }

        tt.bump_search_id();

        // A new-search store replaces the shallowest old entry, not the
        // existing deep data of other positions.
        let newcomer = base_hash + 4 * buckets as u64 * 4;
        tt.store(newcomer, test_move(), 2, EntryFlag::LOWER_BOUND, 60);
        assert!(tt.probe(newcomer).is_some());
        // The deepest old entry survives.
        assert!(tt.probe(base_hash + 3 * buckets as u64 * 4).is_some());
    }
}
