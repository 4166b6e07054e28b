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

pub mod adjust;
pub mod genbb;
pub mod packed;
pub mod rle;

use self::packed::PackedArray;
use crate::board::defs::{piece_type, square_file, square_rank, Pieces};
use crate::defs::{Piece, Square};
use log::{info, warn};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/*
    Endgame bitbases: one packed win/draw bit per position, a file per
    (endgame, side to move). The white king is folded into files A-D, so
    the king pair indexes 32*64 slots; every other piece multiplies by
    64, or 48 for pawns (ranks 2-7 only).

    On-disk format: a 16-byte header (magic "Kbb0", 4 reserved bytes, a
    big-endian payload length, 4 more reserved bytes) followed by the
    payload, raw or run-length encoded. A per-endgame predictor XORs the
    data before encoding and after decoding to maximize zero runs.
*/

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BitBaseId {
    Kpk,
    Kppk,
    Kbpk,
    Kbnk,
}

pub struct BbFlags;
impl BbFlags {
    pub const PACK_RLE: u32 = 0x01;
    pub const DEFAULT_IS_1: u32 = 0x100;
}

#[derive(Clone, Copy, PartialEq)]
pub enum AdjustOp {
    Encode,
    Decode,
}

pub type AdjustFn = fn(&mut PackedArray, &BitBases, bool, AdjustOp) -> Result<(), String>;

pub struct BitBaseInfo {
    pub id: BitBaseId,
    pub bits: u32,
    pub pieces: &'static [Piece],
    pub flags: u32,
    pub filename: &'static str,
    pub adjust: Option<AdjustFn>,
}

// Order matters: a bitbase may depend on earlier ones for decoding.
pub const BITBASE_INFO: [BitBaseInfo; 4] = [
    BitBaseInfo {
        id: BitBaseId::Kpk,
        bits: 1,
        pieces: &[Pieces::WHITE_PAWN],
        flags: 0,
        filename: "kpk",
        adjust: None,
    },
    BitBaseInfo {
        id: BitBaseId::Kppk,
        bits: 1,
        pieces: &[Pieces::WHITE_PAWN, Pieces::WHITE_PAWN],
        flags: BbFlags::PACK_RLE,
        filename: "kppk",
        adjust: Some(adjust::adjust_kppk),
    },
    BitBaseInfo {
        id: BitBaseId::Kbpk,
        bits: 1,
        pieces: &[Pieces::WHITE_BISHOP, Pieces::WHITE_PAWN],
        flags: BbFlags::DEFAULT_IS_1 | BbFlags::PACK_RLE,
        filename: "kbpk",
        adjust: Some(adjust::adjust_kbpk),
    },
    BitBaseInfo {
        id: BitBaseId::Kbnk,
        bits: 1,
        pieces: &[Pieces::WHITE_BISHOP, Pieces::WHITE_KNIGHT],
        flags: BbFlags::DEFAULT_IS_1 | BbFlags::PACK_RLE,
        filename: "kbnk",
        adjust: Some(adjust::adjust_kbnk),
    },
];

pub fn info_for(id: BitBaseId) -> &'static BitBaseInfo {
    BITBASE_INFO.iter().find(|i| i.id == id).unwrap()
}

const MAGIC: [u8; 4] = [b'K', b'b', b'b', b'0'];

// The white-king/black-king part of every index. The caller must have
// folded the white king into files A-D.
fn index_for_kings(wk: Square, bk: Square) -> usize {
    debug_assert!(square_file(wk) < 4);
    8 * square_file(wk) + square_rank(wk) + 32 * bk
}

fn piece_index(piece: Piece, square: Square) -> (usize, usize) {
    if piece_type(piece) == Pieces::PAWN {
        debug_assert!((8..56).contains(&square));
        (square - 8, 48)
    } else {
        (square, 64)
    }
}

pub fn index3(id: BitBaseId, wk: Square, bk: Square, p1: Square) -> usize {
    let info = info_for(id);
    debug_assert!(info.pieces.len() == 1);
    let (p1, _) = piece_index(info.pieces[0], p1);
    index_for_kings(wk, bk) + 32 * 64 * p1
}

pub fn index4(id: BitBaseId, wk: Square, bk: Square, p1: Square, p2: Square) -> usize {
    let info = info_for(id);
    debug_assert!(info.pieces.len() == 2);
    let (p1, r1) = piece_index(info.pieces[0], p1);
    let (p2, _) = piece_index(info.pieces[1], p2);
    index_for_kings(wk, bk) + 32 * 64 * p1 + 32 * 64 * r1 * p2
}

pub fn index_range(id: BitBaseId) -> usize {
    let info = info_for(id);
    let mut range = 32 * 64;
    for &piece in info.pieces {
        range *= if piece_type(piece) == Pieces::PAWN { 48 } else { 64 };
    }
    range
}

// In-memory registry of loaded bitbases.
pub struct BitBases {
    data: [[Option<PackedArray>; 2]; 4],
    directory: PathBuf,
}

fn slot(id: BitBaseId) -> usize {
    match id {
        BitBaseId::Kpk => 0,
        BitBaseId::Kppk => 1,
        BitBaseId::Kbpk => 2,
        BitBaseId::Kbnk => 3,
    }
}

fn side_slot(wtm: bool) -> usize {
    if wtm {
        0
    } else {
        1
    }
}

impl BitBases {
    pub fn new(directory: &str) -> Self {
        Self {
            data: Default::default(),
            directory: PathBuf::from(directory),
        }
    }

    // Empty registry; the recognizer falls back to its heuristics.
    pub fn empty() -> Self {
        Self::new(".")
    }

    pub fn filename(&self, id: BitBaseId, wtm: bool) -> PathBuf {
        let suffix = if wtm { "_wtm" } else { "_btm" };
        self.directory
            .join(format!("{}{}.bb", info_for(id).filename, suffix))
    }

    pub fn get(&self, id: BitBaseId, wtm: bool) -> Option<&PackedArray> {
        self.data[slot(id)][side_slot(wtm)].as_ref()
    }

    pub fn insert(&mut self, id: BitBaseId, wtm: bool, pa: PackedArray) {
        self.data[slot(id)][side_slot(wtm)] = Some(pa);
    }

    // Loads every known bitbase; missing or broken files just leave the
    // corresponding slot empty.
    pub fn load_all(&mut self) {
        for info in &BITBASE_INFO {
            // Black-to-move first: the predictors may depend on it.
            for wtm in [false, true] {
                match self.load_one(info.id, wtm) {
                    Ok(pa) => {
                        info!("bitbase '{}' loaded", self.filename(info.id, wtm).display());
                        self.insert(info.id, wtm, pa);
                    }
                    Err(error) => {
                        warn!(
                            "bitbase '{}' unavailable: {}",
                            self.filename(info.id, wtm).display(),
                            error
                        );
                    }
                }
            }
        }
    }

    fn load_one(&self, id: BitBaseId, wtm: bool) -> Result<PackedArray, String> {
        let info = info_for(id);
        let path = self.filename(id, wtm);
        let payload = read_payload(&path)?;

        let mut pa = PackedArray::new(index_range(id), info.bits);
        let expected = pa.raw_data().len();

        if info.flags & BbFlags::PACK_RLE != 0 {
            let unpacked = rle::unpack(&payload, expected)
                .map_err(|e| format!("decompress failed: {e:?}"))?;
            pa.raw_data_mut().copy_from_slice(&unpacked);
        } else {
            if payload.len() != expected {
                return Err(format!(
                    "payload length {} does not match expected {}",
                    payload.len(),
                    expected
                ));
            }
            pa.raw_data_mut().copy_from_slice(&payload);
        }

        if let Some(adjust) = info.adjust {
            adjust(&mut pa, self, wtm, AdjustOp::Decode)
                .map_err(|e| format!("predictor decode failed: {e}"))?;
        }

        Ok(pa)
    }

    pub fn save(&self, id: BitBaseId, wtm: bool, pa: &PackedArray) -> Result<(), String> {
        let info = info_for(id);
        debug_assert_eq!(pa.elements(), index_range(id));

        let mut encoded = pa.clone();
        if let Some(adjust) = info.adjust {
            adjust(&mut encoded, self, wtm, AdjustOp::Encode)?;
        }

        let payload = if info.flags & BbFlags::PACK_RLE != 0 {
            rle::pack(encoded.raw_data())
        } else {
            encoded.raw_data().to_vec()
        };

        write_payload(&self.filename(id, wtm), &payload)
    }
}

fn read_payload(path: &Path) -> Result<Vec<u8>, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("cannot open: {e}"))?;

    let mut header = [0u8; 16];
    file.read_exact(&mut header)
        .map_err(|_| String::from("truncated header"))?;

    if header[..4] != MAGIC {
        return Err(String::from("bad magic"));
    }

    let len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let mut payload = vec![0u8; len];
    file.read_exact(&mut payload)
        .map_err(|_| String::from("truncated payload"))?;

    Ok(payload)
}

fn write_payload(path: &Path, payload: &[u8]) -> Result<(), String> {
    let mut header = [0u8; 16];
    header[..4].copy_from_slice(&MAGIC);
    header[8..12].copy_from_slice(&(payload.len() as u32).to_be_bytes());

    let mut file = std::fs::File::create(path).map_err(|e| format!("cannot create: {e}"))?;
    file.write_all(&header).map_err(|e| format!("write failed: {e}"))?;
    file.write_all(payload).map_err(|e| format!("write failed: {e}"))?;

    Ok(())
}

// Folds the white king into files A-D, mirroring all squares.
pub fn mirror_wk3(wk: &mut Square, bk: &mut Square, p1: &mut Square) {
    if square_file(*wk) >= 4 {
        *wk = flip_file(*wk);
        *bk = flip_file(*bk);
        *p1 = flip_file(*p1);
    }
}

pub fn mirror_wk4(wk: &mut Square, bk: &mut Square, p1: &mut Square, p2: &mut Square) {
    if square_file(*wk) >= 4 {
        *wk = flip_file(*wk);
        *bk = flip_file(*bk);
        *p1 = flip_file(*p1);
        *p2 = flip_file(*p2);
    }
}

pub fn flip_file(square: Square) -> Square {
    square ^ 7
}

pub fn flip_rank(square: Square) -> Square {
    square ^ 56
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kpk_index_is_a_bijection() {
        let mut seen = HashSet::new();
        let range = index_range(BitBaseId::Kpk);

        for wk in 0..64 {
            if square_file(wk) >= 4 {
                continue;
            }
            for bk in 0..64 {
                for p1 in 8..56 {
                    let index = index3(BitBaseId::Kpk, wk, bk, p1);
                    assert!(index < range);
                    assert!(seen.insert(index), "index {index} repeated");
                }
            }
        }

        assert_eq!(seen.len(), 32 * 64 * 48);
        assert_eq!(range, 32 * 64 * 48);
    }

    #[test]
    fn four_piece_ranges() {
        assert_eq!(index_range(BitBaseId::Kppk), 32 * 64 * 48 * 48);
        assert_eq!(index_range(BitBaseId::Kbpk), 32 * 64 * 64 * 48);
        assert_eq!(index_range(BitBaseId::Kbnk), 32 * 64 * 64 * 64);
    }

    #[test]
    fn kbnk_index_corners() {
        let range = index_range(BitBaseId::Kbnk);
        assert_eq!(index4(BitBaseId::Kbnk, 0, 0, 0, 0), 0);
        assert!(index4(BitBaseId::Kbnk, 31, 63, 63, 63) < range);
    }

    #[test]
    fn mirror_folds_into_left_half() {
        let (mut wk, mut bk, mut p1) = (7usize, 56usize, 12usize);
        mirror_wk3(&mut wk, &mut bk, &mut p1);
        assert_eq!(wk, 0);
        assert_eq!(bk, 63);
        assert_eq!(p1, 11);
        assert!(square_file(wk) < 4);
    }

    #[test]
    fn file_round_trip() {
        let dir = std::env::temp_dir().join("kauri_bb_test");
        std::fs::create_dir_all(&dir).unwrap();
        let mut bases = BitBases::new(dir.to_str().unwrap());

        let mut pa = PackedArray::new(index_range(BitBaseId::Kpk), 1);
        pa.set(12345, 1);
        pa.set(54321, 1);

        bases.save(BitBaseId::Kpk, true, &pa).unwrap();
        let loaded = bases.load_one(BitBaseId::Kpk, true).unwrap();
        assert_eq!(loaded.get(12345), 1);
        assert_eq!(loaded.get(54321), 1);
        assert_eq!(loaded.get(1), 0);

        bases.insert(BitBaseId::Kpk, true, loaded);
        assert!(bases.get(BitBaseId::Kpk, true).is_some());
        assert!(bases.get(BitBaseId::Kpk, false).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
