//! [Zobrist hashing] of board snapshots.
//!
//! The table holds one random key per (position, piece kind) pair. A snapshot
//! hashes to the XOR of the keys of its occupied cells, so a position reached
//! through different move orders gets the same key and a single disc change is
//! an O(1) update.
//!
//! Tables are persisted in a small binary format: the `ZOBR` magic, the shape
//! as two little-endian `u32`s and then all keys as little-endian `u64`s.
//!
//! [Zobrist hashing]: https://www.chessprogramming.org/Zobrist_Hashing

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::othello::board::Board;

/// Hash of a board snapshot.
pub type Key = u64;

const MAGIC: &[u8; 4] = b"ZOBR";

/// Random keys for every (position, piece kind) pair. Piece kinds are 1-based
/// in snapshots (0 is an empty cell) and 0-based in the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZobristTable {
    positions: usize,
    pieces: usize,
    keys: Vec<Key>,
}

impl ZobristTable {
    /// Loads the table from `path` if given, otherwise generates a fresh
    /// random one.
    ///
    /// # Errors
    ///
    /// If the file can not be read or its shape differs from the requested
    /// one.
    pub fn new(positions: usize, pieces: usize, path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path, positions, pieces),
            None => Ok(Self::random(positions, pieces)),
        }
    }

    /// Generates keys from the thread-local random generator.
    #[must_use]
    pub fn random(positions: usize, pieces: usize) -> Self {
        Self::generate(positions, pieces, &mut rand::thread_rng())
    }

    /// Generates keys deterministically: the same seed always produces the
    /// same table.
    #[must_use]
    pub fn seeded(positions: usize, pieces: usize, seed: u64) -> Self {
        Self::generate(positions, pieces, &mut StdRng::seed_from_u64(seed))
    }

    fn generate(positions: usize, pieces: usize, rng: &mut impl RngCore) -> Self {
        Self {
            positions,
            pieces,
            keys: (0..positions * pieces).map(|_| rng.next_u64()).collect(),
        }
    }

    /// Number of positions and piece kinds.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.positions, self.pieces)
    }

    /// Key of a 0-based piece kind at given position.
    ///
    /// # Panics
    ///
    /// If either index is outside of the table.
    #[must_use]
    pub fn key(&self, position: usize, piece: usize) -> Key {
        assert!(
            position < self.positions && piece < self.pieces,
            "({position}, {piece}) is outside of the {}x{} table",
            self.positions,
            self.pieces
        );
        self.keys[position * self.pieces + piece]
    }

    /// Hashes a snapshot: one cell per position, 0 for an empty cell and
    /// `1..=pieces` for occupied ones.
    ///
    /// # Panics
    ///
    /// If the snapshot length differs from the number of positions or a cell
    /// value exceeds the number of piece kinds.
    #[must_use]
    pub fn hash(&self, cells: &[u8]) -> Key {
        assert_eq!(
            cells.len(),
            self.positions,
            "snapshot should have one cell per position"
        );
        cells
            .iter()
            .enumerate()
            .filter(|&(_, &cell)| cell != 0)
            .fold(0, |key, (position, &cell)| {
                key ^ self.key(position, usize::from(cell) - 1)
            })
    }

    /// Hashes the board snapshot (see [`Board::snapshot`]).
    ///
    /// # Panics
    ///
    /// If the table does not have exactly 64 positions and at least 2 piece
    /// kinds.
    #[must_use]
    pub fn hash_board(&self, board: &Board) -> Key {
        self.hash(&board.snapshot())
    }

    /// Updates `key` after the cell at `position` changed from `before` to
    /// `after` (both in snapshot encoding).
    ///
    /// # Panics
    ///
    /// If the position or either cell value is outside of the table.
    #[must_use]
    pub fn update(&self, key: Key, position: usize, before: u8, after: u8) -> Key {
        let mut key = key;
        for cell in [before, after] {
            if cell != 0 {
                key ^= self.key(position, usize::from(cell) - 1);
            }
        }
        key
    }

    /// Reads a persisted table from `path`.
    ///
    /// # Errors
    ///
    /// If the file can not be read, is malformed or has a different shape.
    pub fn load(path: &Path, positions: usize, pieces: usize) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::read(BufReader::new(file), positions, pieces)
            .with_context(|| format!("loading Zobrist table from {}", path.display()))
    }

    /// Reads a table in the persisted format.
    ///
    /// # Errors
    ///
    /// If the data is malformed or the stored shape differs from the
    /// requested one.
    pub fn read(mut reader: impl Read, positions: usize, pieces: usize) -> anyhow::Result<Self> {
        let mut magic = [0; 4];
        reader.read_exact(&mut magic)?;
        if magic != *MAGIC {
            bail!("expected Zobrist table magic {MAGIC:?}, got {magic:?}");
        }
        let stored = (
            usize::try_from(reader.read_u32::<LittleEndian>()?)?,
            usize::try_from(reader.read_u32::<LittleEndian>()?)?,
        );
        if stored != (positions, pieces) {
            bail!(
                "shape mismatch: expected {positions}x{pieces}, stored table is {}x{}",
                stored.0,
                stored.1
            );
        }
        let mut keys = vec![0; positions * pieces];
        reader.read_u64_into::<LittleEndian>(&mut keys)?;
        if reader.read(&mut [0])? != 0 {
            bail!("unexpected data after {} keys", keys.len());
        }
        Ok(Self {
            positions,
            pieces,
            keys,
        })
    }

    /// Persists the table to `path`.
    ///
    /// # Errors
    ///
    /// If the file can not be written.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        self.write(BufWriter::new(file))
            .with_context(|| format!("saving Zobrist table to {}", path.display()))
    }

    /// Writes the table in the persisted format.
    ///
    /// # Errors
    ///
    /// If writing fails or the shape does not fit into `u32`.
    pub fn write(&self, mut writer: impl Write) -> anyhow::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(u32::try_from(self.positions)?)?;
        writer.write_u32::<LittleEndian>(u32::try_from(self.pieces)?)?;
        for &key in &self.keys {
            writer.write_u64::<LittleEndian>(key)?;
        }
        writer.flush()?;
        Ok(())
    }
}
