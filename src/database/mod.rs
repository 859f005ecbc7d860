//! Collections of recorded games and the formats they are stored in.
//!
//! Games come either from [WTHOR] binary archives (see [`wthor`]) or from the
//! line-oriented text format (see [`text`]). Both end up in a [`Database`],
//! which only ever grows: files are ingested one after another and a file
//! that can not be read leaves the database untouched.
//!
//! [WTHOR]: http://cassio.free.fr/cassio/custom_install/database/FORMAT_WTHOR.TXT

use std::fs;
use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use tracing::info;

use crate::othello::core::{Move, MoveList};

pub mod text;
pub mod wthor;

/// Replayed game: the moves in the order they were played and the final score
/// differential (`2 * black discs - 64`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    moves: MoveList,
    result: i8,
}

impl Game {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(moves: MoveList, result: i8) -> Self {
        Self { moves, result }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Final score differential from Black's perspective.
    #[must_use]
    pub const fn result(&self) -> i8 {
        self.result
    }
}

/// Accepted games and the number of records that were rejected on the way.
///
/// A record is rejected when it can not be replayed or when the replayed final
/// score disagrees with the one stored in the archive. Rejections are only
/// counted: archives routinely contain a handful of bad records and the
/// interesting number is how many there were.
#[derive(Debug, Default)]
pub struct Database {
    games: Vec<Game>,
    inconsistencies: usize,
}

impl Database {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parallel ingestion of WTHOR archives: each file is decoded into its own
    /// database on the rayon thread pool, the results are then merged in the
    /// order of `paths`.
    ///
    /// # Errors
    ///
    /// If any of the files can not be read or has an unsupported header.
    pub fn from_wthor_files<P: AsRef<Path> + Sync>(paths: &[P]) -> anyhow::Result<Self> {
        let archives = paths
            .par_iter()
            .map(|path| read_wthor_file(path.as_ref()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(archives
            .into_iter()
            .fold(Self::new(), |mut database, archive| {
                database.merge(archive);
                database
            }))
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Number of rejected records across all ingested archives.
    #[must_use]
    pub const fn inconsistencies(&self) -> usize {
        self.inconsistencies
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Appends games and inconsistencies of `other`. This is the reduction
    /// step for databases built independently (e.g. one per file).
    pub fn merge(&mut self, other: Self) {
        self.games.extend(other.games);
        self.inconsistencies += other.inconsistencies;
    }

    /// Reads a WTHOR archive and appends its accepted games. Returns the
    /// number of games added.
    ///
    /// # Errors
    ///
    /// If the file can not be read or its header declares an unsupported
    /// board size. Nothing is added in that case.
    pub fn add_wthor_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let archive = read_wthor_file(path.as_ref())?;
        Ok(self.append(archive))
    }

    /// Same as [`Database::add_wthor_file`] for an archive already in memory.
    ///
    /// # Errors
    ///
    /// If the header is truncated or declares an unsupported board size.
    pub fn add_wthor_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<usize> {
        let archive = wthor::read_archive(bytes)?;
        Ok(self.append(archive))
    }

    /// Reads a text database (gzip-compressed if the name ends with `.gz`)
    /// and appends its games. Returns the number of games added.
    ///
    /// # Errors
    ///
    /// On the first malformed line. Nothing is added in that case.
    pub fn add_text_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let games = text::read_file(path.as_ref())?;
        let added = games.len();
        self.games.extend(games);
        Ok(added)
    }

    /// Writes all games in the text format, one per line. The output is
    /// gzip-compressed if the name ends with `.gz`.
    ///
    /// # Errors
    ///
    /// If the file can not be written.
    pub fn save_as_text(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        text::write_file(path.as_ref(), &self.games)
    }

    /// Writes all games as a WTHOR archive.
    ///
    /// # Errors
    ///
    /// If the file can not be written or there are more games than the header
    /// can count.
    pub fn save_as_wthor(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = wthor::encode_archive(&self.games)?;
        fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }

    fn append(&mut self, archive: Self) -> usize {
        let added = archive.len();
        self.merge(archive);
        added
    }
}

fn read_wthor_file(path: &Path) -> anyhow::Result<Database> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let archive =
        wthor::read_archive(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    info!(
        path = %path.display(),
        games = archive.len(),
        inconsistencies = archive.inconsistencies(),
        "read WTHOR archive"
    );
    Ok(archive)
}
