//! Line-oriented text format for replayed games.
//!
//! Each game is a single line: 3-character move tokens (player sign, column
//! letter, row digit) followed by `:` and the final score differential, e.g.
//! `+f5-f4+e3:-58`. Files whose name ends with `.gz` are gzip-compressed.

use std::ffi::OsStr;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;

use crate::database::Game;
use crate::othello::core::{Move, MoveList, MAX_MOVES};

const RESULT_SEPARATOR: char = ':';
const TOKEN_LENGTH: usize = 3;

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for played in self.moves() {
            write!(f, "{played}")?;
        }
        write!(f, "{RESULT_SEPARATOR}{}", self.result())
    }
}

impl TryFrom<&str> for Game {
    type Error = anyhow::Error;

    /// Parses a single line. Surrounding whitespace (including the line
    /// terminator) is ignored.
    fn try_from(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let Some((tokens, result)) = line.split_once(RESULT_SEPARATOR) else {
            bail!("game should end with '{RESULT_SEPARATOR}<result>', got '{line}'")
        };
        let chars = tokens.chars().collect_vec();
        if chars.len() % TOKEN_LENGTH != 0 {
            bail!(
                "moves should be {TOKEN_LENGTH}-character tokens, got {} characters",
                chars.len()
            );
        }
        if chars.len() / TOKEN_LENGTH > MAX_MOVES {
            bail!(
                "game can not have more than {MAX_MOVES} moves, got {}",
                chars.len() / TOKEN_LENGTH
            );
        }
        let mut moves = MoveList::new();
        for token in chars.chunks(TOKEN_LENGTH) {
            let token = token.iter().collect::<String>();
            let played = Move::try_from(token.as_str())
                .with_context(|| format!("move {} '{token}'", moves.len() + 1))?;
            moves.try_push(played)?;
        }
        let result = result
            .parse::<i8>()
            .with_context(|| format!("result should be a small integer, got '{result}'"))?;
        if result % 2 != 0 || !(-64..=64).contains(&result) {
            bail!("result should be an even number within -64..=64, got {result}");
        }
        Ok(Self::new(moves, result))
    }
}

/// Encodes a game as a newline-terminated line.
#[must_use]
pub fn encode(game: &Game) -> String {
    format!("{game}\n")
}

/// Decodes a single line, inverse of [`encode`].
///
/// # Errors
///
/// If the line is malformed: missing result, tokens that are not 3 characters
/// long, out of range coordinates, a bad player sign, an unparsable result or
/// more than [`MAX_MOVES`] moves.
pub fn decode(line: &str) -> anyhow::Result<Game> {
    Game::try_from(line)
}

/// Reads all games from `reader`. Blank lines are skipped.
///
/// # Errors
///
/// On I/O failure or the first malformed line (with its 1-based number).
pub fn read(reader: impl BufRead) -> anyhow::Result<Vec<Game>> {
    let mut games = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        games.push(decode(&line).with_context(|| format!("line {}", index + 1))?);
    }
    Ok(games)
}

/// Writes games to `writer`, one per line.
///
/// # Errors
///
/// If writing fails.
pub fn write(mut writer: impl Write, games: &[Game]) -> anyhow::Result<()> {
    for game in games {
        writeln!(writer, "{game}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a text database, decompressing it if the name ends with `.gz`.
///
/// # Errors
///
/// If the file can not be opened or contains a malformed line.
pub fn read_file(path: &Path) -> anyhow::Result<Vec<Game>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let games = if is_gzip(path) {
        read(BufReader::new(GzDecoder::new(file)))
    } else {
        read(BufReader::new(file))
    };
    games.with_context(|| format!("reading {}", path.display()))
}

/// Writes a text database, compressing it if the name ends with `.gz`.
///
/// # Errors
///
/// If the file can not be created or written.
pub fn write_file(path: &Path, games: &[Game]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let written = if is_gzip(path) {
        write_compressed(BufWriter::new(file), games)
    } else {
        write(BufWriter::new(file), games)
    };
    written.with_context(|| format!("writing {}", path.display()))
}

fn write_compressed(writer: impl Write, games: &[Game]) -> anyhow::Result<()> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    write(&mut encoder, games)?;
    encoder.finish()?.flush()?;
    Ok(())
}

fn is_gzip(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("gz"))
}
