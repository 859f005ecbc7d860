//! Decoder for [WTHOR] binary archives.
//!
//! An archive is a 16-byte file header followed by fixed-size 68-byte records:
//! an 8-byte record header and 60 move slots. A move slot holds `10 * (row +
//! 1) + (column + 1)`; non-positive slots are padding. The format has no
//! notion of whose turn it is and does not store passes, so every record is
//! replayed on a fresh [`Oracle`] to attribute the moves:
//!
//! - Black moves first.
//! - If the player to move can not play the recorded square, that player must
//!   have passed and the square belongs to the opponent. At most one pass is
//!   inferred per move slot; if the opponent can not play the square either,
//!   the record is corrupt.
//!
//! After the replay the final black score is compared with the one stored in
//! the record header. Records that disagree (or can not be replayed at all)
//! are dropped and counted as inconsistencies.
//!
//! [WTHOR]: http://cassio.free.fr/cassio/custom_install/database/FORMAT_WTHOR.TXT

use std::io::{Cursor, Read, Write};

use anyhow::{bail, Context};
use arrayvec::ArrayVec;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, warn};

use crate::database::{Database, Game};
use crate::othello::board::{Board, Oracle};
use crate::othello::core::{Disc, Move, MoveList, Player, Square, MAX_MOVES};

#[allow(missing_docs)]
pub const FILE_HEADER_SIZE: usize = 16;
#[allow(missing_docs)]
pub const RECORD_HEADER_SIZE: usize = 8;
#[allow(missing_docs)]
pub const RECORD_SIZE: usize = RECORD_HEADER_SIZE + MAX_MOVES;

/// Number of cells on the board, which is also the highest possible score.
const DISCS: i16 = 64;

/// Global archive information.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FileHeader {
    /// Creation date: century, year within the century, month, day.
    pub created: [u8; 4],
    /// Number of games the archive declares.
    pub games: u32,
    /// Number of records (only used by solitaire archives).
    pub records: u16,
    /// Year the games were played in.
    pub year: u16,
    /// Only 8 (and 0, which means 8) are supported.
    pub board_size: i8,
    #[allow(missing_docs)]
    pub game_type: u8,
    /// Depth of the perfect play search used for the theoretical score.
    pub depth: u8,
}

impl FileHeader {
    /// Header of an archive with `games` games on the standard board.
    #[must_use]
    pub fn new(games: u32) -> Self {
        Self {
            games,
            board_size: 8,
            ..Self::default()
        }
    }

    /// Parses the header at the start of an archive.
    ///
    /// # Errors
    ///
    /// If there are fewer than [`FILE_HEADER_SIZE`] bytes.
    pub fn parse(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            bail!(
                "file header should be {FILE_HEADER_SIZE} bytes, got {}",
                bytes.len()
            );
        }
        let mut cursor = Cursor::new(bytes);
        let mut created = [0; 4];
        cursor.read_exact(&mut created)?;
        Ok(Self {
            created,
            games: cursor.read_u32::<LittleEndian>()?,
            records: cursor.read_u16::<LittleEndian>()?,
            year: cursor.read_u16::<LittleEndian>()?,
            board_size: cursor.read_i8()?,
            game_type: cursor.read_u8()?,
            depth: cursor.read_u8()?,
        })
    }

    /// Checks whether records of this archive can be replayed on an 8x8
    /// board.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self.board_size, 0 | 8)
    }

    fn write(&self, mut writer: impl Write) -> anyhow::Result<()> {
        writer.write_all(&self.created)?;
        writer.write_u32::<LittleEndian>(self.games)?;
        writer.write_u16::<LittleEndian>(self.records)?;
        writer.write_u16::<LittleEndian>(self.year)?;
        writer.write_i8(self.board_size)?;
        writer.write_u8(self.game_type)?;
        writer.write_u8(self.depth)?;
        // Reserved.
        writer.write_u8(0)?;
        Ok(())
    }
}

/// Per-game information preceding the moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RecordHeader {
    #[allow(missing_docs)]
    pub tournament: u16,
    #[allow(missing_docs)]
    pub black_player: u16,
    #[allow(missing_docs)]
    pub white_player: u16,
    /// Final number of black discs, empty cells included if Black won.
    pub black_score: i8,
    /// Black score with perfect play from the position at the archive's
    /// search depth.
    pub theoretical_score: i8,
}

impl RecordHeader {
    /// Parses the header of a single record.
    ///
    /// # Errors
    ///
    /// If there are fewer than [`RECORD_HEADER_SIZE`] bytes.
    pub fn parse(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut cursor = Cursor::new(bytes);
        Ok(Self {
            tournament: cursor.read_u16::<LittleEndian>()?,
            black_player: cursor.read_u16::<LittleEndian>()?,
            white_player: cursor.read_u16::<LittleEndian>()?,
            black_score: cursor.read_i8()?,
            theoretical_score: cursor.read_i8()?,
        })
    }

    /// Header for a game that only has a result: the black score is recovered
    /// from the score differential.
    ///
    /// # Errors
    ///
    /// If the result is odd or outside of `-64..=64`.
    pub fn for_game(game: &Game) -> anyhow::Result<Self> {
        let result = i16::from(game.result());
        if result % 2 != 0 || !(-DISCS..=DISCS).contains(&result) {
            bail!(
                "result should be an even number within -64..=64, got {}",
                game.result()
            );
        }
        let black_score = (result + DISCS) / 2;
        let black_score = i8::try_from(black_score)?;
        Ok(Self {
            black_score,
            theoretical_score: black_score,
            ..Self::default()
        })
    }

    fn write(&self, mut writer: impl Write) -> anyhow::Result<()> {
        writer.write_u16::<LittleEndian>(self.tournament)?;
        writer.write_u16::<LittleEndian>(self.black_player)?;
        writer.write_u16::<LittleEndian>(self.white_player)?;
        writer.write_i8(self.black_score)?;
        writer.write_i8(self.theoretical_score)?;
        Ok(())
    }
}

/// What replaying a single record resulted in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The replay agrees with the stored score.
    Accepted(Game),
    /// The replay finished but its score disagrees with the stored one.
    Inconsistent {
        /// Black score from the record header.
        stored: i8,
        /// Black score of the replayed board.
        replayed: u8,
    },
}

/// Decodes a move slot into a square. Slots are 1-based: 34 is the third row
/// and the fourth column.
///
/// # Errors
///
/// If the value does not encode a square of the 8x8 board.
pub fn decode_play(play: u8) -> anyhow::Result<Square> {
    let (row, column) = (play / 10, play % 10);
    if row == 0 || column == 0 {
        bail!("move slot {play} does not encode a square");
    }
    Square::new(row - 1, column - 1).with_context(|| format!("move slot {play} is off the board"))
}

/// Encodes a square into a move slot, inverse of [`decode_play`].
#[must_use]
pub const fn encode_play(square: Square) -> u8 {
    (square.row() + 1) * 10 + square.column() + 1
}

/// Extracts the squares played in a record. Non-positive slots are skipped
/// wherever they are: some archives pad with zeros in the middle of a record.
///
/// # Errors
///
/// If the record is not [`RECORD_SIZE`] bytes long or a slot does not encode a
/// square.
pub fn decode_plays(record: &[u8]) -> anyhow::Result<ArrayVec<Square, MAX_MOVES>> {
    if record.len() != RECORD_SIZE {
        bail!("record should be {RECORD_SIZE} bytes, got {}", record.len());
    }
    record[RECORD_HEADER_SIZE..]
        .iter()
        .map(|&slot| i8::from_le_bytes([slot]))
        .filter(|&play| play > 0)
        .map(|play| decode_play(play.unsigned_abs()))
        .collect()
}

/// Replays `plays` on `oracle` and attributes each one to a player, inferring
/// passes on the way (see the module documentation).
///
/// # Errors
///
/// If neither player can play one of the squares.
pub fn resolve_turns(oracle: &mut impl Oracle, plays: &[Square]) -> anyhow::Result<MoveList> {
    let mut moves = MoveList::new();
    let mut player = Player::Black;
    for &square in plays {
        if !oracle.is_feasible(square, player) {
            player = player.opponent();
        }
        oracle
            .flip(square, player)
            .with_context(|| format!("replaying move {} at {square}", moves.len() + 1))?;
        moves.try_push(Move::new(player, square))?;
        player = player.opponent();
    }
    Ok(moves)
}

/// Final black score of a replayed game as archives store it.
///
/// Empty cells are credited to Black when Black has more discs, but never to
/// White. Standard scoring gives them to whoever wins; the asymmetry is kept
/// because it decides which archived records are consistent.
#[must_use]
pub fn replayed_black_score(oracle: &impl Oracle) -> u8 {
    let black = oracle.score(Disc::Black);
    if black > oracle.score(Disc::White) {
        black + oracle.score(Disc::Blank)
    } else {
        black
    }
}

/// Compares the replayed score with the stored one and builds the game if
/// they agree.
///
/// # Errors
///
/// Never for scores produced by a legal replay on an 8x8 board.
pub fn validate(moves: MoveList, stored: i8, replayed: u8) -> anyhow::Result<RecordOutcome> {
    if i16::from(stored) != i16::from(replayed) {
        return Ok(RecordOutcome::Inconsistent { stored, replayed });
    }
    let result = i8::try_from(2 * i16::from(stored) - DISCS)
        .with_context(|| format!("black score {stored} is out of range"))?;
    Ok(RecordOutcome::Accepted(Game::new(moves, result)))
}

/// Runs the whole pipeline for a single record on a fresh `O`.
///
/// # Errors
///
/// If the record is malformed or can not be replayed.
pub fn decode_record<O: Oracle + Default>(record: &[u8]) -> anyhow::Result<RecordOutcome> {
    let plays = decode_plays(record)?;
    let header = RecordHeader::parse(record)?;
    let mut oracle = O::default();
    let moves = resolve_turns(&mut oracle, &plays)?;
    validate(moves, header.black_score, replayed_black_score(&oracle))
}

/// Decodes a whole archive into a new [`Database`]. Trailing bytes that do not
/// form a complete record are ignored.
///
/// # Errors
///
/// If the header is truncated or the board size is neither 8 nor 0.
pub fn read_archive(bytes: &[u8]) -> anyhow::Result<Database> {
    let header = FileHeader::parse(bytes)?;
    if !header.is_supported() {
        bail!(
            "unsupported board size {}, only 8x8 archives can be decoded",
            header.board_size
        );
    }
    let mut database = Database::new();
    let records = bytes[FILE_HEADER_SIZE..].chunks_exact(RECORD_SIZE);
    let found = records.len();
    for (index, record) in records.enumerate() {
        match decode_record::<Board>(record) {
            Ok(RecordOutcome::Accepted(game)) => database.games.push(game),
            Ok(RecordOutcome::Inconsistent { stored, replayed }) => {
                debug!(record = index, stored, replayed, "score mismatch");
                database.inconsistencies += 1;
            },
            Err(e) => {
                debug!(record = index, "corrupt record: {e:#}");
                database.inconsistencies += 1;
            },
        }
    }
    if usize::try_from(header.games).ok() != Some(found) {
        warn!(declared = header.games, found, "header game count mismatch");
    }
    debug!(inconsistencies = database.inconsistencies, "decoded {found} records");
    Ok(database)
}

/// Encodes a single game into a record.
///
/// # Errors
///
/// If the header can not be written.
pub fn encode_record(game: &Game, header: &RecordHeader) -> anyhow::Result<[u8; RECORD_SIZE]> {
    let mut record = [0; RECORD_SIZE];
    header.write(&mut record[..RECORD_HEADER_SIZE])?;
    for (slot, played) in record[RECORD_HEADER_SIZE..].iter_mut().zip(game.moves()) {
        *slot = encode_play(played.square());
    }
    Ok(record)
}

/// Encodes games into an archive readable by [`read_archive`]. The black
/// score of each record is recovered from the game result.
///
/// # Errors
///
/// If a result is outside of `-64..=64` or there are more than [`u32::MAX`]
/// games.
pub fn encode_archive(games: &[Game]) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(FILE_HEADER_SIZE + games.len() * RECORD_SIZE);
    FileHeader::new(u32::try_from(games.len())?).write(&mut bytes)?;
    for game in games {
        bytes.extend_from_slice(&encode_record(game, &RecordHeader::for_game(game)?)?);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn square(input: &str) -> Square {
        Square::try_from(input).expect("valid square")
    }

    fn record(black_score: i8, plays: &[u8]) -> [u8; RECORD_SIZE] {
        let mut record = [0; RECORD_SIZE];
        record[6] = black_score as u8;
        record[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + plays.len()].copy_from_slice(plays);
        record
    }

    /// Oracle that accepts any move on an empty cell, except the ones listed
    /// as infeasible for a player.
    #[derive(Default)]
    struct Permissive {
        infeasible: Vec<(Square, Player)>,
        played: Vec<(Square, Player)>,
    }

    impl Oracle for Permissive {
        fn is_feasible(&self, square: Square, player: Player) -> bool {
            !self.infeasible.contains(&(square, player))
                && !self.played.iter().any(|(played, _)| *played == square)
        }

        fn flip(&mut self, square: Square, player: Player) -> anyhow::Result<()> {
            if !self.is_feasible(square, player) {
                bail!("{square} is infeasible");
            }
            self.played.push((square, player));
            Ok(())
        }

        fn score(&self, _: Disc) -> u8 {
            0
        }
    }

    /// Final position with 20 black and 44 white discs whatever is played.
    #[derive(Default)]
    struct Fixed;

    impl Oracle for Fixed {
        fn is_feasible(&self, _: Square, _: Player) -> bool {
            true
        }

        fn flip(&mut self, _: Square, _: Player) -> anyhow::Result<()> {
            Ok(())
        }

        fn score(&self, disc: Disc) -> u8 {
            match disc {
                Disc::Black => 20,
                Disc::White => 44,
                Disc::Blank => 0,
            }
        }
    }

    #[test]
    fn stored_score_matches_replay() {
        let outcome = decode_record::<Fixed>(&record(20, &[56, 46, 34])).expect("valid record");
        let RecordOutcome::Accepted(game) = outcome else {
            panic!("expected an accepted game, got {outcome:?}");
        };
        assert_eq!(game.result(), -24);
        assert_eq!(game.moves().len(), 3);

        let outcome = decode_record::<Fixed>(&record(21, &[56, 46, 34])).expect("valid record");
        assert_eq!(
            outcome,
            RecordOutcome::Inconsistent {
                stored: 21,
                replayed: 20
            }
        );
    }

    #[test]
    fn plays() {
        assert_eq!(decode_play(34).expect("valid slot"), square("d3"));
        assert_eq!(decode_play(11).expect("valid slot"), square("a1"));
        assert_eq!(decode_play(88).expect("valid slot"), square("h8"));
        assert!(decode_play(9).is_err());
        assert!(decode_play(10).is_err());
        assert!(decode_play(19).is_err());
        assert!(decode_play(91).is_err());
        assert!(decode_play(127).is_err());
        for index in 0..64u8 {
            let square = Square::try_from(index).expect("valid index");
            assert_eq!(decode_play(encode_play(square)).ok(), Some(square));
        }
    }

    #[test]
    fn padding_is_skipped() {
        let plays = decode_plays(&record(0, &[56, 0, 0, 46, 0xff, 0x80, 45])).expect("valid record");
        assert_eq!(plays.as_slice(), &[square("f5"), square("f4"), square("e4")]);

        assert!(decode_plays(&[0; RECORD_SIZE - 1]).is_err());
        assert!(decode_plays(&record(0, &[56, 99])).is_err());
    }

    #[test]
    fn alternating_turns() {
        let mut oracle = Permissive::default();
        let plays = [square("f5"), square("f4"), square("e3")];
        let moves = resolve_turns(&mut oracle, &plays).expect("legal replay");
        let players = moves.iter().map(Move::player).collect::<Vec<_>>();
        assert_eq!(players, [Player::Black, Player::White, Player::Black]);
    }

    #[test]
    fn pass_is_inferred() {
        let mut oracle = Permissive {
            infeasible: vec![(square("e3"), Player::Black)],
            ..Permissive::default()
        };
        // Black plays f5, White f4, then Black can not play e3: Black passed,
        // so e3 is White's and d3 is Black's again.
        let plays = [square("f5"), square("f4"), square("e3"), square("d3")];
        let moves = resolve_turns(&mut oracle, &plays).expect("legal replay");
        let players = moves.iter().map(Move::player).collect::<Vec<_>>();
        assert_eq!(
            players,
            [Player::Black, Player::White, Player::White, Player::Black]
        );
        assert_eq!(oracle.played[2], (square("e3"), Player::White));
    }

    #[test]
    fn double_pass_is_an_error() {
        let mut oracle = Permissive {
            infeasible: vec![(square("f4"), Player::Black), (square("f4"), Player::White)],
            ..Permissive::default()
        };
        assert!(resolve_turns(&mut oracle, &[square("f5"), square("f4")]).is_err());
    }

    #[test]
    fn replay_on_board() {
        // f5 captures e5, f4 captures e4: 3 discs each.
        let outcome = decode_record::<Board>(&record(3, &[56, 46])).expect("valid record");
        let RecordOutcome::Accepted(game) = outcome else {
            panic!("expected an accepted game, got {outcome:?}");
        };
        assert_eq!(game.result(), 3 * 2 - 64);
        assert_eq!(
            game.moves(),
            &[
                Move::new(Player::Black, square("f5")),
                Move::new(Player::White, square("f4"))
            ]
        );
    }

    #[test]
    fn black_lead_claims_empty_cells() {
        // After f5 Black has 4 discs against 1: the 59 empty cells are Black's.
        let outcome = decode_record::<Board>(&record(63, &[56])).expect("valid record");
        assert!(matches!(outcome, RecordOutcome::Accepted(ref game) if game.result() == 62));

        let outcome = decode_record::<Board>(&record(4, &[56])).expect("valid record");
        assert_eq!(
            outcome,
            RecordOutcome::Inconsistent {
                stored: 4,
                replayed: 63
            }
        );
    }

    #[test]
    fn white_lead_does_not_claim_empty_cells() {
        let board = Board::try_from(
            "OOOOOOOO
             OOOOOOOO
             XX------
             --------
             --------
             --------
             --------
             --------",
        )
        .expect("valid board");
        assert_eq!(replayed_black_score(&board), 2);

        let board = Board::try_from(
            "XXXXXXXX
             XXXXXXXX
             OO------
             --------
             --------
             --------
             --------
             --------",
        )
        .expect("valid board");
        assert_eq!(replayed_black_score(&board), 62);
    }

    #[test]
    fn illegal_record_is_an_error() {
        // a1 is not playable by anyone at the start.
        assert!(decode_record::<Board>(&record(0, &[11])).is_err());
    }

    #[test]
    fn headers() {
        let header = FileHeader {
            created: [20, 24, 6, 16],
            games: 2,
            records: 0,
            year: 2024,
            board_size: 8,
            game_type: 0,
            depth: 22,
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes).expect("writing to memory");
        assert_eq!(bytes.len(), FILE_HEADER_SIZE);
        assert_eq!(bytes[12], 8);
        assert_eq!(FileHeader::parse(&bytes).expect("valid header"), header);
        assert!(FileHeader::parse(&bytes[..15]).is_err());

        let record_header = RecordHeader {
            tournament: 7,
            black_player: 1234,
            white_player: 4321,
            black_score: 40,
            theoretical_score: 36,
        };
        let mut bytes = Vec::new();
        record_header.write(&mut bytes).expect("writing to memory");
        assert_eq!(bytes.len(), RECORD_HEADER_SIZE);
        assert_eq!(bytes[6], 40);
        assert_eq!(RecordHeader::parse(&bytes).expect("valid header"), record_header);
    }

    #[test]
    fn unsupported_board_size() {
        let mut bytes = encode_archive(&[]).expect("empty archive");
        for board_size in [8, 0] {
            bytes[12] = board_size;
            assert!(read_archive(&bytes).is_ok());
        }
        bytes[12] = 10;
        assert!(read_archive(&bytes).is_err());
        assert!(read_archive(&bytes[..10]).is_err());
    }

    #[test]
    fn archive_counts_inconsistencies() {
        let mut bytes = encode_archive(&[]).expect("empty archive");
        bytes.extend_from_slice(&record(3, &[56, 46]));
        bytes.extend_from_slice(&record(20, &[56, 46]));
        bytes.extend_from_slice(&record(3, &[11]));
        // Partial trailing record.
        bytes.extend_from_slice(&record(3, &[56, 46])[..30]);

        let database = read_archive(&bytes).expect("valid archive");
        assert_eq!(database.len(), 1);
        assert_eq!(database.inconsistencies(), 2);
        assert_eq!(database.games()[0].result(), -58);
    }

    #[test]
    fn result_out_of_range() {
        let game = Game::new(MoveList::new(), 66);
        assert!(RecordHeader::for_game(&game).is_err());
        assert!(encode_archive(&[game]).is_err());
    }

    #[test]
    fn odd_result_is_not_rounded() {
        let game = Game::new(MoveList::new(), -3);
        assert!(RecordHeader::for_game(&game).is_err());
        assert!(encode_archive(&[game]).is_err());

        let game = Game::new(MoveList::new(), -4);
        let header = RecordHeader::for_game(&game).expect("even result");
        assert_eq!(header.black_score, 30);
    }
}
