//! Board state and the rules needed to replay recorded games.
//!
//! Decoding an archive only needs a handful of questions answered by the game
//! rules: whether a player can place a disc on a given square, what happens
//! when they do and how many discs each side has. [`Oracle`] captures exactly
//! that so that any rules engine can drive the decoder; [`Board`] is the
//! bitboard implementation used by default.

use std::fmt;

use anyhow::bail;
use itertools::Itertools;

use crate::othello::bitboard::Bitboard;
use crate::othello::core::{Disc, Player, Square, BOARD_SIZE, BOARD_WIDTH};

/// Game rules consumed by [`crate::database::wthor`] while replaying a record.
/// Instances are owned by a single replay and are never shared between games.
pub trait Oracle {
    /// Checks whether `player` can legally place a disc on `square`.
    fn is_feasible(&self, square: Square, player: Player) -> bool;

    /// Places a disc of `player` on `square` and flips captured discs.
    ///
    /// # Errors
    ///
    /// If the move is not feasible. The state is left untouched in that case.
    fn flip(&mut self, square: Square, player: Player) -> anyhow::Result<()>;

    /// Number of cells holding `disc`; [`Disc::Blank`] counts empty cells.
    fn score(&self, disc: Disc) -> u8;
}

/// Eight directions a line of captured discs can go in, as (row, column)
/// deltas.
const DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Disc-centric 8x8 board: one [`Bitboard`] per player.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    black: Bitboard,
    white: Bitboard,
}

impl Board {
    /// Standard starting position: white discs on d4 and e5, black discs on d5
    /// and e4.
    ///
    /// ```
    /// use wthor::othello::board::{Board, Oracle};
    /// use wthor::othello::core::Disc;
    ///
    /// let board = Board::starting();
    /// assert_eq!(board.score(Disc::Black), 2);
    /// assert_eq!(board.score(Disc::White), 2);
    /// assert_eq!(board.score(Disc::Blank), 60);
    /// ```
    #[must_use]
    pub fn starting() -> Self {
        let square = |index| Bitboard::from(Square::from_index_unchecked(index));
        // d4 = 27, e4 = 28, d5 = 35, e5 = 36.
        Self {
            black: square(35) | square(28),
            white: square(27) | square(36),
        }
    }

    /// Board with no discs, to be filled by the parser.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            black: Bitboard::empty(),
            white: Bitboard::empty(),
        }
    }

    fn discs(&self, player: Player) -> Bitboard {
        match player {
            Player::Black => self.black,
            Player::White => self.white,
        }
    }

    fn discs_mut(&mut self, player: Player) -> &mut Bitboard {
        match player {
            Player::Black => &mut self.black,
            Player::White => &mut self.white,
        }
    }

    fn occupied(&self) -> Bitboard {
        self.black | self.white
    }

    /// Returns the contents of given square.
    #[must_use]
    pub fn at(&self, square: Square) -> Disc {
        if self.black.is_set(square) {
            Disc::Black
        } else if self.white.is_set(square) {
            Disc::White
        } else {
            Disc::Blank
        }
    }

    /// Discs of the opponent that would be flipped if `player` placed a disc
    /// on `square`. Empty if the move is not legal.
    #[must_use]
    pub fn flips(&self, square: Square, player: Player) -> Bitboard {
        if self.occupied().is_set(square) {
            return Bitboard::empty();
        }
        let ours = self.discs(player);
        let theirs = self.discs(player.opponent());
        let mut result = Bitboard::empty();
        for direction in DIRECTIONS {
            let mut line = Bitboard::empty();
            let mut next = square.shift(direction);
            while let Some(candidate) = next {
                if theirs.is_set(candidate) {
                    line |= Bitboard::from(candidate);
                    next = candidate.shift(direction);
                } else {
                    // The line only counts if it is closed by our own disc.
                    if ours.is_set(candidate) {
                        result |= line;
                    }
                    break;
                }
            }
        }
        result
    }

    /// All squares `player` can place a disc on.
    #[must_use]
    pub fn feasible_squares(&self, player: Player) -> Bitboard {
        (!self.occupied())
            .iter()
            .filter(|square| !self.flips(*square, player).is_empty())
            .fold(Bitboard::empty(), |acc, square| acc | Bitboard::from(square))
    }

    /// The game is over when neither side can move.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.feasible_squares(Player::Black).is_empty()
            && self.feasible_squares(Player::White).is_empty()
    }

    /// Dumps the board into a flat position-major array of piece kinds (see
    /// [`Disc`]) which is the input format of
    /// [`crate::zobrist::ZobristTable::hash`].
    #[must_use]
    pub fn snapshot(&self) -> [u8; BOARD_SIZE as usize] {
        let mut cells = [Disc::Blank as u8; BOARD_SIZE as usize];
        for square in self.black {
            cells[usize::from(square.index())] = Disc::Black as u8;
        }
        for square in self.white {
            cells[usize::from(square.index())] = Disc::White as u8;
        }
        cells
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::starting()
    }
}

impl Oracle for Board {
    fn is_feasible(&self, square: Square, player: Player) -> bool {
        !self.flips(square, player).is_empty()
    }

    fn flip(&mut self, square: Square, player: Player) -> anyhow::Result<()> {
        let flips = self.flips(square, player);
        if flips.is_empty() {
            bail!("{square} is not a legal move for {player:?}");
        }
        *self.discs_mut(player) |= flips | Bitboard::from(square);
        *self.discs_mut(player.opponent()) ^= flips;
        Ok(())
    }

    fn score(&self, disc: Disc) -> u8 {
        match disc {
            Disc::Black => self.black.count(),
            Disc::White => self.white.count(),
            Disc::Blank => (!self.occupied()).count(),
        }
    }
}

impl TryFrom<&str> for Board {
    type Error = anyhow::Error;

    /// Parses 64 symbols (`X` for black, `O` for white and `-` for empty
    /// cells) from a1 to h8, row by row. Whitespace is ignored so that the
    /// board can be written as an 8x8 grid.
    fn try_from(input: &str) -> anyhow::Result<Self> {
        let symbols = input.chars().filter(|c| !c.is_whitespace()).collect_vec();
        if symbols.len() != usize::from(BOARD_SIZE) {
            bail!("board should have {BOARD_SIZE} cells, got {}", symbols.len());
        }
        let mut board = Self::empty();
        for (index, symbol) in (0..BOARD_SIZE).zip(symbols) {
            let square = Square::from_index_unchecked(index);
            match Disc::try_from(symbol)? {
                Disc::Blank => {},
                Disc::Black => board.black |= Bitboard::from(square),
                Disc::White => board.white |= Bitboard::from(square),
            }
        }
        Ok(board)
    }
}

impl fmt::Debug for Board {
    /// Dumps the board row by row, a1 first, in the format accepted by
    /// [`Board::try_from`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = (0..BOARD_SIZE)
            .map(|index| self.at(Square::from_index_unchecked(index)))
            .chunks(BOARD_WIDTH as usize)
            .into_iter()
            .map(|mut row| row.join(""))
            .collect_vec();
        write!(f, "{}", rows.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn square(input: &str) -> Square {
        Square::try_from(input).expect("valid square")
    }

    #[test]
    fn starting_position() {
        let board = Board::starting();
        assert_eq!(board.at(square("d4")), Disc::White);
        assert_eq!(board.at(square("e5")), Disc::White);
        assert_eq!(board.at(square("d5")), Disc::Black);
        assert_eq!(board.at(square("e4")), Disc::Black);
        assert_eq!(board.at(square("a1")), Disc::Blank);
        assert_eq!(Board::default(), board);
    }

    #[test]
    fn opening_moves() {
        let board = Board::starting();
        let black = board.feasible_squares(Player::Black);
        assert_eq!(
            black,
            Bitboard::from_squares(&[square("d3"), square("c4"), square("f5"), square("e6")])
        );
        let white = board.feasible_squares(Player::White);
        assert_eq!(
            white,
            Bitboard::from_squares(&[square("e3"), square("f4"), square("c5"), square("d6")])
        );
        assert!(!board.is_feasible(square("d4"), Player::Black));
        assert!(!board.is_feasible(square("a1"), Player::Black));
    }

    #[test]
    fn flip_captures() {
        let mut board = Board::starting();
        board.flip(square("f5"), Player::Black).expect("legal move");
        assert_eq!(board.at(square("e5")), Disc::Black);
        assert_eq!(board.score(Disc::Black), 4);
        assert_eq!(board.score(Disc::White), 1);

        board.flip(square("f4"), Player::White).expect("legal move");
        assert_eq!(board.at(square("e4")), Disc::White);
        assert_eq!(board.score(Disc::Black), 3);
        assert_eq!(board.score(Disc::White), 3);
        assert_eq!(board.score(Disc::Blank), 58);
    }

    #[test]
    fn illegal_flip_keeps_state() {
        let mut board = Board::starting();
        assert!(board.flip(square("a1"), Player::Black).is_err());
        assert!(board.flip(square("d4"), Player::Black).is_err());
        assert_eq!(board, Board::starting());
    }

    #[test]
    fn multiple_lines() {
        let mut board = Board::try_from(
            "--------
             --------
             --XXX---
             --XOX---
             --XXX---
             --------
             --------
             --------",
        )
        .expect("valid board");
        // Surrounded white disc can not be captured by placing on an occupied
        // cell.
        assert!(!board.is_feasible(square("d4"), Player::Black));
        let mut board_with_gap = board;
        board_with_gap.white = Bitboard::from_squares(&[square("d4"), square("e4"), square("d5")]);
        board_with_gap.black = Bitboard::from_squares(&[square("f4"), square("d6"), square("f6")]);
        assert!(board_with_gap.is_feasible(square("c4"), Player::Black));
        board_with_gap
            .flip(square("c4"), Player::Black)
            .expect("legal move");
        assert_eq!(board_with_gap.score(Disc::White), 1);
        assert_eq!(board_with_gap.at(square("d5")), Disc::White);

        board.black = Bitboard::from_squares(&[square("a1"), square("a3"), square("c3")]);
        board.white = Bitboard::from_squares(&[square("a2"), square("b2"), square("b3")]);
        board.flip(square("c1"), Player::Black).expect("legal move");
        // Vertical line is not closed from c1 (c2 is empty), diagonal b2 is
        // closed by a3.
        assert_eq!(board.at(square("b2")), Disc::Black);
        assert_eq!(board.at(square("a2")), Disc::White);
        assert_eq!(board.at(square("b3")), Disc::White);
    }

    #[test]
    fn parse_and_dump() {
        let input = "XO------\n--------\n--------\n---OX---\n---XO---\n--------\n--------\n-------X";
        let board = Board::try_from(input).expect("valid board");
        assert_eq!(board.at(square("a1")), Disc::Black);
        assert_eq!(board.at(square("b1")), Disc::White);
        assert_eq!(board.at(square("h8")), Disc::Black);
        assert_eq!(format!("{board:?}"), input);

        assert!(Board::try_from("XO").is_err());
        assert!(Board::try_from(&*"?".repeat(64)).is_err());
    }

    #[test]
    fn snapshot() {
        let cells = Board::starting().snapshot();
        assert_eq!(cells.iter().filter(|&&cell| cell == 0).count(), 60);
        assert_eq!(cells[usize::from(square("d4").index())], 2);
        assert_eq!(cells[usize::from(square("e4").index())], 1);
    }

    #[test]
    fn game_over() {
        assert!(!Board::starting().is_over());
        assert!(Board::empty().is_over());
        let full = Board::try_from(&*"X".repeat(64)).expect("valid board");
        assert!(full.is_over());
    }
}
