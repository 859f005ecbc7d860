//! Othello primitives commonly used within [`crate::othello`] and
//! [`crate::database`].

use std::fmt;

use anyhow::bail;
use arrayvec::ArrayVec;
use itertools::Itertools;

#[allow(missing_docs)]
pub const BOARD_WIDTH: u8 = 8;
#[allow(missing_docs)]
pub const BOARD_SIZE: u8 = BOARD_WIDTH * BOARD_WIDTH;

/// A game on an 8x8 board can not have more moves than there are empty cells
/// in the starting position (64 - 4 central discs).
pub const MAX_MOVES: usize = 60;

/// Sequence of moves in one game. Bounded by [`MAX_MOVES`] so that an overlong
/// record can not be represented at all.
pub type MoveList = ArrayVec<Move, MAX_MOVES>;

/// Othello is played between Black (moving first) and White.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    Black,
    White,
}

impl Player {
    /// "Flips" the color.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::Black => '+',
                Self::White => '-',
            }
        )
    }
}

impl TryFrom<char> for Player {
    type Error = anyhow::Error;

    fn try_from(sign: char) -> anyhow::Result<Self> {
        match sign {
            '+' => Ok(Self::Black),
            '-' => Ok(Self::White),
            _ => bail!("player sign should be '+' or '-', got '{sign}'"),
        }
    }
}

/// Contents of a single cell. The numeric values are the piece kinds used by
/// [`crate::zobrist::ZobristTable::hash`]: empty cells are 0 and contribute
/// nothing to the hash.
#[repr(u8)]
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disc {
    Blank = 0,
    Black = 1,
    White = 2,
}

impl From<Player> for Disc {
    fn from(player: Player) -> Self {
        match player {
            Player::Black => Self::Black,
            Player::White => Self::White,
        }
    }
}

impl TryFrom<char> for Disc {
    type Error = anyhow::Error;

    fn try_from(symbol: char) -> anyhow::Result<Self> {
        match symbol {
            '-' => Ok(Self::Blank),
            'X' => Ok(Self::Black),
            'O' => Ok(Self::White),
            _ => bail!("disc should be one of 'X', 'O' or '-', got '{symbol}'"),
        }
    }
}

impl fmt::Display for Disc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::Blank => '-',
                Self::Black => 'X',
                Self::White => 'O',
            }
        )
    }
}

/// Board cell. Squares are indexed row-major: A1 is 0, H1 is 7, A2 is 8 and H8
/// is 63.
///
/// ```
/// use wthor::othello::core::Square;
///
/// let square = Square::new(3, 2).unwrap();
/// assert_eq!(square.index(), 26);
/// assert_eq!(square.to_string(), "c4");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(u8);

impl Square {
    /// Connects row and column (both zero-based) to form a square.
    ///
    /// # Errors
    ///
    /// If either coordinate is outside of `0..BOARD_WIDTH`.
    pub fn new(row: u8, column: u8) -> anyhow::Result<Self> {
        if row >= BOARD_WIDTH {
            bail!("row should be within 0..{BOARD_WIDTH}, got {row}");
        }
        if column >= BOARD_WIDTH {
            bail!("column should be within 0..{BOARD_WIDTH}, got {column}");
        }
        Ok(Self(row * BOARD_WIDTH + column))
    }

    pub(crate) const fn from_index_unchecked(index: u8) -> Self {
        debug_assert!(index < BOARD_SIZE);
        Self(index)
    }

    /// Position-major index of the square.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn row(self) -> u8 {
        self.0 / BOARD_WIDTH
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn column(self) -> u8 {
        self.0 % BOARD_WIDTH
    }

    /// Returns the neighbouring square in given direction or `None` if it
    /// would be off the board.
    #[must_use]
    pub(crate) fn shift(self, (d_row, d_column): (i8, i8)) -> Option<Self> {
        let row = self.row().checked_add_signed(d_row)?;
        let column = self.column().checked_add_signed(d_column)?;
        Self::new(row, column).ok()
    }
}

impl TryFrom<u8> for Square {
    type Error = anyhow::Error;

    /// Creates a square given its position on the board.
    ///
    /// # Errors
    ///
    /// If given square index is outside 0..[`BOARD_SIZE`] range.
    fn try_from(index: u8) -> anyhow::Result<Self> {
        // Exclusive range patterns are not allowed:
        // https://github.com/rust-lang/rust/issues/37854
        const MAX_INDEX: u8 = BOARD_SIZE - 1;
        match index {
            0..=MAX_INDEX => Ok(Self(index)),
            _ => bail!("square index should be in 0..{BOARD_SIZE}, got {index}"),
        }
    }
}

impl TryFrom<&str> for Square {
    type Error = anyhow::Error;

    /// Parses a square in `<column letter><row digit>` notation, e.g. "c4".
    fn try_from(square: &str) -> anyhow::Result<Self> {
        let Some((column, row)) = square.chars().collect_tuple() else {
            bail!(
                "square should be two-char, got '{square}' with {} chars",
                square.chars().count()
            )
        };
        let column = match column {
            'a'..='h' => column as u8 - b'a',
            _ => bail!("column should be within 'a'..='h', got '{column}'"),
        };
        let row = match row {
            '1'..='8' => row as u8 - b'1',
            _ => bail!("row should be within '1'..='8', got '{row}'"),
        };
        Self::new(row, column)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.column()) as char, self.row() + 1)
    }
}

/// A disc placed by one of the players. Moves are produced by replaying game
/// records and are never mutated afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    player: Player,
    square: Square,
}

impl Move {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(player: Player, square: Square) -> Self {
        Self { player, square }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn player(&self) -> Player {
        self.player
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn square(&self) -> Square {
        self.square
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn row(&self) -> u8 {
        self.square.row()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn column(&self) -> u8 {
        self.square.column()
    }
}

impl fmt::Display for Move {
    /// Serializes a move as a 3-character token: player sign, column letter
    /// and row digit (e.g. "+c4" or "-d3").
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.player, self.square)
    }
}

impl TryFrom<&str> for Move {
    type Error = anyhow::Error;

    fn try_from(token: &str) -> anyhow::Result<Self> {
        let mut chars = token.chars();
        let Some(sign) = chars.next() else {
            bail!("move should not be empty")
        };
        Ok(Self::new(Player::try_from(sign)?, Square::try_from(chars.as_str())?))
    }
}
