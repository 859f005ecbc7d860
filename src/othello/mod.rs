//! Othello board, its rules and primitives needed to replay recorded games.

pub mod bitboard;
pub mod board;
pub mod core;
