//! Reader and converter for [WTHOR] Othello game archives. For more
//! information, see [README].
//!
//! WTHOR records store the squares that were played but neither whose turn it
//! was nor the passes. [`database::wthor`] replays every record on an
//! [`othello::board::Board`] to attribute the moves and validates the final
//! score against the stored one. Accepted games go into a
//! [`database::Database`] that can be exported to the line-oriented
//! [`database::text`] format. [`zobrist`] hashes board snapshots for
//! deduplication and transposition lookups.
//!
//! [WTHOR]: http://cassio.free.fr/cassio/custom_install/database/FORMAT_WTHOR.TXT
//! [README]: https://github.com/kirillbobyrev/wthor/blob/main/README.md

pub mod database;
pub mod othello;
pub mod zobrist;

use shadow_rs::shadow;

shadow!(build);

/// Returns the full version that can be used to identify how the tool was
/// built in the first place.
#[must_use]
pub fn version() -> String {
    format!(
        "{} (commit {}, branch {})",
        build::PKG_VERSION,
        build::SHORT_COMMIT,
        build::BRANCH
    )
}

/// Prints information about the build type and whether the build is clean.
pub fn print_binary_info() {
    println!("wthor {}", version());
    println!("Release build: {}", !shadow_rs::is_debug());
    if !shadow_rs::git_clean() {
        println!("Warning: built with uncommitted changes");
    }
}
