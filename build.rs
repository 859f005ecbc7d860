//! Retrieves information about the version of the tool from Git and the build
//! environment. The generated module is included by `src/lib.rs` and is
//! printed by `wthor --version`.

fn main() -> shadow_rs::SdResult<()> {
    shadow_rs::new()
}
