//! thicket CLI entry point
//!
//! Logging is installed by `cli::run` once the `--log-level` flag is known.

fn main() {
    thicket::cli::run();
}
