//! CLI subcommand implementations.

pub mod case;
pub mod check_in;
pub mod check_out;
pub mod detect;
pub mod elapsed;
pub mod locations;
pub mod monitor;
pub mod pause;
pub mod resume;
pub mod schedule;
pub mod status;
pub mod util;
