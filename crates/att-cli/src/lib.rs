//! Field attendance CLI library.
//!
//! This crate provides the CLI functionality for att, exposed as a library
//! for testing.

mod cli;
pub mod commands;
mod config;
mod location;

pub use cli::{
    CaseCommand, CheckInArgs, CheckOutArgs, Cli, Commands, DetectArgs, LocationsAction,
    PauseArgs, PositionArgs, ScheduleAction, SessionArg,
};
pub use config::{Config, dirs_data_path};
pub use location::DeviceLocation;
