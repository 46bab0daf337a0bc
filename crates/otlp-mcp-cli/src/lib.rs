//! Command line parsing, configuration resolution and the `doctor`
//! diagnostic subcommand.

pub mod cli;
pub mod config;
pub mod doctor;

pub use cli::{Cli, Command, DoctorArgs, ServeArgs};
pub use config::{Config, ConfigOverrides};
pub use doctor::DoctorReport;
