//! Command-line argument parsing module
//!
//! A table-driven parser: the option registry declares every recognized
//! flag, the scanner turns the token list into raw events, and the config
//! mapper applies each event to the configuration under construction.

pub mod config_mapper;
pub mod converters;
pub mod options;
pub mod scanner;

pub use config_mapper::ParseState;
pub use scanner::{ArgumentScanner, RawEvent};
