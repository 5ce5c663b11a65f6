//! Command-line parse errors.
//!
//! Every failure is fatal to the parse: the first problem aborts the whole
//! pass and the caller is expected to print the message plus the usage text
//! and exit non-zero.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A value did not match its declared type or compound shape.
    #[error("{0}")]
    Format(String),

    /// A flag requiring a value had none available.
    #[error("option '--{flag}' requires an argument")]
    MissingArgument { flag: String },

    /// Token did not match any registry entry.
    #[error("unrecognized option '{token}'")]
    UnrecognizedOption { token: String },

    /// Leftover non-flag token after scanning.
    #[error("unexpected argument: {token}")]
    UnexpectedArgument { token: String },

    /// Two mutually exclusive flags were both supplied.
    #[error(
        "incompatible flags --{first} and --{second} both provided, \
         please provide one or the other"
    )]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },

    /// Two enabled endpoints resolve to the same address and port.
    #[error(
        "the server cannot listen to {first} requests and {second} requests \
         at the same address and port {address}:{port}"
    )]
    PortConflict {
        first: &'static str,
        second: &'static str,
        address: String,
        port: i32,
    },

    /// An endpoint's port falls outside the range another endpoint allows
    /// on the shared bind address.
    #[error(
        "the server cannot listen to {service} requests at port {port}, \
         the port range allowed by {range_service} is [{lower}, {upper}]"
    )]
    PortRangeViolation {
        range_service: &'static str,
        service: &'static str,
        port: i32,
        lower: i32,
        upper: i32,
    },

    /// `--help` was supplied; the caller prints usage and exits cleanly.
    #[error("help requested")]
    HelpRequested,
}
