//! Unified error type.

use std::net::AddrParseError;

/// The error type returned by wren's fallible operations.
///
/// Handler outcomes (404, aborts, faults) are expressed through
/// [`Halt`](crate::Halt) and end up as [`Response`](crate::Response) values,
/// never as `Error`s. This type surfaces setup and infrastructure failures:
/// a route that does not compile, a config file that does not parse, a
/// template that cannot be loaded, a port that cannot be bound.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid route `{pattern}`: {source}")]
    InvalidRoute {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown reserved route `{0}`")]
    UnknownReserved(String),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    #[error("template: {0}")]
    Template(#[from] minijinja::Error),

    #[error("template-path is not configured")]
    TemplatePathUnset,

    #[error("status code {0} has no reason phrase")]
    UnknownStatus(u16),

    #[error("invalid socket address: {0}")]
    Addr(#[from] AddrParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
