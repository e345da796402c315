use std::str::Utf8Error;

/// Framing errors surfaced to the session's read loop.
///
/// `Incomplete` is not really an error: it tells the caller that the
/// buffered bytes so far do not contain a whole record yet and more
/// should be read from the socket before trying again.
#[derive(Debug)]
pub enum Error {
    Incomplete,
    InvalidCommand(u8),
    InvalidLength(i32),
    InvalidAddressFamily(u8),
    Utf8Error(Utf8Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incomplete => write!(f, "incomplete record"),
            Self::InvalidCommand(cmd) => write!(f, "invalid command byte: {cmd}"),
            Self::InvalidLength(len) => write!(f, "invalid length prefix: {len}"),
            Self::InvalidAddressFamily(b) => write!(f, "invalid address family byte: {b}"),
            Self::Utf8Error(e) => write!(f, "invalid utf-8: {e}"),
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}
