use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    Timeout,
    HttpStatus(u16),
    UnexpectedResponse(String),
    InvalidInput(String),
    BridgeUnavailable(String),
    JsonError(Box<dyn error::Error + Send>),
    HttpError(Box<dyn error::Error + Send>),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Timed out"),
            Self::HttpStatus(code) => write!(f, "HTTP {code}"),
            Self::UnexpectedResponse(msg) => write!(f, "Unexpected response: {msg}"),
            Self::InvalidInput(msg) => f.write_str(msg),
            Self::BridgeUnavailable(msg) => write!(f, "Bridge unavailable: {msg}"),
            Self::JsonError(err) | Self::HttpError(err) => err.fmt(f),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        if matches!(
            err.kind(),
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
        ) {
            Error::Timeout
        } else {
            Error::IoError(err)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::JsonError(Box::new(err))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Error {
        match err {
            ureq::Error::StatusCode(code) => Error::HttpStatus(code),
            ureq::Error::Timeout(_) => Error::Timeout,
            err => Error::HttpError(Box::new(err)),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::InvalidInput(err.to_string())
    }
}

impl From<crossbeam_channel::RecvTimeoutError> for Error {
    fn from(_: crossbeam_channel::RecvTimeoutError) -> Error {
        Error::Timeout
    }
}
