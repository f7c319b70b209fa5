use thiserror::Error;

/// Tag identifying which textual grammar rule a parse error violated.
///
/// Kept as a small closed enumeration (rather than a free-form string) so
/// callers can match on failure class without parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    NoFunctionSection,
    NoFunctions,
    IncompleteXYPair,
    BadParameterLine,
    BadOptionLine,
    BadImageBlock,
    UnknownFunction,
    BadSection,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParseErrorKind::NoFunctionSection => "no function section",
            ParseErrorKind::NoFunctions => "no functions",
            ParseErrorKind::IncompleteXYPair => "incomplete X0/Y0 pair",
            ParseErrorKind::BadParameterLine => "bad parameter line",
            ParseErrorKind::BadOptionLine => "bad option line",
            ParseErrorKind::BadImageBlock => "bad image block",
            ParseErrorKind::UnknownFunction => "unknown function name",
            ParseErrorKind::BadSection => "bad image-section syntax",
        };
        f.write_str(s)
    }
}

/// Parse error carrying the *original* (not compacted/renumbered) line number.
#[derive(Error, Debug)]
#[error("line {line}: {kind}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            line,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("lifecycle misuse: {0}")]
    Lifecycle(String),

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("no valid (unmasked, finite) pixels remain after finalize")]
    NoValidPixels,

    #[error("pixScale must be > 0, got {0}")]
    InvalidPixScale(f64),

    #[error("FFT plan allocation failed for size {0}x{1}")]
    FftSetup(usize, usize),

    #[error("unknown fit statistic / function name: {0}")]
    UnknownIdentifier(String),
}

pub type Result<T> = std::result::Result<T, Error>;
