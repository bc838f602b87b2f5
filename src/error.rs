//! Error types for parsing and tuning construction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading `.scl`/`.kbm` text or generating scales.
///
/// Line numbers are 1-based positions in the source text.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file could not be read.
    #[error("could not read {}: {source}", .path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The input ended before a required value was found.
    #[error("input ended before the {expected}")]
    Incomplete {
        /// The value that was expected next.
        expected: &'static str,
    },

    /// A header value is not a valid non-negative integer.
    #[error("line {line}: {field} `{text}` is not a valid integer")]
    InvalidInteger {
        /// Offending line.
        line: usize,
        /// Header field being read.
        field: &'static str,
        /// Text of the line.
        text: String,
    },

    /// A header value is not a valid number.
    #[error("line {line}: {field} `{text}` is not a valid number")]
    InvalidNumber {
        /// Offending line.
        line: usize,
        /// Header field being read.
        field: &'static str,
        /// Text of the line.
        text: String,
    },

    /// A tone is neither a cents value nor an integer ratio.
    #[error("{}invalid tone `{text}`", line_prefix(.line))]
    InvalidTone {
        /// Offending line, if the tone came from a file.
        line: Option<usize>,
        /// Text of the tone.
        text: String,
    },

    /// A ratio tone has a zero or negative numerator or denominator.
    #[error("{}ratio `{text}` must have positive numerator and denominator", line_prefix(.line))]
    NonPositiveRatio {
        /// Offending line, if the tone came from a file.
        line: Option<usize>,
        /// Text of the tone.
        text: String,
    },

    /// Fewer tone lines than the declared note count.
    #[error("scale declares {expected} tones but only {found} are listed")]
    MissingTones {
        /// Declared note count.
        expected: usize,
        /// Number of tones actually found.
        found: usize,
    },

    /// A key line is neither a scale degree nor the unmapped marker.
    #[error("line {line}: key `{text}` is not a scale degree or `x`")]
    InvalidKey {
        /// Offending line.
        line: usize,
        /// Text of the line.
        text: String,
    },

    /// Fewer key lines than the declared map size.
    #[error("mapping declares {expected} keys but only {found} are listed")]
    MissingKeys {
        /// Declared map size.
        expected: usize,
        /// Number of keys actually found.
        found: usize,
    },

    /// The reference frequency is not a positive finite number.
    #[error("line {line}: reference frequency `{text}` must be positive")]
    InvalidFrequency {
        /// Offending line.
        line: usize,
        /// Text of the line.
        text: String,
    },

    /// Cannot divide a zero span.
    #[error("cannot divide a zero span")]
    ZeroSpan,

    /// Cannot divide into zero steps.
    #[error("cannot divide into zero steps")]
    ZeroDivisions,

    /// Cannot divide a non-positive cents amount.
    #[error("cannot divide {cents} cents, the amount must be positive")]
    NonPositiveCents {
        /// The rejected amount.
        cents: f64,
    },
}

impl FormatError {
    /// Re-targets a tone error at the given source line.
    pub(crate) fn at_line(self, source_line: usize) -> Self {
        match self {
            Self::InvalidTone { text, .. } => Self::InvalidTone {
                line: Some(source_line),
                text,
            },
            Self::NonPositiveRatio { text, .. } => Self::NonPositiveRatio {
                line: Some(source_line),
                text,
            },
            other => other,
        }
    }
}

fn line_prefix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("line {line}: "),
        None => String::new(),
    }
}

/// Errors raised when a scale and keyboard mapping cannot form a tuning.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TuningError {
    /// The reference note has no scale degree and tuning on unmapped keys is not allowed.
    #[error("cannot anchor tuning on unmapped key {note}")]
    UnmappedReference {
        /// The reference note.
        note: i32,
    },

    /// Every key of the mapping is unmapped.
    #[error("keyboard mapping does not map any key")]
    NoMappedKeys,

    /// The scale has no tones but the mapping lists explicit keys.
    #[error("a scale with no tones cannot resolve an explicit keyboard mapping")]
    EmptyScale,

    /// The mapping's key list disagrees with its declared size.
    #[error("keyboard mapping declares {declared} keys but holds {actual}")]
    KeyCountMismatch {
        /// Declared map size.
        declared: usize,
        /// Length of the key list.
        actual: usize,
    },

    /// The reference frequency is not a positive finite number.
    #[error("reference frequency {frequency} Hz must be positive")]
    InvalidReferenceFrequency {
        /// The rejected frequency.
        frequency: f64,
    },
}

/// Either kind of error, for entry points that both parse and tune.
#[derive(Debug, Error)]
pub enum Error {
    /// Parse-time failure.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Construction-time failure.
    #[error(transparent)]
    Tuning(#[from] TuningError),
}
