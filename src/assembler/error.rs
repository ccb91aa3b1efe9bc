//! Assembly failures and the status codes they map to.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to open input file `{}`: {source}", .path.display())]
    OpenInput { path: PathBuf, #[source] source: io::Error },

    #[error("unable to read line {line}: {source}")]
    ReadInput { line: usize, #[source] source: io::Error },

    #[error("line {line}: invalid .ORIG address `{operand}`")]
    InvalidOrigin { line: usize, operand: String },

    #[error("line {line}: instruction before .ORIG")]
    BeforeOrigin { line: usize },

    #[error("no .ORIG directive")]
    MissingOrigin,

    #[error("line {line}: invalid .FILL value `{operand}`")]
    InvalidFill { line: usize, operand: String },

    #[error("line {line}: .FILL value {value} is outside [-65536, 65535]")]
    FillOutOfRange { line: usize, value: i32 },

    #[error("line {line}: invalid .BLKW count `{operand}`")]
    InvalidBlock { line: usize, operand: String },

    #[error("line {line}: .BLKW count {value} is outside [1, 100]")]
    BlockOutOfRange { line: usize, value: i32 },

    #[error("line {line}: unknown instruction `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: invalid label `{label}`")]
    InvalidLabel { line: usize, label: String },

    #[error("line {line}: .STRINGZ needs one quoted string, got `{operand}`")]
    InvalidString { line: usize, operand: String },

    #[error("missing .END")]
    MissingEnd,

    #[error("unable to open output file `{}`: {source}", .path.display())]
    OpenOutput { path: PathBuf, #[source] source: io::Error },

    #[error("unable to write to output file `{}`: {source}", .path.display())]
    WriteOutput { path: PathBuf, #[source] source: io::Error },

    #[error("{} instruction(s) could not be encoded", .0.len())]
    Encode(Vec<EncodeError>),
}

impl Error {
    /// Stable status code reported to the outside world. Zero is
    /// reserved for success.
    pub fn code(&self) -> i32 {
        use Error::*;
        match self {
            OpenInput { .. } | ReadInput { .. } => -1,
            InvalidOrigin { .. } => -2,
            BeforeOrigin { .. } | MissingOrigin => -3,
            InvalidFill { .. } => -4,
            FillOutOfRange { .. } => -5,
            InvalidBlock { .. } => -6,
            BlockOutOfRange { .. } => -7,
            UnknownMnemonic { .. } => -8,
            InvalidLabel { .. } => -9,
            InvalidString { .. } => -10,
            MissingEnd => -11,
            OpenOutput { .. } | WriteOutput { .. } => -20,
            Encode(errors) => errors.first().map(|e| e.kind.code()).unwrap_or(-30),
        }
    }

    /// The source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        use Error::*;
        match self {
            ReadInput { line, .. }
            | InvalidOrigin { line, .. }
            | BeforeOrigin { line }
            | InvalidFill { line, .. }
            | FillOutOfRange { line, .. }
            | InvalidBlock { line, .. }
            | BlockOutOfRange { line, .. }
            | UnknownMnemonic { line, .. }
            | InvalidLabel { line, .. }
            | InvalidString { line, .. } => Some(*line),
            Encode(errors) => errors.first().map(|e| e.line),
            OpenInput { .. } | MissingOrigin | MissingEnd | OpenOutput { .. } | WriteOutput { .. } => None,
        }
    }
}

/// A single instruction the second pass could not encode.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("line {line}: {kind} (in `{text}`)")]
pub struct EncodeError {
    pub line: usize,
    pub text: String,
    pub kind: EncodeErrorKind,
}

#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum EncodeErrorKind {
    #[error("{mnemonic} takes {expected} operand(s), found {found}")]
    OperandCount { mnemonic: &'static str, expected: usize, found: usize },

    #[error("expected a register, found `{0}`")]
    ExpectedRegister(String),

    #[error("no such register `{0}` (R0-R7)")]
    InvalidRegister(String),

    #[error("`{0}` is neither a label nor a number")]
    UndefinedSymbol(String),

    #[error("unknown instruction `{0}`")]
    UnknownMnemonic(String),

    #[error("register `{0}` not allowed here")]
    UnexpectedRegister(String),
}

impl EncodeErrorKind {
    pub fn code(&self) -> i32 {
        use EncodeErrorKind::*;
        match self {
            OperandCount { .. } => -30,
            ExpectedRegister(_) => -31,
            InvalidRegister(_) => -32,
            UndefinedSymbol(_) => -33,
            UnknownMnemonic(_) => -34,
            UnexpectedRegister(_) => -35,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = vec![
            Error::OpenInput { path: PathBuf::from("a"), source: io::ErrorKind::NotFound.into() },
            Error::InvalidOrigin { line: 1, operand: "X".to_string() },
            Error::BeforeOrigin { line: 1 },
            Error::InvalidFill { line: 1, operand: "X".to_string() },
            Error::FillOutOfRange { line: 1, value: 70000 },
            Error::InvalidBlock { line: 1, operand: "X".to_string() },
            Error::BlockOutOfRange { line: 1, value: 0 },
            Error::UnknownMnemonic { line: 1, mnemonic: "NOP".to_string() },
            Error::InvalidLabel { line: 1, label: "1X".to_string() },
            Error::InvalidString { line: 1, operand: "X".to_string() },
            Error::MissingEnd,
            Error::OpenOutput { path: PathBuf::from("a"), source: io::ErrorKind::NotFound.into() },
        ];

        let mut codes: Vec<i32> = errors.iter().map(Error::code).collect();
        assert!(codes.iter().all(|&c| c < 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_encode_code_comes_from_first_error() {
        let err = Error::Encode(vec![
            EncodeError {
                line: 4,
                text: "ADD R0 R0".to_string(),
                kind: EncodeErrorKind::OperandCount { mnemonic: "ADD", expected: 3, found: 2 },
            },
            EncodeError {
                line: 9,
                text: "JMP LOOP".to_string(),
                kind: EncodeErrorKind::ExpectedRegister("LOOP".to_string()),
            },
        ]);
        assert_eq!(err.code(), -30);
        assert_eq!(err.line(), Some(4));
        assert_eq!(err.to_string(), "2 instruction(s) could not be encoded");
    }

    #[test]
    fn test_messages() {
        let err = Error::FillOutOfRange { line: 3, value: 70000 };
        assert_eq!(err.to_string(), "line 3: .FILL value 70000 is outside [-65536, 65535]");

        let err = EncodeError {
            line: 2,
            text: "NOT R9 R1".to_string(),
            kind: EncodeErrorKind::InvalidRegister("R9".to_string()),
        };
        assert_eq!(err.to_string(), "line 2: no such register `R9` (R0-R7) (in `NOT R9 R1`)");
        // `kind` is a plain field, not the error's source.
        assert!(std::error::Error::source(&err).is_none());
    }
}
