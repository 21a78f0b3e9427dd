use std::fmt;

/// Errors produced while parsing or serializing DNS wire-format data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidHeader,
    InvalidLabel,
    InvalidQuestionSection,
    InvalidAnswerSection,
    InvalidAuthoritySection,
    InvalidAdditionalSection,
    InvalidBitStream(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidHeader => write!(f, "invalid DNS header"),
            ParseError::InvalidLabel => write!(f, "invalid DNS label"),
            ParseError::InvalidQuestionSection => write!(f, "invalid question section"),
            ParseError::InvalidAnswerSection => write!(f, "invalid answer section"),
            ParseError::InvalidAuthoritySection => write!(f, "invalid authority section"),
            ParseError::InvalidAdditionalSection => write!(f, "invalid additional section"),
            ParseError::InvalidBitStream(msg) => write!(f, "invalid bit stream: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::InvalidBitStream(err.to_string())
    }
}
