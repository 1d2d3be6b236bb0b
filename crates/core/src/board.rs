//! Curriculum boards and material languages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A K-12 curriculum authority.
///
/// Serialized as the upper-case board code (`"CBSE"`, `"TELANGANA"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Board {
    Cbse,
    Ncert,
    Telangana,
    Other(String),
}

impl Board {
    /// Parse a board code, case- and whitespace-insensitively.
    pub fn parse(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        match code.as_str() {
            "CBSE" => Board::Cbse,
            "NCERT" => Board::Ncert,
            "TELANGANA" | "TS" | "TSBIE" => Board::Telangana,
            _ => Board::Other(code),
        }
    }

    /// Boards whose textbooks are the national NCERT books.
    pub fn uses_ncert_textbooks(&self) -> bool {
        matches!(self, Board::Cbse | Board::Ncert)
    }

    pub fn code(&self) -> &str {
        match self {
            Board::Cbse => "CBSE",
            Board::Ncert => "NCERT",
            Board::Telangana => "TELANGANA",
            Board::Other(code) => code,
        }
    }
}

impl From<String> for Board {
    fn from(value: String) -> Self {
        Board::parse(&value)
    }
}

impl From<Board> for String {
    fn from(value: Board) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Language tag for uploaded material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialLanguage {
    #[default]
    English,
    Hindi,
    Telugu,
}

impl MaterialLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialLanguage::English => "English",
            MaterialLanguage::Hindi => "Hindi",
            MaterialLanguage::Telugu => "Telugu",
        }
    }
}

impl fmt::Display for MaterialLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
