use std::fmt;

use serde::{Deserialize, Serialize};

pub const REEL_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Symbol {
    #[serde(rename = "C")]
    Cherry,
    #[serde(rename = "L")]
    Lemon,
    #[serde(rename = "O")]
    Orange,
    #[serde(rename = "W")]
    Watermelon,
}

impl Symbol {
    pub const ALL: [Symbol; 4] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Watermelon,
    ];

    /// Maps a uniform value in [0,1) onto the alphabet.
    pub fn from_unit(u: f64) -> Self {
        let len = Self::ALL.len();
        let idx = ((u * len as f64).floor() as usize).min(len - 1);
        Self::ALL[idx]
    }

    pub fn code(self) -> char {
        match self {
            Symbol::Cherry => 'C',
            Symbol::Lemon => 'L',
            Symbol::Orange => 'O',
            Symbol::Watermelon => 'W',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Three symbols, one per reel.
pub type Reels = [Symbol; REEL_COUNT];

pub fn is_winning(reels: &Reels) -> bool {
    reels.iter().all(|s| *s == reels[0])
}

/// Compact form used by the audit log, e.g. `"WWC"`.
pub fn reels_to_codes(reels: &Reels) -> String {
    reels.iter().map(|s| s.code()).collect()
}

pub fn reels_from_codes(codes: &str) -> Option<Reels> {
    let mut chars = codes.chars();
    let reels = [
        Symbol::from_code(chars.next()?)?,
        Symbol::from_code(chars.next()?)?,
        Symbol::from_code(chars.next()?)?,
    ];
    if chars.next().is_some() {
        return None;
    }
    Some(reels)
}
