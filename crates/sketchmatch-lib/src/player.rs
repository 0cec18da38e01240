use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Which side of a round a participant plays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Role {
    /// Picks the secret word and streams canvas frames.
    Drawer,
    /// Submits guesses for the secret word.
    Guesser,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Drawer => f.write_str("drawer"),
            Role::Guesser => f.write_str("guesser"),
        }
    }
}
