use std::collections::HashMap;
use std::fmt::Display;

use super::GameError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingIdentity,
    MissingSession,
    UnauthorizedActor,
    DuplicateEnqueue,
    WordAlreadySelected,
    WordNotSelected,
    SamePlayer,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::MissingIdentity,
        ErrorKind::MissingSession,
        ErrorKind::UnauthorizedActor,
        ErrorKind::DuplicateEnqueue,
        ErrorKind::WordAlreadySelected,
        ErrorKind::WordNotSelected,
        ErrorKind::SamePlayer,
    ];
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::MissingIdentity(_) => ErrorKind::MissingIdentity,
            GameError::MissingSession(_) => ErrorKind::MissingSession,
            GameError::UnauthorizedActor(_) => ErrorKind::UnauthorizedActor,
            GameError::DuplicateEnqueue(_) => ErrorKind::DuplicateEnqueue,
            GameError::WordAlreadySelected(_) => ErrorKind::WordAlreadySelected,
            GameError::WordNotSelected(_) => ErrorKind::WordNotSelected,
            GameError::SamePlayer(_) => ErrorKind::SamePlayer,
        }
    }
}

/// Running count of dropped events, by reason.
#[derive(Debug, Default)]
pub struct Diagnostics {
    rejected: HashMap<ErrorKind, u64>,
}

impl Diagnostics {
    pub fn record(&mut self, error: &GameError) {
        *self.rejected.entry(error.kind()).or_default() += 1;
    }

    pub fn count(&self, kind: ErrorKind) -> u64 {
        self.rejected.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.rejected.values().sum()
    }
}

/// Nonzero counts as `Kind=n` pairs, in a fixed order.
impl Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for kind in ErrorKind::ALL {
            let n = self.count(kind);
            if n == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{kind:?}={n}")?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}
