use serde::{Deserialize, Serialize};

/// Difficulty the drawer attaches to the chosen word. Scales the points awarded for a correct guess.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn multiplier(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Multiplier for an optional difficulty, where a round without one counts as `Easy`.
    pub fn multiplier_of(difficulty: Option<Self>) -> u32 {
        difficulty.map_or(1, Self::multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::Difficulty;

    #[test]
    fn multipliers() {
        assert_eq!(Difficulty::Easy.multiplier(), 1);
        assert_eq!(Difficulty::Medium.multiplier(), 2);
        assert_eq!(Difficulty::Hard.multiplier(), 3);
        assert_eq!(Difficulty::multiplier_of(None), 1);
        assert_eq!(Difficulty::multiplier_of(Some(Difficulty::Hard)), 3);
    }
}
