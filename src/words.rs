//! Word pool and 5x5 grid generation for bingo cards.

use rand::seq::SliceRandom;

/// Side length of a bingo card.
pub const GRID_SIZE: usize = 5;
/// Label shown on the free center cell.
pub const FREE_SPACE: &str = "FREE";

/// Buzzwords baked into the binary. A config file can substitute its own pool.
const WORD_POOL: &[&str] = &[
    "synergy",
    "alignment",
    "bandwidth",
    "circle back",
    "deep dive",
    "low-hanging fruit",
    "move the needle",
    "paradigm shift",
    "touch base",
    "leverage",
    "deliverable",
    "action item",
    "take this offline",
    "stakeholder",
    "value add",
    "best practice",
    "ecosystem",
    "game changer",
    "growth hacking",
    "north star",
    "pain point",
    "quick win",
    "scalable",
    "single source of truth",
    "thought leadership",
    "win-win",
    "actionable",
    "ballpark",
    "blocker",
    "boil the ocean",
    "core competency",
    "double-click",
    "drill down",
    "holistic",
    "ideate",
    "in the weeds",
    "key takeaway",
    "mission critical",
    "onboarding",
    "pivot",
    "roadmap",
    "run it up the flagpole",
    "streamline",
    "table stakes",
    "learnings",
    "alignment check",
    "per my last email",
    "parking lot",
];

/// Copy of the built-in pool, used as the config default.
pub fn default_pool() -> Vec<String> {
    WORD_POOL.iter().map(|word| word.to_string()).collect()
}

/// Ordered 5x5 arrangement of buzzwords assigned to the local player's card.
///
/// Immutable once pushed to the server; "new card" regenerates it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordGrid {
    rows: Vec<Vec<String>>,
}

impl WordGrid {
    /// Sample a fresh card from `pool`, with the free space pinned at the
    /// center. Words are drawn without replacement; a pool smaller than the
    /// card repeats entries after exhausting the shuffle.
    pub fn generate(pool: &[String]) -> Self {
        let mut deck: Vec<&str> = pool.iter().map(String::as_str).collect();
        deck.shuffle(&mut rand::rng());

        let needed = GRID_SIZE * GRID_SIZE - 1;
        let mut picks = deck.iter().cycle().take(needed).map(|word| word.to_string());

        let center = GRID_SIZE / 2;
        let rows = (0..GRID_SIZE)
            .map(|row| {
                (0..GRID_SIZE)
                    .map(|col| {
                        if row == center && col == center {
                            FREE_SPACE.to_string()
                        } else {
                            picks.next().unwrap_or_default()
                        }
                    })
                    .collect()
            })
            .collect();

        Self { rows }
    }

    /// Word at the given cell, when in bounds.
    pub fn word_at(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// The 5x5 rows in order, as sent to the server by "set words".
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cells whose word occurs in `transcript`, case-insensitively.
    ///
    /// The free center cell never matches; the server keeps it marked on its
    /// own. The transcript string comes from an external speech layer and is
    /// treated as opaque text.
    pub fn find_matches(&self, transcript: &str) -> Vec<(u8, u8)> {
        let haystack = transcript.to_lowercase();
        let center = GRID_SIZE / 2;
        let mut matches = Vec::new();
        for (row, words) in self.rows.iter().enumerate() {
            for (col, word) in words.iter().enumerate() {
                if row == center && col == center {
                    continue;
                }
                if !word.is_empty() && haystack.contains(&word.to_lowercase()) {
                    matches.push((row as u8, col as u8));
                }
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<String> {
        default_pool()
    }

    #[test]
    fn generated_grid_is_5x5_with_free_center() {
        let grid = WordGrid::generate(&pool());
        assert_eq!(grid.rows().len(), GRID_SIZE);
        for row in grid.rows() {
            assert_eq!(row.len(), GRID_SIZE);
        }
        assert_eq!(grid.word_at(2, 2), Some(FREE_SPACE));
    }

    #[test]
    fn generated_words_are_distinct_and_from_pool() {
        let pool = pool();
        let grid = WordGrid::generate(&pool);
        let mut seen = std::collections::HashSet::new();
        for (row, words) in grid.rows().iter().enumerate() {
            for (col, word) in words.iter().enumerate() {
                if row == 2 && col == 2 {
                    continue;
                }
                assert!(pool.contains(word), "{word} not drawn from the pool");
                assert!(seen.insert(word.clone()), "{word} repeated on the card");
            }
        }
    }

    #[test]
    fn small_pool_still_fills_the_card() {
        let pool: Vec<String> = ["alpha", "beta", "gamma"]
            .iter()
            .map(|w| w.to_string())
            .collect();
        let grid = WordGrid::generate(&pool);
        for row in grid.rows() {
            for word in row {
                assert!(!word.is_empty());
            }
        }
    }

    #[test]
    fn transcript_matching_is_case_insensitive() {
        let grid = WordGrid::generate(&pool());
        let (row, col) = (0, 0);
        let word = grid.word_at(row, col).unwrap().to_uppercase();
        let matches = grid.find_matches(&format!("okay so let's {word} on this"));
        assert!(matches.contains(&(row as u8, col as u8)));
    }

    #[test]
    fn transcript_never_matches_the_free_cell() {
        let grid = WordGrid::generate(&pool());
        let matches = grid.find_matches("free free FREE");
        assert!(!matches.contains(&(2, 2)));
    }

    #[test]
    fn unrelated_transcript_matches_nothing() {
        let pool: Vec<String> = ["synergy", "bandwidth"].iter().map(|w| w.to_string()).collect();
        let grid = WordGrid::generate(&pool);
        // Every cell is synergy or bandwidth; this sentence contains neither.
        assert!(grid.find_matches("hello there").is_empty());
    }
}
