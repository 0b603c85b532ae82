//! Program habit catalog

use crate::types::{Habit, ScoreType};

/// The five habits tracked by the program, in display order
pub fn default_catalog() -> Vec<Habit> {
    vec![
        Habit::new(1, "Read for at least 30 minutes", ScoreType::Partial, 1),
        Habit::new(2, "Watch a training video", ScoreType::Binary, 1),
        Habit::new(3, "Use or review a product", ScoreType::Partial, 2),
        Habit::new(4, "Attend a meeting", ScoreType::Binary, 5),
        Habit::new(5, "Deliver products or manage consumers", ScoreType::Partial, 2),
    ]
}

/// Find a habit by id
pub fn find_habit(habits: &[Habit], habit_id: u32) -> Option<&Habit> {
    habits.iter().find(|h| h.id == habit_id)
}

/// Highest score a single user can reach over the whole program
pub fn max_program_score(habits: &[Habit]) -> f64 {
    let per_day: f64 = habits.iter().map(|h| h.score_value as f64).sum();
    per_day * crate::types::PROGRAM_DAYS as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_shape() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 5);

        let values: Vec<u32> = catalog.iter().map(|h| h.score_value).collect();
        assert_eq!(values, vec![1, 1, 2, 5, 2]);

        let types: Vec<ScoreType> = catalog.iter().map(|h| h.score_type).collect();
        assert_eq!(
            types,
            vec![
                ScoreType::Partial,
                ScoreType::Binary,
                ScoreType::Partial,
                ScoreType::Binary,
                ScoreType::Partial,
            ]
        );
    }

    #[test]
    fn test_find_habit() {
        let catalog = default_catalog();
        assert_eq!(find_habit(&catalog, 4).map(|h| h.score_value), Some(5));
        assert!(find_habit(&catalog, 9).is_none());
    }

    #[test]
    fn test_max_program_score() {
        // (1 + 1 + 2 + 5 + 2) * 56
        assert_eq!(max_program_score(&default_catalog()), 616.0);
    }

    #[test]
    fn test_max_program_score_large_values() {
        let habits = vec![
            Habit::new(1, "a", ScoreType::Binary, u32::MAX),
            Habit::new(2, "b", ScoreType::Partial, 100_000_000),
        ];
        let expected = (u32::MAX as f64 + 100_000_000.0) * 56.0;
        assert_eq!(max_program_score(&habits), expected);
        assert_eq!(max_program_score(&[]), 0.0);
    }
}
