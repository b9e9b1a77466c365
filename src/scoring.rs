use std::collections::HashSet;

use crate::result::{AppError, Result};

pub const ROUND_STATUS_ONGOING: &str = "ongoing";
pub const ROUND_STATUS_SETTLED: &str = "settled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Tags,
    Rating,
    PassRate,
}

impl GameMode {
    pub fn parse(s: &str) -> Option<GameMode> {
        return match s {
            "tags" => Some(GameMode::Tags),
            "rating" => Some(GameMode::Rating),
            "pass_rate" => Some(GameMode::PassRate),
            _ => None,
        };
    }

    pub fn as_str(&self) -> &'static str {
        return match self {
            GameMode::Tags => "tags",
            GameMode::Rating => "rating",
            GameMode::PassRate => "pass_rate",
        };
    }
}

/// One guess, carrying only the fields that its round's mode uses.
#[derive(Debug, Clone, PartialEq)]
pub enum GuessPayload {
    Tags(Vec<String>),
    Rating { min: i32, max: i32 },
    PassRate { min: f64, max: f64 },
}

impl GuessPayload {
    /// Validates the raw request fields against the round's mode.
    pub fn from_parts(
        mode: GameMode,
        tags: Option<Vec<String>>,
        rating_min: Option<i32>,
        rating_max: Option<i32>,
        pass_rate_min: Option<f64>,
        pass_rate_max: Option<f64>,
    ) -> Result<GuessPayload> {
        match mode {
            GameMode::Tags => {
                let Some(tags) = tags else {
                    return Err(AppError::InvalidArgument(
                        "Tags are required for tags mode".to_string(),
                    ));
                };
                if tags.is_empty() {
                    return Err(AppError::InvalidArgument(
                        "Tags are required for tags mode".to_string(),
                    ));
                }
                return Ok(GuessPayload::Tags(tags));
            }
            GameMode::Rating => {
                let (Some(min), Some(max)) = (rating_min, rating_max) else {
                    return Err(AppError::InvalidArgument(
                        "Rating range is required for rating mode".to_string(),
                    ));
                };
                // Sign and order first: once both bounds are non-negative
                // and ordered, the span subtraction cannot overflow.
                if min < 0 || max < 0 || min > max {
                    return Err(AppError::InvalidArgument(
                        "Invalid rating range".to_string(),
                    ));
                }
                if max - min > 200 {
                    return Err(AppError::InvalidArgument(
                        "Rating range must not exceed 200".to_string(),
                    ));
                }
                return Ok(GuessPayload::Rating { min, max });
            }
            GameMode::PassRate => {
                let (Some(min), Some(max)) = (pass_rate_min, pass_rate_max) else {
                    return Err(AppError::InvalidArgument(
                        "Pass rate range is required for pass_rate mode".to_string(),
                    ));
                };
                if max - min > 10.0 {
                    return Err(AppError::InvalidArgument(
                        "Pass rate range must not exceed 10%".to_string(),
                    ));
                }
                if min < 0.0 || max > 100.0 || min > max {
                    return Err(AppError::InvalidArgument(
                        "Invalid pass rate range".to_string(),
                    ));
                }
                return Ok(GuessPayload::PassRate { min, max });
            }
        }
    }

    /// Scores this guess against the round's problem snapshot.
    pub fn is_correct(&self, actual_tags: &[String], actual_rating: i32, actual_pass_rate: f64) -> bool {
        return match self {
            GuessPayload::Tags(tags) => {
                let guessed: HashSet<&str> = tags.iter().map(String::as_str).collect();
                let actual: HashSet<&str> = actual_tags.iter().map(String::as_str).collect();
                guessed == actual
            }
            GuessPayload::Rating { min, max } => *min <= actual_rating && actual_rating <= *max,
            GuessPayload::PassRate { min, max } => {
                *min <= actual_pass_rate && actual_pass_rate <= *max
            }
        };
    }
}

/// Zero-sum point redistribution, funded only by collected penalties.
///
/// Each incorrect guesser pays the penalty coefficient; the pot is split
/// evenly across correct guessers. When nobody is correct, no penalty is
/// levied and every delta is zero.
pub fn settlement_deltas(outcomes: &[bool], penalty_coefficient: f64) -> Vec<f64> {
    let correct_count = outcomes.iter().filter(|correct| **correct).count();

    if correct_count == 0 {
        return vec![0.0; outcomes.len()];
    }

    let incorrect_count = outcomes.len() - correct_count;
    let reward = incorrect_count as f64 * penalty_coefficient / correct_count as f64;

    return outcomes
        .iter()
        .map(|correct| {
            if *correct {
                reward
            } else {
                -penalty_coefficient
            }
        })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        return names.iter().map(|s| s.to_string()).collect();
    }

    #[test]
    fn parses_known_modes_only() {
        assert_eq!(GameMode::parse("tags"), Some(GameMode::Tags));
        assert_eq!(GameMode::parse("rating"), Some(GameMode::Rating));
        assert_eq!(GameMode::parse("pass_rate"), Some(GameMode::PassRate));
        assert_eq!(GameMode::parse("difficulty"), None);
    }

    #[test]
    fn tags_guess_requires_non_empty_tags() {
        let missing = GuessPayload::from_parts(GameMode::Tags, None, None, None, None, None);
        assert!(matches!(missing, Err(AppError::InvalidArgument(_))));

        let empty =
            GuessPayload::from_parts(GameMode::Tags, Some(vec![]), None, None, None, None);
        assert!(matches!(empty, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn rating_span_boundary() {
        let ok = GuessPayload::from_parts(GameMode::Rating, None, Some(1000), Some(1200), None, None);
        assert_eq!(ok.unwrap(), GuessPayload::Rating { min: 1000, max: 1200 });

        let too_wide =
            GuessPayload::from_parts(GameMode::Rating, None, Some(1000), Some(1201), None, None);
        assert!(matches!(too_wide, Err(AppError::InvalidArgument(_))));

        let inverted =
            GuessPayload::from_parts(GameMode::Rating, None, Some(1200), Some(1100), None, None);
        assert!(matches!(inverted, Err(AppError::InvalidArgument(_))));

        let negative =
            GuessPayload::from_parts(GameMode::Rating, None, Some(-100), Some(0), None, None);
        assert!(matches!(negative, Err(AppError::InvalidArgument(_))));

        // Extreme bounds must reject cleanly rather than overflow the span
        // arithmetic.
        let extreme = GuessPayload::from_parts(
            GameMode::Rating,
            None,
            Some(i32::MIN),
            Some(i32::MAX),
            None,
            None,
        );
        assert!(matches!(extreme, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn pass_rate_span_boundary() {
        let ok =
            GuessPayload::from_parts(GameMode::PassRate, None, None, None, Some(30.0), Some(40.0));
        assert!(ok.is_ok());

        let too_wide = GuessPayload::from_parts(
            GameMode::PassRate,
            None,
            None,
            None,
            Some(30.0),
            Some(40.01),
        );
        assert!(matches!(too_wide, Err(AppError::InvalidArgument(_))));

        let out_of_range = GuessPayload::from_parts(
            GameMode::PassRate,
            None,
            None,
            None,
            Some(95.0),
            Some(101.0),
        );
        assert!(matches!(out_of_range, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn off_mode_fields_are_ignored() {
        let payload = GuessPayload::from_parts(
            GameMode::Rating,
            Some(tags(&["dp"])),
            Some(800),
            Some(900),
            Some(1.0),
            Some(2.0),
        )
        .unwrap();
        assert_eq!(payload, GuessPayload::Rating { min: 800, max: 900 });
    }

    #[test]
    fn tags_scoring_is_exact_set_equality() {
        let actual = tags(&["dp", "graphs"]);

        let exact = GuessPayload::Tags(tags(&["graphs", "dp"]));
        assert!(exact.is_correct(&actual, 1500, 35.0));

        let subset = GuessPayload::Tags(tags(&["dp"]));
        assert!(!subset.is_correct(&actual, 1500, 35.0));

        let superset = GuessPayload::Tags(tags(&["dp", "graphs", "math"]));
        assert!(!superset.is_correct(&actual, 1500, 35.0));
    }

    #[test]
    fn rating_scoring_bounds_are_inclusive() {
        let guess = GuessPayload::Rating { min: 1400, max: 1500 };
        assert!(guess.is_correct(&[], 1400, 0.0));
        assert!(guess.is_correct(&[], 1500, 0.0));
        assert!(!guess.is_correct(&[], 1501, 0.0));
    }

    #[test]
    fn pass_rate_scoring_bounds_are_inclusive() {
        let guess = GuessPayload::PassRate { min: 30.0, max: 40.0 };
        assert!(guess.is_correct(&[], 0, 35.0));
        assert!(guess.is_correct(&[], 0, 40.0));
        assert!(!guess.is_correct(&[], 0, 40.01));
    }

    #[test]
    fn one_correct_one_incorrect_tags_round() {
        // actual tags {dp, graphs}, A exact, B subset, penalty 10
        let deltas = settlement_deltas(&[true, false], 10.0);
        assert_eq!(deltas, vec![10.0, -10.0]);
        assert_eq!(deltas.iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn no_correct_guesses_levies_no_penalty() {
        let deltas = settlement_deltas(&[false, false], 10.0);
        assert_eq!(deltas, vec![0.0, 0.0]);
    }

    #[test]
    fn pot_splits_evenly_across_correct_guessers() {
        let deltas = settlement_deltas(&[true, true, false, false, false, false], 5.0);
        assert_eq!(deltas, vec![10.0, 10.0, -5.0, -5.0, -5.0, -5.0]);
        assert_eq!(deltas.iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn all_correct_means_empty_pot() {
        let deltas = settlement_deltas(&[true, true], 25.0);
        assert_eq!(deltas, vec![0.0, 0.0]);
    }

    #[test]
    fn empty_round_settles_to_nothing() {
        assert!(settlement_deltas(&[], 10.0).is_empty());
    }
}
