use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::result::{AppError, Result};

const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Snapshot of one archive problem, as persisted into a round.
#[derive(Debug, Clone)]
pub struct Problem {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub rating: i32,
    pub solved_count: i64,
}

/// Client for the Codeforces problemset archive.
///
/// The full problem list is cached process-wide for [`CACHE_TTL`]; one
/// instance is constructed at startup and shared through `AppState`.
pub struct ProblemArchive {
    http: reqwest::Client,
    api_url: String,
    cache: Mutex<Option<CacheEntry>>,
}

struct CacheEntry {
    problems: Vec<Problem>,
    fetched_at: Instant,
}

#[derive(Deserialize)]
struct ArchiveResponse {
    status: String,
    result: Option<ArchiveResult>,
}

#[derive(Deserialize)]
struct ArchiveResult {
    problems: Vec<ArchiveProblem>,
    #[serde(rename = "problemStatistics")]
    problem_statistics: Vec<ArchiveStatistic>,
}

#[derive(Deserialize)]
struct ArchiveProblem {
    #[serde(rename = "contestId")]
    contest_id: Option<i64>,
    index: String,
    name: String,
    #[serde(default)]
    tags: Vec<String>,
    rating: Option<i32>,
}

#[derive(Deserialize)]
struct ArchiveStatistic {
    #[serde(rename = "solvedCount")]
    solved_count: Option<i64>,
}

impl ProblemArchive {
    pub fn new(api_url: String) -> Self {
        return Self {
            http: reqwest::Client::new(),
            api_url,
            cache: Mutex::new(None),
        };
    }

    /// Picks one problem uniformly at random from the cached archive,
    /// refreshing the cache first if it is missing or older than the TTL.
    pub async fn random_problem(&self) -> Result<Problem> {
        let mut cache = self.cache.lock().await;

        let stale = match cache.as_ref() {
            Some(entry) => entry.fetched_at.elapsed() >= CACHE_TTL,
            None => true,
        };

        if stale {
            let problems = self.refresh().await?;
            tracing::info!(count = problems.len(), "refreshed problem archive cache");

            *cache = Some(CacheEntry {
                problems,
                fetched_at: Instant::now(),
            });
        }

        let entry = cache.as_ref().expect("cache populated above");

        let problem = entry
            .problems
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| {
                AppError::UpstreamUnavailable("Problem archive returned no usable problems".to_string())
            })?;

        return Ok(problem.clone());
    }

    async fn refresh(&self) -> Result<Vec<Problem>> {
        let response: ArchiveResponse = self
            .http
            .get(&self.api_url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Problem archive unreachable: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Problem archive returned malformed data: {e}")))?;

        if response.status != "OK" {
            return Err(AppError::UpstreamUnavailable(format!(
                "Problem archive returned status {}",
                response.status
            )));
        }

        let Some(result) = response.result else {
            return Err(AppError::UpstreamUnavailable(
                "Problem archive returned no result".to_string(),
            ));
        };

        return Ok(collect_problems(result));
    }
}

/// Joins problems with their positional statistics, keeping only entries
/// that have a rating and at least one tag.
fn collect_problems(result: ArchiveResult) -> Vec<Problem> {
    let mut stats = result.problem_statistics.into_iter();

    return result
        .problems
        .into_iter()
        .map(|problem| {
            let solved_count = stats.next().and_then(|s| s.solved_count).unwrap_or(0);
            (problem, solved_count)
        })
        .filter(|(problem, _)| problem.rating.is_some() && !problem.tags.is_empty())
        .map(|(problem, solved_count)| Problem {
            id: format!(
                "{}{}",
                problem.contest_id.unwrap_or_default(),
                problem.index
            ),
            name: problem.name,
            tags: problem.tags,
            rating: problem.rating.unwrap_or_default(),
            solved_count,
        })
        .collect();
}

/// Estimated pass rate in percent, rounded to two decimals. The archive
/// exposes solve counts but not attempt counts, so attempts are estimated
/// as `max(solved * 1.5, solved + 100)`.
pub fn pass_rate(solved_count: i64) -> f64 {
    let solved = solved_count as f64;
    let estimated_attempts = (solved * 1.5).max(solved + 100.0);
    let rate = solved / estimated_attempts * 100.0;

    return (rate * 100.0).round() / 100.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_rate_uses_flat_estimate_for_small_counts() {
        // 100 solvers: max(150, 200) = 200 attempts
        assert_eq!(pass_rate(100), 50.0);
        assert_eq!(pass_rate(0), 0.0);
    }

    #[test]
    fn pass_rate_uses_scaled_estimate_for_large_counts() {
        // 1000 solvers: max(1500, 1100) = 1500 attempts
        assert_eq!(pass_rate(1000), 66.67);
    }

    #[test]
    fn collect_problems_filters_unrated_and_untagged() {
        let result: ArchiveResult = serde_json::from_value(serde_json::json!({
            "problems": [
                {"contestId": 1, "index": "A", "name": "Theatre Square", "tags": ["math"], "rating": 1000},
                {"contestId": 1, "index": "B", "name": "Unrated", "tags": ["math"]},
                {"contestId": 2, "index": "A", "name": "Untagged", "tags": [], "rating": 800}
            ],
            "problemStatistics": [
                {"solvedCount": 5000},
                {"solvedCount": 10},
                {"solvedCount": 20}
            ]
        }))
        .unwrap();

        let problems = collect_problems(result);

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].id, "1A");
        assert_eq!(problems[0].rating, 1000);
        assert_eq!(problems[0].solved_count, 5000);
    }

    #[test]
    fn collect_problems_tolerates_missing_statistics() {
        let result: ArchiveResult = serde_json::from_value(serde_json::json!({
            "problems": [
                {"contestId": 3, "index": "C", "name": "Lonely", "tags": ["dp"], "rating": 1200}
            ],
            "problemStatistics": []
        }))
        .unwrap();

        let problems = collect_problems(result);

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].solved_count, 0);
    }
}
