//! Unindexed search with a delayed index-only escape hatch.
//!
//! The primary query is favored: the fallback is only issued once `delay`
//! has elapsed without the primary resolving, and a fallback that resolves
//! first with nothing in it does not beat a primary that later finds results.

use std::future::Future;
use std::time::Duration;

use crate::error::SearchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceWinner {
    Primary,
    Fallback,
}

#[derive(Debug)]
pub struct Raced<T> {
    pub results: Vec<T>,
    pub winner: RaceWinner,
}

impl<T> Raced<T> {
    fn new(results: Vec<T>, winner: RaceWinner) -> Self {
        Self { results, winner }
    }
}

pub async fn favor_primary<T, P, F, Fut>(
    primary: P,
    delay: Duration,
    fallback: F,
) -> Result<Raced<T>, SearchError>
where
    P: Future<Output = Result<Vec<T>, SearchError>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, SearchError>>,
{
    tokio::pin!(primary);
    tokio::select! {
        biased;
        result = &mut primary => {
            return result.map(|results| Raced::new(results, RaceWinner::Primary));
        }
        _ = tokio::time::sleep(delay) => {}
    }

    tracing::debug!(delay_ms = delay.as_millis() as u64, "primary search slow; issuing index-only fallback");
    let fallback = fallback();
    tokio::pin!(fallback);

    let (first, first_winner) = tokio::select! {
        biased;
        result = &mut primary => (result, RaceWinner::Primary),
        result = &mut fallback => (result, RaceWinner::Fallback),
    };
    if let Ok(results) = &first {
        if !results.is_empty() {
            return first.map(|results| Raced::new(results, first_winner));
        }
    }

    let (second, second_winner) = match first_winner {
        RaceWinner::Primary => (fallback.await, RaceWinner::Fallback),
        RaceWinner::Fallback => (primary.await, RaceWinner::Primary),
    };
    match (first, second) {
        (_, Ok(results)) if !results.is_empty() => Ok(Raced::new(results, second_winner)),
        (Ok(results), _) => Ok(Raced::new(results, first_winner)),
        (Err(_), Ok(results)) => Ok(Raced::new(results, second_winner)),
        (Err(err), Err(other)) => {
            tracing::warn!(error = %other, "index-only fallback also failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::future;

    use super::*;

    async fn after(ms: u64, results: Vec<u32>) -> Result<Vec<u32>, SearchError> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(results)
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_used_when_primary_never_resolves() {
        let raced = favor_primary(
            future::pending::<Result<Vec<u32>, SearchError>>(),
            Duration::from_millis(5_000),
            || after(100, vec![7]),
        )
        .await
        .unwrap();
        assert_eq!(raced.results, vec![7]);
        assert_eq!(raced.winner, RaceWinner::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn primary_before_timeout_never_issues_fallback() {
        let issued = Arc::new(AtomicBool::new(false));
        let flag = issued.clone();
        let raced = favor_primary(after(10, vec![1]), Duration::from_millis(5_000), move || {
            flag.store(true, Ordering::SeqCst);
            after(0, vec![2])
        })
        .await
        .unwrap();
        assert_eq!(raced.results, vec![1]);
        assert_eq!(raced.winner, RaceWinner::Primary);
        assert!(!issued.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_primary_before_timeout_is_returned_as_is() {
        let raced = favor_primary(after(10, vec![]), Duration::from_millis(100), || after(0, vec![2]))
            .await
            .unwrap();
        assert!(raced.results.is_empty());
        assert_eq!(raced.winner, RaceWinner::Primary);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_primary_still_beats_slower_fallback() {
        let raced = favor_primary(after(150, vec![1]), Duration::from_millis(100), || after(500, vec![2]))
            .await
            .unwrap();
        assert_eq!(raced.results, vec![1]);
        assert_eq!(raced.winner, RaceWinner::Primary);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_fallback_does_not_override_later_primary() {
        let raced = favor_primary(after(300, vec![1]), Duration::from_millis(100), || after(10, vec![]))
            .await
            .unwrap();
        assert_eq!(raced.results, vec![1]);
        assert_eq!(raced.winner, RaceWinner::Primary);
    }

    #[tokio::test(start_paused = true)]
    async fn primary_error_before_timeout_propagates() {
        let result = favor_primary(
            async { Err::<Vec<u32>, _>(SearchError::Backend("boom".to_string())) },
            Duration::from_millis(100),
            || after(0, vec![1]),
        )
        .await;
        assert!(matches!(result, Err(SearchError::Backend(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_primary_after_timeout_falls_back() {
        let primary = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Err::<Vec<u32>, _>(SearchError::Backend("boom".to_string()))
        };
        let raced = favor_primary(primary, Duration::from_millis(100), || after(300, vec![3]))
            .await
            .unwrap();
        assert_eq!(raced.results, vec![3]);
        assert_eq!(raced.winner, RaceWinner::Fallback);
    }
}
