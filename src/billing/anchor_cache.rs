use anyhow::Result;
use chrono::NaiveDate;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::collections::HashMap;

use crate::model::attendance::AttendanceRecord;

/// user id => earliest anchor date seen so far
///
/// Entries never expire on time; only capacity pressure evicts, and an
/// evicted member falls back to the anchor of their next database snapshot.
pub static ANCHOR_CACHE: Lazy<Cache<u64, NaiveDate>> =
    Lazy::new(|| Cache::builder().max_capacity(100_000).build());

/// Returns the anchor to bill against.
///
/// The cached anchor only ever moves to an earlier date, so a snapshot that
/// is missing a member's oldest rows cannot shift their cycle forward.
pub async fn stabilize(user_id: u64, observed: NaiveDate) -> NaiveDate {
    ANCHOR_CACHE
        .entry(user_id)
        .and_upsert_with(|current| async move {
            match current {
                Some(entry) => (*entry.value()).min(observed),
                None => observed,
            }
        })
        .await
        .into_value()
}

/// Drop a member's anchor, e.g. after their account is deleted.
pub async fn forget(user_id: u64) {
    ANCHOR_CACHE.invalidate(&user_id).await;
}

/// Seed the cache with every member's earliest attendance.
pub async fn warmup_anchor_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, user_id, user_email, date, marked_at, qr_id, meal_type
        FROM attendance
        "#,
    )
    .fetch(pool);

    let mut earliest: HashMap<u64, NaiveDate> = HashMap::new();
    let mut scanned = 0usize;

    while let Some(row) = stream.next().await {
        let record = row?;
        scanned += 1;
        if let Some(date) = record.event_date() {
            earliest
                .entry(record.user_id)
                .and_modify(|d| *d = (*d).min(date))
                .or_insert(date);
        }
    }

    let anchors: Vec<_> = earliest.into_iter().collect();
    for batch in anchors.chunks(batch_size.max(1)) {
        let futures: Vec<_> = batch
            .iter()
            .map(|(user_id, date)| stabilize(*user_id, *date))
            .collect();
        futures::future::join_all(futures).await;
    }

    tracing::info!(
        rows = scanned,
        members = anchors.len(),
        "Anchor cache warmup complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn cached(user_id: u64) -> Option<NaiveDate> {
        ANCHOR_CACHE.get(&user_id).await
    }

    // Each test uses its own user ids; the cache is process wide.

    #[actix_web::test]
    async fn first_observation_is_kept() {
        assert_eq!(stabilize(9_001, day(2024, 1, 5)).await, day(2024, 1, 5));
        assert_eq!(cached(9_001).await, Some(day(2024, 1, 5)));
    }

    #[actix_web::test]
    async fn later_observation_does_not_regress() {
        stabilize(9_002, day(2024, 1, 5)).await;
        assert_eq!(stabilize(9_002, day(2024, 2, 1)).await, day(2024, 1, 5));
    }

    #[actix_web::test]
    async fn earlier_observation_wins() {
        stabilize(9_003, day(2024, 1, 5)).await;
        assert_eq!(stabilize(9_003, day(2023, 12, 25)).await, day(2023, 12, 25));
        assert_eq!(stabilize(9_003, day(2024, 1, 1)).await, day(2023, 12, 25));
    }

    #[test]
    fn idle_members_keep_their_anchor() {
        let policy = ANCHOR_CACHE.policy();
        assert_eq!(policy.time_to_idle(), None);
        assert_eq!(policy.time_to_live(), None);
    }

    #[actix_web::test]
    async fn forget_resets() {
        stabilize(9_004, day(2024, 1, 5)).await;
        forget(9_004).await;
        assert_eq!(cached(9_004).await, None);
        assert_eq!(stabilize(9_004, day(2024, 3, 1)).await, day(2024, 3, 1));
    }
}
