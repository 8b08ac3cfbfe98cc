use chrono::{Duration, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use market_application::{LoginAttemptStore, LoginThrottlePolicy};

use super::PostgresLoginAttemptStore;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for login attempt store tests: {error}");
    }

    Some(pool)
}

fn unique_session_key() -> String {
    format!("test-session-{}", Uuid::new_v4())
}

#[tokio::test]
async fn missing_record_loads_as_none() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresLoginAttemptStore::new(pool);

    let record = store.load(unique_session_key().as_str()).await;
    assert!(record.is_ok_and(|record| record.is_none()));
}

#[tokio::test]
async fn repeated_failures_count_up_and_arm_the_lockout() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresLoginAttemptStore::new(pool);
    let policy = LoginThrottlePolicy::default();
    let session_key = unique_session_key();
    let now = Utc::now();

    for expected in 1..=4 {
        let recorded = store.record_failure(session_key.as_str(), &policy, now).await;
        assert!(recorded.as_ref().is_ok_and(|recorded| {
            recorded.attempts == expected && recorded.lockout_until.is_none()
        }));
    }

    let fifth = store.record_failure(session_key.as_str(), &policy, now).await;
    assert!(fifth.is_ok_and(|recorded| {
        recorded.attempts == 5
            && recorded.lockout_until.is_some_and(|until| until > now)
    }));

    let record = store.load(session_key.as_str()).await;
    assert!(record.is_ok_and(|record| {
        record.is_some_and(|record| record.failed_attempts == 5 && record.is_locked(now))
    }));
}

#[tokio::test]
async fn parallel_failures_lose_no_increments() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresLoginAttemptStore::new(pool);
    let policy = LoginThrottlePolicy::default();
    let session_key = unique_session_key();
    let now = Utc::now();

    // The upsert serializes on the row, so no interleaving drops a count.
    let (a, b, c, d, e) = tokio::join!(
        store.record_failure(session_key.as_str(), &policy, now),
        store.record_failure(session_key.as_str(), &policy, now),
        store.record_failure(session_key.as_str(), &policy, now),
        store.record_failure(session_key.as_str(), &policy, now),
        store.record_failure(session_key.as_str(), &policy, now),
    );
    for result in [a, b, c, d, e] {
        assert!(result.is_ok());
    }

    let record = store.load(session_key.as_str()).await;
    assert!(record.is_ok_and(|record| {
        record.is_some_and(|record| record.failed_attempts == 5 && record.is_locked(now))
    }));
}

#[tokio::test]
async fn failure_write_decays_the_stored_counter_first() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresLoginAttemptStore::new(pool);
    let policy = LoginThrottlePolicy::default();
    let session_key = unique_session_key();
    let earlier = Utc::now() - Duration::seconds(20);

    let (Ok(_), Ok(_)) = (
        store.record_failure(session_key.as_str(), &policy, earlier).await,
        store.record_failure(session_key.as_str(), &policy, earlier).await,
    ) else {
        panic!("seeding failures errored");
    };

    // Two intervals elapse, so the stored 2 decays to 0 before the increment.
    let recorded = store
        .record_failure(session_key.as_str(), &policy, earlier + Duration::seconds(20))
        .await;
    assert!(recorded.is_ok_and(|recorded| recorded.attempts == 1));
}

#[tokio::test]
async fn clear_returns_the_record_to_the_zero_state() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresLoginAttemptStore::new(pool);
    let policy = LoginThrottlePolicy::default();
    let session_key = unique_session_key();

    let Ok(_) = store
        .record_failure(session_key.as_str(), &policy, Utc::now())
        .await
    else {
        panic!("seeding failure errored");
    };

    assert!(store.clear(session_key.as_str()).await.is_ok());

    let record = store.load(session_key.as_str()).await;
    assert!(record.is_ok_and(|record| {
        record.is_some_and(|record| {
            record.failed_attempts == 0
                && record.last_failed_at.is_none()
                && record.lockout_until.is_none()
        })
    }));
}

#[tokio::test]
async fn clear_all_reports_rows_changed() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresLoginAttemptStore::new(pool);
    let policy = LoginThrottlePolicy::default();
    let session_key = unique_session_key();

    let Ok(_) = store
        .record_failure(session_key.as_str(), &policy, Utc::now())
        .await
    else {
        panic!("seeding failure errored");
    };

    let affected = store.clear_all().await;
    assert!(affected.is_ok_and(|affected| affected >= 1));

    let record = store.load(session_key.as_str()).await;
    assert!(record.is_ok_and(|record| {
        record.is_some_and(|record| record.failed_attempts == 0)
    }));
}
