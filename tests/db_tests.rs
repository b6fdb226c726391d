// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite store tests: upsert semantics, listings and aggregates.

use strava_dashboard::db::{ActivityFilter, Database};
use strava_dashboard::models::{compute_streak, AthleteProfile, AthleteTokens, StreakStats};
use strava_dashboard::services::StatsService;

mod common;
use common::{day, make_activity, seed_athlete, ATHLETE_ID};

async fn test_db() -> Database {
    let db = Database::in_memory().await.expect("in-memory database");
    seed_athlete(&db, ATHLETE_ID, common::fresh_expiry()).await;
    db
}

#[tokio::test]
async fn test_upsert_athlete_updates_profile_and_tokens() {
    let db = test_db().await;
    let before = db.get_athlete(ATHLETE_ID).await.unwrap().unwrap();

    let profile = AthleteProfile {
        id: ATHLETE_ID,
        firstname: Some("Grace".to_string()),
        city: Some("Arlington".to_string()),
        ..Default::default()
    };
    let tokens = AthleteTokens {
        access_token: "a2".to_string(),
        refresh_token: "r2".to_string(),
        expires_at: 42,
    };
    let after = db.upsert_athlete(&profile, &tokens).await.unwrap();

    assert_eq!(after.firstname.as_deref(), Some("Grace"));
    assert_eq!(after.city.as_deref(), Some("Arlington"));
    assert_eq!(after.tokens(), tokens);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(db.list_athletes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_tokens_for_missing_athlete() {
    let db = test_db().await;
    let tokens = AthleteTokens {
        access_token: "a".to_string(),
        refresh_token: "r".to_string(),
        expires_at: 1,
    };
    assert!(!db.update_tokens(999, &tokens).await.unwrap());
}

#[tokio::test]
async fn test_upsert_counts_only_new_rows() {
    let db = test_db().await;
    let a = make_activity(1, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1500);
    let b = make_activity(2, ATHLETE_ID, "2024-03-02", "Ride", 20000.0, 3600);

    assert_eq!(db.upsert_activities(&[a.clone(), b.clone()]).await.unwrap(), 2);

    let mut renamed = a.clone();
    renamed.name = "Renamed".to_string();
    renamed.kudos_count = Some(7);
    assert_eq!(db.upsert_activities(&[renamed, b]).await.unwrap(), 0);

    let stored = db.get_activity(1).await.unwrap().unwrap();
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.kudos_count, Some(7));
    assert_eq!(
        db.count_activities(ATHLETE_ID, &ActivityFilter::default())
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_upsert_never_changes_owner() {
    let db = test_db().await;
    seed_athlete(&db, 777, common::fresh_expiry()).await;

    let original = make_activity(1, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1500);
    db.upsert_activities(&[original]).await.unwrap();

    let mut hijack = make_activity(1, 777, "2024-03-01", "Run", 1.0, 1);
    hijack.name = "Hijacked".to_string();
    assert_eq!(db.upsert_activities(&[hijack]).await.unwrap(), 0);

    let stored = db.get_activity(1).await.unwrap().unwrap();
    assert_eq!(stored.athlete_id, ATHLETE_ID);
    assert_ne!(stored.name, "Hijacked");
}

#[tokio::test]
async fn test_upsert_keeps_stored_map_when_listing_omits_it() {
    let db = test_db().await;
    let mut with_map = make_activity(1, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1500);
    with_map.summary_polyline = Some("_p~iF~ps|U".to_string());
    db.upsert_activities(&[with_map]).await.unwrap();

    let without_map = make_activity(1, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1500);
    db.upsert_activities(&[without_map]).await.unwrap();

    let stored = db.get_activity(1).await.unwrap().unwrap();
    assert_eq!(stored.summary_polyline.as_deref(), Some("_p~iF~ps|U"));
}

#[tokio::test]
async fn test_latest_start_date() {
    let db = test_db().await;
    assert!(db.latest_start_date(ATHLETE_ID).await.unwrap().is_none());

    let older = make_activity(1, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1500);
    let newer = make_activity(2, ATHLETE_ID, "2024-03-05", "Run", 5000.0, 1500);
    db.upsert_activities(&[newer.clone(), older]).await.unwrap();

    assert_eq!(
        db.latest_start_date(ATHLETE_ID).await.unwrap(),
        Some(newer.start_date)
    );
}

#[tokio::test]
async fn test_list_activities_filter_and_order() {
    let db = test_db().await;
    db.upsert_activities(&[
        make_activity(1, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1500),
        make_activity(2, ATHLETE_ID, "2024-03-02", "Ride", 20000.0, 3600),
        make_activity(3, ATHLETE_ID, "2024-03-03", "Run", 8000.0, 2400),
    ])
    .await
    .unwrap();

    let all = db
        .list_activities(ATHLETE_ID, &ActivityFilter::default(), 20, 0)
        .await
        .unwrap();
    assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![3, 2, 1]);

    let runs = ActivityFilter {
        activity_type: Some("run".to_string()),
    };
    let filtered = db.list_activities(ATHLETE_ID, &runs, 20, 0).await.unwrap();
    assert_eq!(filtered.iter().map(|a| a.id).collect::<Vec<_>>(), vec![3, 1]);
    assert_eq!(db.count_activities(ATHLETE_ID, &runs).await.unwrap(), 2);

    let second_page = db
        .list_activities(ATHLETE_ID, &ActivityFilter::default(), 2, 2)
        .await
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, 1);

    assert_eq!(
        db.activity_types(ATHLETE_ID).await.unwrap(),
        vec!["Ride".to_string(), "Run".to_string()]
    );
}

#[tokio::test]
async fn test_similar_activities_match_month_day_and_type() {
    let db = test_db().await;
    seed_athlete(&db, 777, common::fresh_expiry()).await;

    let target = make_activity(1, ATHLETE_ID, "2024-03-10", "Run", 5000.0, 1500);
    db.upsert_activities(&[
        target.clone(),
        make_activity(2, ATHLETE_ID, "2023-03-10", "Run", 5000.0, 1500),
        make_activity(3, ATHLETE_ID, "2022-03-10", "Run", 5000.0, 1500),
        // Same day, different type
        make_activity(4, ATHLETE_ID, "2023-03-10", "Ride", 5000.0, 1500),
        // Different day
        make_activity(5, ATHLETE_ID, "2023-03-11", "Run", 5000.0, 1500),
        // Another athlete
        make_activity(6, 777, "2023-03-10", "Run", 5000.0, 1500),
    ])
    .await
    .unwrap();

    let similar = db.similar_activities(&target).await.unwrap();
    assert_eq!(similar.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 3]);
}

#[tokio::test]
async fn test_activity_days_are_distinct_and_sorted() {
    let db = test_db().await;
    db.upsert_activities(&[
        make_activity(1, ATHLETE_ID, "2024-03-03", "Run", 5000.0, 1500),
        make_activity(2, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1500),
        make_activity(3, ATHLETE_ID, "2024-03-03", "Ride", 5000.0, 1500),
    ])
    .await
    .unwrap();

    let days = db.activity_days(ATHLETE_ID).await.unwrap();
    assert_eq!(days, vec![day("2024-03-01"), day("2024-03-03")]);

    let stats = compute_streak(&days, day("2024-03-04"));
    db.set_streak(ATHLETE_ID, &stats).await.unwrap();
    let stored = db.get_streak(ATHLETE_ID).await.unwrap().unwrap();
    assert_eq!(stored.stats(), stats);
    assert_eq!(
        stats,
        StreakStats {
            current_streak: 1,
            longest_streak: 1,
            total_days: 2,
            last_activity_date: Some(day("2024-03-03")),
        }
    );
}

#[tokio::test]
async fn test_dashboard_period_totals() {
    let db = test_db().await;
    // 2024-03-13 is a Wednesday; its week starts Monday 2024-03-11.
    db.upsert_activities(&[
        make_activity(1, ATHLETE_ID, "2024-03-13", "Run", 5000.0, 1800),
        make_activity(2, ATHLETE_ID, "2024-03-11", "Run", 10000.0, 3600),
        make_activity(3, ATHLETE_ID, "2024-03-10", "Ride", 30000.0, 3600),
        make_activity(4, ATHLETE_ID, "2024-02-29", "Run", 1000.0, 360),
    ])
    .await
    .unwrap();

    let stats = StatsService::new(db.clone())
        .dashboard(ATHLETE_ID, day("2024-03-13"))
        .await
        .unwrap();

    assert_eq!(stats.today.count, 1);
    assert!((stats.today.distance - 5.0).abs() < 1e-9);
    assert!((stats.today.time - 0.5).abs() < 1e-9);

    assert_eq!(stats.this_week.count, 2);
    assert!((stats.this_week.distance - 15.0).abs() < 1e-9);

    assert_eq!(stats.this_month.count, 3);
    assert!((stats.this_month.distance - 45.0).abs() < 1e-9);
    assert!((stats.this_month.elevation - 30.0).abs() < 1e-9);

    // No streak stored yet.
    assert_eq!(stats.streak, StreakStats::default());
}

#[tokio::test]
async fn test_weekly_series_keys_and_window() {
    let db = test_db().await;
    db.upsert_activities(&[
        make_activity(1, ATHLETE_ID, "2024-03-13", "Run", 5000.0, 1800),
        // Sunday belongs to the week starting Monday 2024-03-04
        make_activity(2, ATHLETE_ID, "2024-03-10", "Run", 10000.0, 3600),
        make_activity(3, ATHLETE_ID, "2024-03-04", "Run", 2000.0, 600),
        // Start of the 12-week window
        make_activity(4, ATHLETE_ID, "2023-12-25", "Run", 1000.0, 300),
        // Just outside it
        make_activity(5, ATHLETE_ID, "2023-12-24", "Run", 1000.0, 300),
        // Future-dated: later this week and next week
        make_activity(6, ATHLETE_ID, "2024-03-14", "Run", 1000.0, 300),
        make_activity(7, ATHLETE_ID, "2024-03-20", "Run", 1000.0, 300),
    ])
    .await
    .unwrap();

    let series = StatsService::new(db.clone())
        .weekly(ATHLETE_ID, day("2024-03-13"))
        .await
        .unwrap();

    let keys: Vec<&str> = series.iter().map(|b| b.period.as_str()).collect();
    assert_eq!(keys, vec!["2024-03-11", "2024-03-04", "2023-12-25"]);
    assert_eq!(series[0].data.count, 1);
    assert_eq!(series[1].data.count, 2);
    assert!((series[1].data.distance - 12.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_monthly_series_keys_and_window() {
    let db = test_db().await;
    db.upsert_activities(&[
        make_activity(1, ATHLETE_ID, "2024-03-13", "Run", 5000.0, 1800),
        make_activity(2, ATHLETE_ID, "2024-03-01", "Run", 5000.0, 1800),
        make_activity(3, ATHLETE_ID, "2023-11-30", "Ride", 40000.0, 7200),
        make_activity(4, ATHLETE_ID, "2023-03-14", "Run", 1000.0, 300),
        // More than 365 days back
        make_activity(5, ATHLETE_ID, "2023-03-12", "Run", 1000.0, 300),
        // Future-dated: later this month and next month
        make_activity(6, ATHLETE_ID, "2024-03-14", "Run", 1000.0, 300),
        make_activity(7, ATHLETE_ID, "2024-04-02", "Run", 1000.0, 300),
    ])
    .await
    .unwrap();

    let series = StatsService::new(db.clone())
        .monthly(ATHLETE_ID, day("2024-03-13"))
        .await
        .unwrap();

    let keys: Vec<&str> = series.iter().map(|b| b.period.as_str()).collect();
    assert_eq!(keys, vec!["2024-03", "2023-11", "2023-03"]);
    assert_eq!(series[0].data.count, 2);
    assert!((series[1].data.time - 2.0).abs() < 1e-9);
    assert_eq!(series[2].data.count, 1);
}
