//! Scenario: leaderboard ranking by revenue per online hour.
//!
//! All tests are pure in-process; no DB or network required.

use chrono::Utc;
use fw_roster::RosterViews;
use fw_schemas::ShiftType;
use fw_testkit::fixtures::{self, completed_shift};
use fw_testkit::Harness;

async fn harness() -> Harness {
    let h = Harness::new(Utc::now());
    for (id, name) in [("DA", "Alpha"), ("DB", "Bravo"), ("DC", "Charlie"), ("DD", "Delta")] {
        h.store
            .add_driver(fixtures::driver(id, name, 500_000, 500_000))
            .await;
    }
    h
}

#[tokio::test]
async fn equal_rates_keep_revenue_order() {
    let h = harness().await;
    let day = fixtures::date(2025, 3, 1);
    // Both earn 500 per online hour; A took more in total.
    h.store
        .put_shift(completed_shift("S-B", "DB", ShiftType::Am, day, 1_000, 120, 3))
        .await;
    h.store
        .put_shift(completed_shift("S-A", "DA", ShiftType::Am, day, 3_000, 360, 9))
        .await;

    let views = RosterViews::new(h.lifecycle.clone());
    let board = views.get_leaderboard(day, Some(ShiftType::Am), 10).await.unwrap();

    let order: Vec<_> = board.iter().map(|e| (e.rank, e.driver_id.as_str())).collect();
    assert_eq!(order, [(1, "DA"), (2, "DB")]);
    assert_eq!(board[0].revenue_per_hour_cents, 500.0);
    assert_eq!(board[1].revenue_per_hour_cents, 500.0);
    assert_eq!(board[0].total_revenue_cents, 3_000);
    assert_eq!(board[0].trip_count, 9);
    assert_eq!(board[0].driver_name, "Alpha");
    // 360 online of 480 scheduled.
    assert_eq!(board[0].utilization_percent, 75.0);
}

#[tokio::test]
async fn zero_online_minutes_ranks_last_and_limit_truncates() {
    let h = harness().await;
    let day = fixtures::date(2025, 3, 1);
    h.store
        .put_shift(completed_shift("S-C", "DC", ShiftType::Pm, day, 90_000, 0, 1))
        .await;
    h.store
        .put_shift(completed_shift("S-A", "DA", ShiftType::Am, day, 3_000, 360, 2))
        .await;
    h.store
        .put_shift(completed_shift("S-D", "DD", ShiftType::Pm, day, 6_000, 240, 4))
        .await;

    let views = RosterViews::new(h.lifecycle.clone());

    let all = views.get_leaderboard(day, None, 10).await.unwrap();
    let ids: Vec<_> = all.iter().map(|e| e.driver_id.as_str()).collect();
    assert_eq!(ids, ["DD", "DA", "DC"]);
    assert_eq!(all[2].revenue_per_hour_cents, 0.0);
    assert_eq!(all[2].utilization_percent, 0.0);

    let top = views.get_leaderboard(day, None, 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].rank, 1);

    let pm = views.get_leaderboard(day, Some(ShiftType::Pm), 10).await.unwrap();
    assert_eq!(pm.len(), 2);
}

#[tokio::test]
async fn only_completed_shifts_on_the_date_are_ranked() {
    let h = harness().await;
    let day = fixtures::date(2025, 3, 1);
    let mut live = completed_shift("S-LIVE", "DA", ShiftType::Am, day, 9_000, 60, 1);
    live.status = fw_schemas::ShiftStatus::Active;
    h.store.put_shift(live).await;
    h.store
        .put_shift(completed_shift(
            "S-OTHER-DAY",
            "DB",
            ShiftType::Am,
            fixtures::date(2025, 3, 2),
            9_000,
            60,
            1,
        ))
        .await;

    let views = RosterViews::new(h.lifecycle.clone());
    assert!(views.get_leaderboard(day, None, 10).await.unwrap().is_empty());
}
