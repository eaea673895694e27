// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk refresh and daily vitals jobs.

use chrono::NaiveDate;
use mockito::{Matcher, Server, ServerGuard};
use vitals_retriever::db::DocumentStore;
use vitals_retriever::error::AppError;
use vitals_retriever::models::{BulkStatus, VitalsRecord};
use vitals_retriever::services::cipher::hash_user_id;

mod common;
use common::{create_test_app, paths, seed_user, test_config, token_body, TestApp};

async fn mock_refresh(server: &mut ServerGuard, refresh_token: &str, ok: bool) -> mockito::Mock {
    let mock = server
        .mock("POST", paths::TOKEN)
        .match_body(Matcher::UrlEncoded(
            "refresh_token".into(),
            refresh_token.into(),
        ));
    let mock = if ok {
        mock.with_status(200).with_body(token_body(
            "ignored",
            &format!("{}-access", refresh_token),
            &format!("{}-next", refresh_token),
        ))
    } else {
        mock.with_status(400)
            .with_body(r#"{"errors":[{"errorType":"invalid_grant"}]}"#)
    };
    mock.expect(1).create_async().await
}

async fn seed_users(app: &TestApp, count: usize) {
    for i in 1..=count {
        seed_user(
            &app.state,
            &format!("USER{}", i),
            &format!("a-{}", i),
            &format!("r-{}", i),
        )
        .await;
    }
}

#[tokio::test]
async fn test_refresh_all_all_ok() {
    let mut server = Server::new_async().await;
    let app = create_test_app(test_config(&server.url()));
    seed_users(&app, 3).await;

    let mut mocks = Vec::new();
    for i in 1..=3 {
        mocks.push(mock_refresh(&mut server, &format!("r-{}", i), true).await);
    }

    let summary = app.state.bulk.refresh_all().await.unwrap();

    assert_eq!(summary.status, BulkStatus::AllOk);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.failures.is_empty());
    for mock in mocks {
        mock.assert_async().await;
    }

    let store = app.state.fitbit.credentials();
    let stored = store.decode(&store.read("USER2").await.unwrap()).unwrap();
    assert_eq!(stored.token, "r-2-access");
    assert_eq!(stored.refresh_token, "r-2-next");
}

#[tokio::test]
async fn test_refresh_all_partial() {
    let mut server = Server::new_async().await;
    let app = create_test_app(test_config(&server.url()));
    seed_users(&app, 3).await;

    let ok1 = mock_refresh(&mut server, "r-1", true).await;
    let ok2 = mock_refresh(&mut server, "r-2", true).await;
    let bad = mock_refresh(&mut server, "r-3", false).await;

    let summary = app.state.bulk.refresh_all().await.unwrap();

    assert_eq!(summary.status, BulkStatus::Partial);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].user, hash_user_id("USER3"));

    ok1.assert_async().await;
    ok2.assert_async().await;
    bad.assert_async().await;
}

#[tokio::test]
async fn test_refresh_all_all_failed() {
    let mut server = Server::new_async().await;
    let app = create_test_app(test_config(&server.url()));
    seed_users(&app, 2).await;

    let _bad1 = mock_refresh(&mut server, "r-1", false).await;
    let _bad2 = mock_refresh(&mut server, "r-2", false).await;

    let summary = app.state.bulk.refresh_all().await.unwrap();

    assert_eq!(summary.status, BulkStatus::AllFailed);
    assert_eq!(summary.failed, 2);
}

#[tokio::test]
async fn test_bulk_jobs_without_users() {
    let server = Server::new_async().await;
    let app = create_test_app(test_config(&server.url()));

    assert!(matches!(
        app.state.bulk.refresh_all().await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        app.state
            .bulk
            .fetch_all(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_daily_vitals_stores_every_user() {
    let mut server = Server::new_async().await;
    let app = create_test_app(test_config(&server.url()));
    seed_users(&app, 2).await;

    let mut mocks = Vec::new();
    for path in paths::DAILY {
        mocks.push(
            server
                .mock("GET", path)
                .with_status(200)
                .with_body(r#"{"ok":true}"#)
                .expect(2)
                .create_async()
                .await,
        );
    }

    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let summary = app.state.bulk.fetch_all(date).await.unwrap();

    assert_eq!(summary.status, BulkStatus::AllOk);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(app.vitals.len(), 2);

    let record: VitalsRecord = app
        .vitals
        .find_one(&VitalsRecord::document_id(&hash_user_id("USER1"), paths::DATE))
        .await
        .unwrap()
        .unwrap();
    let data = record.data.as_object().unwrap();
    assert_eq!(data.len(), 6);
    assert_eq!(data["spO2"]["ok"], true);

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_daily_vitals_undecryptable_user_does_not_abort() {
    let mut server = Server::new_async().await;
    let app = create_test_app(test_config(&server.url()));
    seed_users(&app, 1).await;

    let mut broken = app.state.fitbit.credentials().prepare("BROKEN", "a", "r");
    broken.encrypted_access_token = "AAAA".to_string();
    app.credentials.insert_one(&broken.id, &broken).await.unwrap();

    let mut mocks = Vec::new();
    for path in paths::DAILY {
        mocks.push(
            server
                .mock("GET", path)
                .with_status(200)
                .with_body(r#"{"ok":true}"#)
                .create_async()
                .await,
        );
    }

    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let summary = app.state.bulk.fetch_all(date).await.unwrap();

    assert_eq!(summary.status, BulkStatus::Partial);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].user, hash_user_id("BROKEN"));
    assert_eq!(app.vitals.len(), 1);
}

#[tokio::test]
async fn test_daily_vitals_partial_user() {
    let mut server = Server::new_async().await;
    let app = create_test_app(test_config(&server.url()));
    seed_users(&app, 1).await;

    let mut mocks = Vec::new();
    for path in paths::DAILY {
        let status = if path == paths::HRV { 500 } else { 200 };
        mocks.push(
            server
                .mock("GET", path)
                .with_status(status)
                .with_body(r#"{"ok":true}"#)
                .create_async()
                .await,
        );
    }

    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let summary = app.state.bulk.fetch_all(date).await.unwrap();

    assert_eq!(summary.status, BulkStatus::Partial);
    assert_eq!(summary.partial, 1);
    assert!(summary.failures[0]
        .error
        .contains("heart_rate_variability"));
    // Partial results are still stored
    assert_eq!(app.vitals.len(), 1);
}
