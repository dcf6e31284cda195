//! Pagination, aggregation and multi-year scheduling against a mocked
//! activities endpoint.

use commute_drivetrain::activity_totals::{MultiYearScheduler, YearAggregator, year_bounds};
use commute_drivetrain::common::oauth::OAuthSession;
use commute_drivetrain::common::strava_client::StravaClient;
use commute_drivetrain::common::types::{CommuteError, TokenSet, YearDistance};
use mockito::{Matcher, Mock, Server, ServerGuard};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ACCESS_TOKEN: &str = "test-access";

fn aggregator(server: &ServerGuard) -> YearAggregator {
    let client =
        StravaClient::with_endpoints(&server.url(), &format!("{}/oauth", server.url())).unwrap();
    let session = OAuthSession::from_tokens(TokenSet {
        access_token: ACCESS_TOKEN.to_string(),
        ..TokenSet::default()
    });
    YearAggregator::new(Arc::new(client), Arc::new(session))
}

fn ride(name: &str, activity_type: &str, distance: f64, commute: bool) -> Value {
    json!({
        "id": 1,
        "name": name,
        "type": activity_type,
        "sport_type": activity_type,
        "distance": distance,
        "commute": commute,
        "moving_time": 1800,
        "start_date": "2020-05-04T07:30:00Z",
    })
}

async fn mock_page(server: &mut ServerGuard, year: i32, page: u32, body: Value) -> Mock {
    let (after, before) = year_bounds(year).unwrap();
    server
        .mock("GET", "/athlete/activities")
        .match_header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("after".into(), after.to_string()),
            Matcher::UrlEncoded("before".into(), before.to_string()),
            Matcher::UrlEncoded("page".into(), page.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_single_commute_ride_in_2020() {
    let mut server = Server::new_async().await;
    let page_1 = mock_page(
        &mut server,
        2020,
        1,
        json!([ride("To work", "Ride", 20000.0, true)]),
    )
    .await;
    let page_2 = mock_page(&mut server, 2020, 2, json!([])).await;

    let distance = aggregator(&server).aggregate(2020).await.unwrap();

    page_1.assert_async().await;
    page_2.assert_async().await;
    assert_eq!(
        distance,
        YearDistance {
            year: 2020,
            commute: 20.0,
            pleasure: 0.0
        }
    );
}

#[tokio::test]
async fn test_paging_stops_one_page_after_the_last_full_page() {
    let mut server = Server::new_async().await;
    let pages = [
        json!([
            ride("a", "Ride", 1000.0, false),
            ride("b", "Run", 1000.0, false)
        ]),
        json!([
            ride("c", "EBikeRide", 1000.0, true),
            ride("d", "Ride", 1000.0, false)
        ]),
        json!([ride("e", "Ride", 1000.0, true)]),
        json!([]),
    ];

    let mut mocks = Vec::new();
    for (index, body) in pages.into_iter().enumerate() {
        mocks.push(mock_page(&mut server, 2018, index as u32 + 1, body).await);
    }
    let never = server
        .mock("GET", "/athlete/activities")
        .match_query(Matcher::UrlEncoded("page".into(), "5".into()))
        .expect(0)
        .create_async()
        .await;

    let activities = aggregator(&server)
        .with_page_size(2)
        .fetch_year(2018)
        .await
        .unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }
    never.assert_async().await;
    assert_eq!(activities.len(), 5);
}

#[tokio::test]
async fn test_page_size_is_sent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/athlete/activities")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("per_page".into(), "200".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let activities = aggregator(&server).fetch_year(2016).await.unwrap();

    mock.assert_async().await;
    assert!(activities.is_empty());
}

#[tokio::test]
async fn test_other_activity_types_are_ignored() {
    let mut server = Server::new_async().await;
    mock_page(
        &mut server,
        2021,
        1,
        json!([
            ride("commute", "Ride", 12500.0, true),
            ride("weekend", "EBikeRide", 40000.0, false),
            ride("run to work", "Run", 8000.0, true),
            ride("swim", "Swim", 1500.0, false),
        ]),
    )
    .await;
    mock_page(&mut server, 2021, 2, json!([])).await;

    let distance = aggregator(&server).aggregate(2021).await.unwrap();

    assert_eq!(distance.commute, 12.5);
    assert_eq!(distance.pleasure, 40.0);
    assert_eq!(distance.total(), 52.5);
}

#[tokio::test]
async fn test_expired_token_aborts_the_year() {
    let mut server = Server::new_async().await;
    mock_page(
        &mut server,
        2019,
        1,
        json!([ride("a", "Ride", 5000.0, false)]),
    )
    .await;
    let (after, _) = year_bounds(2019).unwrap();
    server
        .mock("GET", "/athlete/activities")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("after".into(), after.to_string()),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .with_status(401)
        .with_body(r#"{"message": "Authorization Error"}"#)
        .create_async()
        .await;

    let result = aggregator(&server).aggregate(2019).await;
    match result {
        Err(CommuteError::AuthRejected { status, .. }) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED)
        }
        other => panic!("expected AuthRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_array_body_is_malformed() {
    let mut server = Server::new_async().await;
    mock_page(&mut server, 2017, 1, json!({"message": "Record Not Found"})).await;

    let result = aggregator(&server).aggregate(2017).await;
    assert!(matches!(result, Err(CommuteError::ResponseMalformed(_))));
}

#[tokio::test]
async fn test_record_without_distance_is_malformed() {
    let mut server = Server::new_async().await;
    mock_page(
        &mut server,
        2017,
        1,
        json!([{"name": "no distance", "type": "Ride", "commute": false}]),
    )
    .await;

    let result = aggregator(&server).fetch_year(2017).await;
    assert!(matches!(result, Err(CommuteError::ResponseMalformed(_))));
}

#[tokio::test]
async fn test_scheduler_collects_one_entry_per_year() {
    let mut server = Server::new_async().await;
    for (year, metres) in [(2019, 1000.0), (2020, 2000.0), (2021, 3000.0)] {
        mock_page(
            &mut server,
            year,
            1,
            json!([
                ride("commute", "Ride", metres, true),
                ride("fun", "Ride", metres * 2.0, false)
            ]),
        )
        .await;
        mock_page(&mut server, year, 2, json!([])).await;
    }

    // reversed on purpose
    let table = MultiYearScheduler::new(aggregator(&server))
        .run(2021, 2019)
        .await
        .unwrap();

    assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![2019, 2020, 2021]);
    for (year, km) in [(2019, 1.0), (2020, 2.0), (2021, 3.0)] {
        let distance = table[&year];
        assert_eq!(distance.year, year);
        assert_eq!(distance.commute, km);
        assert_eq!(distance.pleasure, km * 2.0);
    }
}

/// First page answered after `delay`, so tasks finish in a chosen order.
async fn mock_slow_page(server: &mut ServerGuard, year: i32, delay: Duration, body: Value) -> Mock {
    let (after, before) = year_bounds(year).unwrap();
    let body = body.to_string();
    server
        .mock("GET", "/athlete/activities")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("after".into(), after.to_string()),
            Matcher::UrlEncoded("before".into(), before.to_string()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_chunked_body(move |writer| {
            thread::sleep(delay);
            writer.write_all(body.as_bytes())
        })
        .expect(1)
        .create_async()
        .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scheduler_entries_do_not_depend_on_completion_order() {
    let mut server = Server::new_async().await;
    // oldest year answers last
    for (year, delay_ms, metres) in [(2019, 400, 1000.0), (2020, 200, 2000.0), (2021, 0, 3000.0)] {
        mock_slow_page(
            &mut server,
            year,
            Duration::from_millis(delay_ms),
            json!([
                ride("commute", "Ride", metres, true),
                ride("fun", "Ride", metres * 2.0, false)
            ]),
        )
        .await;
        mock_page(&mut server, year, 2, json!([])).await;
    }

    let table = MultiYearScheduler::new(aggregator(&server))
        .run(2019, 2021)
        .await
        .unwrap();

    assert_eq!(table.len(), 3);
    for (year, km) in [(2019, 1.0), (2020, 2.0), (2021, 3.0)] {
        assert_eq!(
            table[&year],
            YearDistance {
                year,
                commute: km,
                pleasure: km * 2.0
            }
        );
    }
}

#[tokio::test]
async fn test_scheduler_fails_when_any_year_fails() {
    let mut server = Server::new_async().await;
    for year in [2019, 2021] {
        mock_page(&mut server, year, 1, json!([])).await;
    }
    let (after, _) = year_bounds(2020).unwrap();
    server
        .mock("GET", "/athlete/activities")
        .match_query(Matcher::UrlEncoded("after".into(), after.to_string()))
        .with_status(500)
        .create_async()
        .await;

    let result = MultiYearScheduler::new(aggregator(&server))
        .run(2019, 2021)
        .await;

    match result {
        Err(CommuteError::AuthRejected { status, .. }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("expected AuthRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scheduler_rejects_range_before_provider_epoch() {
    let server = Server::new_async().await;
    let result = MultiYearScheduler::new(aggregator(&server))
        .run(1995, 2001)
        .await;

    assert!(matches!(result, Err(CommuteError::InvalidInput(_))));
}
