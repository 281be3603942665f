use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;
use tokio::time::sleep;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use routine_check::additive_normalizer::{normalize, AdditiveCode};
use routine_check::api_connection::connection::{ScoringApi, ScoringApiError};
use routine_check::interaction_checker::{CheckOutcome, CheckState, InteractionChecker};
use routine_check::report_presenter::{dominant_tier, render_report, RiskTier};
use routine_check::routine_aggregator::additive_set_of;
use routine_check::routine_loader::load_routine;
use routine_check::what_if::restrict;

fn codes(raw: &[&str]) -> Vec<AdditiveCode> {
    raw.iter().map(|r| normalize(r).unwrap()).collect()
}

fn as_strings(codes: &[AdditiveCode]) -> Vec<String> {
    codes.iter().map(|c| c.as_str().to_string()).collect()
}

fn routine_file() -> NamedTempFile {
    let records = json!([
        { "code": "111", "product_name": "Soda", "additives": ["E330"] },
        { "code": "222", "product_name": "Spread", "additives": ["E322I", "e 102"] }
    ]);
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(records.to_string().as_bytes()).unwrap();
    file
}

fn clean_response(inputs: &[String]) -> serde_json::Value {
    json!({
        "inputs": inputs,
        "additives": null,
        "summary": { "score": 0.0, "grade": "A", "matches": 0, "method": "pairwise_v1" },
        "matches": []
    })
}

#[tokio::test]
async fn test_routine_file_flows_into_a_scored_check() {
    let file = routine_file();
    let aggregator = load_routine(file.path()).unwrap();

    let additive_set = aggregator.additive_set();
    assert_eq!(as_strings(&additive_set), vec!["E102", "E322", "E322I", "E330"]);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .and(body_json(
            json!({ "e_numbers": ["E102", "E322", "E322I", "E330"] }),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clean_response(&as_strings(&additive_set))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let checker = InteractionChecker::new(ScoringApi::new(server.uri()));
    let outcome = checker.run_check(&additive_set).await;

    assert_eq!(outcome, CheckOutcome::Applied);
    match checker.state() {
        CheckState::Success(report) => {
            assert!(report.matches.is_empty());
            assert_eq!(report.summary.grade.as_deref(), Some("A"));
            assert_eq!(report.inputs, as_strings(&additive_set));
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exclusions_below_the_gate_clear_the_previous_report() {
    let file = routine_file();
    let aggregator = load_routine(file.path()).unwrap();
    let full_set = aggregator.additive_set();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clean_response(&as_strings(&full_set))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let checker = InteractionChecker::new(ScoringApi::new(server.uri()));
    assert_eq!(checker.run_check(&full_set).await, CheckOutcome::Applied);
    assert!(matches!(checker.state(), CheckState::Success(_)));

    // Leaving out the spread drops the set to one code, below the gate.
    let excluded: HashSet<String> = ["222".to_string()].into();
    let kept = restrict(aggregator.list(), &excluded);
    let restricted_set = additive_set_of(&kept);
    assert_eq!(as_strings(&restricted_set), vec!["E330"]);

    let outcome = checker.run_check(&restricted_set).await;
    assert_eq!(outcome, CheckOutcome::InsufficientInput);
    assert_eq!(checker.state(), CheckState::Idle);
}

#[tokio::test]
async fn test_slow_wire_response_cannot_overwrite_a_newer_one() {
    let first = codes(&["E322", "E330"]);
    let second = codes(&["E102", "E129"]);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .and(body_json(json!({ "e_numbers": as_strings(&first) })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(clean_response(&as_strings(&first)))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .and(body_json(json!({ "e_numbers": as_strings(&second) })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clean_response(&as_strings(&second))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let checker = Arc::new(InteractionChecker::new(ScoringApi::new(server.uri())));

    let slow = tokio::spawn({
        let checker = checker.clone();
        let first = first.clone();
        async move { checker.run_check(&first).await }
    });
    sleep(Duration::from_millis(50)).await;

    let fast_outcome = checker.run_check(&second).await;
    let slow_outcome = slow.await.unwrap();

    assert_eq!(fast_outcome, CheckOutcome::Applied);
    assert_eq!(slow_outcome, CheckOutcome::Superseded);
    match checker.state() {
        CheckState::Success(report) => assert_eq!(report.inputs, as_strings(&second)),
        other => panic!("expected the later result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rapid_wire_schedules_produce_one_request() {
    let pair = codes(&["E322", "E330"]);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clean_response(&as_strings(&pair))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let checker = Arc::new(InteractionChecker::with_debounce_window(
        ScoringApi::new(server.uri()),
        Duration::from_millis(250),
    ));

    let mut handles = Vec::new();
    for _ in 0..3 {
        handles.push(tokio::spawn({
            let checker = checker.clone();
            let pair = pair.clone();
            async move { checker.schedule_check(&pair).await }
        }));
        sleep(Duration::from_millis(25)).await;
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == CheckOutcome::Applied)
            .count(),
        1,
        "exactly one schedule should fire, got {:?}",
        outcomes
    );
    assert!(matches!(checker.state(), CheckState::Success(_)));
}

#[tokio::test]
async fn test_service_rejection_lands_in_the_error_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "detail": "Provide at least 2 valid E-numbers" })),
        )
        .mount(&server)
        .await;

    let checker = InteractionChecker::new(ScoringApi::new(server.uri()));
    let outcome = checker.run_check(&codes(&["E322", "E330"])).await;

    assert_eq!(outcome, CheckOutcome::Applied);
    match checker.state() {
        CheckState::Error(message) => {
            assert!(message.contains("422"), "unexpected message: {message}");
            assert!(message.contains("E-numbers"));
        }
        other => panic!("expected an error state, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_reports_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let checker = InteractionChecker::new(ScoringApi::new(server.uri()));
    checker.run_check(&codes(&["E322", "E330"])).await;

    match checker.state() {
        CheckState::Error(message) => {
            assert!(
                message.contains("Serialization error"),
                "unexpected message: {message}"
            );
        }
        other => panic!("expected an error state, got {:?}", other),
    }
}

#[tokio::test]
async fn test_flagged_matches_surface_in_the_rendered_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inputs": ["E322", "E330"],
            "summary": { "score": 55.0, "grade": "D", "matches": 1, "method": "pairwise_v1" },
            "matches": [{
                "combo_id": "C014",
                "severity": "high",
                "risk_weight_0to3": 3,
                "matched_e_numbers": ["E322", "E330"],
                "health_outcome_short": "oxidative stress markers",
                "context": "combined exposure in soft drinks",
                "sources": [
                    { "source_id": "S01", "title": "Mixture study", "url": null, "year": "2021", "notes": null }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let checker = InteractionChecker::new(ScoringApi::new(server.uri()));
    checker.run_check(&codes(&["E322", "E330"])).await;

    let report = match checker.state() {
        CheckState::Success(report) => report,
        other => panic!("expected success, got {:?}", other),
    };
    assert_eq!(dominant_tier(&report), RiskTier::High);

    let rendered = render_report(&report);
    assert!(rendered.contains("Grade: D (score 55.0)"));
    assert!(rendered.contains("[high] E322 + E330: oxidative stress markers (1 source)"));
}

#[tokio::test]
async fn test_additive_detail_round_trip_and_missing_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/additives/E322"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "e_number": "E322",
            "name": "Lecithins",
            "risk_level": "low",
            "functional_class": "emulsifier",
            "effects": ["generally recognized as safe"],
            "source_title": "EFSA re-evaluation"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/additives/E9999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Unknown additive" })))
        .mount(&server)
        .await;

    let api = ScoringApi::new(server.uri());

    let detail = api
        .fetch_additive_detail(&normalize("e322").unwrap())
        .await
        .unwrap();
    assert_eq!(detail.e_number, "E322");
    assert_eq!(detail.name.as_deref(), Some("Lecithins"));
    assert_eq!(RiskTier::from_label(detail.risk_level.as_deref()), RiskTier::Low);
    assert_eq!(detail.effects, vec!["generally recognized as safe"]);
    assert_eq!(detail.adi, None);

    let missing = api.fetch_additive_detail(&normalize("E9999").unwrap()).await;
    assert!(
        matches!(
            missing,
            Err(ScoringApiError::ApiError { status, .. }) if status == reqwest::StatusCode::NOT_FOUND
        ),
        "expected a 404 ApiError, got {:?}",
        missing
    );
}
