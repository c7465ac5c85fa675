mod common;

use chrono::Utc;
use uuid::Uuid;

use domain::events::{payload, EventEnvelope, EventKind};
use gateway::GatewayState;

fn envelope(draft_id: Uuid, kind: EventKind, data: serde_json::Value) -> EventEnvelope {
    EventEnvelope { id: Uuid::new_v4(), draft_id, kind, timestamp: Utc::now(), data }
}

#[tokio::test]
async fn active_drafts_and_state_snapshot_reflect_applied_events() {
    let state = GatewayState::new(false);
    let draft_id = Uuid::new_v4();

    state
        .projections
        .apply(&envelope(draft_id, EventKind::DraftStarted, payload::draft_lifecycle(draft_id)))
        .await;
    let timeout_at = Utc::now() + chrono::Duration::seconds(30);
    state
        .projections
        .apply(&envelope(
            draft_id,
            EventKind::PickStarted,
            payload::pick_started(Uuid::new_v4(), Uuid::new_v4(), 1, 1, 1, timeout_at),
        ))
        .await;

    let base_url = common::spawn_app(state).await;
    let client = common::create_client();

    let active: serde_json::Value = client
        .get(format!("{base_url}/api/drafts/active"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["draft_id"], draft_id.to_string());

    let response = client.get(format!("{base_url}/api/drafts/{draft_id}/state")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "in_progress");
    assert!(body["time_remaining_sec"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn unknown_draft_state_is_404() {
    let state = GatewayState::new(false);
    let base_url = common::spawn_app(state).await;
    let client = common::create_client();

    let response = client
        .get(format!("{base_url}/api/drafts/{}/state", Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn picks_endpoint_paginates_and_stats_endpoint_reports_zero_connections() {
    let state = GatewayState::new(false);
    let draft_id = Uuid::new_v4();
    let now = Utc::now();

    for overall_pick in 1..=3 {
        state
            .projections
            .apply(&envelope(
                draft_id,
                EventKind::PickMade,
                payload::pick_made(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), overall_pick, 1, overall_pick, now),
            ))
            .await;
    }

    let base_url = common::spawn_app(state).await;
    let client = common::create_client();

    let page: serde_json::Value = client
        .get(format!("{base_url}/api/drafts/{draft_id}/picks?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["picks"].as_array().unwrap().len(), 2);
    assert_eq!(page["next_cursor"], 2);

    let stats: serde_json::Value = client
        .get(format!("{base_url}/ws/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_connections"], 0);
}

#[tokio::test]
async fn ws_upgrade_without_draft_id_returns_bad_request() {
    let state = GatewayState::new(false);
    let base_url = common::spawn_app(state).await;
    let client = common::create_client();

    let response = client.get(format!("{base_url}/ws/draft")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
