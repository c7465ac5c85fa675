//! Draft lifecycle acceptance tests, exercising the HTTP surface end to end.

mod common;

use std::time::Duration;
use uuid::Uuid;

fn two_team_payload(time_per_pick_secs: i32) -> serde_json::Value {
    serde_json::json!({
        "league_id": Uuid::new_v4(),
        "draft_type": "snake",
        "rounds": 2,
        "time_per_pick_secs": time_per_pick_secs,
        "team_order": [Uuid::new_v4(), Uuid::new_v4()],
        "third_round_reversal": false,
        "auction": null,
        "scheduled_at": null,
    })
}

#[tokio::test]
async fn create_start_and_pick_round_trip() {
    let (base_url, _pool) = common::spawn_app().await;
    let client = common::create_client();

    let created: serde_json::Value = client
        .post(format!("{}/api/v1/drafts", base_url))
        .json(&two_team_payload(30))
        .send()
        .await
        .expect("create draft request failed")
        .json()
        .await
        .expect("invalid create draft response");

    let draft_id = created["id"].as_str().expect("draft id missing").to_string();
    assert_eq!(created["status"], "not_started");

    let started: serde_json::Value = client
        .post(format!("{}/api/v1/drafts/{}/start", base_url, draft_id))
        .send()
        .await
        .expect("start draft request failed")
        .json()
        .await
        .expect("invalid start draft response");
    assert_eq!(started["status"], "in_progress");
    assert!(!started["next_deadline"].is_null());

    let remaining: serde_json::Value = client
        .get(format!("{}/api/v1/drafts/{}/picks/remaining", base_url, draft_id))
        .send()
        .await
        .expect("remaining picks request failed")
        .json()
        .await
        .expect("invalid remaining picks response");
    assert_eq!(remaining["remaining"], 4);

    let next_pick: serde_json::Value = client
        .get(format!("{}/api/v1/drafts/{}/picks/next", base_url, draft_id))
        .send()
        .await
        .expect("next pick request failed")
        .json()
        .await
        .expect("invalid next pick response");
    let pick_id = next_pick["id"].as_str().expect("pick id missing").to_string();
    let team_id = next_pick["team_id"].as_str().expect("team id missing").to_string();

    let pick_response = client
        .post(format!("{}/api/v1/drafts/{}/picks/make", base_url, draft_id))
        .json(&serde_json::json!({
            "pick_id": pick_id,
            "team_id": team_id,
            "player_id": Uuid::new_v4(),
        }))
        .send()
        .await
        .expect("make pick request failed");
    assert_eq!(pick_response.status(), 200);
    let pick_body: serde_json::Value = pick_response.json().await.expect("invalid make pick response");
    assert_eq!(pick_body["overall_pick"], 1);
    assert_eq!(pick_body["draft_completed"], false);
}

#[tokio::test]
async fn pause_clears_deadline_and_resume_rearms_it() {
    let (base_url, _pool) = common::spawn_app().await;
    let client = common::create_client();

    let created: serde_json::Value = client
        .post(format!("{}/api/v1/drafts", base_url))
        .json(&two_team_payload(60))
        .send()
        .await
        .expect("create draft request failed")
        .json()
        .await
        .expect("invalid create draft response");
    let draft_id = created["id"].as_str().expect("draft id missing").to_string();

    client
        .post(format!("{}/api/v1/drafts/{}/start", base_url, draft_id))
        .send()
        .await
        .expect("start draft request failed");

    let paused: serde_json::Value = client
        .post(format!("{}/api/v1/drafts/{}/pause", base_url, draft_id))
        .send()
        .await
        .expect("pause draft request failed")
        .json()
        .await
        .expect("invalid pause draft response");
    assert_eq!(paused["status"], "paused");
    assert!(paused["next_deadline"].is_null());

    let resumed: serde_json::Value = client
        .post(format!("{}/api/v1/drafts/{}/resume", base_url, draft_id))
        .send()
        .await
        .expect("resume draft request failed")
        .json()
        .await
        .expect("invalid resume draft response");
    assert_eq!(resumed["status"], "in_progress");
    assert!(!resumed["next_deadline"].is_null());
}

#[tokio::test]
async fn concurrent_pick_attempts_on_same_slot_yield_exactly_one_winner() {
    let (base_url, _pool) = common::spawn_app().await;
    let client = common::create_client();

    let created: serde_json::Value = client
        .post(format!("{}/api/v1/drafts", base_url))
        .json(&two_team_payload(60))
        .send()
        .await
        .expect("create draft request failed")
        .json()
        .await
        .expect("invalid create draft response");
    let draft_id = created["id"].as_str().expect("draft id missing").to_string();

    client
        .post(format!("{}/api/v1/drafts/{}/start", base_url, draft_id))
        .send()
        .await
        .expect("start draft request failed");

    let next_pick: serde_json::Value = client
        .get(format!("{}/api/v1/drafts/{}/picks/next", base_url, draft_id))
        .send()
        .await
        .expect("next pick request failed")
        .json()
        .await
        .expect("invalid next pick response");
    let pick_id = next_pick["id"].as_str().expect("pick id missing").to_string();
    let team_id = next_pick["team_id"].as_str().expect("team id missing").to_string();

    let make_request = |player_id: Uuid| {
        let client = client.clone();
        let base_url = base_url.clone();
        let draft_id = draft_id.clone();
        let pick_id = pick_id.clone();
        let team_id = team_id.clone();
        async move {
            client
                .post(format!("{}/api/v1/drafts/{}/picks/make", base_url, draft_id))
                .timeout(Duration::from_secs(5))
                .json(&serde_json::json!({
                    "pick_id": pick_id,
                    "team_id": team_id,
                    "player_id": player_id,
                }))
                .send()
                .await
                .expect("make pick request failed")
                .status()
        }
    };

    let (first, second) = tokio::join!(make_request(Uuid::new_v4()), make_request(Uuid::new_v4()));

    let statuses = [first.as_u16(), second.as_u16()];
    let ok_count = statuses.iter().filter(|s| **s == 200).count();
    let conflict_count = statuses.iter().filter(|s| **s == 409).count();
    assert_eq!(ok_count, 1);
    assert_eq!(conflict_count, 1);
}
