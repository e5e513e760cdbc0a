mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use merge_or_reject::{
    config::AppConfig,
    dao::models::{Difficulty, Role},
    services::completion::CompletionClient,
    state::AppState,
};
use serde_json::json;
use uuid::Uuid;

use common::{CannedCompletion, TestApp};

#[tokio::test]
async fn healthcheck_reports_degraded_until_storage_is_installed() {
    let state = AppState::new(AppConfig::default(), None);
    let router = merge_or_reject::build_router(state.clone());
    let app = TestApp {
        router,
        state,
        store: merge_or_reject::dao::content_store::memory::MemoryContentStore::new(),
    };

    let (status, body) = app.send("GET", "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["generation_enabled"], false);

    let (status, _) = app.send("GET", "/languages", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    app.state
        .set_content_store(Arc::new(app.store.clone()))
        .await;
    let (_, body) = app.send("GET", "/healthcheck", None, None).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn anonymous_session_plays_to_completion_and_shares_result() {
    let app = TestApp::new().await;
    app.add_language("typescript").await;
    for index in 0..4 {
        app.add_snippet("typescript", Difficulty::Easy, index % 2 == 0)
            .await;
    }

    let (status, started) = app
        .send(
            "POST",
            "/sessions",
            None,
            Some(json!({ "language": "typescript", "level": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{started}");
    assert_eq!(started["total"], 3);
    assert_eq!(started["difficulty"], "easy");
    assert_eq!(started["time_limit_secs"], 60);
    let cards = started["snippets"].as_array().unwrap();
    assert_eq!(cards.len(), 3);
    assert!(cards.iter().all(|card| card.get("is_valid").is_none()));

    let session_id: Uuid = started["session_id"].as_str().unwrap().parse().unwrap();
    let key = app.answer_key(session_id).await;

    let (status, _) = app
        .send("POST", &format!("/sessions/{session_id}/finalize"), None, None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for (index, truth) in key.iter().enumerate() {
        // Answer the last one wrong.
        let claim = if index == key.len() - 1 { !truth } else { *truth };
        let (status, answer) = app
            .send(
                "POST",
                &format!("/sessions/{session_id}/answers"),
                None,
                Some(json!({ "claim": claim })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{answer}");
        assert_eq!(answer["is_valid"], *truth);
        assert_eq!(answer["answered"], index + 1);
    }

    let (status, _) = app
        .send(
            "POST",
            &format!("/sessions/{session_id}/answers"),
            None,
            Some(json!({ "claim": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, state) = app
        .send("GET", &format!("/sessions/{session_id}"), None, None)
        .await;
    assert_eq!(state["status"], "over");
    assert_eq!(state["score"], 2);

    let (status, finalized) = app
        .send("POST", &format!("/sessions/{session_id}/finalize"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finalized["score"], 2);
    let slug = finalized["share_slug"].as_str().unwrap().to_owned();
    assert!(slug.starts_with("typescript-easy-"));

    let (_, again) = app
        .send("POST", &format!("/sessions/{session_id}/finalize"), None, None)
        .await;
    assert_eq!(again["share_slug"], slug.as_str());

    let (status, shared) = app.send("GET", &format!("/results/{slug}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared["score"], 2);
    assert_eq!(shared["total"], 3);
    assert!(shared["player"].is_null());

    let (status, _) = app.send("GET", "/results/nope-easy-1234-abcdef", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signed_in_player_feeds_the_leaderboards() {
    let app = TestApp::new().await;
    app.add_language("rust").await;
    for _ in 0..3 {
        app.add_snippet("rust", Difficulty::Easy, true).await;
    }

    let (status, user) = app
        .send(
            "POST",
            "/users",
            Some("ferris"),
            Some(json!({ "display_name": "Ferris" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{user}");
    assert_eq!(user["role"], "user");

    let (_, started) = app
        .send(
            "POST",
            "/sessions",
            Some("ferris"),
            Some(json!({ "language": "rust", "level": 1 })),
        )
        .await;
    let session_id = started["session_id"].as_str().unwrap().to_owned();
    for _ in 0..3 {
        app.send(
            "POST",
            &format!("/sessions/{session_id}/answers"),
            Some("ferris"),
            Some(json!({ "claim": true })),
        )
        .await;
    }

    let (_, profile) = app.send("GET", "/users/me", Some("ferris"), None).await;
    assert_eq!(profile["user"]["total_games"], 1);
    assert_eq!(profile["stats"][0]["language"], "rust");
    assert_eq!(profile["stats"][0]["highest_score"], 3);

    let (status, board) = app.send("GET", "/leaderboard/rust", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["user_id"], "ferris");
    assert_eq!(board[0]["display_name"], "Ferris");
    assert_eq!(board[0]["rank"], 1);

    let (_, global) = app.send("GET", "/leaderboard?limit=5", None, None).await;
    assert_eq!(global.as_array().unwrap().len(), 1);
    assert_eq!(global[0]["average_score"], 3.0);

    let (status, _) = app.send("GET", "/leaderboard/cobol", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_requests_are_validated() {
    let app = TestApp::new().await;
    app.add_language("go").await;

    let (status, body) = app
        .send(
            "POST",
            "/sessions",
            None,
            Some(json!({ "language": "go", "level": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("level"), "{body}");

    let (status, body) = app
        .send(
            "POST",
            "/sessions",
            None,
            Some(json!({ "language": "Go!", "level": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, body) = app
        .send("POST", "/sessions", None, Some(json!({ "level": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    // Not enough snippets in the pool.
    let (status, body) = app
        .send(
            "POST",
            "/sessions",
            None,
            Some(json!({ "language": "go", "level": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());

    let (status, _) = app
        .send("GET", &format!("/sessions/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_answer_body_gets_a_json_error() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            "POST",
            &format!("/sessions/{}/answers", Uuid::new_v4()),
            None,
            Some(json!({ "claim": "merge" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string(), "{body}");
}

#[tokio::test]
async fn admin_routes_require_an_admin_caller() {
    let app = TestApp::new().await;
    app.add_user("player", Role::User).await;
    app.add_user("root", Role::Admin).await;

    let (status, _) = app.send("GET", "/admin/languages", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/admin/languages", Some("stranger"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/admin/languages", Some("player"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("GET", "/admin/languages", Some("root"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn admin_manages_catalogue_and_snippets() {
    let app = TestApp::new().await;
    app.add_user("root", Role::Admin).await;

    let (status, created) = app
        .send(
            "POST",
            "/admin/languages",
            Some("root"),
            Some(json!({ "language": "python" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{created}");
    assert_eq!(created["current_volume"], 1);

    let (status, _) = app
        .send(
            "POST",
            "/admin/languages",
            Some("root"),
            Some(json!({ "language": "python" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, snippet) = app
        .send(
            "POST",
            "/admin/snippets",
            Some("root"),
            Some(json!({
                "language": "python",
                "difficulty": "medium",
                "code": "print(1)",
                "is_valid": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{snippet}");
    assert_eq!(snippet["volume"], 1);
    let snippet_id = snippet["id"].as_str().unwrap().to_owned();

    let (_, languages) = app.send("GET", "/languages", None, None).await;
    assert_eq!(languages[0]["snippet_count"], 1);

    let (status, updated) = app
        .send(
            "PUT",
            &format!("/admin/snippets/{snippet_id}"),
            Some("root"),
            Some(json!({ "is_valid": false, "explanation": "off by one" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_valid"], false);
    assert_eq!(updated["code"], "print(1)");

    let (_, listed) = app
        .send("GET", "/admin/snippets?language=python", Some("root"), None)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/admin/snippets/{snippet_id}"),
            Some("root"),
            None,
        )
        .await;
    assert!(status.is_success());
    let (status, _) = app
        .send(
            "GET",
            &format!("/admin/snippets/{snippet_id}"),
            Some("root"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, paused) = app
        .send(
            "PUT",
            "/admin/languages/python/status",
            Some("root"),
            Some(json!({ "status": "paused" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paused["status"], "paused");
    let (_, languages) = app.send("GET", "/languages", None, None).await;
    assert_eq!(languages, json!([]));

    let (_, bumped) = app
        .send("POST", "/admin/languages/python/volume", Some("root"), None)
        .await;
    assert_eq!(bumped["current_volume"], 2);
    assert_eq!(bumped["snippet_count"], 0);
}

#[tokio::test]
async fn admin_generation_stores_the_returned_batch() {
    let reply = json!({
        "snippets": [
            { "code": "a", "isValid": true, "explanation": "fine" },
            { "code": "b", "isValid": false, "explanation": "typo" }
        ]
    });
    let completion: Arc<dyn CompletionClient> =
        Arc::new(CannedCompletion(format!("Sure!\n{reply}")));
    let app = TestApp::with_completion(Some(completion)).await;
    app.add_user("root", Role::Admin).await;
    app.add_language("kotlin").await;

    let (_, health) = app.send("GET", "/healthcheck", None, None).await;
    assert_eq!(health["generation_enabled"], true);

    let (status, body) = app
        .send(
            "POST",
            "/admin/generate",
            Some("root"),
            Some(json!({ "language": "kotlin", "difficulty": "hard", "count": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["inserted"], 2);
    assert_eq!(body["valid_requested"], 1);
    assert_eq!(body["invalid_requested"], 1);
    assert!(
        body["snippets"]
            .as_array()
            .unwrap()
            .iter()
            .all(|snippet| snippet["ai_generated"] == true && snippet["difficulty"] == "hard")
    );

    let (_, languages) = app.send("GET", "/admin/languages", Some("root"), None).await;
    assert_eq!(languages[0]["ai_generated_count"], 2);
    assert!(languages[0]["last_generated_at"].is_string());
}

#[tokio::test]
async fn generation_without_completion_service_is_a_bad_gateway() {
    let app = TestApp::new().await;
    app.add_user("root", Role::Admin).await;
    app.add_language("kotlin").await;

    let (status, _) = app
        .send(
            "POST",
            "/admin/generate",
            Some("root"),
            Some(json!({ "language": "kotlin", "difficulty": "easy", "count": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let (status, doc) = app.send("GET", "/api-doc/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/sessions/{id}/answers").is_some());
    assert!(doc["paths"].get("/admin/generate").is_some());
}
