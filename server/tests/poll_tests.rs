mod support;

use actix_web::{http::StatusCode, test, App};
use poll_server::{
    config::TokenCarrier,
    error::GENERIC_ERROR_MESSAGE,
    store::{MemoryStore, StoreCall},
};
use serde_json::json;

fn polls() -> MemoryStore {
    MemoryStore::new()
        .with_row(
            "polls",
            json!({
                "id": 7,
                "created_by": "alice",
                "title": "Lunch",
                "description": "Where to?",
                "options": ["Tacos", "Pho"],
            }),
        )
        .with_procedure(
            "polloptioncounts",
            json!([{ "optionid": 0, "count": 3 }, { "optionid": 1, "count": 1 }]),
        )
        .with_procedure("pollsICreated", json!([{ "id": 7, "title": "Lunch" }]))
        .with_procedure("getPollsIParticipatedIn", json!([]))
        .with_procedure("mostPopularPolls", json!([{ "id": 7, "votes": 4 }]))
}

#[actix_web::test]
async fn test_poll_details_found() {
    let store = polls();
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/poll-details?pollid=7")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["poll"]["title"], "Lunch");
    assert_eq!(body["poll"]["created_by"], "alice");
    assert_eq!(body["option_votes"][0]["count"], 3);

    assert!(store.calls().contains(&StoreCall::Rpc {
        function: "polloptioncounts".to_string(),
        args: json!({ "pid": "7" }),
    }));
}

#[actix_web::test]
async fn test_poll_details_missing_or_unknown() {
    let store = polls();
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = test::TestRequest::get().uri("/poll-details").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "pollid is required");
    assert_eq!(store.call_count(), 0);

    let req = test::TestRequest::get()
        .uri("/poll-details?pollid=999")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Poll not found");
}

#[actix_web::test]
async fn test_create_poll_takes_owner_from_session() {
    let store = MemoryStore::new();
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = support::authed(test::TestRequest::post().uri("/create-poll"), "alice")
        .set_json(json!({
            "title": "Best editor",
            "description": "Be honest",
            "options": ["vim", "emacs"],
            "created_by": "mallory",
            "id": 1234,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Poll created successfully");

    let rows = store.rows("polls");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["created_by"], "alice");
    assert_eq!(rows[0]["title"], "Best editor");
    assert_ne!(rows[0]["id"], 1234);
}

#[actix_web::test]
async fn test_create_poll_validation() {
    let store = MemoryStore::new();
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = support::authed(test::TestRequest::post().uri("/create-poll"), "alice")
        .set_json(json!({ "title": "No options", "options": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = support::authed(test::TestRequest::post().uri("/create-poll"), "alice")
        .set_json(json!({ "description": "missing title" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(store.call_count(), 0);
}

#[actix_web::test]
async fn test_listings_call_their_procedures() {
    let store = polls();
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = support::authed(test::TestRequest::get().uri("/my-polls"), "alice").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body[0]["title"], "Lunch");

    let req = support::authed(test::TestRequest::get().uri("/polls-i-participated-in"), "alice")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([]));

    let req = test::TestRequest::get()
        .uri("/most-popular-polls")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body[0]["votes"], 4);

    let calls = store.calls();
    assert!(calls.contains(&StoreCall::Rpc {
        function: "pollsICreated".to_string(),
        args: json!({ "uname": "alice" }),
    }));
    assert!(calls.contains(&StoreCall::Rpc {
        function: "getPollsIParticipatedIn".to_string(),
        args: json!({ "uname": "alice" }),
    }));
    assert!(calls.contains(&StoreCall::Rpc {
        function: "mostPopularPolls".to_string(),
        args: json!({}),
    }));
}

#[actix_web::test]
async fn test_my_polls_requires_session() {
    let store = polls();
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = test::TestRequest::get().uri("/my-polls").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.call_count(), 0);
}

#[actix_web::test]
async fn test_read_csrf_only_when_enabled() {
    let store = polls();
    let mut auth = support::settings(TokenCarrier::Cookie);
    auth.csrf_protect_reads = true;
    let app = test::init_service(App::new().configure(support::configure(&store, auth))).await;

    let req = test::TestRequest::get()
        .uri("/my-polls")
        .cookie(actix_web::cookie::Cookie::new(
            poll_protocol::SESSION_COOKIE,
            support::session_token("alice"),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.call_count(), 0);

    let req = support::authed(test::TestRequest::get().uri("/my-polls"), "alice").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_store_outage_is_generic_500() {
    let store = polls();
    store.set_unavailable(true);
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/most-popular-polls")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
}

#[actix_web::test]
async fn test_poll_details_with_null_description() {
    let store = MemoryStore::new()
        .with_row(
            "polls",
            json!({
                "id": 8,
                "created_by": "bob",
                "title": "No blurb",
                "description": null,
                "options": ["a", "b"],
            }),
        )
        .with_procedure("polloptioncounts", json!([]));
    let app = test::init_service(
        App::new().configure(support::configure(&store, support::settings(TokenCarrier::Cookie))),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/poll-details?pollid=8")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["poll"]["title"], "No blurb");
    assert_eq!(body["poll"]["description"], "");
}
