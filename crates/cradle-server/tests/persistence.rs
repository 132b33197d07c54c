mod common;

use axum::http::StatusCode;
use common::{application, server, ADMIN_TOKEN};
use cradle_server::{identity::IdentityProvider, store::Store, AppState, DB_FILE};
use serde_json::Value;

#[tokio::test]
async fn records_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join(DB_FILE);

    let id = {
        let server = server(AppState::new(
            Store::open(&db).unwrap(),
            IdentityProvider::Development,
        ));
        let res = server.post("/api/applications/submit").json(&application()).await;
        res.assert_status(StatusCode::CREATED);
        res.json::<Value>()["data"]["id"].as_str().unwrap().to_string()
    };

    let server = server(AppState::new(
        Store::open(&db).unwrap(),
        IdentityProvider::Development,
    ));
    let stored: Value = server
        .get(&format!("/api/applications/{id}"))
        .authorization_bearer(ADMIN_TOKEN)
        .await
        .json();
    assert_eq!(stored["data"]["fullName"], "Adaeze Okafor");

    // Launch posts are written once, not on every open.
    let posts: Value = server.get("/api/blog").await.json();
    assert_eq!(posts["count"], 2);

    let next: Value = server
        .post("/api/applications/submit")
        .json(&application())
        .await
        .json();
    let next_id: i64 = next["data"]["id"].as_str().unwrap().parse().unwrap();
    assert!(next_id > id.parse::<i64>().unwrap());
}
