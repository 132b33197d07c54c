#![allow(dead_code)]

use axum_test::TestServer;
use cradle_server::{identity::IdentityProvider, router, store::Store, AppState};
use serde_json::{json, Value};

pub const ADMIN_TOKEN: &str = "any-token-works-in-development";

pub fn dev_state() -> AppState {
    AppState::new(Store::in_memory().unwrap(), IdentityProvider::Development)
}

pub fn server(state: AppState) -> TestServer {
    TestServer::new(router(state)).unwrap()
}

pub fn dev_server() -> TestServer {
    server(dev_state())
}

pub fn application() -> Value {
    json!({
        "fullName": "Adaeze Okafor",
        "email": "Ada.Okafor@Example.com",
        "phone": "+234 803 123 4567",
        "gradeApplyingFor": "JSS 1",
        "parentName": "Chinedu Okafor",
        "message": "Looking forward to the entrance exam."
    })
}

pub fn inquiry() -> Value {
    json!({
        "name": "Tunde Bello",
        "email": "tunde@example.com",
        "subject": "School fees",
        "message": "Could you share the fee schedule for next term?"
    })
}
