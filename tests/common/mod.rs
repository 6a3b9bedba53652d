#![allow(dead_code)]

use chantier::config::{ChantierConfig, ClientOptions};
use chantier::Chantier;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ANON_KEY: &str = "test_anon_key";
pub const SERVICE_KEY: &str = "test_service_key";
pub const ACCESS_TOKEN: &str = "test_access_token";

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub fn client(server: &MockServer) -> Chantier {
    let config = ChantierConfig::new(&server.uri(), ANON_KEY).unwrap();
    Chantier::new(config, ClientOptions::default()).unwrap()
}

pub fn admin_client(server: &MockServer) -> Chantier {
    let config = ChantierConfig::new(&server.uri(), ANON_KEY)
        .unwrap()
        .with_service_role_key(SERVICE_KEY);
    Chantier::new(config, ClientOptions::default().with_site_url("https://chantier.test")).unwrap()
}

pub fn user_json(id: &str, invited: bool, signed_in: bool) -> Value {
    let mut user = json!({
        "id": id,
        "email": format!("{}@chantier.test", id),
        "user_metadata": { "invited": invited },
    });
    if signed_in {
        user["last_sign_in_at"] = json!("2024-03-01T09:00:00Z");
    }
    user
}

pub fn profile_json(id: &str, user_id: &str, status: &str, role: &str) -> Value {
    json!({
        "id": id,
        "user_id": user_id,
        "email": format!("{}@chantier.test", user_id),
        "full_name": null,
        "role": role,
        "status": status,
        "requested_at": "2024-02-01T10:00:00Z",
        "approved_at": null,
        "rejection_reason": null
    })
}

pub fn project_json(id: &str, name: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "created_at": created_at
    })
}

pub fn membership_json(project: Value, role: &str) -> Value {
    json!({
        "project_id": project["id"].clone(),
        "role": role,
        "projects": project
    })
}

/// Password sign-in answering with a session for `user_id`
pub async fn mount_sign_in(server: &MockServer, user_id: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "test_refresh_token",
            "user": user_json(user_id, true, true)
        })))
        .mount(server)
        .await;
}

/// Profile lookup of `user_id` answering with `status`
pub async fn mount_profile(server: &MockServer, user_id: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_profiles"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([profile_json("profile-1", user_id, status, "user")])),
        )
        .mount(server)
        .await;
}

pub async fn mount_memberships(server: &MockServer, user_id: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/project_members"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

pub async fn mount_logout(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}
