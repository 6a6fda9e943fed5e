use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use umacred::authz::HttpAuthorizationServer;
use umacred::config::Config;
use umacred::credentials::CredentialServices;
use umacred::store::MemoryCredentialStore;

#[allow(dead_code)]
pub const DB: &str = "resource-server";
#[allow(dead_code)]
pub const COLL: &str = "credentials";

#[allow(dead_code)]
pub const AUTHENTICATE_PATH: &str = "/openam/json/realms/root/authenticate";
#[allow(dead_code)]
pub const SESSIONS_PATH: &str = "/openam/json/realms/root/sessions";
#[allow(dead_code)]
pub const AUTHORIZE_PATH: &str = "/openam/oauth2/realms/root/authorize";
#[allow(dead_code)]
pub const TOKEN_PATH: &str = "/openam/oauth2/realms/root/access_token";
#[allow(dead_code)]
pub const TOKENINFO_PATH: &str = "/openam/oauth2/realms/root/tokeninfo";

/// Configuration pointing at `base_url` with the AS mounted under `/openam`.
#[allow(dead_code)]
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.authorization_server.base_url = format!("{base_url}/openam");
    config.authorization_server.admin.user = "amadmin".to_string();
    config.authorization_server.admin.password = "password".to_string();
    config.client.client_id = "rs-client".to_string();
    config.client.client_secret = "rs-secret".to_string();
    config.client.redirect_uri = "https://rs.example.com/redirect".to_string();
    config
}

/// Base URI of a local port with nothing listening on it.
#[allow(dead_code)]
pub fn unreachable_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind a local port");
    let port = listener
        .local_addr()
        .expect("failed to read the bound address")
        .port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Memory store plus services talking HTTP to `server`.
#[allow(dead_code)]
pub fn services_for(server: &MockServer) -> (Arc<MemoryCredentialStore>, CredentialServices) {
    services_with(test_config(&server.uri()))
}

#[allow(dead_code)]
pub fn services_with(config: Config) -> (Arc<MemoryCredentialStore>, CredentialServices) {
    let store = Arc::new(MemoryCredentialStore::new());
    let authz = HttpAuthorizationServer::new(&config.authorization_server)
        .expect("failed to build authorization server client");
    let services = CredentialServices::new(store.clone(), Arc::new(authz), &config)
        .expect("failed to build credential services");
    (store, services)
}

#[allow(dead_code)]
pub fn seed_credential(
    store: &MemoryCredentialStore,
    uid: &str,
    owner: &str,
    category: &str,
    credential: Value,
) {
    store.insert_raw(
        DB,
        COLL,
        uid,
        json!({"owner": owner, "category": category, "credential": credential}),
    );
}

/// Documents stored for `(owner, category)`.
#[allow(dead_code)]
pub fn documents_for(store: &MemoryCredentialStore, owner: &str, category: &str) -> Vec<(String, Value)> {
    store
        .documents(DB, COLL)
        .into_iter()
        .filter(|(_, data)| data["owner"] == owner && data["category"] == category)
        .collect()
}

#[allow(dead_code)]
pub async fn mount_authenticate(server: &MockServer, token_id: &str) {
    Mock::given(method("POST"))
        .and(path(AUTHENTICATE_PATH))
        .and(header("X-OpenAM-Username", "amadmin"))
        .and(header("X-OpenAM-Password", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tokenId": token_id,
            "successUrl": "/openam/console",
            "realm": "/"
        })))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_session(server: &MockServer, token: &str, valid: bool, uid: &str) {
    Mock::given(method("POST"))
        .and(path(SESSIONS_PATH))
        .and(query_param("_action", "validate"))
        .and(header("iPlanetDirectoryPro", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": valid,
            "uid": uid,
            "realm": "/",
            "sessionUid": format!("session-{token}")
        })))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_authorize_redirect(server: &MockServer, location: &str) {
    Mock::given(method("POST"))
        .and(path(AUTHORIZE_PATH))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_code_exchange(server: &MockServer, code: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "refresh_token": format!("refresh-{access_token}"),
            "scope": "uma_protection",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_tokeninfo(server: &MockServer, access_token: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(TOKENINFO_PATH))
        .and(header("Authorization", format!("Bearer {access_token}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "access_token": access_token,
            "scope": ["uma_protection"]
        })))
        .mount(server)
        .await;
}
