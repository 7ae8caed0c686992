use serde_json::json;
use tempfile::TempDir;

use vibecheck::client::{ApiClient, AppStore};
use vibecheck::config::Config;
use vibecheck::state::AppState;
use vibecheck::{api, db};

/// Serve the API on an ephemeral port and return its action URL.
async fn spawn_server(dir: &TempDir) -> String {
    let mut config = Config::default();
    config.database.path = Some(dir.path().join("test.db"));
    config.uploads.path = Some(dir.path().join("uploads"));

    let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    let app = api::router(AppState { db: pool, config });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api.php", addr)
}

#[tokio::test]
async fn client_keeps_the_session_across_calls() {
    let dir = TempDir::new().unwrap();
    let client = ApiClient::new(&spawn_server(&dir).await).unwrap();

    let registered = client
        .register(&json!({ "email": "c@b.com", "password": "pw", "role": ["influencer"] }))
        .await;
    assert!(registered.success, "{:?}", registered.error);
    let user_id = registered.data.unwrap()["user_id"].as_i64().unwrap();

    // the cookie from register authorizes the dashboard call
    let dash = client.get_influencer_dashboard(user_id).await;
    assert!(dash.success, "{:?}", dash.error);
    assert_eq!(
        dash.data.unwrap()["monthly_breakdown"].as_array().unwrap().len(),
        4
    );

    let login = client.login("c@b.com", "pw").await;
    let mut store = AppStore::new();
    store.set_user(login.data.map(|d| d["user"].clone()));
    assert_eq!(store.active_role(), Some("curator"));
    assert!(store.is_dark_mode());

    let uploaded = client.upload_media("selfie.jpg", b"jpeg bytes".to_vec()).await;
    let media = uploaded.data.expect("upload failed");
    assert!(media.url.starts_with("http://127.0.0.1:"));
    assert!(media.url.contains("/uploads/selfie_"));
    assert_eq!(media.mime.as_deref(), Some("image/jpeg"));

    assert!(client.logout().await.success);
    let dash = client.get_influencer_dashboard(user_id).await;
    assert!(!dash.success);
}

#[tokio::test]
async fn server_errors_surface_as_messages() {
    let dir = TempDir::new().unwrap();
    let client = ApiClient::new(&spawn_server(&dir).await).unwrap();

    let login = client.login("nobody@b.com", "pw").await;
    assert!(!login.success);
    assert_eq!(login.error.as_deref(), Some("Invalid credentials"));

    let deleted = client.delete_campaign(99).await;
    assert!(!deleted.success);
}
