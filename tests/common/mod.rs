use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use tower::ServiceExt;
use wattboard::config::AppConfig;
use wattboard::storage::{LocalStorage, StorageClient};
use wattboard::{build_app, db, AppState};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub plots_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.plots_dir);
    }
}

/// App over a fresh in-memory database and a throwaway plots directory.
pub async fn test_app() -> TestApp {
    let plots_dir = std::env::temp_dir().join(format!("wattboard-it-{}", uuid::Uuid::new_v4()));
    let config = AppConfig::for_tests(plots_dir.clone());

    let pool = db::connect(&config.database_url).await.expect("memory db");
    db::migrate(&pool).await.expect("migrations");
    let storage = Arc::new(LocalStorage::new(plots_dir.clone())) as Arc<dyn StorageClient>;
    let state = AppState::from_parts(pool, Arc::new(config), storage);

    TestApp {
        router: build_app(state.clone()),
        state,
        plots_dir,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().method("GET").uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.router
            .clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, body: &str) -> Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn register(&self, username: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/register",
            &format!("username={username}&password={password}&password2={password}"),
        )
        .await
    }

    /// Logs in and returns the `name=value` pair of the session cookie.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_form("/login", &format!("username={username}&password={password}"))
            .await;
        assert_eq!(location(&res), Some("/dashboard".to_string()), "login failed");
        find_cookie(&res, "wattboard_session").expect("session cookie")
    }

    #[allow(dead_code)]
    pub async fn rows_for(&self, username: &str) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM energy_data e JOIN users u ON u.id = e.user_id WHERE u.username = ?",
        )
        .bind(username)
        .fetch_one(&self.state.db)
        .await
        .unwrap()
    }

    pub async fn total_rows(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM energy_data")
            .fetch_one(&self.state.db)
            .await
            .unwrap()
    }

    #[allow(dead_code)]
    pub async fn user_id(&self, username: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.state.db)
            .await
            .unwrap()
    }

    #[allow(dead_code)]
    pub fn artifact_path(&self, owner_id: i64) -> PathBuf {
        self.plots_dir.join(owner_id.to_string()).join("energy_usage.png")
    }
}

pub fn location(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

/// The `name=value` part of the Set-Cookie header for `name`, if any.
pub fn find_cookie(res: &Response<Body>, name: &str) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(|v| v.split(';').next().unwrap().to_string())
}

pub async fn body_bytes(res: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(res.into_body(), 4 << 20)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_string(res: Response<Body>) -> String {
    String::from_utf8(body_bytes(res).await).unwrap()
}
