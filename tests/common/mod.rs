#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use foodhive::{
    ServerConfig,
    auth::RefreshRotation,
    create_app,
    db::{Database, StoreGate},
    jwt::JwtConfig,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-that-is-long-enough";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-that-is-long-enough";

pub struct TestApp {
    pub app: Router,
    pub jwt: JwtConfig,
    pub store: StoreGate,
}

pub async fn setup() -> TestApp {
    TestSetup::new().build().await
}

/// Builder for test setup with various options
pub struct TestSetup {
    is_production: bool,
    rotation: RefreshRotation,
    with_store: bool,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            is_production: false,
            rotation: RefreshRotation::Disabled,
            with_store: true,
        }
    }

    pub fn production(mut self) -> Self {
        self.is_production = true;
        self
    }

    pub fn with_rotation(mut self) -> Self {
        self.rotation = RefreshRotation::Reissue;
        self
    }

    /// Leave the store gate empty, as if the database never came up.
    pub fn without_store(mut self) -> Self {
        self.with_store = false;
        self
    }

    pub async fn build(self) -> TestApp {
        let store = if self.with_store {
            let db = Database::open(":memory:")
                .await
                .expect("Failed to open test database");
            StoreGate::with_database(db)
        } else {
            StoreGate::pending()
        };

        let config = ServerConfig {
            store: store.clone(),
            access_secret: ACCESS_SECRET.to_vec(),
            refresh_secret: REFRESH_SECRET.to_vec(),
            is_production: self.is_production,
            allowed_origins: vec![],
            refresh_rotation: self.rotation,
        };

        TestApp {
            app: create_app(&config),
            jwt: JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET),
            store,
        }
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    /// POST /jwt with `claims` and return a jar holding the session cookies.
    pub async fn login(&self, claims: Value) -> CookieJar {
        let response = self.send(json_request("POST", "/jwt", None, claims)).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let mut jar = CookieJar::default();
        jar.apply(&response);
        jar
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// The Set-Cookie header for `name`, if any.
pub fn find_set_cookie<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    cookies
        .iter()
        .find(|c| c.starts_with(&prefix))
        .map(|c| c.as_str())
}

/// The token stored by a `name=token; ...` Set-Cookie header.
pub fn set_cookie_value(set_cookie: &str) -> &str {
    let pair = set_cookie.split(';').next().unwrap();
    pair.split_once('=').unwrap().1
}

/// Minimal browser cookie store: keeps what Set-Cookie sets, drops what
/// it expires with `Max-Age=0`.
#[derive(Debug, Default, Clone)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn apply(&mut self, response: &Response<Body>) {
        for set_cookie in extract_set_cookies(response) {
            let pair = set_cookie.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            if set_cookie.contains("Max-Age=0") || value.is_empty() {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|v| v.as_str())
    }

    /// `Cookie` header value, or None when the jar is empty.
    pub fn header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
