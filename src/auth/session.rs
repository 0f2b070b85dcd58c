//! Server-side sessions and the signed cookie that points at them.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use super::repo::User;
use crate::config::SessionConfig;

pub const SESSION_COOKIE: &str = "wattboard_session";
const SESSION_ID_LEN: usize = 43;

/// Payload of the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,     // user id
    pub sid: String,  // session id
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
}

/// An authenticated request context: who is logged in, on which session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    user_id: i64,
    expires_at: OffsetDateTime,
}

/// Session id → user id bindings.
#[derive(Clone, Default)]
pub struct SessionStore {
    bindings: Arc<DashMap<String, Binding>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, user_id: i64, ttl: Duration) -> String {
        let sid: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        let expires_at = OffsetDateTime::now_utc() + ttl;
        self.bindings
            .insert(sid.clone(), Binding { user_id, expires_at });
        sid
    }

    /// The user bound to `sid`, dropping the binding if it has expired.
    pub fn resolve(&self, sid: &str) -> Option<i64> {
        let binding = *self.bindings.get(sid)?;
        if binding.expires_at <= OffsetDateTime::now_utc() {
            self.bindings.remove(sid);
            return None;
        }
        Some(binding.user_id)
    }

    /// Returns whether a binding was removed.
    pub fn unbind(&self, sid: &str) -> bool {
        self.bindings.remove(sid).is_some()
    }

    pub fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.bindings.len();
        self.bindings.retain(|_, b| b.expires_at > now);
        before - self.bindings.len()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Signing keys and cookie policy derived from [`SessionConfig`].
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
    cookie_secure: bool,
}

impl SessionKeys {
    pub fn new(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            cookie_secure: cfg.cookie_secure,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, user_id: i64, sid: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            sid: sid.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: (now + self.ttl).unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie_secure)
            .max_age(self.ttl)
            .build()
    }
}

/// Bind a fresh session to `user` and attach its cookie to `jar`.
pub fn login(
    store: &SessionStore,
    keys: &SessionKeys,
    jar: CookieJar,
    user: &User,
) -> anyhow::Result<(CookieJar, String)> {
    let sid = store.bind(user.id, keys.ttl());
    let token = match keys.sign(user.id, &sid) {
        Ok(t) => t,
        Err(e) => {
            store.unbind(&sid);
            return Err(e);
        }
    };
    info!(user_id = user.id, "session started");
    Ok((jar.add(keys.cookie(token)), sid))
}

/// Drop the binding named by the cookie (if any) and expire the cookie.
/// Safe to call with no session at all.
pub fn logout(store: &SessionStore, keys: &SessionKeys, jar: CookieJar) -> CookieJar {
    if let Some(claims) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| keys.verify(c.value()).ok())
    {
        if store.unbind(&claims.sid) {
            info!(user_id = claims.sub, "session ended");
        }
    }
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn keys() -> SessionKeys {
        SessionKeys::new(&AppConfig::for_tests("/tmp").session)
    }

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{id}"),
            password_hash: String::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn bound_sessions_resolve_until_unbound() {
        let store = SessionStore::new();
        let sid = store.bind(7, Duration::minutes(5));
        assert_eq!(sid.len(), SESSION_ID_LEN);
        assert_eq!(store.resolve(&sid), Some(7));
        assert!(store.unbind(&sid));
        assert_eq!(store.resolve(&sid), None);
        assert!(!store.unbind(&sid));
    }

    #[test]
    fn expired_bindings_do_not_resolve() {
        let store = SessionStore::new();
        let sid = store.bind(7, Duration::seconds(-1));
        assert_eq!(store.resolve(&sid), None);
        assert!(store.is_empty());

        store.bind(8, Duration::seconds(-1));
        store.bind(9, Duration::minutes(1));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = keys();
        let token = keys.sign(42, "abc").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.sid, "abc");
        assert_eq!(claims.iss, "wattboard-test");
    }

    #[test]
    fn verify_rejects_other_secret_or_issuer() {
        let token = keys().sign(42, "abc").unwrap();

        let mut cfg = AppConfig::for_tests("/tmp").session;
        cfg.secret = "a-completely-different-secret".into();
        assert!(SessionKeys::new(&cfg).verify(&token).is_err());

        let mut cfg = AppConfig::for_tests("/tmp").session;
        cfg.issuer = "someone-else".into();
        assert!(SessionKeys::new(&cfg).verify(&token).is_err());
    }

    #[test]
    fn login_then_logout_clears_binding_and_is_idempotent() {
        let store = SessionStore::new();
        let keys = keys();
        let (jar, sid) = login(&store, &keys, CookieJar::new(), &user(3)).unwrap();
        let cookie = jar.get(SESSION_COOKIE).expect("cookie set");
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(store.resolve(&sid), Some(3));

        let jar = logout(&store, &keys, jar);
        assert_eq!(store.resolve(&sid), None);
        assert!(jar.get(SESSION_COOKIE).is_none());

        let _ = logout(&store, &keys, jar);
        let _ = logout(&store, &keys, CookieJar::new());
        assert!(store.is_empty());
    }
}
