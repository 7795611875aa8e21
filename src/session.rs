//! Server-side sessions and the sign-in gate.
//!
//! A session is an opaque random id carried in a cookie, pointing at a record
//! in process memory that holds at most a signed-in identity and a one-shot
//! flash message. Records expire after an idle TTL; an expired id is treated
//! as unknown and the client is handed a fresh anonymous session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue};
use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Flash shown when a gated route is hit without a signed-in identity.
pub const SIGN_IN_REQUIRED: &str = "You must be signed in to do that.";

/// Contents of one session record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub identity: Option<String>,
    pub flash: Option<String>,
}

#[derive(Debug)]
struct SessionEntry {
    data: SessionData,
    expires_at: Instant,
}

/// Session id resolved for one request. `fresh` is set when the id was minted
/// for this request and the response must carry a `Set-Cookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    pub id: String,
    pub fresh: bool,
}

/// Outcome of [`SessionStore::require_signed_in`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Authorized(String),
    Denied,
}

fn gen_id() -> AppResult<String> {
    gen_id_from(getrandom::getrandom)
}

/// 256-bit random id, base64url without padding. An RNG failure is an error,
/// never a zeroed id.
fn gen_id_from(fill: impl FnOnce(&mut [u8]) -> Result<(), getrandom::Error>) -> AppResult<String> {
    let mut buf = [0u8; 32];
    fill(&mut buf).map_err(|e| AppError::internal(format!("session id generation failed: {e}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
    cookie_name: String,
    secure_cookie: bool,
}

impl SessionStore {
    pub fn new(ttl: Duration, cookie_name: impl Into<String>, secure_cookie: bool) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            cookie_name: cookie_name.into(),
            secure_cookie,
        }
    }

    pub fn cookie_name(&self) -> &str { &self.cookie_name }

    /// Mint a new empty session and return its id.
    pub fn create(&self) -> AppResult<String> {
        self.insert_new(SessionData::default())
    }

    /// Store `data` under a freshly generated id. An id that is already taken
    /// is refused rather than overwritten.
    fn insert_new(&self, data: SessionData) -> AppResult<String> {
        let sid = gen_id()?;
        let entry = SessionEntry { data, expires_at: Instant::now() + self.ttl };
        match self.sessions.write().entry(sid.clone()) {
            std::collections::hash_map::Entry::Occupied(_) => {
                return Err(AppError::internal("session id collision"));
            }
            std::collections::hash_map::Entry::Vacant(v) => { v.insert(entry); }
        }
        debug!(target: "flatcms::session", "session.create ttl_secs={}", self.ttl.as_secs());
        Ok(sid)
    }

    /// True if `sid` names a live record. Expired records are dropped on the way.
    fn is_live(&self, sid: &str) -> bool {
        let now = Instant::now();
        let expired = match self.sessions.read().get(sid) {
            Some(ent) if ent.expires_at > now => return true,
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.write().remove(sid);
            debug!(target: "flatcms::session", "session.expired");
        }
        false
    }

    /// Find the session for a request, minting one if the cookie is absent,
    /// unknown or expired.
    pub fn resolve(&self, headers: &HeaderMap) -> AppResult<SessionId> {
        if let Some(sid) = parse_cookie(headers, &self.cookie_name) {
            if self.is_live(&sid) {
                return Ok(SessionId { id: sid, fresh: false });
            }
        }
        Ok(SessionId { id: self.create()?, fresh: true })
    }

    /// Run `f` against the record for `sid`, creating it if needed and pushing
    /// its expiry out by one TTL.
    fn with_entry<R>(&self, sid: &str, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut map = self.sessions.write();
        let expires_at = Instant::now() + self.ttl;
        let entry = map
            .entry(sid.to_string())
            .or_insert_with(|| SessionEntry { data: SessionData::default(), expires_at });
        entry.expires_at = expires_at;
        f(&mut entry.data)
    }

    /// Snapshot of a record without consuming the flash.
    pub fn get(&self, sid: &str) -> Option<SessionData> {
        if !self.is_live(sid) { return None; }
        self.sessions.read().get(sid).map(|e| e.data.clone())
    }

    pub fn identity(&self, sid: &str) -> Option<String> {
        self.get(sid).and_then(|d| d.identity)
    }

    pub fn is_signed_in(&self, sid: &str) -> bool {
        self.identity(sid).is_some_and(|u| !u.is_empty())
    }

    pub fn require_signed_in(&self, sid: &str) -> Access {
        match self.identity(sid) {
            Some(user) if !user.is_empty() => Access::Authorized(user),
            _ => Access::Denied,
        }
    }

    /// Record `username` as signed in. The record moves to a new id, which is
    /// returned; the old id stops resolving.
    pub fn sign_in(&self, sid: &str, username: &str) -> AppResult<String> {
        let mut data = self.sessions.write().remove(sid).map(|e| e.data).unwrap_or_default();
        data.identity = Some(username.to_string());
        let new_sid = self.insert_new(data)?;
        debug!(target: "flatcms::session", "session.sign_in user={} rotated=true", username);
        Ok(new_sid)
    }

    pub fn sign_out(&self, sid: &str) {
        let prev = self.with_entry(sid, |d| d.identity.take());
        debug!(target: "flatcms::session", "session.sign_out user={:?}", prev);
    }

    /// Replace the pending flash message.
    pub fn set_flash(&self, sid: &str, message: impl Into<String>) {
        let message = message.into();
        self.with_entry(sid, |d| d.flash = Some(message));
    }

    /// Return the pending flash message once, clearing it.
    pub fn take_flash(&self, sid: &str) -> Option<String> {
        if !self.is_live(sid) { return None; }
        self.with_entry(sid, |d| d.flash.take())
    }

    /// Drop every expired record; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.sessions.write();
        let before = map.len();
        map.retain(|_, e| e.expires_at > now);
        before - map.len()
    }

    pub fn set_cookie_header(&self, sid: &str) -> HeaderValue {
        let secure = if self.secure_cookie { "; Secure" } else { "" };
        // ids are base64url and the cookie name comes from config, both header-safe
        HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Lax; Path=/{}", self.cookie_name, sid, secure))
            .unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(axum::http::header::COOKIE) {
        let Ok(s) = value.to_str() else { continue };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}
