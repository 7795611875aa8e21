//! Route handlers. Each one resolves the caller's session, runs the gate where
//! the route is privileged, delegates to a store and answers with a page or a
//! redirect home. User-facing failures travel through the flash message.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::views::{DocumentBody, EditBody, IndexBody, NewBody, Page, SigninBody};
use super::AppState;
use crate::documents::{render, Rendered};
use crate::error::{AppError, AppResult};
use crate::session::{Access, SessionId, SIGN_IN_REQUIRED};

const HTML: &str = "text/html; charset=utf-8";
const PLAIN_UTF8: &str = "text/plain; charset=utf-8";
const PLAIN: &str = "text/plain";

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    #[serde(default)]
    filename: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    #[serde(default)]
    new_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Attach the session cookie when the id was minted for this request.
fn with_cookie(state: &AppState, sid: &SessionId, mut resp: Response) -> Response {
    if sid.fresh {
        resp.headers_mut().append(header::SET_COOKIE, state.sessions.set_cookie_header(&sid.id));
    }
    resp
}

fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, HeaderValue::from_static("/"))]).into_response()
}

/// Set a flash and send the caller home.
fn flash_home(state: &AppState, sid: &SessionId, message: impl Into<String>) -> Response {
    state.sessions.set_flash(&sid.id, message);
    with_cookie(state, sid, redirect_home())
}

/// Render a full page, consuming any pending flash.
fn page<T: Serialize>(state: &AppState, sid: &SessionId, status: StatusCode, template: &str, body: T) -> AppResult<Response> {
    let page = Page {
        flash: state.sessions.take_flash(&sid.id),
        identity: state.sessions.identity(&sid.id),
        body,
    };
    let html = state.views.render(template, &page)?;
    Ok(with_cookie(state, sid, (status, [(header::CONTENT_TYPE, HTML)], html).into_response()))
}

/// Gate for privileged routes: the signed-in user, or `Unauthorized`.
fn require_signed_in(state: &AppState, sid: &SessionId) -> AppResult<String> {
    match state.sessions.require_signed_in(&sid.id) {
        Access::Authorized(user) => Ok(user),
        Access::Denied => Err(AppError::unauthorized(SIGN_IN_REQUIRED)),
    }
}

/// Unwrap a form extracted after the gate, so a malformed body can never
/// short-circuit the sign-in check.
fn form_or_reject<T>(state: &AppState, sid: &SessionId, form: Result<Form<T>, FormRejection>) -> Result<T, Response> {
    form.map(|Form(f)| f).map_err(|rej| with_cookie(state, sid, rej.into_response()))
}

/// Run the gate; an unauthorized caller is flashed and sent home before the
/// handler body runs.
macro_rules! gate {
    ($state:expr, $sid:expr) => {
        match require_signed_in(&$state, &$sid) {
            Ok(user) => user,
            Err(AppError::Unauthorized(msg)) => return Ok(flash_home(&$state, &$sid, msg)),
            Err(e) => return Err(e),
        }
    };
}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    let documents = state.documents.list()?;
    page(&state, &sid, StatusCode::OK, "index.html", IndexBody { documents })
}

pub async fn new_document(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    gate!(state, sid);
    page(&state, &sid, StatusCode::OK, "new.html", NewBody::default())
}

pub async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<CreateForm>, FormRejection>,
) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    let user = gate!(state, sid);
    let form = match form_or_reject(&state, &sid, form) {
        Ok(f) => f,
        Err(resp) => return Ok(resp),
    };
    match state.documents.create(&form.filename, "") {
        Ok(()) => {
            info!(target: "flatcms::server", user = %user, "created document '{}'", form.filename);
            Ok(flash_home(&state, &sid, format!("{} was created.", form.filename)))
        }
        Err(AppError::Validation(msg)) => {
            let body = NewBody { filename: form.filename, error: Some(msg) };
            page(&state, &sid, StatusCode::UNPROCESSABLE_ENTITY, "new.html", body)
        }
        Err(e) => Err(e),
    }
}

pub async fn signin_form(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    page(&state, &sid, StatusCode::OK, "signin.html", SigninBody::default())
}

pub async fn signin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SigninForm>,
) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    // A missing or corrupt credential file fails the request here.
    if state.credentials.authenticate(&form.username, &form.password)? {
        // New id on privilege change; the caller gets a fresh cookie.
        let sid = SessionId { id: state.sessions.sign_in(&sid.id, &form.username)?, fresh: true };
        info!(target: "flatcms::server", "signed in '{}'", form.username);
        return Ok(flash_home(&state, &sid, "Welcome!"));
    }
    state.sessions.set_flash(&sid.id, "Invalid Credentials");
    page(&state, &sid, StatusCode::UNPROCESSABLE_ENTITY, "signin.html", SigninBody::default())
}

pub async fn signout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    state.sessions.sign_out(&sid.id);
    Ok(flash_home(&state, &sid, "You have been signed out."))
}

pub async fn show_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    let doc = match state.documents.read(&name) {
        Ok(doc) => doc,
        Err(e @ AppError::NotFound(_)) => return Ok(flash_home(&state, &sid, e.to_string())),
        Err(e) => return Err(e),
    };
    match render(&doc.content, doc.kind) {
        Rendered::Html(html) => page(&state, &sid, StatusCode::OK, "document.html", DocumentBody { name: doc.name, html }),
        Rendered::PlainText(bytes) => {
            // Served as stored; only claim a charset when the bytes are UTF-8.
            let content_type = if std::str::from_utf8(&bytes).is_ok() { PLAIN_UTF8 } else { PLAIN };
            Ok(with_cookie(&state, &sid, (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()))
        }
    }
}

pub async fn edit_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    gate!(state, sid);
    match state.documents.read(&name) {
        Ok(doc) => {
            let content = doc.text().into_owned();
            page(&state, &sid, StatusCode::OK, "edit.html", EditBody { name: doc.name, content })
        }
        Err(e @ AppError::NotFound(_)) => Ok(flash_home(&state, &sid, e.to_string())),
        Err(e) => Err(e),
    }
}

pub async fn update_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    form: Result<Form<UpdateForm>, FormRejection>,
) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    let user = gate!(state, sid);
    let form = match form_or_reject(&state, &sid, form) {
        Ok(f) => f,
        Err(resp) => return Ok(resp),
    };
    match state.documents.update(&name, &form.new_text) {
        Ok(()) => {
            info!(target: "flatcms::server", user = %user, "updated document '{}'", name);
            Ok(flash_home(&state, &sid, format!("{name} has been updated.")))
        }
        Err(e @ AppError::NotFound(_)) => Ok(flash_home(&state, &sid, e.to_string())),
        Err(e) => Err(e),
    }
}

pub async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let sid = state.sessions.resolve(&headers)?;
    let user = gate!(state, sid);
    match state.documents.delete(&name) {
        Ok(()) => {
            info!(target: "flatcms::server", user = %user, "deleted document '{}'", name);
            Ok(flash_home(&state, &sid, format!("{name} has been deleted.")))
        }
        Err(AppError::NotFound(_)) => Ok(flash_home(&state, &sid, format!("{name} does not exist."))),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn state() -> (tempfile::TempDir, AppState) {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: tmp.path().join("data"),
            credentials_path: tmp.path().join("users.yaml"),
            ..ServerConfig::default()
        };
        let state = AppState::from_config(&config).unwrap();
        (tmp, state)
    }

    #[test]
    fn gate_denies_anonymous_as_unauthorized() {
        let (_tmp, state) = state();
        let sid = state.sessions.resolve(&HeaderMap::new()).unwrap();
        let err = require_signed_in(&state, &sid).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == SIGN_IN_REQUIRED));
    }

    #[test]
    fn gate_admits_signed_in_user() {
        let (_tmp, state) = state();
        let sid = state.sessions.resolve(&HeaderMap::new()).unwrap();
        let sid = SessionId { id: state.sessions.sign_in(&sid.id, "admin").unwrap(), fresh: false };
        assert_eq!(require_signed_in(&state, &sid).unwrap(), "admin");
    }

    #[tokio::test]
    async fn denied_gate_redirects_with_flash() {
        let (_tmp, state) = state();
        let resp = new_document(State(state.clone()), HeaderMap::new()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "/");
        let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        let sid = cookie.split(';').next().unwrap().split_once('=').unwrap().1;
        assert_eq!(state.sessions.take_flash(sid).as_deref(), Some(SIGN_IN_REQUIRED));
    }
}
