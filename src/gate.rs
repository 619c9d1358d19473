use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cookie::Cookie;
use tracing::debug;

/// Paths reachable without a session.
const PUBLIC_PATHS: [&str; 5] = [
    "/login",
    "/signup",
    "/verifyemail",
    "/forgot-password",
    "/reset-password",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToProfile,
    RedirectToLogin,
}

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Whether the gate's route pattern set covers this path at all.
/// API and health endpoints are not navigable pages and pass through.
fn is_gated(path: &str) -> bool {
    path == "/" || path == "/profile" || path.starts_with("/profile/") || is_public(path)
}

/// Pure per-request decision. Presence of the session cookie is the only
/// input; the token itself is never validated here (the `/me` extractor
/// does that) -- intentional parity with the behavior callers rely on.
pub fn decide(path: &str, token_present: bool) -> GateDecision {
    if !is_gated(path) {
        return GateDecision::Allow;
    }
    match (is_public(path), token_present) {
        (true, true) => GateDecision::RedirectToProfile,
        (false, false) => GateDecision::RedirectToLogin,
        _ => GateDecision::Allow,
    }
}

/// Reads the session cookie value, if any.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        if let Ok(parsed) = Cookie::parse(part.trim().to_string()) {
            if parsed.name() == "token" {
                return Some(parsed.value().to_string());
            }
        }
    }
    None
}

pub async fn session_gate(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let token_present = session_token(req.headers()).is_some_and(|t| !t.is_empty());

    match decide(&path, token_present) {
        GateDecision::Allow => next.run(req).await,
        GateDecision::RedirectToProfile => {
            debug!(%path, "session present on public path, redirecting to /profile");
            Redirect::temporary("/profile").into_response()
        }
        GateDecision::RedirectToLogin => {
            debug!(%path, "no session on private path, redirecting to /login");
            Redirect::temporary("/login").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn public_path_with_token_redirects_to_profile() {
        assert_eq!(decide("/login", true), GateDecision::RedirectToProfile);
        assert_eq!(decide("/signup", true), GateDecision::RedirectToProfile);
        assert_eq!(decide("/reset-password", true), GateDecision::RedirectToProfile);
    }

    #[test]
    fn public_path_without_token_is_allowed() {
        for path in ["/login", "/signup", "/verifyemail", "/forgot-password", "/reset-password"] {
            assert_eq!(decide(path, false), GateDecision::Allow);
        }
    }

    #[test]
    fn private_path_without_token_redirects_to_login() {
        assert_eq!(decide("/", false), GateDecision::RedirectToLogin);
        assert_eq!(decide("/profile", false), GateDecision::RedirectToLogin);
        assert_eq!(decide("/profile/42", false), GateDecision::RedirectToLogin);
    }

    #[test]
    fn private_path_with_token_is_allowed() {
        assert_eq!(decide("/profile", true), GateDecision::Allow);
        assert_eq!(decide("/profile/42", true), GateDecision::Allow);
    }

    #[test]
    fn ungated_paths_pass_through() {
        assert_eq!(decide("/api/users/signup", false), GateDecision::Allow);
        assert_eq!(decide("/api/users/signup", true), GateDecision::Allow);
        assert_eq!(decide("/api/health", false), GateDecision::Allow);
    }

    #[test]
    fn session_token_reads_the_token_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "other=1; token=abc; theme=dark".parse().unwrap(),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));

        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::COOKIE, "token=".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some(""));

        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    fn gated_app() -> Router {
        Router::new()
            .route("/login", get(|| async { "login page" }))
            .route("/profile", get(|| async { "profile page" }))
            .layer(axum::middleware::from_fn(session_gate))
    }

    #[tokio::test]
    async fn middleware_redirects_private_without_cookie() {
        let res = gated_app()
            .oneshot(HttpRequest::get("/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()["location"], "/login");
    }

    #[tokio::test]
    async fn middleware_redirects_public_with_cookie() {
        let res = gated_app()
            .oneshot(
                HttpRequest::get("/login")
                    .header("cookie", "token=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()["location"], "/profile");
    }

    #[tokio::test]
    async fn middleware_treats_empty_cookie_as_absent() {
        let res = gated_app()
            .oneshot(
                HttpRequest::get("/login")
                    .header("cookie", "token=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn middleware_allows_private_with_any_nonempty_cookie() {
        let res = gated_app()
            .oneshot(
                HttpRequest::get("/profile")
                    .header("cookie", "token=not-even-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
