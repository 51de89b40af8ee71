use tungstenite::handshake::server::Request;
use tungstenite::http::header::COOKIE;

/// Name of the cookie carrying the identity token set by the login flow.
pub const AUTH_COOKIE: &str = "auth";

/// Returns the value of the `auth` cookie on the upgrade request, if any.
///
/// The value is kept opaque; the hub never looks inside it.
pub fn auth_cookie(req: &Request) -> Option<String> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
