//! One-shot status messages carried across a redirect in a cookie.

use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

pub const NOTICE_COOKIE: &str = "notice";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }

    fn encode(&self) -> Option<String> {
        serde_json::to_string(self).ok().map(|json| urlencoding::encode(&json).into_owned())
    }

    fn decode(value: &str) -> Option<Self> {
        let json = urlencoding::decode(value).ok()?;
        serde_json::from_str(&json).ok()
    }
}

/// Attach `notice` to the jar and send the browser back to the home page.
pub fn redirect_home(jar: CookieJar, notice: Notice) -> (CookieJar, Redirect) {
    let jar = match notice.encode() {
        Some(value) => jar.add(
            Cookie::build((NOTICE_COOKIE, value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        ),
        None => jar,
    };
    (jar, Redirect::to("/"))
}

/// Read the pending notice, if any, and clear it so it is shown only once.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Notice>) {
    let Some(cookie) = jar.get(NOTICE_COOKIE) else {
        return (jar, None);
    };

    let notice = Notice::decode(cookie.value());
    let jar = jar.remove(Cookie::build(NOTICE_COOKIE).path("/"));
    (jar, notice)
}
