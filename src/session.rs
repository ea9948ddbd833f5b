use cookie::{Cookie, CookieJar, Key, SameSite};
use log::{debug, error, warn};
use warp::http::header::{HeaderValue, SET_COOKIE};
use warp::reply::Response;

const SESSION_COOKIE: &str = "session";
const FLASH_COOKIE: &str = "flash";

/// Shortest secret we'll derive a signing key from.
pub const MIN_SECRET_LEN: usize = 32;

/// Signs and checks the session and flash cookies.
#[derive(Clone)]
pub struct SessionKeys {
    key: Key,
    secure: bool,
}

/// One request's view of the client's session: who is logged in and which
/// flash messages are waiting. Changes are sent back by [`Session::finish`].
pub struct Session {
    jar: CookieJar,
    keys: SessionKeys,
}

#[derive(Debug)]
pub struct SecretTooShort;

impl SessionKeys {
    pub fn new(secret: &str, secure: bool) -> Result<Self, SecretTooShort> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SecretTooShort);
        }

        Ok(Self {
            key: Key::derive_from(secret.as_bytes()),
            secure,
        })
    }

    /// Start a request's session from its `Cookie` header.
    pub fn open(&self, cookie_header: Option<&str>) -> Session {
        let mut jar = CookieJar::new();

        if let Some(header) = cookie_header {
            for cookie in Cookie::split_parse_encoded(header.to_string()) {
                match cookie {
                    Ok(cookie) => jar.add_original(cookie),
                    Err(e) => debug!("ignoring unparsable cookie: {e}"),
                }
            }
        }

        Session {
            jar,
            keys: self.clone(),
        }
    }

    fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

impl Session {
    /// The logged in username, if the session cookie is present and its
    /// signature checks out.
    pub fn current_user(&self) -> Option<String> {
        self.signed(SESSION_COOKIE)
    }

    pub fn login(&mut self, username: &str) {
        let cookie = self.keys.cookie(SESSION_COOKIE, username.into());
        self.jar.signed_mut(&self.keys.key).add(cookie);
    }

    pub fn logout(&mut self) {
        self.jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    }

    /// Queue a message for the next page the user sees.
    pub fn flash(&mut self, message: impl Into<String>) {
        let mut flashes = self.flashes();
        flashes.push(message.into());

        match serde_json::to_string(&flashes) {
            Ok(json) => {
                let cookie = self.keys.cookie(FLASH_COOKIE, json);
                self.jar.signed_mut(&self.keys.key).add(cookie);
            }
            Err(e) => error!("couldn't encode flash messages: {e:?}"),
        }
    }

    /// Pending flash messages, which are then forgotten.
    pub fn take_flashes(&mut self) -> Vec<String> {
        let flashes = self.flashes();

        if self.jar.get(FLASH_COOKIE).is_some() {
            self.jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
        }

        flashes
    }

    /// Attach every cookie change made during the request to `response`.
    pub fn finish(self, mut response: Response) -> Response {
        let headers = response.headers_mut();

        for cookie in self.jar.delta() {
            match HeaderValue::from_str(&cookie.encoded().to_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => error!("couldn't set cookie {}: {e:?}", cookie.name()),
            }
        }

        response
    }

    fn flashes(&self) -> Vec<String> {
        self.signed(FLASH_COOKIE)
            .and_then(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| warn!("discarding bad flash cookie: {e:?}"))
                    .ok()
            })
            .unwrap_or_default()
    }

    fn signed(&self, name: &str) -> Option<String> {
        let present = self.jar.get(name).is_some();
        let verified = self.jar.signed(&self.keys.key).get(name);

        if present && verified.is_none() {
            warn!("{name} cookie failed verification");
        }

        verified.map(|cookie| cookie.value().to_string())
    }
}
