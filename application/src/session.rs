//! [`Session`] transport over HTTP.

use std::time::Duration;

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar},
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use common::DateTime;
use service::{
    command::{self, Command as _},
    domain::{user::session, User},
};

use crate::{config, define_error, AsError, Error, Service};

/// Name of the [`Cookie`] carrying a [`session::Token`].
pub const COOKIE_NAME: &str = "token";

/// Issuer of session [`Cookie`]s.
#[derive(Clone, Copy, Debug)]
pub struct Issuer {
    /// Indicator whether issued [`Cookie`]s are marked as `Secure`.
    secure: bool,

    /// Period of time an issued [`Cookie`] lives for.
    lifetime: Duration,
}

impl Issuer {
    /// Creates a new [`Issuer`] out of the provided [`config::Config`].
    #[must_use]
    pub fn new(conf: &config::Config) -> Self {
        Self {
            secure: conf.mode == config::Mode::Production,
            lifetime: conf.server.cookie.expire,
        }
    }

    /// Issues a new [`Cookie`] carrying the provided [`session::Token`].
    ///
    /// The [`Cookie`] is always HTTP-only, and is marked as `Secure` in
    /// [`config::Mode::Production`] only, so development setups without TLS
    /// keep working.
    #[must_use]
    pub fn issue(
        &self,
        token: &session::Token,
        now: DateTime,
    ) -> Cookie<'static> {
        let cookie = Cookie::build((COOKIE_NAME, token.to_string()))
            .path("/")
            .http_only(true)
            .expires(time::OffsetDateTime::from(now + self.lifetime));
        if self.secure {
            cookie.secure(true)
        } else {
            cookie
        }
        .build()
    }
}

/// Authenticated user session, extracted from an HTTP request.
///
/// The [`session::Token`] is taken from the `Authorization: Bearer` header,
/// falling back to the session [`Cookie`] when the header is absent.
#[derive(Clone, Debug)]
pub struct Session {
    /// [`User`] this [`Session`] belongs to.
    pub user: User,

    /// [`session::Token`] this [`Session`] was authorized with.
    pub token: session::Token,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let res = parts.extract::<TypedHeader<Authorization<Bearer>>>().await;
        let token = match res {
            Ok(TypedHeader(Authorization(bearer))) => {
                bearer.token().to_owned()
            }
            Err(_) => CookieJar::from_headers(&parts.headers)
                .get(COOKIE_NAME)
                .map(|cookie| cookie.value().to_owned())
                .ok_or(AuthError::AuthorizationRequired)?,
        };
        #[expect(unsafe_code, reason = "verified upon execution")]
        let token = unsafe { session::Token::new_unchecked(token) };

        let user = service
            .execute(command::AuthorizeUserSession {
                token: token.clone(),
            })
            .await
            .map_err(AsError::into_error)?;

        Ok(Self { user, token })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenDecodeError(_) | Self::UserNotExists(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Not authorized to access this route"]
        AuthorizationRequired,
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use service::domain::user::session;

    use super::{Issuer, COOKIE_NAME};

    fn token() -> session::Token {
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked("a.b.c".into()) };
        token
    }

    #[test]
    fn issues_http_only_cookie() {
        let issuer = Issuer {
            secure: false,
            lifetime: Duration::from_secs(30 * 24 * 60 * 60),
        };

        let cookie = issuer.issue(&token(), DateTime::now());

        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.value(), "a.b.c");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert!(cookie.to_string().contains("HttpOnly"));
    }

    #[test]
    fn marks_cookie_secure_in_production_only() {
        let lifetime = Duration::from_secs(30 * 24 * 60 * 60);
        let now = DateTime::now();

        let production = Issuer {
            secure: true,
            lifetime,
        }
        .issue(&token(), now);
        assert_eq!(production.secure(), Some(true));
        assert!(production.to_string().contains("Secure"));

        let development = Issuer {
            secure: false,
            lifetime,
        }
        .issue(&token(), now);
        assert_eq!(development.secure(), None);
        assert!(!development.to_string().contains("Secure"));
    }

    #[test]
    fn expires_cookie_after_configured_lifetime() {
        let lifetime = Duration::from_secs(30 * 24 * 60 * 60);
        let now = DateTime::now();

        let cookie = Issuer {
            secure: false,
            lifetime,
        }
        .issue(&token(), now);

        assert_eq!(
            cookie.expires_datetime(),
            Some(time::OffsetDateTime::from(now + lifetime)),
        );
    }
}
