//! Authentication endpoints definitions.

use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{command, domain::user, query, Command as _, Query as _};

use crate::{
    api, define_error, session::Issuer, AsError, Error, Service, Session,
};

/// Name of the [`tracing::Span`] for the endpoints.
const SPAN_NAME: &str = "REST request";

/// Registers a new `User` with the provided credentials.
///
/// Responds with a fresh `Session` token, both in the body and as a session
/// cookie.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_NAME` - no valid name is provided;
/// - `INVALID_EMAIL` - no valid email is provided;
/// - `INVALID_PASSWORD` - no valid password is provided;
/// - `EMAIL_OCCUPIED` - provided email is occupied by another `User`.
#[tracing::instrument(
    skip_all,
    fields(
        email = ?body.email,
        name = ?body.name,
        otel.name = SPAN_NAME,
        rest.name = "register",
    ),
)]
pub async fn register(
    Extension(service): Extension<Service>,
    Extension(issuer): Extension<Issuer>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), Error> {
    let RegisterRequest {
        name,
        email,
        password,
    } = body;

    let name = name.and_then(user::Name::new).ok_or(ValidationError::Name)?;
    let email = email
        .and_then(user::Email::new)
        .ok_or(ValidationError::Email)?;
    let password = password
        .and_then(user::Password::new)
        .ok_or(ValidationError::Password)?;

    let user = service
        .execute(command::CreateUser {
            name,
            email,
            password: secrecy::SecretBox::init_with(move || password),
        })
        .await
        .map_err(AsError::into_error)?;
    let output = service
        .execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map_err(AsError::into_error)?;

    Ok(respond_with_token(jar, issuer, &output))
}

/// Logs a `User` in with the provided credentials.
///
/// Responds with a fresh `Session` token, both in the body and as a session
/// cookie.
///
/// # Errors
///
/// Possible error codes:
/// - `MISSING_CREDENTIALS` - email or password is not provided;
/// - `WRONG_CREDENTIALS` - provided credentials do not match any `User`.
#[tracing::instrument(
    skip_all,
    fields(
        email = ?body.email,
        otel.name = SPAN_NAME,
        rest.name = "login",
    ),
)]
pub async fn login(
    Extension(service): Extension<Service>,
    Extension(issuer): Extension<Issuer>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), Error> {
    let LoginRequest { email, password } = body;

    // Empty values are treated as absent ones, so are reported as missing
    // credentials rather than wrong ones.
    let email = email.filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());

    // Malformed credentials cannot match any `User`, so are rejected the same
    // way wrong ones are, without giving the mismatch away.
    let (email, password) =
        if let (Some(email), Some(password)) = (email, password) {
            (
                Some(user::Email::new(email).ok_or(CredentialsError::Wrong)?),
                Some(
                    user::Password::new(password)
                        .ok_or(CredentialsError::Wrong)?,
                ),
            )
        } else {
            (None, None)
        };

    let output = service
        .execute(command::CreateUserSession::ByCredentials {
            email,
            password: password
                .map(|p| secrecy::SecretBox::init_with(move || p)),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(respond_with_token(jar, issuer, &output))
}

/// Responds with the currently authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request provides no valid `Session` token.
#[tracing::instrument(
    skip_all,
    fields(otel.name = SPAN_NAME, rest.name = "me"),
)]
pub async fn me(
    Extension(service): Extension<Service>,
    session: Session,
) -> Result<Json<DataResponse<Option<api::User>>>, Error> {
    service
        .execute(query::user::ById::by(session.user.id))
        .await
        .map_err(AsError::into_error)
        .map(|user| {
            Json(DataResponse {
                success: true,
                data: user.map(Into::into),
            })
        })
}

/// Updates the name and/or email of the currently authenticated `User`.
///
/// Fields absent from the request body are left untouched.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request provides no valid `Session` token;
/// - `INVALID_NAME` - provided name is not a valid one;
/// - `INVALID_EMAIL` - provided email is not a valid one;
/// - `EMAIL_OCCUPIED` - provided email is occupied by another `User`.
#[tracing::instrument(
    skip_all,
    fields(
        email = ?body.email,
        name = ?body.name,
        otel.name = SPAN_NAME,
        rest.name = "updatedetails",
    ),
)]
pub async fn update_details(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<UpdateDetailsRequest>,
) -> Result<Json<DataResponse<api::User>>, Error> {
    let UpdateDetailsRequest { name, email } = body;

    let name = match name {
        Some(name) => {
            Some(user::Name::new(name).ok_or(ValidationError::Name)?)
        }
        None => None,
    };
    let email = match email {
        Some(email) => {
            Some(user::Email::new(email).ok_or(ValidationError::Email)?)
        }
        None => None,
    };

    service
        .execute(command::UpdateUserDetails {
            user_id: session.user.id,
            name,
            email,
        })
        .await
        .map_err(AsError::into_error)
        .map(|user| {
            Json(DataResponse {
                success: true,
                data: user.into(),
            })
        })
}

/// Updates the password of the currently authenticated `User`.
///
/// The current password is verified first, and a fresh `Session` token is
/// issued on success, as the old one keeps working anyway.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request provides no valid `Session` token;
/// - `WRONG_PASSWORD` - provided current password is not the actual one;
/// - `INVALID_PASSWORD` - no valid new password is provided.
#[tracing::instrument(
    skip_all,
    fields(otel.name = SPAN_NAME, rest.name = "updatepassword"),
)]
pub async fn update_password(
    Extension(service): Extension<Service>,
    Extension(issuer): Extension<Issuer>,
    session: Session,
    jar: CookieJar,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), Error> {
    let UpdatePasswordRequest {
        current_password,
        new_password,
    } = body;

    // A malformed current password cannot match the actual one, so is
    // rejected the same way a wrong one is.
    let current_password = current_password
        .and_then(user::Password::new)
        .ok_or(PasswordError::Wrong)?;
    let new_password = new_password
        .and_then(user::Password::new)
        .ok_or(ValidationError::Password)?;

    let user = service
        .execute(command::UpdateUserPassword {
            user_id: session.user.id,
            new_password,
            old_password: current_password,
        })
        .await
        .map_err(AsError::into_error)?;
    let output = service
        .execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map_err(AsError::into_error)?;

    Ok(respond_with_token(jar, issuer, &output))
}

/// Renders the provided [`Output`] as a [`TokenResponse`], setting the session
/// [`Cookie`] along.
///
/// [`Cookie`]: axum_extra::extract::cookie::Cookie
/// [`Output`]: command::create_user_session::Output
fn respond_with_token(
    jar: CookieJar,
    issuer: Issuer,
    output: &command::create_user_session::Output,
) -> (CookieJar, Json<TokenResponse>) {
    (
        jar.add(issuer.issue(&output.token, DateTime::now())),
        Json(TokenResponse {
            success: true,
            token: output.token.to_string(),
        }),
    )
}

/// Body of the `register` request.
#[derive(Clone, Debug, Deserialize)]
pub struct RegisterRequest {
    /// Name of the `User` to register.
    #[serde(default)]
    pub name: Option<String>,

    /// Email of the `User` to register.
    #[serde(default)]
    pub email: Option<String>,

    /// Password of the `User` to register.
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of the `login` request.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    /// Email to log in with.
    #[serde(default)]
    pub email: Option<String>,

    /// Password to log in with.
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of the `updatedetails` request.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateDetailsRequest {
    /// New name of the `User`, if any.
    #[serde(default)]
    pub name: Option<String>,

    /// New email of the `User`, if any.
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of the `updatepassword` request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    /// Current password of the `User`.
    #[serde(default)]
    pub current_password: Option<String>,

    /// New password to set.
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Body of a successful authentication response.
#[derive(Clone, Debug, Serialize)]
pub struct TokenResponse {
    /// Indicator that the request succeeded.
    pub success: bool,

    /// `Session` token to authenticate further requests with.
    pub token: String,
}

/// Body of a successful response carrying a payload.
#[derive(Clone, Debug, Serialize)]
pub struct DataResponse<T> {
    /// Indicator that the request succeeded.
    pub success: bool,

    /// Payload of the response.
    pub data: T,
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = BAD_REQUEST]
                #[message = "Duplicate field value entered"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::MissingCredentials => Some(CredentialsError::Missing.into()),
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(CredentialsError::Wrong.into())
            }
        }
    }
}

impl AsError for command::update_user_details::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = BAD_REQUEST]
                #[message = "Duplicate field value entered"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => None,
            Self::WrongPassword => Some(PasswordError::Wrong.into()),
        }
    }
}

define_error! {
    enum CredentialsError {
        #[code = "MISSING_CREDENTIALS"]
        #[status = BAD_REQUEST]
        #[message = "Please provide email & password"]
        Missing,

        #[code = "WRONG_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid credentials"]
        Wrong,
    }
}

define_error! {
    enum PasswordError {
        #[code = "WRONG_PASSWORD"]
        #[status = UNAUTHORIZED]
        #[message = "Password is incorrect"]
        Wrong,
    }
}

define_error! {
    enum ValidationError {
        #[code = "INVALID_NAME"]
        #[status = BAD_REQUEST]
        #[message = "Please add a name"]
        Name,

        #[code = "INVALID_EMAIL"]
        #[status = BAD_REQUEST]
        #[message = "Please add a valid email"]
        Email,

        #[code = "INVALID_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Please add a password with at least 6 characters"]
        Password,
    }
}
