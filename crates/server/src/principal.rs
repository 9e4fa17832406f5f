//! Principal extraction.
//!
//! Authentication happens upstream; the gateway in front of this service
//! forwards the caller as `x-user-id`, `x-user-role` and `x-campus`.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Error as HeaderError, Header},
    typed_header::TypedHeaderRejection,
};
use engine::{Principal, Role};

static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
static ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");
static CAMPUS_HEADER: HeaderName = HeaderName::from_static("x-campus");

fn decode_text<'i, I>(values: &mut I) -> Result<String, HeaderError>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let value = values.next().ok_or_else(HeaderError::invalid)?;
    let Ok(value) = value.to_str() else {
        return Err(HeaderError::invalid());
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(HeaderError::invalid());
    }
    Ok(value.to_string())
}

fn encode_text<E: Extend<HeaderValue>>(value: &str, values: &mut E, name: &HeaderName) {
    match HeaderValue::from_str(value) {
        Ok(value) => values.extend(std::iter::once(value)),
        Err(_) => tracing::error!("failed to encode {name} header"),
    }
}

/// `TypedHeader` for `x-user-id`.
#[derive(Debug)]
pub struct UserIdHeader(pub String);

impl Header for UserIdHeader {
    fn name() -> &'static HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_text(values).map(UserIdHeader)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_text(&self.0, values, &USER_ID_HEADER);
    }
}

/// `TypedHeader` for `x-user-role`: `student` (or `user`) and `admin`.
#[derive(Debug)]
pub struct RoleHeader(pub Role);

impl Header for RoleHeader {
    fn name() -> &'static HeaderName {
        &ROLE_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = decode_text(values)?;
        Role::try_from(value.as_str())
            .map(RoleHeader)
            .map_err(|_| HeaderError::invalid())
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_text(self.0.as_str(), values, &ROLE_HEADER);
    }
}

#[derive(Debug)]
pub struct CampusHeader(pub String);

impl Header for CampusHeader {
    fn name() -> &'static HeaderName {
        &CAMPUS_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        decode_text(values).map(CampusHeader)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_text(&self.0, values, &CAMPUS_HEADER);
    }
}

/// Resolves the caller into a [`Principal`] request extension. A missing or
/// malformed identity is a `401`.
pub async fn auth(
    user_id: Result<TypedHeader<UserIdHeader>, TypedHeaderRejection>,
    role: Result<TypedHeader<RoleHeader>, TypedHeaderRejection>,
    campus: Result<TypedHeader<CampusHeader>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Ok(TypedHeader(UserIdHeader(user_id))) = user_id else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    let role = match role {
        Ok(TypedHeader(RoleHeader(role))) => role,
        Err(rejection) if rejection.is_missing() => Role::default(),
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };
    let campus = campus.ok().map(|TypedHeader(CampusHeader(campus))| campus);

    request
        .extensions_mut()
        .insert(Principal::new(user_id, role, campus));
    Ok(next.run(request).await)
}
