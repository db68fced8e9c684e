use crate::infrastructure::security::validate_token;
use crate::presentation::handlers::ShopError;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::{EitherBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        Method,
        header::{AUTHORIZATION, HeaderName, HeaderValue},
    },
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

type LocalBoxFuture<T> = Pin<Box<dyn std::future::Future<Output = T>>>;

/// The owner resolved from the bearer token; every ledger operation is scoped by it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Per-request id, also echoed in the `x-request-id` response header.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

const MAX_REQUEST_ID_LEN: usize = 128;

fn incoming_request_id(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
}

/// Tags each request with an id (a caller-supplied `x-request-id` is kept),
/// adds `x-request-id` and `x-response-time` to the response and writes one
/// log line per request. Wrap it outside [`JwtAuthMiddleware`] so the owner
/// resolved there is part of the log line.
pub struct RequestLogMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestLogMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLogMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLogMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLogMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLogMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let request_id = incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
        let method = req.method().clone();
        let path = req.path().to_string();

        req.extensions_mut().insert(RequestId(request_id.clone()));
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let elapsed_ms = started.elapsed().as_millis();
            let owner = res
                .request()
                .extensions()
                .get::<AuthenticatedUser>()
                .map(|user| user.user_id.clone());

            let headers = res.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                headers.insert(HeaderName::from_static("x-request-id"), value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms}ms")) {
                headers.insert(HeaderName::from_static("x-response-time"), value);
            }

            info!(
                %method,
                %path,
                status = res.status().as_u16(),
                elapsed_ms,
                request_id = %request_id,
                owner = owner.as_deref().unwrap_or("-"),
                "Request processed"
            );
            Ok(res)
        })
    }
}

const PUBLIC_PATHS: &[&str] = &["/api/health", "/api/auth/register", "/api/auth/login"];

/// Resolves `Authorization: Bearer <jwt>` to an [`AuthenticatedUser`].
/// Requests to public paths and CORS preflights pass through untouched.
pub struct JwtAuthMiddleware {
    secret: Arc<str>,
}

impl JwtAuthMiddleware {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::from(secret.into()),
        }
    }
}

pub fn authenticate(req: &ServiceRequest, secret: &str) -> Result<AuthenticatedUser, ShopError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ShopError::Unauthorized("missing bearer token".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ShopError::Unauthorized("missing bearer token".to_string()))?;

    let user_id = validate_token(token, secret).map_err(|e| {
        debug!(error = %e, "Token validation failed");
        ShopError::Unauthorized("invalid or expired token".to_string())
    })?;

    Ok(AuthenticatedUser { user_id })
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    secret: Arc<str>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let is_public = *req.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&req.path());

        if !is_public {
            match authenticate(&req, &self.secret) {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                }
                Err(err) => {
                    warn!(path = %req.path(), error = %err, "Rejected unauthenticated request");
                    let response = err.error_response();
                    return Box::pin(async move {
                        Ok(req.into_response(response).map_into_right_body())
                    });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::security::generate_token;
    use actix_web::{App, HttpResponse, test, web};

    const SECRET: &str = "middleware-test-secret";

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id)
    }

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_request_id_is_echoed_or_generated() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogMiddleware)
                .route("/api/health", web::get().to(ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/health")
            .insert_header(("x-request-id", "abc-123"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.headers().get("x-request-id").unwrap(), "abc-123");
        assert!(resp.headers().contains_key("x-response-time"));

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        let generated = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(generated).is_ok());
    }

    #[actix_web::test]
    async fn test_bearer_token_resolves_owner() {
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new(SECRET))
                .route("/api/auth/me", web::get().to(whoami))
                .route("/api/health", web::get().to(ok)),
        )
        .await;

        let token = generate_token("owner-42", SECRET, 60).unwrap();
        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], b"owner-42");

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let other = generate_token("owner-42", "another-secret", 60).unwrap();
        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {other}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
