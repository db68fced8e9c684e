use crate::domain::models::CustomerForm;
use crate::domain::repository::UploadedPhoto;
use crate::infrastructure::uploads::{NOT_AN_IMAGE, is_image};
use crate::presentation::handlers::{AppState, MessageResponse, ShopError};
use crate::presentation::middleware::AuthenticatedUser;
use actix_multipart::{Field, Multipart};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse, web};
use futures_util::TryStreamExt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const PHOTO_FIELD: &str = "aadharPhoto";

fn too_large(limit: usize) -> ShopError {
    ShopError::Validation(format!("Request body exceeds {limit} bytes"))
}

/// Body of a customer create or update: JSON, or `multipart/form-data` with
/// the same fields plus an optional `aadharPhoto` part.
pub enum CustomerPayload {
    Json(CustomerForm),
    Multipart(Multipart),
}

impl FromRequest for CustomerPayload {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        if req.content_type().eq_ignore_ascii_case("multipart/form-data") {
            let multipart = Multipart::new(req.headers(), payload.take());
            return Box::pin(async move { Ok(CustomerPayload::Multipart(multipart)) });
        }
        // Goes through the scope's JsonConfig, so malformed bodies become validation errors.
        let json = web::Json::<CustomerForm>::from_request(req, payload);
        Box::pin(async move { Ok(CustomerPayload::Json(json.await?.into_inner())) })
    }
}

/// Reads one multipart field, counting against the shared request `budget`.
async fn read_field(field: &mut Field, budget: &mut usize, limit: usize) -> Result<Vec<u8>, ShopError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| ShopError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if chunk.len() > *budget {
            return Err(too_large(limit));
        }
        *budget -= chunk.len();
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_multipart(
    mut multipart: Multipart,
    limit: usize,
) -> Result<(CustomerForm, Option<UploadedPhoto>), ShopError> {
    let mut form = CustomerForm::default();
    let mut photo = None;
    let mut budget = limit;

    while let Some(mut field) = multipart
        .try_next()
        .await
        .map_err(|e| ShopError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == PHOTO_FIELD {
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            // An empty file input still submits a part with a blank file name.
            if file_name.as_deref().is_some_and(str::is_empty) {
                read_field(&mut field, &mut budget, limit).await?;
                continue;
            }
            let content_type = field
                .content_type()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default();
            if !is_image(&content_type) {
                warn!(content_type = %content_type, "Rejected non-image upload");
                return Err(ShopError::Validation(NOT_AN_IMAGE.to_string()));
            }
            let bytes = read_field(&mut field, &mut budget, limit).await?;
            if !bytes.is_empty() {
                photo = Some(UploadedPhoto {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let bytes = read_field(&mut field, &mut budget, limit).await?;
        let value = String::from_utf8(bytes)
            .map_err(|_| ShopError::Validation(format!("Field {name} is not valid UTF-8")))?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "phone" => form.phone = Some(value),
            "whatsappNumber" => form.whatsapp_number = Some(value),
            "email" => form.email = Some(value),
            "address" => form.address = Some(value),
            "aadharNumber" => form.aadhar_number = Some(value),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok((form, photo))
}

/// Multipart bodies are capped at `limit` bytes across all parts.
async fn read_customer_form(
    payload: CustomerPayload,
    limit: usize,
) -> Result<(CustomerForm, Option<UploadedPhoto>), ShopError> {
    match payload {
        CustomerPayload::Json(form) => Ok((form, None)),
        CustomerPayload::Multipart(multipart) => read_multipart(multipart, limit).await,
    }
}

#[instrument(skip(state))]
pub async fn list_customers(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ShopError> {
    let customers = state.customers.list_customers(&user.user_id).await?;
    info!(count = customers.len(), "Customers listed");
    Ok(HttpResponse::Ok().json(customers))
}

#[instrument(skip(state, payload), fields(customer_id))]
pub async fn create_customer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: CustomerPayload,
) -> Result<HttpResponse, ShopError> {
    let (form, photo) = read_customer_form(payload, state.max_upload_bytes).await?;
    let customer = state
        .customers
        .create_customer(&user.user_id, form, photo)
        .await?;
    tracing::Span::current().record("customer_id", tracing::field::display(customer.id));
    info!(customer_id = %customer.id, "Customer created successfully");
    Ok(HttpResponse::Created().json(customer))
}

#[instrument(skip(state), fields(customer_id = %*path))]
pub async fn get_customer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ShopError> {
    let customer = state
        .customers
        .get_customer(&user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(customer))
}

#[instrument(skip(state, payload), fields(customer_id = %*path))]
pub async fn update_customer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    payload: CustomerPayload,
) -> Result<HttpResponse, ShopError> {
    let (form, photo) = read_customer_form(payload, state.max_upload_bytes).await?;
    let customer = state
        .customers
        .update_customer(&user.user_id, path.into_inner(), form, photo)
        .await?;
    info!(customer_id = %customer.id, "Customer updated successfully");
    Ok(HttpResponse::Ok().json(customer))
}

#[instrument(skip(state), fields(customer_id = %*path))]
pub async fn delete_customer(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ShopError> {
    state
        .customers
        .delete_customer(&user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Customer removed")))
}

#[instrument(skip(state), fields(customer_id = %*path))]
pub async fn customer_statement(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ShopError> {
    let statement = state
        .customers
        .statement(&user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(statement))
}
