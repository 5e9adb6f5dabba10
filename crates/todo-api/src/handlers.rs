use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use shared::password;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    CreatePaymentIntentRequest, CreateTodoRequest, LoginRequest, PaymentIntentResponse, Todo,
    TodoResponse, TokenResponse, UpdateTodoRequest,
};
use crate::uploads::UploadedFile;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unavailable"})),
        ),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    // Unknown username and wrong password answer identically.
    let user = state
        .store
        .find_user_by_username(&request.username)
        .await?
        .ok_or(ApiError::Unauthenticated("Invalid username or password"))?;

    if !password::verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::Unauthenticated("Invalid username or password"));
    }

    let token = state
        .tokens
        .issue(user.id, &user.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "login succeeded");
    Ok(Json(TokenResponse { token }))
}

/// Parsed create request, identical for the JSON and multipart forms.
#[derive(Debug, Default)]
struct NewTodoInput {
    title: String,
    description: Option<String>,
    time: Option<String>,
    is_pro: bool,
    files: Vec<UploadedFile>,
}

pub async fn create_todo(
    State(state): State<AppState>,
    user: AuthUser,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let input = read_create_input(&state, request).await?;

    if input.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let filenames = if input.is_pro {
        if input.files.is_empty() {
            return Err(ApiError::MissingUpload);
        }
        state.images.save_all(&input.files).await?
    } else {
        Vec::new()
    };

    let todo_id = match state
        .store
        .insert_todo(
            user.user_id,
            &input.title,
            input.description.as_deref(),
            input.time.as_deref(),
            &filenames,
        )
        .await
    {
        Ok(id) => id,
        Err(e) => {
            // Stored files that no row references must not outlive the
            // failed insert.
            state.images.remove_all(&filenames).await;
            return Err(e.into());
        }
    };

    tracing::info!(todo_id, user_id = user.user_id, images = filenames.len(), "created todo");
    Ok(Json(json!({"message": "Todo created successfully"})))
}

pub async fn get_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<i64>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = fetch_owned(&state, todo_id, &user).await?;
    Ok(Json(todo.into()))
}

pub async fn update_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<i64>,
    Json(changes): Json<UpdateTodoRequest>,
) -> Result<Json<Value>, ApiError> {
    let existing = fetch_owned(&state, todo_id, &user).await?;

    // Absent fields keep their stored values; they are never cleared.
    let title = changes.title.unwrap_or(existing.title);
    let description = changes.description.or(existing.description);
    let time = changes.time.or(existing.time);

    state
        .store
        .update_todo(todo_id, &title, description.as_deref(), time.as_deref())
        .await?;

    tracing::info!(todo_id, user_id = user.user_id, "updated todo");
    Ok(Json(json!({"message": "Todo updated successfully"})))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(todo_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    fetch_owned(&state, todo_id, &user).await?;
    state.store.delete_todo(todo_id).await?;

    tracing::info!(todo_id, user_id = user.user_id, "deleted todo");
    Ok(Json(json!({"message": "Todo deleted successfully"})))
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let intent = state
        .payments
        .create_payment_intent(request.amount, &request.currency)
        .await?;

    tracing::info!(intent_id = %intent.id, "created payment intent");
    Ok(Json(PaymentIntentResponse { client_secret: intent.client_secret }))
}

/// Existence is checked before ownership: a missing id is 404 for every
/// caller, an existing id owned by someone else is 403.
async fn fetch_owned(state: &AppState, todo_id: i64, user: &AuthUser) -> Result<Todo, ApiError> {
    let todo = state.store.get_todo(todo_id).await?.ok_or(ApiError::NotFound)?;
    if todo.user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(todo)
}

async fn read_create_input(state: &AppState, request: Request) -> Result<NewTodoInput, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        read_multipart_input(multipart).await
    } else {
        let Json(body) = Json::<CreateTodoRequest>::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(NewTodoInput {
            title: body.title,
            description: body.description,
            time: body.time,
            is_pro: body.is_pro,
            files: Vec::new(),
        })
    }
}

async fn read_multipart_input(mut multipart: Multipart) -> Result<NewTodoInput, ApiError> {
    let mut input = NewTodoInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => input.title = field_text(field).await?,
            "description" => input.description = Some(field_text(field).await?),
            "time" => input.time = Some(field_text(field).await?),
            "is_pro" => {
                let value = field_text(field).await?;
                input.is_pro = matches!(value.as_str(), "true" | "1" | "on");
            }
            "images" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                input.files.push(UploadedFile { name: filename, data: data.to_vec() });
            }
            _ => {}
        }
    }
    Ok(input)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))
}
