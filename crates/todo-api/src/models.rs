use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

/// A todo with its image filenames already fetched.
#[derive(Debug, Clone)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub time: Option<String>,
    pub images: Vec<String>,
    pub user_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TodoRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub time: Option<String>,
    pub user_id: i64,
    pub created_at: String,
}

impl TodoRow {
    pub fn into_todo(self, images: Vec<String>) -> Todo {
        Todo {
            id: self.id,
            title: self.title,
            description: self.description,
            time: self.time,
            images,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub time: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
}

/// Named optional deltas; an absent field keeps the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub time: Option<String>,
    pub images: Vec<String>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        TodoResponse {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            time: todo.time,
            images: todo.images,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Amount in the currency's minor unit.
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}
