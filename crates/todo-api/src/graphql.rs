use async_graphql::connection::{query, Connection, Edge};
use async_graphql::{Context, EmptySubscription, Object, Result as GqlResult, Schema, SimpleObject, ID};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use shared::password;

use crate::auth::AuthUser;
use crate::db::Store;
use crate::models::Todo;
use crate::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

pub type ApiSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(store: Store) -> ApiSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .finish()
}

/// Transport guard only: the bearer token must be valid, but resolvers do
/// not filter by the caller's identity.
pub async fn graphql_handler(
    State(state): State<AppState>,
    _user: AuthUser,
    request: GraphQLRequest,
) -> GraphQLResponse {
    state.schema.execute(request.into_inner()).await.into()
}

#[derive(SimpleObject)]
pub struct TodoNode {
    pub id: ID,
    pub title: String,
    pub description: Option<String>,
    pub time: Option<String>,
    pub images: Vec<String>,
}

impl From<Todo> for TodoNode {
    fn from(todo: Todo) -> Self {
        TodoNode {
            id: ID(todo.id.to_string()),
            title: todo.title,
            description: todo.description,
            time: todo.time,
            images: todo.images,
        }
    }
}

/// Client-facing user shape; the password hash is never part of it.
#[derive(SimpleObject)]
pub struct UserNode {
    pub id: ID,
    pub username: String,
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Every todo in the store in id order, regardless of owner.
    async fn all_todos(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        first: Option<i32>,
    ) -> GqlResult<Connection<String, TodoNode>> {
        let store = ctx.data_unchecked::<Store>().clone();
        query(after, None, first, None, |after: Option<String>, _before, first, _last| async move {
            let after_id = match after {
                Some(cursor) => Some(
                    decode_cursor(&cursor)
                        .ok_or_else(|| async_graphql::Error::new("invalid cursor"))?,
                ),
                None => None,
            };
            let page_size = first.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

            let mut todos = store
                .todos_after(after_id, page_size as i64 + 1)
                .await
                .map_err(|e| {
                    tracing::error!(error = ?e, "todo connection query failed");
                    async_graphql::Error::new("internal error")
                })?;
            let has_next = todos.len() > page_size;
            todos.truncate(page_size);

            let mut connection = Connection::new(after_id.is_some(), has_next);
            connection.edges.extend(
                todos
                    .into_iter()
                    .map(|todo| Edge::new(encode_cursor(todo.id), TodoNode::from(todo))),
            );
            Ok::<_, async_graphql::Error>(connection)
        })
        .await
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Registers a new user. The password is stored only as an argon2 hash.
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> GqlResult<UserNode> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(async_graphql::Error::new("username and password are required"));
        }

        let store = ctx.data_unchecked::<Store>();
        if store.username_exists(&username).await.map_err(internal)? {
            return Err(async_graphql::Error::new("Username already exists"));
        }

        let password_hash =
            password::hash_password(&password).map_err(|e| internal(e.to_string()))?;
        let user = store
            .insert_user(&username, &password_hash)
            .await
            .map_err(internal)?;

        tracing::info!(user_id = user.id, "created user");
        Ok(UserNode { id: ID(user.id.to_string()), username: user.username })
    }
}

fn internal(e: impl std::fmt::Display) -> async_graphql::Error {
    tracing::error!(error = %e, "user mutation failed");
    async_graphql::Error::new("internal error")
}

fn encode_cursor(id: i64) -> String {
    BASE64.encode(format!("todo:{id}"))
}

fn decode_cursor(cursor: &str) -> Option<i64> {
    let bytes = BASE64.decode(cursor).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.strip_prefix("todo:")?.parse().ok()
}
