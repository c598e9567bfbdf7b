use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: u32,
}

#[derive(Deserialize)]
pub struct CreateContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: u32,
}

#[derive(Deserialize)]
pub struct UpdateContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Contact>>>;

pub const MALFORMED_BODY: &str = "this is not json";

/// A JSON-shaped body whose string value is not valid UTF-8.
pub const INVALID_UTF8_BODY: &[u8] = b"{\"a\":\"\xff\"}";

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route(
            "/contacts/{id}",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/malformed", get(malformed))
        .route("/invalid-utf8", get(invalid_utf8))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_contacts(State(db): State<Db>) -> Json<Vec<Contact>> {
    let contacts = db.read().await;
    Json(contacts.values().cloned().collect())
}

async fn create_contact(
    State(db): State<Db>,
    Json(input): Json<CreateContact>,
) -> (StatusCode, Json<Contact>) {
    let contact = Contact {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
        age: input.age,
    };
    info!(id = %contact.id, "contact created");
    db.write().await.insert(contact.id, contact.clone());
    (StatusCode::CREATED, Json(contact))
}

async fn get_contact(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>, StatusCode> {
    let contacts = db.read().await;
    contacts.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_contact(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateContact>,
) -> Result<Json<Contact>, StatusCode> {
    let mut contacts = db.write().await;
    let contact = contacts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        contact.name = name;
    }
    if let Some(email) = input.email {
        contact.email = email;
    }
    if let Some(age) = input.age {
        contact.age = age;
    }
    debug!(%id, "contact updated");
    Ok(Json(contact.clone()))
}

async fn delete_contact(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut contacts = db.write().await;
    let removed = contacts.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND);
    info!(%id, found = removed.is_ok(), "contact delete");
    removed
}

/// Reflects the request back as JSON. A body that is not JSON is echoed as a
/// string; an empty body becomes `null`.
async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or(Value::String(body))
    };
    Json(json!({
        "method": method.as_str(),
        "content_type": header_value(header::CONTENT_TYPE),
        "authorization": header_value(header::AUTHORIZATION),
        "body": body,
    }))
}

/// Responds with the requested status code and a small JSON body.
async fn status(Path(code): Path<u16>) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    debug!(code, "status route");
    Ok((status, Json(json!({ "status": code }))))
}

/// A 200 response whose body is not JSON.
async fn malformed() -> &'static str {
    MALFORMED_BODY
}

/// A 200 response labelled as JSON whose bytes are not UTF-8.
async fn invalid_utf8() -> ([(header::HeaderName, &'static str); 1], &'static [u8]) {
    ([(header::CONTENT_TYPE, "application/json")], INVALID_UTF8_BODY)
}
