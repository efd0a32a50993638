use crate::auth::{Permission, Role};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(value) => ok(&req.id, value),
        Err(error) => error.response(&req.id),
    }
}

pub fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}

/// Missing or null params read as an empty object, so structs whose fields
/// all have defaults still parse.
pub fn parse_params<T: DeserializeOwned>(req: &Request) -> Result<T, HandlerErr> {
    let raw = if req.params.is_null() {
        json!({})
    } else {
        req.params.clone()
    };
    serde_json::from_value(raw).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

/// Anything other than a known role string is "no role".
pub fn role_from(v: &serde_json::Value) -> Option<Role> {
    v.as_str().and_then(Role::parse)
}

pub fn permission_from(v: &serde_json::Value) -> Option<Permission> {
    v.as_str().and_then(Permission::parse)
}

/// Gate for methods that expose student data. Fails closed on a missing or
/// unknown role.
pub fn require_any(
    state: &AppState,
    req: &Request,
    role: Option<Role>,
    needed: &[Permission],
) -> Result<(), HandlerErr> {
    if state.auth.has_any(role, needed.iter().copied()) {
        return Ok(());
    }
    let needed_names: Vec<&str> = needed.iter().map(|p| p.as_str()).collect();
    tracing::warn!(
        method = %req.method,
        role = role.map(Role::as_str).unwrap_or("none"),
        "permission denied"
    );
    Err(HandlerErr {
        code: "forbidden",
        message: format!("{} requires one of: {}", req.method, needed_names.join(", ")),
        details: Some(json!({
            "role": role,
            "required": needed_names,
        })),
    })
}
