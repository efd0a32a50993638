use crate::ipc::helpers::{parse_params, permission_from, respond, role_from, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

// Every field is optional and loosely typed: a missing, null or unknown
// role or permission answers false rather than failing the request.
#[derive(Deserialize)]
struct AuthParams {
    #[serde(default)]
    role: serde_json::Value,
    #[serde(default)]
    permission: serde_json::Value,
    #[serde(default)]
    permissions: Vec<serde_json::Value>,
}

fn auth_has_permission(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: AuthParams = parse_params(req)?;
    let allowed = state
        .auth
        .has_permission(role_from(&p.role), permission_from(&p.permission));
    Ok(json!({ "allowed": allowed }))
}

fn auth_has_any(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: AuthParams = parse_params(req)?;
    let allowed = state
        .auth
        .has_any(role_from(&p.role), p.permissions.iter().map(permission_from));
    Ok(json!({ "allowed": allowed }))
}

fn auth_has_all(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: AuthParams = parse_params(req)?;
    let allowed = state
        .auth
        .has_all(role_from(&p.role), p.permissions.iter().map(permission_from));
    Ok(json!({ "allowed": allowed }))
}

fn auth_permissions(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: AuthParams = parse_params(req)?;
    Ok(json!({ "permissions": state.auth.permissions_for(role_from(&p.role)) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "auth.hasPermission" => auth_has_permission(state, req),
        "auth.hasAny" => auth_has_any(state, req),
        "auth.hasAll" => auth_has_all(state, req),
        "auth.permissions" => auth_permissions(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
