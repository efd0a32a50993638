use crate::auth::AuthorizationModel;
use crate::config::Config;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub auth: AuthorizationModel,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            auth: AuthorizationModel::default(),
        }
    }
}
