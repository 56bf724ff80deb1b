use std::sync::Arc;

use service::auth::{AuthService, UserRepository};

/// Refresh-cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age_secs: i64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { name: "refresh_token".into(), secure: true, max_age_secs: 7 * 24 * 60 * 60 }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService<dyn UserRepository>>,
    pub cookie: CookieSettings,
}
