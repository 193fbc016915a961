use std::sync::Arc;

use slap_db::Database;

use crate::imgur::ImgurClient;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler needs, built once in main and injected through
/// axum state — never reached for ambiently.
pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub imgur: ImgurClient,
}
