use std::sync::Arc;

use revu_auth::token::TokenManager;
use revu_dal::Pool;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(pool: Pool, tokens: TokenManager) -> Self {
        AppState {
            state: Arc::new(AppStateInner { pool, tokens }),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
}
