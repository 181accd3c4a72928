/*
 * Responsibility
 * - 起動時に一度だけ組み立てるプロセス共有コンポーネント
 *   - gate: AuthenticationGate (classifier + token authority + principal store)
 *   - cors: CorsPolicy
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - リクエストごとの状態 (SecurityContext) は持たない
 */
use std::sync::Arc;

use crate::middleware::cors::CorsPolicy;
use crate::security::gate::AuthenticationGate;

#[derive(Clone, Debug)]
pub struct AppState {
    pub gate: Arc<AuthenticationGate>,
    pub cors: Arc<CorsPolicy>,
}

impl AppState {
    pub fn new(gate: AuthenticationGate, cors: CorsPolicy) -> Self {
        Self {
            gate: Arc::new(gate),
            cors: Arc::new(cors),
        }
    }
}
