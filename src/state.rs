/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - asserter / validator / 公開用 JWKS / proof の期限
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;
use std::time::Duration;

use crate::services::dasvid::{Asserter, DasvidServices, Deadline, Validator};
use crate::services::keys::{Jwk, Jwks};

#[derive(Clone, Debug)]
pub struct AppState {
    pub asserter: Arc<Asserter>,
    pub validator: Arc<Validator>,
    pub jwks: Arc<Jwks>,
    pub proof_deadline: Duration,
}

impl AppState {
    pub fn new(services: DasvidServices, proof_deadline: Duration) -> Self {
        let jwks = Jwks::new(vec![Jwk::from_public_key(
            services.workload_key.public_key(),
        )]);

        Self {
            asserter: services.asserter,
            validator: services.validator,
            jwks: Arc::new(jwks),
            proof_deadline,
        }
    }

    /// Fresh deadline for one request.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.proof_deadline)
    }
}
