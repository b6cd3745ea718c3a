use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::identity::Identity;
use crate::session::seed::SeedStatus;
use crate::session::store::SignUpForm;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: SignUpForm,
}

/// Answer to sign-in and sign-up: who is signed in now and where to go next.
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub identity: Option<Identity>,
    pub redirect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedStatus>,
}

/// Claims of the browser session token. `sid` keys the session registry.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sid: String,
    pub exp: usize,
    pub jti: String,
}
