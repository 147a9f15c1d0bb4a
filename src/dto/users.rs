use serde::Deserialize;
use utoipa::ToSchema;

/// Administrative user creation. Credentials arrive pre-hashed; password
/// handling itself lives with the out-of-process auth system.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub image: Option<String>,
}

fn default_role() -> String {
    "customer".to_string()
}
