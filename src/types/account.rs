//! Request and response bodies for account endpoints

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "is_2fa")]
    pub second_factor: bool,
}

impl RegisterRequest {
    /// First missing required field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("password", &self.password),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public view of an account (never includes the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "is_2fa")]
    pub second_factor: bool,
}

/// Successful login body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "Token")]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_order() {
        let req = RegisterRequest {
            first_name: "Ada".into(),
            email: "a@x.com".into(),
            ..Default::default()
        };
        assert_eq!(req.missing_field(), Some("last_name"));

        let req = RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "a@x.com".into(),
            password: "pw1".into(),
            second_factor: false,
        };
        assert_eq!(req.missing_field(), None);
    }

    #[test]
    fn test_token_response_shape() {
        let json = serde_json::to_value(TokenResponse { token: "abc".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "Token": "abc" }));
    }
}
