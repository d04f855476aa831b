use serde::{Deserialize, Deserializer, Serialize};

/// Coarse authorization tier deciding which dashboard a user reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
    Owner,
}

impl Role {
    /// Lenient parse of the API's role string. Anything unknown is an employee.
    pub fn from_api(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("owner") => Role::Owner,
            Some("manager") => Role::Manager,
            _ => Role::Employee,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Owner => "owner",
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Role::from_api(raw.as_deref()))
    }
}

fn default_role() -> Role {
    Role::Employee
}

/// The user behind the current access token, as answered by `GET /api/auth/user/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub username: String,
    #[serde(rename = "fullname", default)]
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

/// Credentials posted by the login form.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Fields posted by the registration form.
#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub fullname: String,
}

/// Payload sent to `POST /api/auth/register/`.
#[derive(Serialize)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub fullname: &'a str,
    pub role: Role,
}
