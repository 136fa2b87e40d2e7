use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Student,
  Teacher,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::Teacher => "teacher",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "student" => Some(Self::Student),
      "teacher" => Some(Self::Teacher),
      _ => None,
    }
  }
}

/// Identity of the current requester, as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContext {
  pub user_id: i64,
  pub username: String,
  pub role: Role,
}

impl UserContext {
  pub fn new(user_id: i64, username: &str, role: Role) -> Self {
    Self {
      user_id,
      username: username.to_string(),
      role,
    }
  }
}
