//! Request identity extractor.
//!
//! Identity is established upstream (reverse proxy or gateway) and arrives
//! as trusted headers. Add `CurrentUser` as a handler parameter to require
//! a user; call `require_admin` inside admin handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub user_id: String,
  pub is_admin: bool,
}

impl CurrentUser {
  pub fn require_admin(&self) -> AppResult<()> {
    if self.is_admin {
      Ok(())
    } else {
      Err(AppError::Forbidden)
    }
  }
}

impl FromRequestParts<AppState> for CurrentUser {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, AppError> {
    let user_id = parts
      .headers
      .get(USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .ok_or(AppError::Unauthorized)?;

    let is_admin = parts
      .headers
      .get(ROLE_HEADER)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));

    Ok(CurrentUser {
      user_id: user_id.to_string(),
      is_admin,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_require_admin() {
    let admin = CurrentUser {
      user_id: "anika".into(),
      is_admin: true,
    };
    assert!(admin.require_admin().is_ok());

    let user = CurrentUser {
      user_id: "rahim".into(),
      is_admin: false,
    };
    assert!(matches!(user.require_admin(), Err(AppError::Forbidden)));
  }
}
