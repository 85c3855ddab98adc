//! Users tasks can be assigned to.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::non_blank;

/// Id of the always-present placeholder assignee.
pub const UNASSIGNED_USER_ID: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl User {
    /// The placeholder assignee every board carries.
    pub fn unassigned() -> Self {
        User {
            id: UNASSIGNED_USER_ID.to_string(),
            name: "Unassigned".to_string(),
            email: String::new(),
        }
    }

    /// Whether this is the placeholder user.
    pub fn is_unassigned(&self) -> bool {
        self.id == UNASSIGNED_USER_ID
    }
}

/// Check a name/email pair before it is written. Returns the trimmed values.
pub fn validate_user_fields<'a>(name: &'a str, email: &'a str) -> Result<(&'a str, &'a str)> {
    let name = non_blank(name).ok_or_else(|| Error::invalid_field("name", "cannot be blank"))?;
    let email =
        non_blank(email).ok_or_else(|| Error::invalid_field("email", "cannot be blank"))?;
    if !email.contains('@') {
        return Err(Error::invalid_field("email", format!("'{email}' is not an address")));
    }
    Ok((name, email))
}

/// Make sure the placeholder user is present, first in the list.
pub fn ensure_unassigned(users: &mut Vec<User>) {
    if let Some(pos) = users.iter().position(User::is_unassigned) {
        if pos != 0 {
            let u = users.remove(pos);
            users.insert(0, u);
        }
    } else {
        users.insert(0, User::unassigned());
    }
}
