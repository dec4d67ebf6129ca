use super::money::Balance;
use super::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = u32;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => f.write_str("customer"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// A registered renter or administrator.
///
/// The deposit is the prepaid balance rentals are paid from. It only changes
/// through a top-up or a rental debit, both of which run inside a repository
/// transaction holding the user's lock.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// bcrypt hash of the password. Never leaves the process in a response.
    #[serde(rename = "password", skip_serializing, default)]
    pub password_hash: String,
    pub deposit: Balance,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields needed to insert a user; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub deposit: Balance,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            deposit: self.deposit,
            role: self.role,
        }
    }
}

/// A user together with their rental history.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct UserWithRecords {
    #[serde(flatten)]
    pub user: User,
    pub records: Vec<Record>,
}
