/*!
Account types.

Two disjoint account classes live in the credential store: regular users
(who may go on to be registered as teachers or students) and admin users.
The same email may exist in both tables at once; the tables are checked
independently.
*/
use serde::{Deserialize, Serialize};

/// Role tag carried in issued tokens.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            Role::Admin => "admin",
            Role::User  => "user",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user"  => Ok(Role::User),
            _ => Err(format!("{:?} is not a valid Role.", s)),
        }
    }
}

/// A row from the `users` table.
///
/// `password` holds the PHC hash string, never the plaintext.
#[derive(Clone, Debug)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub name: Option<String>,
}

/// A row from the `admin_users` table.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in [Role::Admin, Role::User] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
        assert!("boss".parse::<Role>().is_err());
    }
}
