/*
`Store` methods for the two credential tables.

Registration is the only write path, and it takes an already-hashed
password; plaintext never reaches this module. The duplicate-email check
runs per table, so one email may be registered as both a regular user and
an admin.
*/
use tokio_postgres::Row;

use super::{Store, DbError};
use crate::account::{AdminAccount, UserAccount};

/// Outcome of a registration attempt.
#[derive(Debug)]
pub enum RegisterResult<T> {
    Created(T),
    DuplicateEmail,
}

fn user_from_row(row: &Row) -> Result<UserAccount, DbError> {
    log::trace!("user_from_row( {:?} ) called.", row);

    Ok(UserAccount {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
        gender: row.try_get("gender")?,
        date_of_birth: row.try_get("date_of_birth")?,
        name: row.try_get("name")?,
    })
}

fn admin_from_row(row: &Row) -> Result<AdminAccount, DbError> {
    log::trace!("admin_from_row( {:?} ) called.", row);

    Ok(AdminAccount {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
        name: row.try_get("name")?,
    })
}

impl Store {
    /// Insert a new regular user account.
    ///
    /// Checks for a preexisting email in the `users` table (and only
    /// there) before inserting; reports `DuplicateEmail` rather than
    /// tripping the unique constraint so the caller can answer with a
    /// client error instead of a server one.
    pub async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        gender: Option<&str>,
        date_of_birth: Option<&str>,
        name: Option<&str>,
    ) -> Result<RegisterResult<UserAccount>, DbError> {
        log::trace!(
            "Store::insert_user( {:?}, [ hash ], {:?}, {:?}, {:?} ) called.",
            email, gender, date_of_birth, name
        );

        let mut client = self.connect().await?;
        let t = client.transaction().await?;

        if t.query_opt(
            "SELECT id FROM users WHERE email = $1",
            &[&email]
        ).await?.is_some() {
            return Ok(RegisterResult::DuplicateEmail);
        }

        let row = t.query_one(
            "INSERT INTO users (email, password, gender, date_of_birth, name)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *",
            &[&email, &password_hash, &gender, &date_of_birth, &name]
        ).await?;
        let u = user_from_row(&row)?;

        t.commit().await?;
        log::trace!("Inserted user {:?} ({}).", &u.email, &u.id);
        Ok(RegisterResult::Created(u))
    }

    /// Insert a new admin account; same contract as `insert_user`, but
    /// against the `admin_users` table.
    pub async fn insert_admin(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<RegisterResult<AdminAccount>, DbError> {
        log::trace!(
            "Store::insert_admin( {:?}, [ hash ], {:?} ) called.",
            email, name
        );

        let mut client = self.connect().await?;
        let t = client.transaction().await?;

        if t.query_opt(
            "SELECT id FROM admin_users WHERE email = $1",
            &[&email]
        ).await?.is_some() {
            return Ok(RegisterResult::DuplicateEmail);
        }

        let row = t.query_one(
            "INSERT INTO admin_users (email, password, name)
                VALUES ($1, $2, $3)
                RETURNING *",
            &[&email, &password_hash, &name]
        ).await?;
        let a = admin_from_row(&row)?;

        t.commit().await?;
        log::trace!("Inserted admin {:?} ({}).", &a.email, &a.id);
        Ok(RegisterResult::Created(a))
    }

    pub async fn user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserAccount>, DbError> {
        log::trace!("Store::user_by_email( {:?} ) called.", email);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM users WHERE email = $1",
            &[&email]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(user_from_row(&row)?)),
        }
    }

    pub async fn admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminAccount>, DbError> {
        log::trace!("Store::admin_by_email( {:?} ) called.", email);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM admin_users WHERE email = $1",
            &[&email]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(admin_from_row(&row)?)),
        }
    }

    pub async fn user_by_id(
        &self,
        id: i64,
    ) -> Result<Option<UserAccount>, DbError> {
        log::trace!("Store::user_by_id( {} ) called.", &id);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM users WHERE id = $1",
            &[&id]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(user_from_row(&row)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serial_test::serial;

    use crate::tests::ensure_logging;
    use crate::store::tests::TEST_CONNECTION;

    // Not a real hash; these tests never verify passwords.
    static PW: &str = "$argon2id$fake$fake";

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn duplicate_emails_per_table() {
        ensure_logging();

        let db = Store::new(TEST_CONNECTION.to_owned());
        db.ensure_db_schema().await.unwrap();

        let u = match db.insert_user(
            "thelma@example.com", PW, Some("F"), None, Some("Thelma")
        ).await.unwrap() {
            RegisterResult::Created(u) => u,
            x => panic!("first user insert returned {:?}", &x),
        };
        assert_eq!(&u.email, "thelma@example.com");

        // Second registration of the same email in the same table fails.
        match db.insert_user(
            "thelma@example.com", PW, None, None, None
        ).await.unwrap() {
            RegisterResult::DuplicateEmail => {},
            x => panic!("second user insert returned {:?}", &x),
        }

        // The admin table is checked independently, so the same email
        // can be registered there, too.
        match db.insert_admin("thelma@example.com", PW, "Thelma").await.unwrap() {
            RegisterResult::Created(a) => {
                assert_eq!(&a.email, "thelma@example.com");
            },
            x => panic!("admin insert returned {:?}", &x),
        }
        match db.insert_admin("thelma@example.com", PW, "Thelma").await.unwrap() {
            RegisterResult::DuplicateEmail => {},
            x => panic!("second admin insert returned {:?}", &x),
        }

        let found = db.user_by_email("thelma@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, u.id);
        assert!(db.user_by_email("nobody@example.com").await.unwrap().is_none());

        db.nuke_database().await.unwrap();
    }
}
