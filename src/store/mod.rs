/*!
Database interaction module.

The Postgres database to which this connects is meant to have the
following sets of tables.

Two credential tables, checked independently of each other (an email may
appear in both):

```sql
CREATE TABLE users (
    id            BIGSERIAL PRIMARY KEY,
    email         TEXT UNIQUE NOT NULL,
    password      TEXT NOT NULL,   /* PHC hash string, never plaintext */
    gender        TEXT,
    date_of_birth TEXT,
    name          TEXT
);

CREATE TABLE admin_users (
    id       BIGSERIAL PRIMARY KEY,
    email    TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    name     TEXT NOT NULL
);
```

And the school records proper: reference data (subjects, classes), the
rows linking user accounts into school roles (teachers, students), the
many-to-many teacher/class relation, scores, and schedules. See
`school.rs` for those definitions.

*/
use std::fmt::Write;

use tokio_postgres::{Client, NoTls, Row, Statement, types::Type};

pub mod accounts;
pub mod school;

pub use accounts::RegisterResult;

static SCHEMA: &[(&str, &str, &str)] = &[
    (
        "SELECT FROM information_schema.tables WHERE table_name = 'users'",
        "CREATE TABLE users (
            id            BIGSERIAL PRIMARY KEY,
            email         TEXT UNIQUE NOT NULL,
            password      TEXT NOT NULL,   /* PHC hash string */
            gender        TEXT,
            date_of_birth TEXT,
            name          TEXT
        )",
        "DROP TABLE users",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'admin_users'",
        "CREATE TABLE admin_users (
            id       BIGSERIAL PRIMARY KEY,
            email    TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            name     TEXT NOT NULL
        )",
        "DROP TABLE admin_users",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'subjects'",
        "CREATE TABLE subjects (
            id   BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL
        )",
        "DROP TABLE subjects",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'classes'",
        "CREATE TABLE classes (
            id   BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL
        )",
        "DROP TABLE classes",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'teachers'",
        "CREATE TABLE teachers (
            id         BIGSERIAL PRIMARY KEY,
            user_id    BIGINT REFERENCES users(id),
            subject_id BIGINT REFERENCES subjects(id)
        )",
        "DROP TABLE teachers",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'students'",
        "CREATE TABLE students (
            id       BIGSERIAL PRIMARY KEY,
            user_id  BIGINT REFERENCES users(id),
            class_id BIGINT REFERENCES classes(id)
        )",
        "DROP TABLE students",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'teacher_class'",
        "CREATE TABLE teacher_class (
            id         BIGSERIAL PRIMARY KEY,
            teacher_id BIGINT REFERENCES teachers(id),
            class_id   BIGINT REFERENCES classes(id)
            /* deliberately no UNIQUE (teacher_id, class_id); repeated
               assignment makes repeated rows */
        )",
        "DROP TABLE teacher_class",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'scores'",
        "CREATE TABLE scores (
            id         BIGSERIAL PRIMARY KEY,
            student_id BIGINT REFERENCES students(id),
            subject_id BIGINT REFERENCES subjects(id),
            scores     TEXT
            /* one row per (student, subject) is kept by the application's
               update-or-insert, not by a constraint */
        )",
        "DROP TABLE scores",
    ),

    (
        "SELECT FROM information_schema.tables WHERE table_name = 'schedules'",
        "CREATE TABLE schedules (
            id        BIGSERIAL PRIMARY KEY,
            date      TEXT,
            class_id  BIGINT REFERENCES classes(id),
            time_slot SMALLINT,
            subject   TEXT    /* free text, not a subjects(id) reference */
        )",
        "DROP TABLE schedules",
    ),
];

/// Row-deletion order that respects the foreign keys above.
static WIPE_ORDER: &[&str] = &[
    "teacher_class",
    "scores",
    "schedules",
    "teachers",
    "students",
    "subjects",
    "classes",
    "users",
    "admin_users",
];

#[derive(Debug, PartialEq)]
pub struct DbError(pub(crate) String);

impl DbError {
    /// Prepend some contextual `annotation` for the error.
    fn annotate(self, annotation: &str) -> Self {
        let s = format!("{}: {}", annotation, &self.0);
        Self(s)
    }

    pub fn display(&self) -> &str { &self.0 }
}

impl From<tokio_postgres::error::Error> for DbError {
    fn from(e: tokio_postgres::error::Error) -> DbError {
        let mut s = format!("Data DB: {}", &e);
        if let Some(dbe) = e.as_db_error() {
            write!(&mut s, "; {}", dbe).unwrap();
        }
        DbError(s)
    }
}

impl From<String> for DbError {
    fn from(s: String) -> DbError { DbError(s) }
}

pub struct Store {
    connection_string: String,
}

impl Store {
    pub fn new(connection_string: String) -> Self {
        log::trace!("Store::new( {:?} ) called.", &connection_string);

        Self { connection_string }
    }

    pub(crate) async fn connect(&self) -> Result<Client, DbError> {
        log::trace!(
            "Store::connect() called w/connection string {:?}",
            &self.connection_string
        );

        match tokio_postgres::connect(&self.connection_string, NoTls).await {
            Ok((client, connection)) => {
                log::trace!("    ...connection successful.");
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        log::error!("Data DB connection error: {}", &e);
                    } else {
                        log::trace!("tokio connection runtime drops.");
                    }
                });
                Ok(client)
            },
            Err(e) => {
                let dberr = DbError::from(e);
                log::trace!("    ...connection failed: {:?}", &dberr);
                Err(dberr.annotate("Unable to connect"))
            }
        }
    }

    pub async fn ensure_db_schema(&self) -> Result<(), DbError> {
        log::trace!("Store::ensure_db_schema() called.");

        let mut client = self.connect().await?;
        let t = client.transaction().await
            .map_err(|e| DbError::from(e)
                .annotate("Data DB unable to begin transaction"))?;

        for (test_stmt, create_stmt, _) in SCHEMA.iter() {
            if t.query_opt(test_stmt.to_owned(), &[]).await?.is_none() {
                log::info!(
                    "{:?} returned no results; attempting to insert table.",
                    test_stmt
                );
                t.execute(create_stmt.to_owned(), &[]).await?;
            }
        }

        t.commit().await
            .map_err(|e| DbError::from(e)
                .annotate("Error committing transaction"))
    }

    /**
    Delete every row from every table, leaving the schema in place.

    The seeding utility runs this before repopulating; nothing in the
    serving path calls it.
    */
    pub async fn wipe_records(&self) -> Result<(), DbError> {
        log::trace!("Store::wipe_records() called.");

        let mut client = self.connect().await?;
        let t = client.transaction().await?;

        for table in WIPE_ORDER.iter() {
            let stmt = format!("DELETE FROM {}", table);
            let n = t.execute(stmt.as_str(), &[]).await?;
            log::trace!("    ...{} rows deleted from {}.", &n, table);
        }

        t.commit().await
            .map_err(|e| DbError::from(e)
                .annotate("Error committing record wipe"))
    }

    /**
    Drop all database tables to fully reset database state.

    This is only meant for cleanup after testing. It is advisable to look
    at the ERROR level log output when testing to ensure this method did
    its job.
    */
    #[cfg(test)]
    pub async fn nuke_database(&self) -> Result<(), DbError> {
        log::trace!("Store::nuke_database() called.");

        let client = self.connect().await?;

        for (_, _, drop_stmt) in SCHEMA.iter().rev() {
            if let Err(e) = client.execute(drop_stmt.to_owned(), &[]).await {
                let err = DbError::from(e);
                log::error!("Error dropping: {:?}: {}", &drop_stmt, &err.display());
            }
        }

        log::trace!("    ....nuking comlete.");
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    /*!
    These tests assume you have a Postgres instance running on your local
    machine with resources named according to what you see in the
    `static TEST_CONNECTION &str`:

    ```text
    user: registrar_test
    password: registrar_test

    with write access to:

    database: registrar_test
    ```

    They are `#[ignore]`d so the default test run stays hermetic; run them
    with

    ```bash
    cargo test -- --ignored
    ```
    */
    use super::*;
    use crate::tests::ensure_logging;

    use serial_test::serial;

    pub static TEST_CONNECTION: &str = "host=localhost user=registrar_test password='registrar_test' dbname=registrar_test";

    /**
    This function is for getting the database back in a blank slate state
    if a test panics partway through and leaves it munged.

    ```bash
    cargo test reset_store -- --ignored
    ```
    */
    #[tokio::test]
    #[ignore]
    #[serial]
    async fn reset_store() {
        ensure_logging();
        let db = Store::new(TEST_CONNECTION.to_owned());
        db.nuke_database().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn create_store() {
        ensure_logging();

        let db = Store::new(TEST_CONNECTION.to_owned());
        db.ensure_db_schema().await.unwrap();
        db.wipe_records().await.unwrap();
        db.nuke_database().await.unwrap();
    }
}
