/*!
School record types.

These are straight images of their database rows. Reference data
(`Subject`, `Class`) is created by an administrator and then only read;
`Teacher` and `Student` link a user account into a school role; a
`Schedule` names its subject as free text on purpose, with no tie to the
`subjects` table.
*/
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
}

/// Links one user account to the one subject they teach.
#[derive(Clone, Debug, Serialize)]
pub struct Teacher {
    pub id: i64,
    pub user_id: i64,
    pub subject_id: i64,
}

/// Links one user account to the one class they sit in.
#[derive(Clone, Debug, Serialize)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub class_id: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Schedule {
    pub id: i64,
    pub date: Option<String>,
    pub class_id: i64,
    pub time_slot: i16,
    pub subject: String,
}
