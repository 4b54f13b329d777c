/*
`Store` methods for the school records proper.

```sql
CREATE TABLE subjects (
    id   BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE classes (
    id   BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE teachers (
    id         BIGSERIAL PRIMARY KEY,
    user_id    BIGINT REFERENCES users(id),
    subject_id BIGINT REFERENCES subjects(id)
);

CREATE TABLE students (
    id       BIGSERIAL PRIMARY KEY,
    user_id  BIGINT REFERENCES users(id),
    class_id BIGINT REFERENCES classes(id)
);

CREATE TABLE teacher_class (
    id         BIGSERIAL PRIMARY KEY,
    teacher_id BIGINT REFERENCES teachers(id),
    class_id   BIGINT REFERENCES classes(id)
);

CREATE TABLE scores (
    id         BIGSERIAL PRIMARY KEY,
    student_id BIGINT REFERENCES students(id),
    subject_id BIGINT REFERENCES subjects(id),
    scores     TEXT
);

CREATE TABLE schedules (
    id        BIGSERIAL PRIMARY KEY,
    date      TEXT,
    class_id  BIGINT REFERENCES classes(id),
    time_slot SMALLINT,
    subject   TEXT
);
```

Existence checks on referenced rows happen at the handler layer (that is
where a miss becomes a 404); these methods assume their ids are good and
let the foreign keys complain otherwise.
*/
use serde::Serialize;
use tokio_postgres::{Row, types::Type};

use super::{Store, DbError};
use crate::school::{Class, Schedule, Student, Subject, Teacher};

/// One row of the admin's teacher listing: the teacher joined with their
/// user account and subject.
#[derive(Debug, Serialize)]
pub struct TeacherOverview {
    pub teacher_id: i64,
    pub user_id: i64,
    pub name: Option<String>,
    pub subject: Option<String>,
}

/// One row of a teacher's student listing: the student joined with their
/// user account and their score in the teacher's own subject, if any.
#[derive(Debug, Serialize)]
pub struct ClassStudent {
    pub student_id: i64,
    pub user_id: i64,
    pub name: Option<String>,
    pub class_id: i64,
    pub score: Option<String>,
}

/// A student's score in one subject, by name.
#[derive(Debug, Serialize)]
pub struct SubjectScore {
    pub subject: String,
    pub score: String,
}

fn subject_from_row(row: &Row) -> Result<Subject, DbError> {
    Ok(Subject {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

fn class_from_row(row: &Row) -> Result<Class, DbError> {
    Ok(Class {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

fn teacher_from_row(row: &Row) -> Result<Teacher, DbError> {
    Ok(Teacher {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        subject_id: row.try_get("subject_id")?,
    })
}

fn student_from_row(row: &Row) -> Result<Student, DbError> {
    Ok(Student {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        class_id: row.try_get("class_id")?,
    })
}

fn schedule_from_row(row: &Row) -> Result<Schedule, DbError> {
    Ok(Schedule {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        class_id: row.try_get("class_id")?,
        time_slot: row.try_get("time_slot")?,
        subject: row.try_get("subject")?,
    })
}

impl Store {
    pub async fn insert_subject(&self, name: &str) -> Result<Subject, DbError> {
        log::trace!("Store::insert_subject( {:?} ) called.", name);

        let client = self.connect().await?;
        let row = client.query_one(
            "INSERT INTO subjects (name) VALUES ($1) RETURNING *",
            &[&name]
        ).await?;

        subject_from_row(&row)
    }

    /// Insert several subjects in one transaction; the seeding utility's
    /// path.
    pub async fn insert_subjects(
        &self,
        names: &[&str],
    ) -> Result<Vec<Subject>, DbError> {
        log::trace!("Store::insert_subjects( [ {} names ] ) called.", names.len());

        let mut client = self.connect().await?;
        let t = client.transaction().await?;
        let insert_query = t.prepare_typed(
            "INSERT INTO subjects (name) VALUES ($1) RETURNING *",
            &[Type::TEXT]
        ).await?;

        let mut subjects: Vec<Subject> = Vec::with_capacity(names.len());
        for name in names.iter() {
            let row = t.query_one(&insert_query, &[name]).await?;
            subjects.push(subject_from_row(&row)?);
        }

        t.commit().await?;
        Ok(subjects)
    }

    pub async fn insert_class(&self, name: &str) -> Result<Class, DbError> {
        log::trace!("Store::insert_class( {:?} ) called.", name);

        let client = self.connect().await?;
        let row = client.query_one(
            "INSERT INTO classes (name) VALUES ($1) RETURNING *",
            &[&name]
        ).await?;

        class_from_row(&row)
    }

    pub async fn insert_classes(
        &self,
        names: &[&str],
    ) -> Result<Vec<Class>, DbError> {
        log::trace!("Store::insert_classes( [ {} names ] ) called.", names.len());

        let mut client = self.connect().await?;
        let t = client.transaction().await?;
        let insert_query = t.prepare_typed(
            "INSERT INTO classes (name) VALUES ($1) RETURNING *",
            &[Type::TEXT]
        ).await?;

        let mut classes: Vec<Class> = Vec::with_capacity(names.len());
        for name in names.iter() {
            let row = t.query_one(&insert_query, &[name]).await?;
            classes.push(class_from_row(&row)?);
        }

        t.commit().await?;
        Ok(classes)
    }

    pub async fn get_subjects(&self) -> Result<Vec<Subject>, DbError> {
        log::trace!("Store::get_subjects() called.");

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT * FROM subjects ORDER BY id",
            &[]
        ).await?;

        let mut subjects: Vec<Subject> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            subjects.push(subject_from_row(row)?);
        }
        Ok(subjects)
    }

    pub async fn get_classes(&self) -> Result<Vec<Class>, DbError> {
        log::trace!("Store::get_classes() called.");

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT * FROM classes ORDER BY id",
            &[]
        ).await?;

        let mut classes: Vec<Class> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            classes.push(class_from_row(row)?);
        }
        Ok(classes)
    }

    pub async fn subject_by_id(&self, id: i64) -> Result<Option<Subject>, DbError> {
        log::trace!("Store::subject_by_id( {} ) called.", &id);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM subjects WHERE id = $1",
            &[&id]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(subject_from_row(&row)?)),
        }
    }

    pub async fn class_by_id(&self, id: i64) -> Result<Option<Class>, DbError> {
        log::trace!("Store::class_by_id( {} ) called.", &id);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM classes WHERE id = $1",
            &[&id]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(class_from_row(&row)?)),
        }
    }

    pub async fn teacher_by_id(&self, id: i64) -> Result<Option<Teacher>, DbError> {
        log::trace!("Store::teacher_by_id( {} ) called.", &id);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM teachers WHERE id = $1",
            &[&id]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(teacher_from_row(&row)?)),
        }
    }

    pub async fn student_by_id(&self, id: i64) -> Result<Option<Student>, DbError> {
        log::trace!("Store::student_by_id( {} ) called.", &id);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM students WHERE id = $1",
            &[&id]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(student_from_row(&row)?)),
        }
    }

    /// Look a student up by the id of their user account (the shape the
    /// student-facing endpoints receive).
    pub async fn student_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<Student>, DbError> {
        log::trace!("Store::student_by_user_id( {} ) called.", &user_id);

        let client = self.connect().await?;
        match client.query_opt(
            "SELECT * FROM students WHERE user_id = $1",
            &[&user_id]
        ).await? {
            None => Ok(None),
            Some(row) => Ok(Some(student_from_row(&row)?)),
        }
    }

    pub async fn insert_teacher(
        &self,
        user_id: i64,
        subject_id: i64,
    ) -> Result<Teacher, DbError> {
        log::trace!(
            "Store::insert_teacher( {}, {} ) called.",
            &user_id, &subject_id
        );

        let client = self.connect().await?;
        let row = client.query_one(
            "INSERT INTO teachers (user_id, subject_id)
                VALUES ($1, $2)
                RETURNING *",
            &[&user_id, &subject_id]
        ).await?;

        teacher_from_row(&row)
    }

    pub async fn insert_student(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> Result<Student, DbError> {
        log::trace!(
            "Store::insert_student( {}, {} ) called.",
            &user_id, &class_id
        );

        let client = self.connect().await?;
        let row = client.query_one(
            "INSERT INTO students (user_id, class_id)
                VALUES ($1, $2)
                RETURNING *",
            &[&user_id, &class_id]
        ).await?;

        student_from_row(&row)
    }

    /// Add a teacher/class link.
    ///
    /// Makes no attempt to deduplicate; assigning the same pair twice
    /// leaves two rows, and the listing queries cope.
    pub async fn assign_teacher_to_class(
        &self,
        teacher_id: i64,
        class_id: i64,
    ) -> Result<(), DbError> {
        log::trace!(
            "Store::assign_teacher_to_class( {}, {} ) called.",
            &teacher_id, &class_id
        );

        let client = self.connect().await?;
        client.execute(
            "INSERT INTO teacher_class (teacher_id, class_id)
                VALUES ($1, $2)",
            &[&teacher_id, &class_id]
        ).await?;

        Ok(())
    }

    pub async fn teachers_overview(&self) -> Result<Vec<TeacherOverview>, DbError> {
        log::trace!("Store::teachers_overview() called.");

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT t.id, t.user_id, u.name, s.name AS subject
                FROM teachers t
                LEFT JOIN users u ON u.id = t.user_id
                LEFT JOIN subjects s ON s.id = t.subject_id
                ORDER BY t.id",
            &[]
        ).await?;

        let mut overview: Vec<TeacherOverview> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            overview.push(TeacherOverview {
                teacher_id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                subject: row.try_get("subject")?,
            });
        }
        Ok(overview)
    }

    /// The distinct classes a teacher is assigned to.
    ///
    /// `teacher_class` can hold duplicate links, so this deduplicates.
    pub async fn classes_for_teacher(
        &self,
        teacher_id: i64,
    ) -> Result<Vec<Class>, DbError> {
        log::trace!("Store::classes_for_teacher( {} ) called.", &teacher_id);

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT DISTINCT c.id, c.name
                FROM teacher_class tc
                JOIN classes c ON c.id = tc.class_id
                WHERE tc.teacher_id = $1
                ORDER BY c.id",
            &[&teacher_id]
        ).await?;

        let mut classes: Vec<Class> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            classes.push(class_from_row(row)?);
        }
        Ok(classes)
    }

    /// Every student in every class the teacher is assigned to, with the
    /// student's score in the teacher's own subject attached (null when
    /// unscored). Duplicate class links must not duplicate students.
    pub async fn students_for_teacher(
        &self,
        teacher_id: i64,
    ) -> Result<Vec<ClassStudent>, DbError> {
        log::trace!("Store::students_for_teacher( {} ) called.", &teacher_id);

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT DISTINCT st.id, st.user_id, u.name, st.class_id, sc.scores
                FROM teacher_class tc
                JOIN students st ON st.class_id = tc.class_id
                LEFT JOIN users u ON u.id = st.user_id
                LEFT JOIN teachers t ON t.id = tc.teacher_id
                LEFT JOIN scores sc ON sc.student_id = st.id
                    AND sc.subject_id = t.subject_id
                WHERE tc.teacher_id = $1
                ORDER BY st.id",
            &[&teacher_id]
        ).await?;

        let mut students: Vec<ClassStudent> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            students.push(ClassStudent {
                student_id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                class_id: row.try_get("class_id")?,
                score: row.try_get("scores")?,
            });
        }
        Ok(students)
    }

    /**
    Record a score, overwriting any existing one for the same
    (student, subject) pair.

    The check-then-write runs in one transaction but takes no row lock,
    so two simultaneous writers for the same pair can still race; the
    loser's value wins silently.
    */
    pub async fn upsert_score(
        &self,
        student_id: i64,
        subject_id: i64,
        value: &str,
    ) -> Result<(), DbError> {
        log::trace!(
            "Store::upsert_score( {}, {}, {:?} ) called.",
            &student_id, &subject_id, value
        );

        let mut client = self.connect().await?;
        let t = client.transaction().await?;

        match t.query_opt(
            "SELECT id FROM scores WHERE student_id = $1 AND subject_id = $2",
            &[&student_id, &subject_id]
        ).await? {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                t.execute(
                    "UPDATE scores SET scores = $1 WHERE id = $2",
                    &[&value, &id]
                ).await?;
            },
            None => {
                t.execute(
                    "INSERT INTO scores (student_id, subject_id, scores)
                        VALUES ($1, $2, $3)",
                    &[&student_id, &subject_id, &value]
                ).await?;
            },
        }

        t.commit().await
            .map_err(|e| DbError::from(e)
                .annotate("Error committing score"))
    }

    /// Insert many score rows at once; the seeding utility's path, which
    /// assumes an empty `scores` table and so skips the upsert check.
    pub async fn insert_scores(
        &self,
        rows: &[(i64, i64, String)],
    ) -> Result<usize, DbError> {
        log::trace!("Store::insert_scores( [ {} rows ] ) called.", rows.len());

        let mut client = self.connect().await?;
        let t = client.transaction().await?;
        let insert_query = t.prepare_typed(
            "INSERT INTO scores (student_id, subject_id, scores)
                VALUES ($1, $2, $3)",
            &[Type::INT8, Type::INT8, Type::TEXT]
        ).await?;

        let mut n: usize = 0;
        for (student_id, subject_id, value) in rows.iter() {
            t.execute(&insert_query, &[student_id, subject_id, value]).await?;
            n += 1;
        }

        t.commit().await?;
        Ok(n)
    }

    /// A student's scores with their subject names.
    pub async fn scores_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<SubjectScore>, DbError> {
        log::trace!("Store::scores_for_student( {} ) called.", &student_id);

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT s.name, sc.scores
                FROM scores sc
                JOIN subjects s ON s.id = sc.subject_id
                WHERE sc.student_id = $1
                ORDER BY sc.id",
            &[&student_id]
        ).await?;

        let mut scores: Vec<SubjectScore> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            scores.push(SubjectScore {
                subject: row.try_get("name")?,
                score: row.try_get("scores")?,
            });
        }
        Ok(scores)
    }

    pub async fn insert_schedule(
        &self,
        date: Option<&str>,
        class_id: i64,
        time_slot: i16,
        subject: &str,
    ) -> Result<Schedule, DbError> {
        log::trace!(
            "Store::insert_schedule( {:?}, {}, {}, {:?} ) called.",
            date, &class_id, &time_slot, subject
        );

        let client = self.connect().await?;
        let row = client.query_one(
            "INSERT INTO schedules (date, class_id, time_slot, subject)
                VALUES ($1, $2, $3, $4)
                RETURNING *",
            &[&date, &class_id, &time_slot, &subject]
        ).await?;

        schedule_from_row(&row)
    }

    pub async fn schedules_for_class(
        &self,
        class_id: i64,
    ) -> Result<Vec<Schedule>, DbError> {
        log::trace!("Store::schedules_for_class( {} ) called.", &class_id);

        let client = self.connect().await?;
        let rows = client.query(
            "SELECT * FROM schedules WHERE class_id = $1 ORDER BY id",
            &[&class_id]
        ).await?;

        let mut schedules: Vec<Schedule> = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            schedules.push(schedule_from_row(row)?);
        }
        Ok(schedules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serial_test::serial;

    use crate::store::RegisterResult;
    use crate::tests::ensure_logging;
    use crate::store::tests::TEST_CONNECTION;

    static PW: &str = "$argon2id$fake$fake";

    /// Insert a user account + teacher + student scaffold for the tests
    /// below.
    async fn scaffold(db: &Store) -> (Teacher, Student, Class, Subject) {
        let subject = db.insert_subject("Math").await.unwrap();
        let class = db.insert_class("Class A").await.unwrap();

        let t_user = match db.insert_user(
            "jenny@example.com", PW, None, None, Some("Ms Jenny")
        ).await.unwrap() {
            RegisterResult::Created(u) => u,
            x => panic!("teacher user insert returned {:?}", &x),
        };
        let s_user = match db.insert_user(
            "jsmith@example.com", PW, Some("M"), Some("2001-06-05"), Some("John Smith")
        ).await.unwrap() {
            RegisterResult::Created(u) => u,
            x => panic!("student user insert returned {:?}", &x),
        };

        let teacher = db.insert_teacher(t_user.id, subject.id).await.unwrap();
        let student = db.insert_student(s_user.id, class.id).await.unwrap();

        (teacher, student, class, subject)
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn score_upsert_keeps_one_row() {
        ensure_logging();

        let db = Store::new(TEST_CONNECTION.to_owned());
        db.ensure_db_schema().await.unwrap();
        let (_, student, _, subject) = scaffold(&db).await;

        db.upsert_score(student.id, subject.id, "7.25").await.unwrap();
        db.upsert_score(student.id, subject.id, "9.5").await.unwrap();

        let scores = db.scores_for_student(student.id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(&scores[0].subject, "Math");
        assert_eq!(&scores[0].score, "9.5");

        db.nuke_database().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn double_assignment_deduplicated_on_read() {
        ensure_logging();

        let db = Store::new(TEST_CONNECTION.to_owned());
        db.ensure_db_schema().await.unwrap();
        let (teacher, student, class, subject) = scaffold(&db).await;

        db.assign_teacher_to_class(teacher.id, class.id).await.unwrap();
        db.assign_teacher_to_class(teacher.id, class.id).await.unwrap();

        // Two raw rows land in the join table...
        let client = db.connect().await.unwrap();
        let row = client.query_one(
            "SELECT COUNT(*) AS n FROM teacher_class WHERE teacher_id = $1",
            &[&teacher.id]
        ).await.unwrap();
        let n: i64 = row.try_get("n").unwrap();
        assert_eq!(n, 2);

        // ...but the listing queries see each thing once.
        let classes = db.classes_for_teacher(teacher.id).await.unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(&classes[0].name, "Class A");

        db.upsert_score(student.id, subject.id, "8.0").await.unwrap();
        let students = db.students_for_teacher(teacher.id).await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].student_id, student.id);
        assert_eq!(students[0].score.as_deref(), Some("8.0"));
        assert_eq!(students[0].name.as_deref(), Some("John Smith"));

        db.nuke_database().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    #[serial]
    async fn schedules_by_class() {
        ensure_logging();

        let db = Store::new(TEST_CONNECTION.to_owned());
        db.ensure_db_schema().await.unwrap();
        let (_, student, class, _) = scaffold(&db).await;

        assert!(db.schedules_for_class(class.id).await.unwrap().is_empty());

        db.insert_schedule(Some("1"), class.id, 3, "Math").await.unwrap();
        db.insert_schedule(None, class.id, 4, "History").await.unwrap();

        let scheds = db.schedules_for_class(class.id).await.unwrap();
        assert_eq!(scheds.len(), 2);
        assert_eq!(scheds[0].time_slot, 3);
        assert_eq!(scheds[1].date, None);

        // The student-facing lookup goes through the user account id.
        let found = db.student_by_user_id(student.user_id).await.unwrap().unwrap();
        assert_eq!(found.id, student.id);

        db.nuke_database().await.unwrap();
    }
}
