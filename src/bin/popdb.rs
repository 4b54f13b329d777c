/*!
Populating the local database with enough generated fake data to allow
some experimentation.

Wipes every record first, then writes a school's worth of admins,
subjects, classes, teachers (with class assignments), students,
schedules, and scores through the same `Store` methods the handlers use.
Every generated account gets the same default password.
*/
use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use simplelog::{ColorChoice, TerminalMode, TermLogger};
use time::{
    Date, Month,
    format_description::FormatItem,
    macros::format_description,
};

use registrar::{
    auth,
    config,
    school::{Class, Student, Subject, Teacher},
    store::RegisterResult,
};

const NUM_ADMINS: usize = 5;
const NUM_CLASSES: usize = 10;
const MIN_STUDENTS_PER_CLASS: usize = 18;
const MAX_STUDENTS_PER_CLASS: usize = 22;
const NUM_SCHEDULES_PER_CLASS: usize = 10;
const NUM_TEACHERS: usize = 40; // 4 teachers per subject
const MAX_CLASSES_PER_TEACHER: usize = 3;

static SUBJECT_NAMES: &[&str] = &[
    "Math", "Physics", "Chemistry", "English", "Literature",
    "Biology", "History", "Geography", "P.E", "Ethics",
];

static FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Alice", "Bob", "Carol",
    "David", "Eve", "Frank", "Grace", "Heidi",
];
static LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown",
    "Jones", "Garcia", "Miller", "Davis",
];

static DEFAULT_PASSWORD: &str = "password123";

const DATE_FMT: &[FormatItem] = format_description!("[year]-[month]-[day]");

/// Hands out emails of the form `{base}{nnn}@example.com`, never the same
/// one twice.
struct EmailGen {
    used: HashSet<String>,
}

impl EmailGen {
    fn new() -> Self {
        Self { used: HashSet::new() }
    }

    fn unique<R: Rng>(&mut self, rng: &mut R, base: &str) -> String {
        loop {
            let suffix: u32 = rng.gen_range(0..1000);
            let email = format!("{}{:03}@example.com", base, suffix);
            if self.used.insert(email.clone()) {
                return email;
            }
        }
    }
}

fn random_name<R: Rng>(rng: &mut R) -> String {
    format!(
        "{} {}",
        FIRST_NAMES.choose(rng).unwrap(),
        LAST_NAMES.choose(rng).unwrap()
    )
}

/// A random YYYY-MM-DD string for a plausible date of birth (between
/// 1980 and 2012).
fn random_date_of_birth<R: Rng>(rng: &mut R) -> String {
    let start = Date::from_calendar_date(1980, Month::January, 1)
        .unwrap()
        .to_julian_day();
    let end = Date::from_calendar_date(2012, Month::December, 31)
        .unwrap()
        .to_julian_day();

    Date::from_julian_day(rng.gen_range(start..=end))
        .unwrap()
        .format(&DATE_FMT)
        .unwrap()
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("registrar")
        .build();
    TermLogger::init(
        registrar::log_level_from_env(),
        log_cfg,
        TerminalMode::Stdout,
        ColorChoice::Auto
    ).unwrap();

    let config_path = std::env::var("REGISTRAR_CONFIG")
        .unwrap_or_else(|_| "registrar.toml".to_owned());
    // This also assures the schema and the default admin, so the seeded
    // database comes up ready to log into.
    let glob = config::load_configuration(&config_path).await.unwrap();
    let db = &glob.store;

    println!("Wiping existing records...");
    db.wipe_records().await.unwrap();

    let mut rng = rand::thread_rng();
    let mut emails = EmailGen::new();
    // One hash serves every generated account; they all share the
    // default password anyway.
    let pw_hash = auth::hash_password(DEFAULT_PASSWORD).unwrap();

    println!("Seeding admins...");
    for _ in 0..NUM_ADMINS {
        let email = emails.unique(&mut rng, "admin");
        let name = random_name(&mut rng);
        match db.insert_admin(&email, &pw_hash, &name).await.unwrap() {
            RegisterResult::Created(_) => {},
            RegisterResult::DuplicateEmail => {
                log::warn!("Admin email {:?} already present; skipping.", &email);
            },
        }
    }

    println!("Seeding subjects and classes...");
    let subjects: Vec<Subject> = db.insert_subjects(SUBJECT_NAMES).await.unwrap();

    let class_names: Vec<String> = (0..NUM_CLASSES)
        .map(|i| format!("Class {}", char::from(b'A' + i as u8)))
        .collect();
    let class_name_refs: Vec<&str> = class_names.iter()
        .map(|s| s.as_str())
        .collect();
    let classes: Vec<Class> = db.insert_classes(&class_name_refs).await.unwrap();

    println!("Seeding teachers...");
    let mut teachers: Vec<Teacher> = Vec::with_capacity(NUM_TEACHERS);
    for n in 0..NUM_TEACHERS {
        let email = emails.unique(&mut rng, "teacher");
        let name = random_name(&mut rng);
        let gender = ["M", "F"].choose(&mut rng).copied().unwrap();
        let dob = random_date_of_birth(&mut rng);

        let user = match db.insert_user(
            &email, &pw_hash, Some(gender), Some(&dob), Some(&name)
        ).await.unwrap() {
            RegisterResult::Created(u) => u,
            RegisterResult::DuplicateEmail => {
                log::warn!("User email {:?} already present; skipping.", &email);
                continue;
            },
        };

        // Subjects round-robin, so each ends up with four teachers.
        let subject = &subjects[n % subjects.len()];
        teachers.push(db.insert_teacher(user.id, subject.id).await.unwrap());
    }

    println!("Assigning teachers to classes (up to {} each)...", MAX_CLASSES_PER_TEACHER);
    for teacher in teachers.iter() {
        let k = rng.gen_range(1..=MAX_CLASSES_PER_TEACHER);
        let chosen: Vec<&Class> = classes.choose_multiple(&mut rng, k).collect();
        for c in chosen.iter() {
            db.assign_teacher_to_class(teacher.id, c.id).await.unwrap();
        }
    }

    println!("Seeding students in each class...");
    let mut students: Vec<Student> = Vec::with_capacity(
        NUM_CLASSES * MAX_STUDENTS_PER_CLASS
    );
    for c in classes.iter() {
        let n = rng.gen_range(MIN_STUDENTS_PER_CLASS..=MAX_STUDENTS_PER_CLASS);
        for _ in 0..n {
            let email = emails.unique(&mut rng, "student");
            let name = random_name(&mut rng);
            let gender = ["M", "F"].choose(&mut rng).copied().unwrap();
            let dob = random_date_of_birth(&mut rng);

            let user = match db.insert_user(
                &email, &pw_hash, Some(gender), Some(&dob), Some(&name)
            ).await.unwrap() {
                RegisterResult::Created(u) => u,
                RegisterResult::DuplicateEmail => {
                    log::warn!("User email {:?} already present; skipping.", &email);
                    continue;
                },
            };

            students.push(db.insert_student(user.id, c.id).await.unwrap());
        }
    }

    println!("Seeding schedules...");
    for c in classes.iter() {
        for _ in 0..NUM_SCHEDULES_PER_CLASS {
            let day: u8 = rng.gen_range(1..=5); // 1=Mon, 5=Fri
            let slot: i16 = rng.gen_range(1..=7);
            let subject = subjects.choose(&mut rng).unwrap();
            db.insert_schedule(
                Some(&day.to_string()), c.id, slot, &subject.name
            ).await.unwrap();
        }
    }

    println!("Seeding scores for each student in each subject...");
    let mut score_rows: Vec<(i64, i64, String)> = Vec::with_capacity(
        students.len() * subjects.len()
    );
    for student in students.iter() {
        for subject in subjects.iter() {
            // 0.0 through 10.0 in steps of 0.25.
            let value = (rng.gen_range(0..=40) as f32) * 0.25;
            score_rows.push((student.id, subject.id, format!("{:.2}", value)));
        }
    }
    let n_scores = db.insert_scores(&score_rows).await.unwrap();

    println!(
        "Done: {} admins, {} subjects, {} classes, {} teachers, {} students, {} scores.",
        NUM_ADMINS, subjects.len(), classes.len(),
        teachers.len(), students.len(), n_scores
    );
}
