//! Populates an empty portal database with departments, an administrator,
//! a handful of employees and a welcome note. Safe to run more than once:
//! existing departments and accounts are left alone.
//!
//! The administrator password comes from `SEED_ADMIN_PASSWORD`.

use std::collections::HashMap;

use anyhow::Context;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use secrecy::ExposeSecret;

use auth_adapters::Argon2Hasher;
use configs::Settings;
use domains::{
    Audience, DepartmentRepository, NewDepartment, NewNote, NewUser, NoteRepository,
    PasswordHasher, Role, UserRepository,
};
use storage_adapters::postgres::{self, PgDepartmentRepository, PgNoteRepository, PgUserRepository};

const DEPARTMENTS: &[(&str, &str)] = &[
    ("Administration", "Accounting, payroll and purchasing"),
    ("Human Resources", "Hiring, onboarding and training"),
    ("IT", "Workstations, network and internal software"),
    ("Sales", "Customer accounts and offers"),
];

const ADMIN_EMAIL: &str = "admin@company.com";
const EMPLOYEES_PER_DEPARTMENT: usize = 3;

async fn ensure_departments(repo: &PgDepartmentRepository) -> anyhow::Result<HashMap<String, i64>> {
    let mut ids: HashMap<String, i64> = repo
        .list()
        .await?
        .into_iter()
        .map(|summary| (summary.department.name, summary.department.id))
        .collect();

    for (name, description) in DEPARTMENTS {
        if ids.contains_key(*name) {
            continue;
        }
        let department = repo
            .create(NewDepartment { name: name.to_string(), description: Some(description.to_string()) })
            .await?;
        tracing::info!(id = department.id, name, "department created");
        ids.insert(department.name, department.id);
    }
    Ok(ids)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = Settings::load().context("loading configuration")?;
    let pool = postgres::connect(settings.database.url.expose_secret(), 2)
        .await
        .context("connecting to PostgreSQL")?;
    postgres::run_migrations(&pool).await.context("running migrations")?;

    let departments = PgDepartmentRepository::new(pool.clone());
    let users = PgUserRepository::new(pool.clone());
    let notes = PgNoteRepository::new(pool);
    let hasher = Argon2Hasher::new();

    let department_ids = ensure_departments(&departments).await?;

    if users.find_by_email(ADMIN_EMAIL).await?.is_some() {
        tracing::info!("administrator already present, nothing else to seed");
        return Ok(());
    }

    let admin_password = std::env::var("SEED_ADMIN_PASSWORD")
        .context("SEED_ADMIN_PASSWORD must be set to seed the administrator")?;
    let admin = users
        .create(NewUser {
            first_name: "Portal".into(),
            last_name: "Administrator".into(),
            email: ADMIN_EMAIL.into(),
            password_hash: hasher.hash(&admin_password)?,
            role: Role::Administrator,
            department_ids: department_ids.get("IT").copied().into_iter().collect(),
        })
        .await?;
    tracing::info!(id = admin.id, email = ADMIN_EMAIL, "administrator created");

    // Employees share one throwaway password; they are expected to change it.
    let employee_hash = hasher.hash("welcome")?;
    for (name, department_id) in &department_ids {
        for _ in 0..EMPLOYEES_PER_DEPARTMENT {
            let first_name: String = FirstName().fake();
            let last_name: String = LastName().fake();
            let email = format!(
                "{}.{}@company.com",
                first_name.to_lowercase(),
                last_name.to_lowercase().replace(' ', "")
            );
            if users.email_taken(&email, None).await? {
                continue;
            }
            let user = users
                .create(NewUser {
                    first_name,
                    last_name,
                    email,
                    password_hash: employee_hash.clone(),
                    role: Role::User,
                    department_ids: vec![*department_id],
                })
                .await?;
            tracing::debug!(id = user.id, department = %name, "employee created");
        }
    }

    let everyone = Audience::departments(department_ids.values().copied())?;
    let note = notes
        .create(
            NewNote {
                title: "Welcome to the portal".into(),
                content: "Documents and notes shared with your department appear here.".into(),
                created_by: admin.id,
            },
            everyone,
        )
        .await?;
    tracing::info!(id = note.id, "welcome note published");
    Ok(())
}
