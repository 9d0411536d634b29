//! The central domain model and interface definitions for the portal.

pub mod activity;
pub mod errors;
pub mod models;
pub mod ports;
pub mod visibility;

// Re-exporting for easier access in other crates
pub use activity::*;
pub use errors::*;
pub use models::*;
pub use ports::*;
pub use visibility::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!("administrator".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!(Role::User.as_str(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: 1,
            first_name: "Giulia".into(),
            last_name: "Bianchi".into(),
            email: "giulia.bianchi@company.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            is_active: true,
            department_ids: vec![2],
            created_at: chrono::Utc::now(),
            last_access: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(user.full_name(), "Giulia Bianchi");
    }

    #[test]
    fn document_flattens_file_columns() {
        let doc = Document {
            id: 4,
            title: "Handbook".into(),
            description: None,
            file: StoredFile {
                file_path: "uploads/documents/a.pdf".into(),
                file_name: "handbook.pdf".into(),
                public_url: "/uploads/documents/a.pdf".into(),
                file_size: 1024,
                mime_type: "application/pdf".into(),
            },
            uploaded_by: 1,
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["public_url"], "/uploads/documents/a.pdf");
        assert_eq!(json["file_size"], 1024);
    }
}
