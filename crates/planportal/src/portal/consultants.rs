use chrono::Utc;

use crate::db::consultant_repo;
use crate::error::{PortalError, Result};
use crate::model::consultant::consultant_id;
use crate::model::{Consultant, ConsultantInput};

use super::Portal;

impl Portal {
    pub fn list_consultants(&self, category: Option<&str>) -> Result<Vec<Consultant>> {
        Ok(self
            .db
            .with_conn(|conn| consultant_repo::list(conn, category))?)
    }

    pub fn create_consultant(&self, input: ConsultantInput) -> Result<Consultant> {
        let name = trimmed(input.name).ok_or(PortalError::MissingField("name"))?;
        let category = trimmed(input.category).ok_or(PortalError::MissingField("category"))?;

        let consultant = self.db.with_conn(|conn| {
            let now = Utc::now();
            let id = consultant_id(now, |candidate| consultant_repo::exists(conn, candidate))?;

            let consultant = Consultant {
                id,
                name,
                category,
                company: trimmed(input.company),
                email: trimmed(input.email),
                phone: trimmed(input.phone),
                notes: input.notes,
                created_at: now,
            };
            consultant_repo::upsert(conn, &consultant)?;
            Ok::<_, PortalError>(consultant)
        })?;

        log::info!("Added consultant {} ({})", consultant.id, consultant.category);
        Ok(consultant)
    }

    /// Updates the fields present in `input`. `name` and `category` cannot
    /// be cleared.
    pub fn update_consultant(&self, id: &str, input: ConsultantInput) -> Result<Consultant> {
        self.db.with_conn(|conn| {
            let mut consultant = consultant_repo::find(conn, id)?
                .ok_or_else(|| PortalError::not_found("Consultant", id))?;

            if let Some(name) = trimmed(input.name) {
                consultant.name = name;
            }
            if let Some(category) = trimmed(input.category) {
                consultant.category = category;
            }
            if input.company.is_some() {
                consultant.company = trimmed(input.company);
            }
            if input.email.is_some() {
                consultant.email = trimmed(input.email);
            }
            if input.phone.is_some() {
                consultant.phone = trimmed(input.phone);
            }
            if input.notes.is_some() {
                consultant.notes = input.notes;
            }

            consultant_repo::upsert(conn, &consultant)?;
            Ok(consultant)
        })
    }

    pub fn delete_consultant(&self, id: &str) -> Result<()> {
        let removed = self
            .db
            .with_conn(|conn| consultant_repo::delete(conn, id))?;
        if !removed {
            return Err(PortalError::not_found("Consultant", id));
        }
        log::info!("Removed consultant {}", id);
        Ok(())
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::test_support::portal;

    fn input(name: &str, category: &str) -> ConsultantInput {
        ConsultantInput {
            name: Some(name.to_string()),
            category: Some(category.to_string()),
            email: Some(" office@ember.example ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_list_by_category() {
        let (_tmp, portal) = portal();
        let ember = portal.create_consultant(input("Ember Co", "Bushfire")).unwrap();
        let leafy = portal.create_consultant(input("Leafy", "Arborist")).unwrap();

        assert_ne!(ember.id, leafy.id);
        assert!(ember.id.parse::<i64>().is_ok());
        assert_eq!(ember.email.as_deref(), Some("office@ember.example"));

        let bushfire = portal.list_consultants(Some("Bushfire")).unwrap();
        assert_eq!(bushfire.len(), 1);
        assert_eq!(bushfire[0].name, "Ember Co");
        assert_eq!(portal.list_consultants(None).unwrap().len(), 2);
    }

    #[test]
    fn test_create_requires_name() {
        let (_tmp, portal) = portal();
        let result = portal.create_consultant(ConsultantInput {
            category: Some("Bushfire".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(PortalError::MissingField("name"))));
    }

    #[test]
    fn test_update_keeps_unsent_fields() {
        let (_tmp, portal) = portal();
        let ember = portal.create_consultant(input("Ember Co", "Bushfire")).unwrap();

        let updated = portal
            .update_consultant(
                &ember.id,
                ConsultantInput {
                    phone: Some("02 9000 0000".to_string()),
                    name: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Ember Co");
        assert_eq!(updated.email, ember.email);
        assert_eq!(updated.phone.as_deref(), Some("02 9000 0000"));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_tmp, portal) = portal();
        let ember = portal.create_consultant(input("Ember Co", "Bushfire")).unwrap();
        portal.delete_consultant(&ember.id).unwrap();
        assert!(portal.delete_consultant(&ember.id).unwrap_err().is_not_found());
        assert!(portal
            .update_consultant(&ember.id, ConsultantInput::default())
            .unwrap_err()
            .is_not_found());
    }
}
