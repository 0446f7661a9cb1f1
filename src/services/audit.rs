// src/services/audit.rs

use serde_json::{Map, Value, json};

use crate::{
    models::{
        audit::NewAuditRecord,
        participant::{Participant, ParticipantUpdate},
    },
    store::AuditStore,
};

const REDACTED: &str = "[redacted]";

/// Appends an audit record after the mutation it describes has committed.
/// A failed write is logged and reported as `false`; it never undoes the mutation.
pub async fn record<S>(store: &S, record: NewAuditRecord) -> bool
where
    S: AuditStore + ?Sized,
{
    let action = record.action;
    let target = record.target_registration_id.clone();
    let admin_id = record.admin_id;

    match store.insert_audit_record(record).await {
        Ok(()) => {
            tracing::info!(admin_id, %action, target = ?target, "Audit record written");
            true
        }
        Err(e) => {
            tracing::error!(
                admin_id,
                %action,
                target = ?target,
                error = %e,
                "Failed to write audit record"
            );
            false
        }
    }
}

/// Result of applying an administrative edit to a participant.
#[derive(Debug)]
pub struct ParticipantDiff {
    pub patched: Participant,
    /// `{field: {from, to}}` for every field whose trimmed value changed.
    pub changes: Map<String, Value>,
}

impl ParticipantDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

fn change(changes: &mut Map<String, Value>, field: &str, from: impl Into<Value>, to: impl Into<Value>) {
    changes.insert(field.to_string(), json!({ "from": from.into(), "to": to.into() }));
}

fn patch_text(changes: &mut Map<String, Value>, field: &str, current: &mut String, incoming: Option<&str>) {
    let Some(incoming) = incoming.map(str::trim) else {
        return;
    };
    if current.trim() != incoming {
        change(changes, field, current.as_str(), incoming);
        *current = incoming.to_string();
    }
}

/// Applies `update` to a copy of `current`. `new_credential_hash` is set when
/// the caller re-issued the login secret; its values never enter the diff.
///
/// The registration id is not editable.
pub fn diff_participant(
    current: &Participant,
    update: &ParticipantUpdate,
    new_credential_hash: Option<String>,
) -> ParticipantDiff {
    let mut patched = current.clone();
    let mut changes = Map::new();

    patch_text(&mut changes, "full_name", &mut patched.full_name, update.full_name.as_deref());
    patch_text(&mut changes, "email", &mut patched.email, update.email.as_deref());
    patch_text(&mut changes, "mobile", &mut patched.mobile, update.mobile.as_deref());
    patch_text(&mut changes, "father_name", &mut patched.father_name, update.father_name.as_deref());
    patch_text(&mut changes, "mother_name", &mut patched.mother_name, update.mother_name.as_deref());
    patch_text(&mut changes, "address", &mut patched.address, update.address.as_deref());
    patch_text(&mut changes, "city", &mut patched.city, update.city.as_deref());
    patch_text(&mut changes, "pincode", &mut patched.pincode, update.pincode.as_deref());
    patch_text(&mut changes, "course_name", &mut patched.course_name, update.course_name.as_deref());

    // an absent school renders as empty, so clearing it is a change
    if let Some(incoming) = update.school_name.as_deref().map(str::trim) {
        let before = patched.school_name.as_deref().unwrap_or("").trim().to_string();
        if before != incoming {
            change(&mut changes, "school_name", before, incoming);
            patched.school_name = (!incoming.is_empty()).then(|| incoming.to_string());
        }
    }

    if let Some(category) = update.category {
        if category != patched.category {
            change(&mut changes, "category", patched.category.as_str(), category.as_str());
            patched.category = category;
        }
    }

    if let Some(hard_copy) = update.hard_copy {
        if hard_copy != patched.hard_copy {
            change(&mut changes, "hard_copy", patched.hard_copy, hard_copy);
            patched.hard_copy = hard_copy;
        }
    }

    if let Some(hash) = new_credential_hash {
        change(&mut changes, "credential", REDACTED, REDACTED);
        patched.credential_hash = hash;
    }

    ParticipantDiff { patched, changes }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        models::{audit::AuditAction, category::Category},
        store::{AdminStore, MemoryStore},
    };

    fn participant() -> Participant {
        let now = Utc::now();
        Participant {
            id: 1,
            registration_id: "NFLO26-1001".to_string(),
            credential_hash: "old-hash".to_string(),
            full_name: "Asha Verma".to_string(),
            email: "asha@example.com".to_string(),
            mobile: "9876543210".to_string(),
            father_name: "Ravi Verma".to_string(),
            mother_name: "Sita Verma".to_string(),
            address: "12 Lake Road".to_string(),
            city: "Jaipur".to_string(),
            pincode: "302001".to_string(),
            school_name: None,
            course_name: "Science".to_string(),
            category: Category::Junior,
            hard_copy: false,
            total_paid: 300,
            transaction_reference: Some("pay_abc".to_string()),
            photo_reference: "uploads/a.jpg".to_string(),
            photo_uploaded: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_changed_fields_are_recorded() {
        let update = ParticipantUpdate {
            full_name: Some("  Asha Verma ".to_string()),
            city: Some("Udaipur".to_string()),
            hard_copy: Some(true),
            ..Default::default()
        };
        let diff = diff_participant(&participant(), &update, None);

        assert_eq!(diff.changes.len(), 2);
        assert_eq!(diff.changes["city"], json!({"from": "Jaipur", "to": "Udaipur"}));
        assert_eq!(diff.changes["hard_copy"], json!({"from": false, "to": true}));
        assert_eq!(diff.patched.city, "Udaipur");
        assert!(diff.patched.hard_copy);
    }

    #[test]
    fn identical_values_produce_no_changes() {
        let current = participant();
        let update = ParticipantUpdate {
            email: Some(current.email.clone()),
            category: Some(Category::Junior),
            school_name: Some(String::new()),
            ..Default::default()
        };
        assert!(diff_participant(&current, &update, None).is_empty());
    }

    #[test]
    fn credential_reset_is_redacted() {
        let diff = diff_participant(
            &participant(),
            &ParticipantUpdate::default(),
            Some("new-hash".to_string()),
        );
        assert_eq!(
            diff.changes["credential"],
            json!({"from": REDACTED, "to": REDACTED})
        );
        assert_eq!(diff.patched.credential_hash, "new-hash");
        assert!(!diff.changes["credential"].to_string().contains("hash"));
    }

    #[test]
    fn clearing_school_name_sets_none() {
        let mut current = participant();
        current.school_name = Some("City School".to_string());
        let update = ParticipantUpdate {
            school_name: Some("  ".to_string()),
            ..Default::default()
        };
        let diff = diff_participant(&current, &update, None);
        assert_eq!(diff.patched.school_name, None);
        assert_eq!(diff.changes["school_name"], json!({"from": "City School", "to": ""}));
    }

    #[tokio::test]
    async fn recorded_entries_resolve_admin_name() {
        let store = MemoryStore::new();
        let admin = store.insert_admin("root", "hash").await.unwrap();

        let written = record(
            &store,
            NewAuditRecord {
                admin_id: admin.id,
                action: AuditAction::UpdateUserDetails,
                target_registration_id: Some("NFLO26-1001".to_string()),
                details: json!({"city": {"from": "A", "to": "B"}}),
                ip_address: Some("127.0.0.1".to_string()),
            },
        )
        .await;
        assert!(written);

        let records = crate::store::AuditStore::list_audit_records(&store, 50)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].admin_name.as_deref(), Some("root"));
    }
}
