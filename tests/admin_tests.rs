// tests/admin_tests.rs

mod common;

use std::io::{Cursor, Write};

use common::spawn_app;
use exam_portal::{
    models::{category::Category, participant::NewParticipant},
    store::{AuditStore, ParticipantStore},
};
use serde_json::{Value, json};

fn seeded(registration_id: &str) -> NewParticipant {
    NewParticipant {
        registration_id: registration_id.to_string(),
        credential_hash: "hash".to_string(),
        full_name: "Existing".to_string(),
        email: "existing@example.com".to_string(),
        mobile: "9111111111".to_string(),
        father_name: "F".to_string(),
        mother_name: "M".to_string(),
        address: "A".to_string(),
        city: "Delhi".to_string(),
        pincode: "110001".to_string(),
        school_name: None,
        course_name: "Standard".to_string(),
        category: Category::Senior,
        hard_copy: false,
        total_paid: 500,
        transaction_reference: None,
        photo_reference: "public/placeholder.svg".to_string(),
        photo_uploaded: false,
    }
}

fn students(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "full_name": format!("Student {}", i + 1),
                "mobile": format!("97000000{:02}", i),
                "category": if i % 2 == 0 { "JUNIOR" } else { "SENIOR" },
            })
        })
        .collect()
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = spawn_app().await;

    let anonymous = app
        .client
        .get(app.url("/api/admin/participants"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let (registration_id, mobile) = app.registered_participant("junior").await;
    let token = app.participant_token(&registration_id, &mobile).await;
    let participant = app
        .client
        .get(app.url("/api/admin/participants"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(participant.status().as_u16(), 403);
}

#[tokio::test]
async fn bulk_register_reports_duplicate_row_and_keeps_the_rest() {
    let app = spawn_app().await;
    // latest parses to 1000, so the block is 1001..=1010 and row 5 collides
    app.store.insert_participant(seeded("NFLO26-1005")).await.unwrap();
    app.store.insert_participant(seeded("LEGACY-1000")).await.unwrap();
    let admin = app.admin_token().await;

    let response = app
        .client
        .post(app.url("/api/admin/participants/bulk"))
        .bearer_auth(&admin)
        .json(&json!({ "students": students(10) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let report: Value = response.json().await.unwrap();
    assert_eq!(report["created"], 9);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["failures"][0]["row"], 5);
    assert_eq!(report["failures"][0]["registration_id"], "NFLO26-1005");

    let imported = app
        .store
        .find_participant_by_registration_id("NFLO26-1010")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(imported.father_name, "Not Provided");
    assert_eq!(imported.category, Category::Senior);
    assert_eq!(imported.total_paid, 500);
    assert!(!imported.photo_uploaded);
    assert!(imported.transaction_reference.unwrap().starts_with("CASH_BULK_"));

    let logs = app.store.list_audit_records(50).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action.as_str(), "BULK_IMPORT");
    assert_eq!(logs[0].details["count"], 9);
}

#[tokio::test]
async fn bulk_register_reports_invalid_rows() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .client
        .post(app.url("/api/admin/participants/bulk"))
        .bearer_auth(&admin)
        .json(&json!({ "students": [
            {"full_name": "Ok", "mobile": "9700000001"},
            {"full_name": "No Mobile"},
            {"full_name": "Bad Category", "mobile": "9700000002", "category": "college"},
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let report: Value = response.json().await.unwrap();
    assert_eq!(report["created"], 1);
    assert_eq!(report["failed"], 2);
    assert_eq!(report["registration_ids"], json!(["NFLO26-1001"]));
}

#[tokio::test]
async fn update_writes_one_audit_record_per_real_change() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (registration_id, _) = app.registered_participant("junior").await;
    let url = app.url(&format!("/api/admin/participants/{}", registration_id));

    let changed = app
        .client
        .put(&url)
        .bearer_auth(&admin)
        .json(&json!({ "city": "Udaipur", "full_name": " Asha Verma " }))
        .send()
        .await
        .unwrap();
    assert_eq!(changed.status().as_u16(), 200);
    let body: Value = changed.json().await.unwrap();
    assert_eq!(body["participant"]["city"], "Udaipur");

    let unchanged = app
        .client
        .put(&url)
        .bearer_auth(&admin)
        .json(&json!({ "city": "Udaipur" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unchanged.status().as_u16(), 200);

    let logs = app.store.list_audit_records(50).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action.as_str(), "UPDATE_USER_DETAILS");
    assert_eq!(logs[0].admin_name.as_deref(), Some(common::ADMIN_USERNAME));
    assert_eq!(logs[0].target_registration_id.as_deref(), Some(registration_id.as_str()));
    assert_eq!(
        logs[0].details,
        json!({ "city": { "from": "Jaipur", "to": "Udaipur" } })
    );

    let listed = app
        .client
        .get(app.url("/api/admin/audit-logs"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let listed: Value = listed.json().await.unwrap();
    assert_eq!(listed["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn credential_reset_uses_new_mobile_and_is_redacted() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (registration_id, _) = app.registered_participant("junior").await;

    let response = app
        .client
        .put(app.url(&format!("/api/admin/participants/{}", registration_id)))
        .bearer_auth(&admin)
        .json(&json!({ "mobile": "9123456780", "reset_credential": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    app.participant_token(&registration_id, "9123456780").await;

    let logs = app.store.list_audit_records(50).await.unwrap();
    assert_eq!(logs[0].details["credential"]["to"], "[redacted]");
}

#[tokio::test]
async fn unknown_participant_is_404() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .client
        .get(app.url("/api/admin/participants/NFLO26-9999"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn listing_filters_and_paginates() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.registered_participant("junior").await;
    app.registered_participant("senior").await;
    app.registered_participant("senior").await;

    let response = app
        .client
        .get(app.url("/api/admin/participants?category=senior&limit=1&page=2"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let page: Value = response.json().await.unwrap();
    assert_eq!(page["pagination"]["total"], 2);
    assert_eq!(page["pagination"]["total_pages"], 2);
    assert_eq!(page["pagination"]["current_page"], 2);
    // newest first, so page 2 holds the older senior
    assert_eq!(page["participants"][0]["registration_id"], "NFLO26-1002");
}

fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

#[tokio::test]
async fn bulk_photo_upload_matches_file_names() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.store.insert_participant(seeded("NFLO26-1001")).await.unwrap();

    let archive = zip_of(&[
        ("NFLO26-1001.jpg", &b"jpeg"[..]),
        ("NFLO26-4040.jpg", &b"jpeg"[..]),
        ("notes.txt", &b"text"[..]),
    ]);
    let form = reqwest::multipart::Form::new().part(
        "archive",
        reqwest::multipart::Part::bytes(archive)
            .file_name("photos.zip")
            .mime_str("application/zip")
            .unwrap(),
    );

    let response = app
        .client
        .post(app.url("/api/admin/participants/photos"))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let report: Value = response.json().await.unwrap();
    assert_eq!(report["updated"], 1);
    assert_eq!(report["failed"], 2);

    let updated = app
        .store
        .find_participant_by_registration_id("NFLO26-1001")
        .await
        .unwrap()
        .unwrap();
    assert!(updated.photo_uploaded);
    assert!(updated.photo_reference.ends_with("-NFLO26-1001.jpg"));

    let logs = app.store.list_audit_records(50).await.unwrap();
    assert_eq!(logs[0].action.as_str(), "BULK_PHOTO_UPLOAD");
    assert_eq!(logs[0].details["success"], 1);
}

#[tokio::test]
async fn bulk_photo_upload_keeps_going_after_a_failed_entry() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    for id in ["NFLO26-1001", "NFLO26-1002", "NFLO26-1003"] {
        app.store.insert_participant(seeded(id)).await.unwrap();
    }

    // longer than any file system allows, so storing it fails
    let unwritable = format!("NFLO26-1002.{}.jpg", "x".repeat(300));
    let archive = zip_of(&[
        ("NFLO26-1001.jpg", &b"jpeg"[..]),
        (unwritable.as_str(), &b"jpeg"[..]),
        ("NFLO26-1003.jpg", &b"jpeg"[..]),
    ]);
    let form = reqwest::multipart::Form::new().part(
        "archive",
        reqwest::multipart::Part::bytes(archive)
            .file_name("photos.zip")
            .mime_str("application/zip")
            .unwrap(),
    );

    let response = app
        .client
        .post(app.url("/api/admin/participants/photos"))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let report: Value = response.json().await.unwrap();
    assert_eq!(report["updated"], 2);
    assert_eq!(report["failed"], 1);
    assert!(report["errors"][0].as_str().unwrap().starts_with("NFLO26-1002."));

    for (id, uploaded) in [("NFLO26-1001", true), ("NFLO26-1002", false), ("NFLO26-1003", true)] {
        let participant = app
            .store
            .find_participant_by_registration_id(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(participant.photo_uploaded, uploaded, "{}", id);
    }

    let logs = app.store.list_audit_records(50).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action.as_str(), "BULK_PHOTO_UPLOAD");
    assert_eq!(logs[0].details["success"], 2);
    assert_eq!(logs[0].details["failed"], 1);
}

#[tokio::test]
async fn single_photo_update_is_audited() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.store.insert_participant(seeded("NFLO26-1001")).await.unwrap();

    let form = reqwest::multipart::Form::new().part(
        "photo",
        reqwest::multipart::Part::bytes(common::png_bytes())
            .file_name("new.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let response = app
        .client
        .put(app.url("/api/admin/participants/NFLO26-1001/photo"))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let logs = app.store.list_audit_records(50).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action.as_str(), "UPDATE_USER_PHOTO");
    assert_eq!(logs[0].details["oldPhoto"], "public/placeholder.svg");
}
