mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{data_array, TestApp};

#[tokio::test]
async fn same_exam_code_in_two_companies_stays_apart() -> Result<()> {
    let app = TestApp::new().await?;
    let acme_exam = app.create_exam("alice", "Calculus I", "MATH101").await?;
    let globex_exam = app.create_exam("bob", "Intro to Math", "MATH101").await?;
    assert_ne!(acme_exam, globex_exam);

    let (status, body) = app.get("/api/exams/", Some("alice")).await?;
    assert_eq!(status, StatusCode::OK);
    let exams = data_array(&body);
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0]["id"], acme_exam);
    assert_eq!(exams[0]["company_id"], app.acme);

    let (_, body) = app.get("/api/exams/", Some("bob")).await?;
    let exams = data_array(&body);
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0]["exam_title"], "Intro to Math");

    let (status, _) = app
        .post("/api/exams/", Some("alice"), json!({ "exam_title": "Again", "exam_code": "MATH101" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn foreign_and_missing_objects_look_the_same() -> Result<()> {
    let app = TestApp::new().await?;
    let acme_exam = app.create_exam("alice", "Calculus I", "MATH101").await?;

    let (foreign_status, foreign_body) = app.get(&format!("/api/exams/{}/", acme_exam), Some("bob")).await?;
    let (missing_status, missing_body) = app.get("/api/exams/999999/", Some("bob")).await?;

    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_body, missing_body);
    assert_eq!(foreign_body["message"], "Not found.");

    let (status, body) = app.get(&format!("/api/exams/{}/", acme_exam), Some("alice")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exam_code"], "MATH101");

    let (status, _) = app.get(&format!("/api/exams/{}/", acme_exam), Some("root")).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn company_cannot_be_chosen_by_members() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app
        .post(
            "/api/exams/",
            Some("alice"),
            json!({ "exam_title": "Sneaky", "exam_code": "X1", "company_id": app.globex }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["company_id"], app.acme);

    let (_, body) = app.get("/api/exams/", Some("bob")).await?;
    assert!(data_array(&body).is_empty());

    Ok(())
}

#[tokio::test]
async fn superuser_sees_and_places_across_companies() -> Result<()> {
    let app = TestApp::new().await?;
    app.create_exam("alice", "Calculus I", "MATH101").await?;
    app.create_exam("bob", "Intro to Math", "MATH101").await?;

    let (status, body) = app
        .post(
            "/api/exams/",
            Some("root"),
            json!({ "exam_title": "Physics", "exam_code": "PHY1", "company_id": app.globex }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["company_id"], app.globex);

    let (_, body) = app.get("/api/exams/", Some("root")).await?;
    assert_eq!(data_array(&body).len(), 3);

    let (_, body) = app.get("/api/exams/", Some("bob")).await?;
    assert_eq!(data_array(&body).len(), 2);

    Ok(())
}

#[tokio::test]
async fn anonymous_requests_see_nothing() -> Result<()> {
    let app = TestApp::new().await?;
    app.create_exam("alice", "Calculus I", "MATH101").await?;

    let (status, body) = app.get("/api/exams/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(data_array(&body).is_empty());

    let (status, body) = app.get("/api/users/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(data_array(&body).is_empty());

    let (status, _) = app
        .post("/api/exams/", None, json!({ "exam_title": "Orphan", "exam_code": "ORPH" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn users_and_reports_are_scoped() -> Result<()> {
    let app = TestApp::new().await?;
    app.create_exam("alice", "Calculus I", "MATH101").await?;
    app.create_exam("bob", "Intro to Math", "MATH101").await?;

    let (status, _) = app
        .post("/api/sessions/", Some("alice"), json!({ "exam": "MATH101", "taker": "carol" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/users/", Some("bob")).await?;
    let names: Vec<_> = data_array(&body).iter().map(|u| u["username"].clone()).collect();
    assert_eq!(names, vec![json!("bob")]);

    let (_, body) = app.get("/api/users/", Some("alice")).await?;
    assert_eq!(data_array(&body).len(), 4, "alice, carol, proctor_a and root share Acme");

    let bob_id = app.user("bob").id.unwrap_or_default();
    let (status, _) = app.get(&format!("/api/users/{}/", bob_id), Some("alice")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/takers/MATH101/", Some("alice")).await?;
    assert_eq!(status, StatusCode::OK);
    let takers = data_array(&body);
    assert_eq!(takers.len(), 1);
    assert_eq!(takers[0]["username"], "carol");
    assert_eq!(takers[0]["attempts_count"], 1);

    let (status, body) = app.get("/api/takers/MATH101/", Some("bob")).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(data_array(&body).is_empty());

    let (status, _) = app.get("/api/exam-sessions/MATH101/carol/", Some("bob")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

/// Ids of an Acme session with one photo and one record
async fn acme_session(app: &TestApp) -> Result<(i64, i64, i64)> {
    app.create_exam("alice", "Calculus I", "MATH101").await?;
    let (_, body) = app
        .post("/api/sessions/", Some("alice"), json!({ "exam": "MATH101", "taker": "carol" }))
        .await?;
    let session = body["data"]["id"].as_i64().unwrap_or_default();
    let (_, body) = app
        .post(&format!("/api/sessions/{}/add_photo/", session), Some("alice"), json!({ "photo": "cam.jpg" }))
        .await?;
    let photo = body["data"]["id"].as_i64().unwrap_or_default();
    let (_, body) = app
        .post(
            &format!("/api/sessions/{}/add_record/", session),
            Some("alice"),
            json!({ "recording_type": "audio", "file": "mic.wav" }),
        )
        .await?;
    let record = body["data"]["id"].as_i64().unwrap_or_default();
    Ok((session, photo, record))
}

#[tokio::test]
async fn foreign_writes_look_like_missing_objects() -> Result<()> {
    let app = TestApp::new().await?;
    let (session, photo, record) = acme_session(&app).await?;
    let (_, body) = app.get("/api/exams/", Some("alice")).await?;
    let exam = data_array(&body)[0]["id"].as_i64().unwrap_or_default();
    let alice = app.user("alice").id.unwrap_or_default();

    let (_, missing) = app.patch("/api/exams/999999/", Some("bob"), json!({ "exam_title": "x" })).await?;
    assert_eq!(missing["message"], "Not found.");

    let writes = [
        (format!("/api/exams/{}/", exam), json!({ "exam_title": "Hijacked" })),
        (format!("/api/sessions/{}/", session), json!({ "is_active": false })),
        (format!("/api/session-photos/{}/", photo), json!({ "photo": "swap.jpg" })),
        (format!("/api/session-records/{}/", record), json!({ "file": "swap.mp3" })),
    ];
    for (path, body) in &writes {
        let (status, response) = app.put(path, Some("bob"), body.clone()).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "PUT {}", path);
        assert_eq!(response, missing);
        let (status, response) = app.patch(path, Some("bob"), body.clone()).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "PATCH {}", path);
        assert_eq!(response, missing);
        let (status, response) = app.delete(path, Some("bob")).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "DELETE {}", path);
        assert_eq!(response, missing);
    }
    let (status, response) = app.patch(&format!("/api/users/{}/", alice), Some("bob"), json!({ "name": "Mallory" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response, missing);

    // Nothing changed for the owner
    let (_, body) = app.get(&format!("/api/exams/{}/", exam), Some("alice")).await?;
    assert_eq!(body["data"]["exam_title"], "Calculus I");
    let (_, body) = app.get(&format!("/api/sessions/{}/", session), Some("alice")).await?;
    assert_eq!(body["data"]["is_active"], true);
    let (_, body) = app.get(&format!("/api/session-photos/{}/", photo), Some("alice")).await?;
    assert_eq!(body["data"]["photo"], "photos/cam.jpg");
    let (_, body) = app.get(&format!("/api/session-records/{}/", record), Some("alice")).await?;
    assert_eq!(body["data"]["file"], "recordings/mic.wav");
    let (_, body) = app.get(&format!("/api/users/{}/", alice), Some("alice")).await?;
    assert_eq!(body["data"]["name"], "");

    Ok(())
}

#[tokio::test]
async fn updates_cannot_move_records_to_another_company() -> Result<()> {
    let app = TestApp::new().await?;
    let (session, photo, _) = acme_session(&app).await?;
    let (_, body) = app.get("/api/exams/", Some("alice")).await?;
    let exam = data_array(&body)[0]["id"].as_i64().unwrap_or_default();
    let alice = app.user("alice").id.unwrap_or_default();

    let (status, body) = app
        .patch(
            &format!("/api/exams/{}/", exam),
            Some("alice"),
            json!({ "exam_title": "Calculus II", "company_id": app.globex }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert_eq!(body["data"]["exam_title"], "Calculus II");
    assert_eq!(body["data"]["company_id"], app.acme);

    // Not even a superuser can rehome a record
    let (status, body) = app
        .put(&format!("/api/sessions/{}/", session), Some("root"), json!({ "is_active": false, "company_id": app.globex }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);
    assert_eq!(body["data"]["company_id"], app.acme);

    let (status, body) = app
        .patch(&format!("/api/session-photos/{}/", photo), Some("alice"), json!({ "photo": "cam2.png", "company_id": app.globex }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["company_id"], app.acme);

    let (status, body) = app
        .patch(&format!("/api/users/{}/", alice), Some("alice"), json!({ "name": "Alice A.", "company_id": app.globex }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alice A.");
    assert_eq!(body["data"]["company_id"], app.acme);

    for path in ["/api/exams/", "/api/sessions/", "/api/session-photos/"] {
        let (_, body) = app.get(path, Some("bob")).await?;
        assert!(data_array(&body).is_empty(), "bob sees {}", path);
    }
    let (_, body) = app.get("/api/users/", Some("bob")).await?;
    assert_eq!(data_array(&body).len(), 1);

    Ok(())
}

#[tokio::test]
async fn owners_can_edit_and_delete() -> Result<()> {
    let app = TestApp::new().await?;
    let (session, photo, record) = acme_session(&app).await?;
    let second = app.create_exam("alice", "Chemistry", "CHEM1").await?;

    let (status, _) = app
        .patch(&format!("/api/exams/{}/", second), Some("alice"), json!({ "exam_code": "MATH101" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .patch(&format!("/api/session-records/{}/", record), Some("alice"), json!({ "recording_type": "video" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "wav is not a video file: {}", body);
    let (status, body) = app
        .patch(
            &format!("/api/session-records/{}/", record),
            Some("alice"),
            json!({ "recording_type": "video", "file": "clip.mp4" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["file"], "recordings/clip.mp4");

    let (status, _) = app.delete(&format!("/api/session-photos/{}/", photo), Some("alice")).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/session-photos/{}/", photo), Some("alice")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/api/sessions/{}/", session), Some("alice")).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = app.get(&format!("/api/session-records/?session={}", session), Some("alice")).await?;
    assert!(data_array(&body).is_empty());

    let (status, _) = app.delete(&format!("/api/exams/{}/", second), Some("alice")).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = app.get("/api/exams/", Some("alice")).await?;
    assert_eq!(data_array(&body).len(), 1);

    Ok(())
}
