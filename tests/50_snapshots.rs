mod common;

use anyhow::Result;
use serde_json::{json, Value};

use common::{data, TestApp};

async fn seed_register(app: &TestApp, token: &str) -> Result<(i64, i64)> {
    let risk = data(
        app.post(
            token,
            "/risks",
            json!({ "risk_name": "Original risk", "probability": 4, "impact": 4 }),
        )
        .await?,
    )
    .await?;
    let risk_id = risk["id"].as_i64().unwrap();
    let item = data(
        app.post(
            token,
            "/action-items",
            json!({ "risk_id": risk_id, "title": "Original item" }),
        )
        .await?,
    )
    .await?;
    Ok((risk_id, item["id"].as_i64().unwrap()))
}

#[tokio::test]
async fn capture_reports_counts_and_hides_payload() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;
    seed_register(&app, &manager).await?;

    let resp = app
        .post(&manager, "/snapshots", json!({ "name": "Q3 baseline" }))
        .await?;
    assert_eq!(resp.status(), 201);
    let snapshot = data(resp).await?;
    assert_eq!(snapshot["risks_count"], 1);
    assert_eq!(snapshot["action_items_count"], 1);
    assert!(snapshot.get("payload").is_none());

    let listed = data(app.get(&manager, "/snapshots").await?).await?;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(listed[0].get("payload").is_none());
    Ok(())
}

#[tokio::test]
async fn restore_round_trip_replaces_live_data() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;
    let (risk_id, _) = seed_register(&app, &manager).await?;

    let snapshot = data(
        app.post(&manager, "/snapshots", json!({ "name": "Before changes" }))
            .await?,
    )
    .await?;
    let snapshot_id = snapshot["id"].as_i64().unwrap();

    // Mutate the register after the capture
    app.delete(&manager, &format!("/risks/{}", risk_id)).await?;
    data(
        app.post(&manager, "/risks", json!({ "risk_name": "Post-snapshot risk" }))
            .await?,
    )
    .await?;

    // Confirmation is mandatory
    let unconfirmed = app
        .post(&manager, &format!("/snapshots/{}/restore", snapshot_id), json!({}))
        .await?;
    assert_eq!(unconfirmed.status(), 422);

    let summary = data(
        app.post(
            &manager,
            &format!("/snapshots/{}/restore", snapshot_id),
            json!({ "confirm": true }),
        )
        .await?,
    )
    .await?;
    assert_eq!(summary["risks_restored"], 1);
    assert_eq!(summary["action_items_restored"], 1);

    let risks = data(app.get(&manager, "/risks").await?).await?;
    let names: Vec<&str> = risks
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["risk_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Original risk"]);

    // The restored action item points at the newly inserted risk
    let new_risk_id = risks[0]["id"].as_i64().unwrap();
    let items = data(app.get(&manager, "/action-items").await?).await?;
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["risk_id"], json!(new_risk_id));
    assert_eq!(items[0]["title"], "Original item");
    Ok(())
}

#[tokio::test]
async fn export_and_import_round_trip() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;
    seed_register(&app, &manager).await?;

    let snapshot = data(
        app.post(&manager, "/snapshots", json!({ "name": "Export me" }))
            .await?,
    )
    .await?;
    let snapshot_id = snapshot["id"].as_i64().unwrap();

    let resp = app
        .get(&manager, &format!("/snapshots/{}/export", snapshot_id))
        .await?;
    assert_eq!(resp.status(), 200);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("Export-me.json"));

    let document: Value = resp.json().await?;
    assert_eq!(document["version"], 1);
    assert_eq!(document["risks"].as_array().unwrap().len(), 1);

    let imported = data(
        app.post(
            &manager,
            "/snapshots/import",
            json!({ "name": "Imported copy", "document": document }),
        )
        .await?,
    )
    .await?;
    assert_eq!(imported["risks_count"], 1);
    assert_eq!(imported["action_items_count"], 1);

    // Import stores a snapshot without touching live data
    let risks = data(app.get(&manager, "/risks").await?).await?;
    assert_eq!(risks.as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn import_rejects_malformed_documents() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;

    let wrong_version = app
        .post(
            &manager,
            "/snapshots/import",
            json!({ "name": "Bad", "document": { "version": 7, "risks": [], "action_items": [] } }),
        )
        .await?;
    assert_eq!(wrong_version.status(), 422);

    let not_a_document = app
        .post(
            &manager,
            "/snapshots/import",
            json!({ "name": "Bad", "document": { "version": 1, "risks": "nope" } }),
        )
        .await?;
    assert_eq!(not_a_document.status(), 422);
    Ok(())
}

#[tokio::test]
async fn snapshots_are_owner_scoped_and_role_gated() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;
    let editor = app.create_user("editor@example.com", "editor").await?;
    let viewer = app.create_user("viewer@example.com", "viewer").await?;

    let snapshot = data(
        app.post(&manager, "/snapshots", json!({ "name": "Managers only" }))
            .await?,
    )
    .await?;
    let snapshot_id = snapshot["id"].as_i64().unwrap();

    // Another user's snapshot is invisible
    let foreign = app.get(&editor, &format!("/snapshots/{}", snapshot_id)).await?;
    assert_eq!(foreign.status(), 404);

    // Editors may capture but not restore or delete
    let captured = app
        .post(&editor, "/snapshots", json!({ "name": "Editor capture" }))
        .await?;
    assert_eq!(captured.status(), 201);
    let editor_snapshot = data(captured).await?["id"].as_i64().unwrap();
    let restore = app
        .post(
            &editor,
            &format!("/snapshots/{}/restore", editor_snapshot),
            json!({ "confirm": true }),
        )
        .await?;
    assert_eq!(restore.status(), 403);

    // Viewers may list but not capture
    let denied = app
        .post(&viewer, "/snapshots", json!({ "name": "Nope" }))
        .await?;
    assert_eq!(denied.status(), 403);
    let listed = app.get(&viewer, "/snapshots").await?;
    assert_eq!(listed.status(), 200);
    Ok(())
}

#[tokio::test]
async fn restore_survives_a_deleted_rbs_node() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;

    let node = data(app.post(&manager, "/rbs", json!({ "name": "Technical" })).await?).await?;
    let node_id = node["id"].as_i64().unwrap();
    data(
        app.post(
            &manager,
            "/risks",
            json!({ "risk_name": "Categorized risk", "rbs_node_id": node_id }),
        )
        .await?,
    )
    .await?;

    let snapshot = data(
        app.post(&manager, "/snapshots", json!({ "name": "With category" }))
            .await?,
    )
    .await?;
    let snapshot_id = snapshot["id"].as_i64().unwrap();

    // The node goes away after the capture; the snapshot must still
    // restore, with the dangling reference cleared.
    let deleted = app.delete(&manager, &format!("/rbs/{}", node_id)).await?;
    assert_eq!(deleted.status(), 204);

    let summary = data(
        app.post(
            &manager,
            &format!("/snapshots/{}/restore", snapshot_id),
            json!({ "confirm": true }),
        )
        .await?,
    )
    .await?;
    assert_eq!(summary["risks_restored"], 1);

    let risks = data(app.get(&manager, "/risks").await?).await?;
    assert_eq!(risks.as_array().unwrap().len(), 1);
    assert_eq!(risks[0]["risk_name"], "Categorized risk");
    assert_eq!(risks[0]["rbs_node_id"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn restoring_an_import_remaps_unknown_owners() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;
    seed_register(&app, &manager).await?;

    let snapshot = data(
        app.post(&manager, "/snapshots", json!({ "name": "To export" }))
            .await?,
    )
    .await?;
    let snapshot_id = snapshot["id"].as_i64().unwrap();
    let resp = app
        .get(&manager, &format!("/snapshots/{}/export", snapshot_id))
        .await?;
    let mut document: Value = resp.json().await?;

    // A document from another install carries user ids this one has
    // never seen
    document["risks"][0]["owner_id"] = json!(9999);
    document["action_items"][0]["owner_id"] = json!(9999);

    let imported = data(
        app.post(
            &manager,
            "/snapshots/import",
            json!({ "name": "Foreign copy", "document": document }),
        )
        .await?,
    )
    .await?;
    let imported_id = imported["id"].as_i64().unwrap();

    let summary = data(
        app.post(
            &manager,
            &format!("/snapshots/{}/restore", imported_id),
            json!({ "confirm": true }),
        )
        .await?,
    )
    .await?;
    assert_eq!(summary["risks_restored"], 1);
    assert_eq!(summary["action_items_restored"], 1);

    let me = data(app.get(&manager, "/auth/me").await?).await?;
    let risks = data(app.get(&manager, "/risks").await?).await?;
    assert_eq!(risks[0]["owner_id"], me["id"]);
    Ok(())
}
