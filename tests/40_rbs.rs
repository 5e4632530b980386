mod common;

use anyhow::Result;
use serde_json::{json, Value};

use common::{data, TestApp};

async fn create_node(app: &TestApp, token: &str, body: Value) -> Result<Value> {
    let resp = app.post(token, "/rbs", body).await?;
    anyhow::ensure!(resp.status() == 201, "create node failed: {}", resp.status());
    data(resp).await
}

#[tokio::test]
async fn tree_nests_children_in_position_order() -> Result<()> {
    let app = TestApp::spawn().await?;
    let editor = app.create_user("editor@example.com", "editor").await?;

    let technical = create_node(&app, &editor, json!({ "name": "Technical" })).await?;
    let technical_id = technical["id"].as_i64().unwrap();
    assert_eq!(technical["position"], 0);

    let external = create_node(&app, &editor, json!({ "name": "External" })).await?;
    assert_eq!(external["position"], 1);

    create_node(
        &app,
        &editor,
        json!({ "name": "Hardware", "parent_id": technical_id, "position": 1 }),
    )
    .await?;
    create_node(
        &app,
        &editor,
        json!({ "name": "Software", "parent_id": technical_id, "position": 0 }),
    )
    .await?;

    let tree = data(app.get(&editor, "/rbs/tree").await?).await?;
    let roots = tree.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["name"], "Technical");
    assert_eq!(roots[1]["name"], "External");

    let children: Vec<&str> = roots[0]["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(children, vec!["Software", "Hardware"]);
    Ok(())
}

#[tokio::test]
async fn nodes_are_scoped_per_user() -> Result<()> {
    let app = TestApp::spawn().await?;
    let alice = app.create_user("alice@example.com", "editor").await?;
    let bob = app.create_user("bob@example.com", "editor").await?;

    let node = create_node(&app, &alice, json!({ "name": "Private" })).await?;
    let node_id = node["id"].as_i64().unwrap();

    let bobs_view = data(app.get(&bob, "/rbs").await?).await?;
    assert!(bobs_view.as_array().unwrap().is_empty());

    // Another user's node is invisible, also as a parent target
    let resp = app
        .post(&bob, "/rbs", json!({ "name": "Child", "parent_id": node_id }))
        .await?;
    assert_eq!(resp.status(), 404);

    let resp = app
        .put(&bob, &format!("/rbs/{}", node_id), json!({ "name": "Hijack" }))
        .await?;
    assert_eq!(resp.status(), 404);
    Ok(())
}

#[tokio::test]
async fn reparenting_rejects_cycles() -> Result<()> {
    let app = TestApp::spawn().await?;
    let editor = app.create_user("editor@example.com", "editor").await?;

    let root = create_node(&app, &editor, json!({ "name": "Root" })).await?;
    let root_id = root["id"].as_i64().unwrap();
    let child = create_node(&app, &editor, json!({ "name": "Child", "parent_id": root_id })).await?;
    let child_id = child["id"].as_i64().unwrap();
    let grandchild = create_node(
        &app,
        &editor,
        json!({ "name": "Grandchild", "parent_id": child_id }),
    )
    .await?;
    let grandchild_id = grandchild["id"].as_i64().unwrap();

    let self_parent = app
        .put(&editor, &format!("/rbs/{}", root_id), json!({ "parent_id": root_id }))
        .await?;
    assert_eq!(self_parent.status(), 422);

    let cycle = app
        .put(
            &editor,
            &format!("/rbs/{}", root_id),
            json!({ "parent_id": grandchild_id }),
        )
        .await?;
    assert_eq!(cycle.status(), 422);

    // A legal move works and shows up in the tree
    let moved = data(
        app.put(
            &editor,
            &format!("/rbs/{}", grandchild_id),
            json!({ "parent_id": root_id }),
        )
        .await?,
    )
    .await?;
    assert_eq!(moved["parent_id"], root_id);
    Ok(())
}

#[tokio::test]
async fn deletion_reparents_children_and_clears_risks() -> Result<()> {
    let app = TestApp::spawn().await?;
    let editor = app.create_user("editor@example.com", "editor").await?;

    let root = create_node(&app, &editor, json!({ "name": "Root" })).await?;
    let root_id = root["id"].as_i64().unwrap();
    let middle = create_node(&app, &editor, json!({ "name": "Middle", "parent_id": root_id })).await?;
    let middle_id = middle["id"].as_i64().unwrap();
    let leaf = create_node(&app, &editor, json!({ "name": "Leaf", "parent_id": middle_id })).await?;
    let leaf_id = leaf["id"].as_i64().unwrap();

    let risk = data(
        app.post(
            &editor,
            "/risks",
            json!({ "risk_name": "Categorized", "rbs_node_id": middle_id }),
        )
        .await?,
    )
    .await?;
    let risk_id = risk["id"].as_i64().unwrap();

    let resp = app.delete(&editor, &format!("/rbs/{}", middle_id)).await?;
    assert_eq!(resp.status(), 204);

    let nodes = data(app.get(&editor, "/rbs").await?).await?;
    let leaf_row = nodes
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == json!(leaf_id))
        .unwrap();
    assert_eq!(leaf_row["parent_id"], json!(root_id));

    let risk_after = data(app.get(&editor, &format!("/risks/{}", risk_id)).await?).await?;
    assert_eq!(risk_after["rbs_node_id"], Value::Null);
    Ok(())
}
