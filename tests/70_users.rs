mod common;

use anyhow::Result;
use serde_json::{json, Value};

use common::{data, TestApp, PASSWORD};

#[tokio::test]
async fn managers_administer_accounts() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;

    let created = data(
        app.post(
            &manager,
            "/users",
            json!({
                "email": "new@example.com",
                "password": PASSWORD,
                "full_name": "New Person",
                "role": "editor"
            }),
        )
        .await?,
    )
    .await?;
    assert_eq!(created["role"], "editor");
    assert!(created.get("hashed_password").is_none());
    let new_id = created["id"].as_i64().unwrap();

    let listed = data(app.get(&manager, "/users").await?).await?;
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let promoted = data(
        app.put(&manager, &format!("/users/{}", new_id), json!({ "role": "manager" }))
            .await?,
    )
    .await?;
    assert_eq!(promoted["role"], "manager");

    let unknown_role = app
        .put(&manager, &format!("/users/{}", new_id), json!({ "role": "root" }))
        .await?;
    assert_eq!(unknown_role.status(), 422);
    Ok(())
}

#[tokio::test]
async fn user_management_is_manager_only() -> Result<()> {
    let app = TestApp::spawn().await?;
    let editor = app.create_user("editor@example.com", "editor").await?;

    let denied = app.get(&editor, "/users").await?;
    assert_eq!(denied.status(), 403);

    let denied = app
        .post(
            &editor,
            "/users",
            json!({ "email": "x@example.com", "password": PASSWORD }),
        )
        .await?;
    assert_eq!(denied.status(), 403);
    Ok(())
}

#[tokio::test]
async fn anyone_reads_their_own_account_and_permissions() -> Result<()> {
    let app = TestApp::spawn().await?;
    let viewer = app.create_user("viewer@example.com", "viewer").await?;

    let me = data(app.get(&viewer, "/auth/me").await?).await?;
    let my_id = me["id"].as_i64().unwrap();

    let own = data(app.get(&viewer, &format!("/users/{}", my_id)).await?).await?;
    assert_eq!(own["email"], "viewer@example.com");

    let perms = data(
        app.get(&viewer, &format!("/users/{}/permissions", my_id))
            .await?,
    )
    .await?;
    assert_eq!(perms["role"], "viewer");
    let list = perms["permissions"].as_array().unwrap();
    assert!(list.contains(&json!("view_risks")));
    assert!(!list.contains(&json!("delete_risks")));

    // But not anyone else's
    let foreign = app.get(&viewer, &format!("/users/{}", my_id + 1000)).await?;
    assert_eq!(foreign.status(), 403);
    Ok(())
}

#[tokio::test]
async fn managers_cannot_demote_or_deactivate_themselves() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;
    let me = data(app.get(&manager, "/auth/me").await?).await?;
    let my_id = me["id"].as_i64().unwrap();

    let demote = app
        .put(&manager, &format!("/users/{}", my_id), json!({ "role": "viewer" }))
        .await?;
    assert_eq!(demote.status(), 422);

    let deactivate = app
        .put(&manager, &format!("/users/{}", my_id), json!({ "is_active": false }))
        .await?;
    assert_eq!(deactivate.status(), 422);

    let delete = app.delete(&manager, &format!("/users/{}", my_id)).await?;
    assert_eq!(delete.status(), 422);
    Ok(())
}

#[tokio::test]
async fn password_changes_rehash_and_take_effect() -> Result<()> {
    let app = TestApp::spawn().await?;
    let manager = app.create_user("boss@example.com", "manager").await?;
    app.create_user("member@example.com", "viewer").await?;

    let listed = data(app.get(&manager, "/users").await?).await?;
    let member_id = listed
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "member@example.com")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let resp = app
        .put(
            &manager,
            &format!("/users/{}", member_id),
            json!({ "password": "a-brand-new-secret" }),
        )
        .await?;
    assert_eq!(resp.status(), 200);

    assert!(app.login("member@example.com", PASSWORD).await.is_err());
    assert!(app
        .login("member@example.com", "a-brand-new-secret")
        .await
        .is_ok());
    Ok(())
}

#[tokio::test]
async fn role_catalog_is_public() -> Result<()> {
    let app = TestApp::spawn().await?;

    let resp = app.client.get(app.url("/users/roles")).send().await?;
    assert_eq!(resp.status(), 200);
    let catalog = data(resp).await?;
    let roles = catalog.as_array().unwrap();
    assert_eq!(roles.len(), 3);

    let values: Vec<&str> = roles
        .iter()
        .map(|r| r["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, vec!["viewer", "editor", "manager"]);
    for role in roles {
        assert!(role["permissions"].as_array().unwrap().len() > 0);
        assert_ne!(role["description"], Value::Null);
    }
    Ok(())
}
