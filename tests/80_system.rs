mod common;

use anyhow::Result;
use serde_json::json;

use common::{data, TestApp};

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let app = TestApp::spawn().await?;

    let resp = app.client.get(app.url("/health")).send().await?;
    assert_eq!(resp.status(), 200);
    let body = data(resp).await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "riskworks-api");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn unknown_routes_return_json_404() -> Result<()> {
    let app = TestApp::spawn().await?;

    let resp = app.client.get(app.url("/no/such/route")).send().await?;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"], json!(true));
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn status_reports_host_and_entity_counts() -> Result<()> {
    let app = TestApp::spawn().await?;
    let viewer = app.create_user("viewer@example.com", "viewer").await?;

    app.create_user("second@example.com", "editor").await?;

    let status = data(app.get(&viewer, "/system/status").await?).await?;
    assert_eq!(status["service"]["name"], "riskworks-api");
    assert_eq!(status["service"]["environment"], "local");
    assert_eq!(status["database"]["healthy"], json!(true));
    assert_eq!(status["database"]["counts"]["users"], 2);
    assert_eq!(status["database"]["counts"]["risks"], 0);
    assert!(status["host"]["cpu_count"].as_u64().unwrap_or(0) > 0);

    let anonymous = app.client.get(app.url("/system/status")).send().await?;
    assert_eq!(anonymous.status(), 401);
    Ok(())
}
