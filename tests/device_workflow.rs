use idgctl::{
    config::Config,
    handlers::{
        AppState, CheckpointParams, CheckpointState, DomainConfigParams, DomainConfigState,
        checkpoint, domain_config, domain_discovery,
    },
    services::IdgClient,
};
use serde_json::json;
use std::{net::TcpListener, sync::Arc};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header_exists, method, path},
};

async fn device() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/domains/config/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"domain": [{"name": "default"}, {"name": "test"}]})),
        )
        .mount(&server)
        .await;
    server
}

fn app_for(server: &MockServer) -> AppState {
    let mut config = Config::default();
    config.connection.password = "secret".to_string();
    config.connection.use_proxy = false;
    config.polling.interval_ms = 10;
    config.polling.timeout_secs = 5;

    let client = IdgClient::new_with_base_url(&config.connection, server.uri()).unwrap();
    AppState::new(&config, Arc::new(client))
}

fn checkpoint_params(name: &str, state: CheckpointState) -> CheckpointParams {
    CheckpointParams {
        domain: "test".to_string(),
        name: name.to_string(),
        state,
    }
}

#[tokio::test]
async fn test_save_checkpoint_waits_for_completion() {
    let server = device().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/actionqueue/test"))
        .and(header_exists("authorization"))
        .and(body_json(json!({"SaveCheckpoint": {"ChkName": "cp1"}})))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({"_links": {"location": {"href": "/actions/test/1"}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/actions/test/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/actions/test/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed"})))
        .with_priority(2)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let result = checkpoint::run(&app, &checkpoint_params("cp1", CheckpointState::Present)).await;

    assert_eq!(result.msg, "Completed");
    assert!(result.changed);
    assert!(!result.is_failed());

    let record = serde_json::to_value(&result).unwrap();
    assert_eq!(
        record,
        json!({"name": "cp1", "domain": "test", "msg": "Completed", "changed": true})
    );
}

#[tokio::test]
async fn test_remove_missing_checkpoint_is_idempotent() {
    let server = device().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/actionqueue/test"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Cannot find Configuration Checkpoint 'cpX'."})),
        )
        .mount(&server)
        .await;

    let app = app_for(&server);
    let result = checkpoint::run(&app, &checkpoint_params("cpX", CheckpointState::Absent)).await;

    assert!(!result.changed);
    assert_eq!(result.failed, None);
    assert_eq!(result.msg, app.messages.immutable);
}

#[tokio::test]
async fn test_missing_domain_is_reported_without_submitting() {
    let server = device().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let mut params = checkpoint_params("cp1", CheckpointState::Present);
    params.domain = "prod".to_string();

    let result = checkpoint::run(&app, &params).await;

    assert!(result.is_failed());
    assert!(result.msg.contains("prod"));
}

#[tokio::test]
async fn test_closed_port_failure_names_the_task() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = Config::default();
    config.connection.password = "secret".to_string();
    config.connection.use_proxy = false;
    config.connection.timeout_secs = 2;
    let client =
        IdgClient::new_with_base_url(&config.connection, format!("http://127.0.0.1:{}", port))
            .unwrap();
    let app = AppState::new(&config, Arc::new(client));

    let result = checkpoint::run(&app, &checkpoint_params("cp1", CheckpointState::Present)).await;

    assert!(result.is_failed());
    assert!(!result.changed);
    assert!(result.msg.contains("传输错误"), "{}", result.msg);
    assert!(result.msg.contains("idg_domain_chkpoint"));
    assert!(result.msg.contains("test"));
    assert!(result.msg.contains("'present'"));
    assert!(result.msg.contains("SaveCheckpoint (cp1)"));
}

#[tokio::test]
async fn test_import_reports_normalized_sections() {
    let server = device().await;

    Mock::given(method("POST"))
        .and(path("/mgmt/actionqueue/test"))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({"_links": {"location": {"href": "/mgmt/actionqueue/test/pending/9"}}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mgmt/actionqueue/test/pending/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "result": {"Import": {"import-results": {
                "detected-errors": "false",
                "export-details": {"domain": "test", "user": "admin"},
                "file-copy-log": {"file-result": [
                    {"name": "local:///a.xsl", "status": "ok"},
                    {"name": "local:///b.xsl", "status": "failed"}
                ]},
                "imported-objects": {"object": {"class": "XMLManager", "name": "x", "status": "new"}}
            }}}
        })))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let mut params = DomainConfigParams::new("test", DomainConfigState::Imported);
    params.input_file = Some("UEsDBA==".to_string());

    let result = domain_config::run(&app, &params).await;

    assert!(result.changed, "{}", result.msg);
    assert_eq!(result.msg, "Completed");
    let results = result.results.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[1],
        json!({"file-copy-log": {
            "summary": {"total": 2, "status": {"failed": 1, "ok": 1}},
            "detail": [
                {"name": "local:///a.xsl", "status": "ok"},
                {"name": "local:///b.xsl", "status": "failed"}
            ]
        }})
    );
    assert_eq!(results[2]["imported-objects"]["summary"]["total"], 1);
}

#[tokio::test]
async fn test_discovery_lists_domains() {
    let server = device().await;
    let app = app_for(&server);

    let result = domain_discovery::run(&app).await;

    assert!(!result.changed);
    assert_eq!(
        result.domains,
        Some(vec!["default".to_string(), "test".to_string()])
    );
}
