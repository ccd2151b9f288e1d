use std::time::Duration;

use httpmock::prelude::*;
use pangea_sdk::data::config::{
    with_base_url_template, with_config_id, with_poll_initial_delay, with_queued_retry_enabled, with_token,
};
use pangea_sdk::{
    BaseRequest, BaseService, ApiRequest, Config, ConfigOption, Context, Error, FileData, PangeaResponse, ReqwestClient,
    ResponseStatus, TransferMethod, Transport,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::tempdir;

fn client() -> ReqwestClient {
    ReqwestClient::from_client(reqwest::Client::builder().no_proxy().build().unwrap())
}

fn service(server: &MockServer, name: &str, extra: Vec<ConfigOption>) -> BaseService<ReqwestClient> {
    let mut options = vec![with_token("pts_test"), with_base_url_template(server.base_url())];
    options.extend(extra);
    let config = Config::new(options).unwrap();
    BaseService::new(name, Transport::with_clients(config, client(), client()))
}

#[derive(Serialize)]
struct RedactRequest {
    #[serde(flatten)]
    base:     BaseRequest,
    text:     String,
    debug:    Option<bool>,
    rulesets: Option<Vec<String>>,
}

impl ApiRequest for RedactRequest {
    fn config_id(&self) -> Option<&str> { ApiRequest::config_id(&self.base) }
}

#[derive(Debug, Deserialize)]
struct Redacted {
    redacted_text: String,
    count:         u32,
}

#[tokio::test]
async fn test_inline_success() {
    let server = MockServer::start_async().await;
    let redact = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/redact")
                .header("authorization", "Bearer pts_test")
                .header("content-type", "application/json")
                .header("x-pangea-redact-config-id", "pci_123")
                .header_exists("user-agent")
                .json_body(json!({ "text": "hello 555-1212" }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "request_id": "prq_s1",
                    "request_time": "2024-01-01T00:00:00.000000Z",
                    "response_time": "2024-01-01T00:00:00.100000Z",
                    "status": "Success",
                    "summary": "Success. Redacted 1 item(s) from text",
                    "result": { "redacted_text": "hello <PHONE_NUMBER>", "count": 1 }
                }));
        })
        .await;

    let service = service(&server, "redact", vec![with_config_id("pci_123")]);
    let request = RedactRequest {
        base:     BaseRequest::new(),
        text:     "hello 555-1212".into(),
        debug:    None,
        rulesets: None,
    };
    let response: PangeaResponse<Redacted> = service
        .post(&Context::background(), "v1/redact", &request)
        .await
        .unwrap();

    redact.assert_calls_async(1).await;
    assert_eq!(response.request_id(), "prq_s1");
    assert_eq!(response.status(), &ResponseStatus::Success);
    assert_eq!(response.http_status, 200);
    assert!(response.header.request_time.is_some());
    let result = response.result.unwrap();
    assert_eq!(result.redacted_text, "hello <PHONE_NUMBER>");
    assert_eq!(result.count, 1);
}

#[tokio::test]
async fn test_multipart_response_and_save() {
    let server = MockServer::start_async().await;
    let archive: Vec<u8> = (0u8..=255).chain(b"\r\n--xy not a boundary\r\n".iter().copied()).collect();

    let mut body = Vec::new();
    body.extend_from_slice(b"--xyz\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"pangea_json\"\r\n");
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(
        json!({
            "request_id": "prq_s5",
            "status": "Success",
            "summary": "ok",
            "result": { "count": 1 }
        })
        .to_string()
        .as_bytes(),
    );
    body.extend_from_slice(b"\r\n--xyz\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"; filename=\"archive.zip\"\r\n");
    body.extend_from_slice(b"Content-Type: application/zip\r\n\r\n");
    body.extend_from_slice(&archive);
    body.extend_from_slice(b"\r\n--xyz--\r\n");

    let get_archive = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/get_archive")
                .query_param("ids", "pos_1")
                .query_param("format", "zip");
            then.status(200)
                .header("content-type", "multipart/form-data; boundary=xyz")
                .body(body);
        })
        .await;

    #[derive(Debug, Deserialize)]
    struct Archive {
        count: u32,
    }

    let share = service(&server, "share", Vec::new());
    let response: PangeaResponse<Archive> = share
        .get(&Context::background(), "v1/get_archive", &json!({ "ids": ["pos_1"], "format": "zip" }))
        .await
        .unwrap();

    get_archive.assert_async().await;
    assert_eq!(response.request_id(), "prq_s5");
    assert_eq!(response.result.as_ref().map(|r| r.count), Some(1));
    assert_eq!(response.attached_files.len(), 1);
    let attachment = &response.attached_files[0];
    assert_eq!(attachment.filename, "archive.zip");
    assert_eq!(attachment.content_type, "application/zip");

    let dir = tempdir().unwrap();
    let path = attachment.save(dir.path(), None).await.unwrap();
    assert_eq!(path, dir.path().join("archive.zip"));
    assert_eq!(std::fs::read(&path).unwrap(), archive);
}

#[tokio::test]
async fn test_validation_failure_not_retried() {
    let server = MockServer::start_async().await;
    let redact = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/redact");
            then.status(400)
                .header("content-type", "application/json")
                .json_body(json!({
                    "request_id": "prq_s6",
                    "status": "ValidationError",
                    "summary": "bad field",
                    "result": {
                        "errors": [{
                            "source": "/field",
                            "code": "BelowMinLength",
                            "detail": "field is too short"
                        }]
                    }
                }));
        })
        .await;

    let service = service(&server, "redact", Vec::new());
    let err = service
        .post::<Redacted, _>(&Context::background(), "v1/redact", &json!({ "text": "" }))
        .await
        .unwrap_err();

    redact.assert_calls_async(1).await;
    assert_eq!(err.request_id(), Some("prq_s6"));
    let Error::Api(api) = err else { panic!("expected an API error") };
    assert_eq!(api.http_status, 400);
    assert_eq!(api.status(), &ResponseStatus::ValidationError);
    assert_eq!(api.summary(), "bad field");
    assert_eq!(api.errors.len(), 1);
    assert_eq!(api.errors[0].source, "/field");
    assert_eq!(api.errors[0].code, "BelowMinLength");
}

#[tokio::test]
async fn test_accepted_without_queued_retry() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/scan");
            then.status(202)
                .header("content-type", "application/json")
                .json_body(json!({ "request_id": "prq_s3", "status": "Accepted", "summary": "queued", "result": {} }));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/request/prq_s3");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "request_id": "prq_s3", "status": "Success", "result": { "verdict": "benign" } }));
        })
        .await;

    let scan = service(&server, "file-scan", vec![with_queued_retry_enabled(false)]);
    let err = scan
        .post::<serde_json::Value, _>(&Context::background(), "v1/scan", &json!({ "file_url": "https://x" }))
        .await
        .unwrap_err();

    let accepted = err.accepted().unwrap();
    assert_eq!(accepted.request_id(), "prq_s3");
    assert_eq!(accepted.http_status, 202);
    poll.assert_calls_async(0).await;

    let response: PangeaResponse<serde_json::Value> = scan
        .poll_result_by_accepted_error(&Context::background(), accepted)
        .await
        .unwrap();
    poll.assert_calls_async(1).await;
    assert_eq!(response.request_id(), "prq_s3");
    assert_eq!(response.result.unwrap()["verdict"], "benign");
}

#[tokio::test]
async fn test_presigned_put_upload() {
    let server = MockServer::start_async().await;
    let put_url = server.url("/bucket/object-1");

    let intent = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/put")
                .header("authorization", "Bearer pts_test")
                .json_body(json!({ "transfer_method": "put-url", "name": "notes.txt" }));
            then.status(202)
                .header("content-type", "application/json")
                .json_body(json!({
                    "request_id": "prq_put",
                    "status": "Accepted",
                    "result": { "put_url": put_url, "ttl_mins": 60 }
                }));
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/bucket/object-1")
                .header("content-type", "application/octet-stream")
                .body("hello storage");
            then.status(200);
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/request/prq_put");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "request_id": "prq_put",
                    "status": "Success",
                    "result": { "object": { "id": "pos_9", "name": "notes.txt" } }
                }));
        })
        .await;

    let share = service(&server, "share", vec![with_poll_initial_delay(Duration::from_millis(20))]);
    let mut file = FileData::new(std::io::Cursor::new(b"hello storage".to_vec()), "notes.txt");
    let request = json!({ "transfer_method": TransferMethod::PutUrl, "name": "notes.txt" });

    let response: PangeaResponse<serde_json::Value> = share
        .post_with_file(&Context::background(), "v1/put", &request, &mut file)
        .await
        .unwrap();

    intent.assert_calls_async(1).await;
    upload.assert_calls_async(1).await;
    poll.assert_calls_async(1).await;
    assert_eq!(response.request_id(), "prq_put");
    assert_eq!(response.result.unwrap()["object"]["id"], "pos_9");
    assert_eq!(file.reader.position(), 0);
}

#[tokio::test]
async fn test_cancelled_context() {
    let server = MockServer::start_async().await;
    let redact = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/redact");
            then.status(200).json_body(json!({ "request_id": "r", "status": "Success" }));
        })
        .await;

    let ctx = Context::background();
    ctx.cancel();
    let err = service(&server, "redact", Vec::new())
        .post::<serde_json::Value, _>(&ctx, "v1/redact", &json!({ "text": "x" }))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    redact.assert_calls_async(0).await;
}
