use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use base64::Engine;
use http::{Request, StatusCode, header};
use image::{ImageBuffer, ImageFormat, Rgb};
use photo_printer::Platform;
use print_server::api::build_app;
use print_server::{Config, ServerState};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

fn png_data_url(width: u32, height: u32) -> String {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    )
}

struct TestServer {
    app: Router,
    state: ServerState,
    _work_dir: TempDir,
}

impl TestServer {
    fn new(platform: Platform, command: Option<&str>) -> Self {
        Self::with_config(platform, command, |_| {})
    }

    fn with_config(
        platform: Platform,
        command: Option<&str>,
        tweak: impl FnOnce(&mut Config),
    ) -> Self {
        let work_dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_overrides(work_dir.path(), 0);
        config.printer.command_override = command.map(str::to_string);
        config.printer.printer_name = None;
        config.printer.timeout = Duration::from_secs(10);
        tweak(&mut config);

        let state = ServerState::with_platform(&config, platform).unwrap();
        let app = build_app(&state);
        Self {
            app,
            state,
            _work_dir: work_dir,
        }
    }

    fn spool_root(&self) -> &Path {
        &self.state.config.temp_dir
    }

    async fn request(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    async fn post_print(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        let req = Request::post("/api/print")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap();
        self.request(req).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Poll a job until it reaches a final status
    async fn wait_finished(&self, job_id: &str) -> Value {
        for _ in 0..200 {
            let (status, job) = self.get(&format!("/api/print/jobs/{}", job_id)).await;
            assert_eq!(status, StatusCode::OK);
            if job["status"] == "completed" || job["status"] == "failed" {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} never finished", job_id);
    }
}

fn spool_entries(root: &Path) -> usize {
    std::fs::read_dir(root).unwrap().count()
}

fn assert_print_failed(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, &json!({ "error": "Failed to print" }));
}

#[tokio::test]
async fn test_valid_photo_is_accepted() {
    let server = TestServer::new(Platform::Unix, Some("true"));

    let body = json!({ "imageStr": png_data_url(800, 600) }).to_string();
    let (status, body) = server.post_print(body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Printing request received");
    assert_eq!(body["status"], "queued");
    let job_id = body["jobId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(job_id).is_ok());

    let (status, job) = server.get(&format!("/api/print/jobs/{}", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["id"], job_id);
    assert_eq!(job["sourceWidth"], 800);
    assert_eq!(job["sourceHeight"], 600);
    assert_eq!(job["printer"], "true");
}

#[cfg(unix)]
#[tokio::test]
async fn test_successful_print_cleans_spool() {
    let server = TestServer::new(Platform::Unix, Some("true"));

    let body = json!({ "imageStr": png_data_url(120, 180) }).to_string();
    let (status, body) = server.post_print(body).await;
    assert_eq!(status, StatusCode::OK);

    let job = server.wait_finished(body["jobId"].as_str().unwrap()).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["exitCode"], 0);
    assert!(job["finishedAt"].is_string());
    assert_eq!(spool_entries(server.spool_root()), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_print_is_recorded_and_cleaned() {
    let server = TestServer::new(Platform::Unix, Some("false"));

    let body = json!({ "imageStr": png_data_url(60, 40) }).to_string();
    let (status, body) = server.post_print(body).await;
    // The response never waits for the print command
    assert_eq!(status, StatusCode::OK);

    let job = server.wait_finished(body["jobId"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");
    assert_eq!(job["exitCode"], 1);
    assert!(job["error"].as_str().unwrap().contains("exited with code 1"));
    assert_eq!(spool_entries(server.spool_root()), 0);
}

#[tokio::test]
async fn test_malformed_base64_fails_and_server_keeps_serving() {
    let server = TestServer::new(Platform::Unix, Some("true"));

    let body = json!({ "imageStr": "data:image/png;base64,@@not-base64@@" }).to_string();
    let (status, body) = server.post_print(body).await;
    assert_print_failed(status, &body);
    assert_eq!(spool_entries(server.spool_root()), 0);

    let (status, _) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bad_request_bodies_fail_with_generic_error() {
    let server = TestServer::new(Platform::Unix, Some("true"));

    let (status, body) = server.post_print("{}").await;
    assert_print_failed(status, &body);

    let (status, body) = server.post_print("not json").await;
    assert_print_failed(status, &body);

    let (status, body) = server
        .post_print(json!({ "imageStr": "aGVsbG8gd29ybGQ=" }).to_string())
        .await;
    assert_print_failed(status, &body);

    let (_, jobs) = server.get("/api/print/jobs").await;
    assert_eq!(jobs, json!([]));
}

#[tokio::test]
async fn test_oversized_body_fails() {
    let server = TestServer::with_config(Platform::Unix, Some("true"), |config| {
        config.max_body_bytes = 64;
    });

    let body = json!({ "imageStr": png_data_url(200, 200) }).to_string();
    assert!(body.len() > 64);
    let (status, body) = server.post_print(body).await;
    assert_print_failed(status, &body);
}

#[tokio::test]
async fn test_unsupported_platform_fails_without_job() {
    let server = TestServer::new(Platform::Unsupported("plan9".into()), None);

    let body = json!({ "imageStr": png_data_url(80, 60) }).to_string();
    let (status, body) = server.post_print(body).await;
    assert_print_failed(status, &body);

    let (_, jobs) = server.get("/api/print/jobs").await;
    assert_eq!(jobs, json!([]));
    assert_eq!(spool_entries(server.spool_root()), 0);

    let (_, health) = server.get("/health").await;
    assert_eq!(health["platform"], "unsupported(plan9)");
    assert!(health.get("printer").is_none());
}

#[tokio::test]
async fn test_unsupported_platform_ignores_command_override() {
    let server = TestServer::new(Platform::Unsupported("plan9".into()), Some("true"));

    let body = json!({ "imageStr": png_data_url(80, 60) }).to_string();
    let (status, body) = server.post_print(body).await;
    assert_print_failed(status, &body);

    let (_, jobs) = server.get("/api/print/jobs").await;
    assert_eq!(jobs, json!([]));
    assert_eq!(spool_entries(server.spool_root()), 0);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let server = TestServer::new(Platform::Unix, Some("true"));

    let uri = format!("/api/print/jobs/{}", uuid::Uuid::new_v4());
    let (status, body) = server.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Print job not found" }));

    let (status, _) = server.get("/api/print/jobs/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_jobs_listed_newest_first() {
    let server = TestServer::new(Platform::Unix, Some("true"));

    let mut ids = Vec::new();
    for _ in 0..2 {
        let body = json!({ "imageStr": png_data_url(40, 40) }).to_string();
        let (status, body) = server.post_print(body).await;
        assert_eq!(status, StatusCode::OK);
        ids.push(body["jobId"].as_str().unwrap().to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (status, jobs) = server.get("/api/print/jobs").await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = jobs
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[1].as_str(), ids[0].as_str()]);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let server = TestServer::new(Platform::Unix, Some("true"));

    let response = server
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["platform"], "unix");
    assert_eq!(health["printer"], "true");
    assert_eq!(health["activeJobs"], 0);
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}
