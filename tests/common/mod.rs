//! Shared test infrastructure for end-to-end tests.
//!
//! Services are played by [`StubService`], an axum app served on a loopback
//! port from its own thread. [`TestFixture`] writes a pipeline config pointing
//! at those ports and runs the built binary against it.

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::Router;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

pub const INPUT: &str = r#"{"metadata": {"mmif": "http://mmif.clams.ai/1.0.0"}, "documents": [{"@type": "http://mmif.clams.ai/vocabulary/TextDocument/v1", "properties": {"id": "d1", "text": {"@value": "Hello world"}}}], "views": []}"#;

/// One request as seen by a stub service.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub body: String,
}

/// How a stub answers `PUT /`.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// 200 with one new view holding a single token.
    Annotate,
    /// 500 with a debug page instead of a document.
    FaultPage,
}

struct StubState {
    behavior: Behavior,
    app: String,
    requests: Mutex<Vec<Request>>,
}

pub struct StubService {
    pub name: String,
    pub port: u16,
    state: Arc<StubState>,
}

impl StubService {
    pub fn start(name: &str, behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub service");
        let port = listener.local_addr().expect("local addr").port();
        listener.set_nonblocking(true).expect("nonblocking listener");
        let state = Arc::new(StubState {
            behavior,
            app: format!("https://apps.clams.ai/{name}/v1"),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(respond).with_state(Arc::clone(&state));
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("stub runtime");
            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).expect("adopt stub listener");
                axum::serve(listener, app).await.expect("serve stub");
            });
        });
        Self {
            name: name.to_string(),
            port,
            state,
        }
    }

    /// `(name, port)` pair for [`TestFixture::new`].
    pub fn entry(&self) -> (&str, u16) {
        (self.name.as_str(), self.port)
    }

    pub fn puts(&self) -> Vec<Request> {
        self.state
            .requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|request| request.method == "PUT")
            .cloned()
            .collect()
    }
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("local addr").port()
}

async fn respond(
    State(stub): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let (status, reply) = if method == Method::GET {
        (
            StatusCode::OK,
            json!({"identifier": stub.app, "name": "stub"}).to_string(),
        )
    } else {
        match stub.behavior {
            Behavior::Annotate => annotate(&body, &stub.app),
            Behavior::FaultPage => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "<html><head><title>KeyError: 'text' // Werkzeug Debugger</title></head></html>"
                    .to_string(),
            ),
        }
    };
    stub.requests.lock().expect("requests lock").push(Request {
        method: method.to_string(),
        target: uri.to_string(),
        body,
    });
    (status, [(header::CONTENT_TYPE, "application/json")], reply)
}

fn annotate(body: &str, app: &str) -> (StatusCode, String) {
    let Ok(mut doc) = serde_json::from_str::<Value>(body) else {
        return (StatusCode::BAD_REQUEST, "bad input".to_string());
    };
    let Some(views) = doc["views"].as_array_mut() else {
        return (StatusCode::BAD_REQUEST, "bad input".to_string());
    };
    let id = format!("v_{}", views.len());
    views.push(json!({
        "id": id,
        "metadata": {"app": app},
        "annotations": [{"@type": "http://vocab.lappsgrid.org/Token", "properties": {"id": "t1"}}]
    }));
    (StatusCode::OK, doc.to_string())
}

/// Scratch directory with a pipeline config and input files.
pub struct TestFixture {
    pub dir: TempDir,
}

impl TestFixture {
    /// Write `config.yml` declaring `(name, port)` services in order.
    pub fn new(services: &[(&str, u16)]) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let mut config = String::from("services:\n");
        for (name, port) in services {
            config.push_str(&format!(
                "  - {name}:\n      container: {name}\n      image: clams-{name}\n      port: {port}\n      parameters:\n        model: default\n"
            ));
        }
        std::fs::write(dir.path().join("config.yml"), config).expect("write config");
        Self { dir }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }

    /// Run the binary from the fixture directory.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mmif-pipeline"))
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .output()
            .expect("run mmif-pipeline")
    }
}

pub fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).expect("read output");
    serde_json::from_str(&text).expect("output is JSON")
}

pub fn views(doc: &Value) -> &Vec<Value> {
    doc["views"].as_array().expect("views array")
}
