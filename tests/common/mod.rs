//! In-process fake ANN service on a real socket.
//!
//! Answers every search exactly (brute-force cosine over what was inserted),
//! in the response shape of its configured schema. Faults are injected by
//! search call number or insert id.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use annharness::similarity::cosine;
use annharness::SchemaVersion;
use serde_json::{json, Value};
use tiny_http::{Header, Request, Response, Server};

#[derive(Debug, Default)]
pub struct Faults {
    /// Zero-based search call numbers answered with HTTP 500.
    pub failing_searches: HashSet<usize>,
    /// Search call numbers answered with an empty match list.
    pub empty_searches: HashSet<usize>,
    /// Insert of this id is rejected with HTTP 507.
    pub rejected_insert: Option<u64>,
}

#[derive(Default)]
struct State {
    vectors: Vec<(u64, Vec<f32>)>,
    searches: usize,
    inserts: usize,
}

pub struct FakeService {
    server: Arc<Server>,
    state: Arc<Mutex<State>>,
    handle: Option<JoinHandle<()>>,
    port: u16,
}

impl FakeService {
    pub fn start(schema: SchemaVersion) -> Self {
        Self::with_faults(schema, Faults::default())
    }

    pub fn with_faults(schema: SchemaVersion, faults: Faults) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind fake service"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("tcp listener")
            .port();
        let state = Arc::new(Mutex::new(State::default()));

        let handle = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                while let Ok(request) = server.recv() {
                    serve(request, schema, &faults, &state);
                }
            })
        };

        Self {
            server,
            state,
            handle: Some(handle),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn inserted(&self) -> usize {
        self.state.lock().unwrap().inserts
    }

    pub fn searches(&self) -> usize {
        self.state.lock().unwrap().searches
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(mut request: Request, schema: SchemaVersion, faults: &Faults, state: &Mutex<State>) {
    let mut body = String::new();
    if request.as_reader().read_to_string(&mut body).is_err() {
        let _ = request.respond(Response::from_string("bad body").with_status_code(400));
        return;
    }
    let Ok(payload) = serde_json::from_str::<Value>(&body) else {
        let _ = request.respond(Response::from_string("bad json").with_status_code(400));
        return;
    };

    let (status, reply) = match request.url() {
        "/insert" => insert(&payload, faults, state),
        "/search" => search(&payload, schema, faults, state),
        _ => (404, json!({"error": "not found"})),
    };

    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
    let response = Response::from_string(reply.to_string())
        .with_status_code(status)
        .with_header(header);
    let _ = request.respond(response);
}

fn insert(payload: &Value, faults: &Faults, state: &Mutex<State>) -> (u16, Value) {
    let (Some(id), Some(vector)) = (payload["id"].as_u64(), as_vector(&payload["vector"])) else {
        return (422, json!({"error": "expected {id, vector}"}));
    };
    if faults.rejected_insert == Some(id) {
        return (507, json!({"error": "index full"}));
    }
    let mut state = state.lock().unwrap();
    state.vectors.push((id, vector));
    state.inserts += 1;
    (200, json!({"status": "ok"}))
}

fn search(payload: &Value, schema: SchemaVersion, faults: &Faults, state: &Mutex<State>) -> (u16, Value) {
    // Either request field is accepted so a schema mismatch surfaces in the
    // response shape rather than as a 4xx.
    let Some(query) = as_vector(&payload["query"]).or_else(|| as_vector(&payload["vector"])) else {
        return (422, json!({"error": "expected query vector"}));
    };

    let mut state = state.lock().unwrap();
    let call = state.searches;
    state.searches += 1;

    if faults.failing_searches.contains(&call) {
        return (500, json!({"error": "internal error"}));
    }

    let mut ranked: Vec<(u64, f32)> = state
        .vectors
        .iter()
        .map(|(id, v)| (*id, cosine(&query, v)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    if faults.empty_searches.contains(&call) {
        ranked.clear();
    }

    match schema {
        SchemaVersion::FlattenedId => match ranked.first() {
            Some((id, score)) => (200, json!({"id": id, "score": score})),
            None => (404, json!({"error": "empty index"})),
        },
        SchemaVersion::QueryMatches | SchemaVersion::Ranked => {
            let k = payload["k"].as_u64().unwrap_or(10) as usize;
            let matches: Vec<Value> = ranked
                .iter()
                .take(k)
                .map(|(id, score)| json!({"id": id, "score": score}))
                .collect();
            (200, json!({ "matches": matches }))
        }
    }
}

fn as_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|x| x.as_f64().map(|f| f as f32))
        .collect()
}
