use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;
use crate::model::{Activity, User};
use crate::transport::{Method, Request, Response, Transport, TransportError};

type Outcome = Result<Response, TransportError>;

enum Script {
    Ready(Outcome),
    Gated(oneshot::Receiver<Outcome>),
}

/// In-memory transport answering from per-route queues, keyed like `"GET /activities"`.
///
/// The script is picked when `send` is called, so the order of `send` calls decides which
/// answer a request gets, independent of when its future is polled.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    sent: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, route: &str, outcome: Outcome) {
        self.push(route, Script::Ready(outcome));
    }

    pub(crate) fn respond_json<T: serde::Serialize>(&self, route: &str, value: &T) {
        self.respond(route, Response::json_ok(value));
    }

    /// Queue an answer that is only released through the returned sender.
    pub(crate) fn gate(&self, route: &str) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.push(route, Script::Gated(rx));
        tx
    }

    pub(crate) fn status_error(path: &str, status: u16) -> TransportError {
        TransportError::Status {
            method: Method::Get,
            path: path.to_string(),
            status,
            body: String::new(),
        }
    }

    /// Requests sent so far for `route`.
    pub(crate) fn count(&self, route: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|r| route_of(r) == route).count()
    }

    pub(crate) fn routes(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(route_of).collect()
    }

    fn push(&self, route: &str, script: Script) {
        self.scripts.lock().unwrap().entry(route.to_string()).or_default().push_back(script);
    }
}

fn route_of(request: &Request) -> String {
    format!("{} {}", request.method, request.path)
}

impl Transport for ScriptedTransport {
    fn send(&self, request: Request) -> impl std::future::Future<Output = Outcome> + Send {
        let route = route_of(&request);
        let script = self.scripts.lock().unwrap().get_mut(&route).and_then(VecDeque::pop_front);
        self.sent.lock().unwrap().push(request.clone());
        async move {
            match script {
                Some(Script::Ready(outcome)) => outcome,
                Some(Script::Gated(rx)) => rx.await.unwrap_or_else(|_| {
                    Err(TransportError::Network {
                        method: request.method,
                        path: request.path,
                        message: "gate dropped".to_string(),
                    })
                }),
                None => Err(TransportError::Status {
                    method: request.method,
                    path: request.path,
                    status: 404,
                    body: format!("no script for {route}"),
                }),
            }
        }
    }
}

pub(crate) fn activity(id: &str, title: &str) -> Activity {
    Activity {
        id: id.to_string(),
        title: title.to_string(),
        date: "2026-11-01T19:00:00Z".to_string(),
        description: "Pub quiz".to_string(),
        category: "drinks".to_string(),
        is_cancelled: false,
        city: "London".to_string(),
        venue: "The Lamb and Flag".to_string(),
        latitude: 51.51,
        longitude: -0.12,
    }
}

pub(crate) fn user(name: &str) -> User {
    User {
        id: name.to_lowercase(),
        email: format!("{}@test.com", name.to_lowercase()),
        display_name: name.to_string(),
        image_url: None,
    }
}
