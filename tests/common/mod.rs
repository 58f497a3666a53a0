#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use trend_ideas::{BotCommand, ChatCommand, CommandInbox, Delivery, TrendError};

/// Canned reply for any request whose text contains `matcher`.
#[derive(Clone)]
pub struct Route {
    matcher: String,
    status: u16,
    body: String,
}

impl Route {
    pub fn new(matcher: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            matcher: matcher.to_string(),
            status,
            body: body.into(),
        }
    }
}

/// Minimal HTTP/1.1 server on an ephemeral port. Routes are tried in order
/// against the full request text; unmatched requests get a 404.
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let seen = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &seen).await;
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Every request received so far, lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &[Route],
    seen: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let request = read_request(&mut stream).await?;
    seen.lock().unwrap().push(request.to_lowercase());

    let (status, body) = routes
        .iter()
        .find(|route| request.contains(&route.matcher))
        .map(|route| (route.status, route.body.clone()))
        .unwrap_or((404, r#"{"message":"Not Found"}"#.to_string()));

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        if status < 400 { "OK" } else { "Error" },
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Delivery that keeps every message, and the chat it was meant for, in memory.
#[derive(Clone, Default)]
pub struct RecordingDelivery {
    pub sent: Arc<Mutex<Vec<(Option<String>, String)>>>,
}

impl RecordingDelivery {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn chats(&self) -> Vec<Option<String>> {
        self.sent.lock().unwrap().iter().map(|(chat, _)| chat.clone()).collect()
    }

    /// Resolves once at least `count` messages were sent.
    pub async fn wait_for(&self, count: usize) {
        while self.sent.lock().unwrap().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    fn topic(&self) -> &str {
        "AI agent"
    }

    async fn send_text_to(&self, chat: Option<&str>, text: &str) -> Result<(), TrendError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat.map(String::from), text.to_string()));
        Ok(())
    }
}

/// Hands out the queued batches, then never returns again.
#[derive(Default)]
pub struct ScriptedInbox {
    batches: Mutex<VecDeque<Vec<ChatCommand>>>,
}

impl ScriptedInbox {
    pub fn with_batch(self, batch: Vec<ChatCommand>) -> Self {
        self.batches.lock().unwrap().push_back(batch);
        self
    }
}

#[async_trait]
impl CommandInbox for ScriptedInbox {
    async fn next_commands(&self) -> Result<Vec<ChatCommand>, TrendError> {
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => std::future::pending().await,
        }
    }
}

pub fn command(chat_id: &str, command: BotCommand) -> ChatCommand {
    ChatCommand {
        chat_id: chat_id.to_string(),
        command,
    }
}

pub fn analysis_json(idea_count: usize) -> String {
    let ideas: Vec<serde_json::Value> = (1..=idea_count)
        .map(|i| {
            serde_json::json!({
                "title": format!("Idea {i}"),
                "description": "A small agent that does one thing well",
                "why_now": "Agent frameworks are trending",
                "difficulty": if i % 2 == 0 { "Medium" } else { "easy" },
                "tech_stack": ["Rust", "tokio"],
                "first_step": "Sketch the CLI"
            })
        })
        .collect();

    serde_json::json!({
        "trend_summary": "Agents and developer tooling dominate today.",
        "ideas": ideas
    })
    .to_string()
}
