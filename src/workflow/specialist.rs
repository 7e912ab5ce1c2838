//! Specialist dispatch contract and adapters.
//!
//! A specialist receives one task at a time and answers with a
//! [`SpecialistResponse`]. Specialists are looked up by [`Domain`]:
//!
//! - [`CommandSpecialist`] runs a configured shell command
//! - [`HttpSpecialist`] posts the request to a configured URL
//! - [`RepositorySpecialist`] and [`AnalysisSpecialist`] are built in

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::analyzer::ProjectAnalyzer;
use crate::collab::{CollaborationStore, Message, MessageKind, Recipient};
use crate::core::config::{Config, SpecialistConfig, SpecialistProtocol};
use crate::core::Domain;
use crate::git::{naming, BranchKind, BranchSpec, RepositoryManager};

/// Lines of command output kept in an exit-code response.
const OUTPUT_TAIL_LINES: usize = 20;

/// Specialist errors.
#[derive(Debug, thiserror::Error)]
pub enum SpecialistError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// What a specialist is asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistRequest {
    pub domain: Domain,
    pub task: String,
    pub workflow_id: String,
    pub workflow_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub project_root: PathBuf,
    pub step: usize,
}

/// What a specialist answered. Anything but `success: true` is a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl SpecialistResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), ..Default::default() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self { success: false, errors: vec![message.clone()], message, ..Default::default() }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<SpecialistError> for SpecialistResponse {
    fn from(err: SpecialistError) -> Self {
        Self::failure(err.to_string())
    }
}

/// A collaborator that handles tasks for one domain.
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Name used in logs and outcome messages.
    fn name(&self) -> &str;

    /// Timeout overriding the engine default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Handle one task. Must not panic; failures go in the response.
    async fn handle(&self, request: &SpecialistRequest) -> SpecialistResponse;
}

/// Specialists by domain.
#[derive(Default, Clone)]
pub struct SpecialistRegistry {
    specialists: BTreeMap<Domain, Arc<dyn Specialist>>,
}

impl std::fmt::Debug for SpecialistRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.specialists.iter().map(|(d, s)| (d, s.name()))).finish()
    }
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the configured external specialists plus the built-ins
    /// for domains that have no configured entry.
    pub fn from_config(config: &Config, root: &Path, store: &CollaborationStore) -> Self {
        let mut registry = Self::new();

        registry.register(
            Domain::RepositoryState,
            Arc::new(RepositorySpecialist::new(RepositoryManager::new(root, config.git.clone()))),
        );
        registry.register(
            Domain::Analysis,
            Arc::new(AnalysisSpecialist::new(
                ProjectAnalyzer::new(root, config.analyzer.clone()),
                store.clone(),
            )),
        );

        for (domain, entry) in config.specialist_entries() {
            match external_specialist(domain, entry) {
                Some(specialist) => registry.register(domain, specialist),
                None => tracing::warn!(
                    domain = %domain,
                    "Specialist entry has neither a usable command nor url, ignoring"
                ),
            }
        }

        registry
    }

    /// Register (or replace) the specialist for `domain`.
    pub fn register(&mut self, domain: Domain, specialist: Arc<dyn Specialist>) {
        self.specialists.insert(domain, specialist);
    }

    pub fn get(&self, domain: Domain) -> Option<&Arc<dyn Specialist>> {
        self.specialists.get(&domain)
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.specialists.keys().copied().collect()
    }
}

fn external_specialist(domain: Domain, entry: &SpecialistConfig) -> Option<Arc<dyn Specialist>> {
    let timeout = entry.timeout_secs.map(Duration::from_secs);

    if let Some(command) = &entry.command {
        return Some(Arc::new(CommandSpecialist {
            name: format!("{} ({command})", domain.specialist_name()),
            command: command.clone(),
            protocol: entry.protocol,
            timeout,
        }));
    }

    #[cfg(feature = "http")]
    if let Some(url) = &entry.url {
        return Some(Arc::new(HttpSpecialist::new(
            format!("{} ({url})", domain.specialist_name()),
            url.clone(),
            timeout,
        )));
    }

    None
}

/// Runs a shell command per task.
#[derive(Debug, Clone)]
pub struct CommandSpecialist {
    name: String,
    command: String,
    protocol: SpecialistProtocol,
    timeout: Option<Duration>,
}

impl CommandSpecialist {
    pub fn new(command: impl Into<String>, protocol: SpecialistProtocol) -> Self {
        let command = command.into();
        Self { name: command.clone(), command, protocol, timeout: None }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(&self, request: &SpecialistRequest) -> Result<SpecialistResponse, SpecialistError> {
        // `~` is expanded here, `$VAR` by the shell
        let command = shellexpand::tilde(&self.command).into_owned();
        let (shell, shell_arg) = get_shell();

        let mut cmd = tokio::process::Command::new(shell);
        cmd.arg(shell_arg)
            .arg(&command)
            .current_dir(&request.project_root)
            .env("CONDUCTOR_DOMAIN", request.domain.as_str())
            .env("CONDUCTOR_TASK", &request.task)
            .env("CONDUCTOR_STEP", request.step.to_string())
            .env("CONDUCTOR_WORKFLOW", &request.workflow_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(subject) = &request.subject {
            cmd.env("CONDUCTOR_SUBJECT", subject);
        }

        tracing::debug!(command = %command, domain = %request.domain, "Spawning specialist command");
        let mut child =
            cmd.spawn().map_err(|source| SpecialistError::Spawn { command: command.clone(), source })?;

        let payload = match self.protocol {
            SpecialistProtocol::Json => serde_json::to_vec(request)?,
            SpecialistProtocol::ExitCode => Vec::new(),
        };
        let stdin = child.stdin.take();
        // Feed stdin while stdout/stderr drain, so neither side can block on a full pipe
        let feed = async move {
            let Some(mut stdin) = stdin else { return };
            // a command that never reads stdin closes the pipe early
            if let Err(e) = stdin.write_all(&payload).await {
                tracing::debug!(error = %e, "Specialist did not read its request");
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        match self.protocol {
            SpecialistProtocol::Json => {
                let mut response: SpecialistResponse = serde_json::from_str(stdout.trim())
                    .map_err(|e| {
                        SpecialistError::MalformedResponse(format!(
                            "{e}; stdout was: {}",
                            tail(&stdout, 3)
                        ))
                    })?;
                if !output.status.success() && response.success {
                    response.success = false;
                    response.errors.push(format!("Command exited with {}", output.status));
                }
                Ok(response)
            }
            SpecialistProtocol::ExitCode => {
                let combined = format!("{stdout}{stderr}");
                let message = tail(&combined, OUTPUT_TAIL_LINES);
                if output.status.success() {
                    Ok(SpecialistResponse::success(message))
                } else {
                    let mut response = SpecialistResponse::failure(message);
                    response.errors.push(format!("Command exited with {}", output.status));
                    Ok(response)
                }
            }
        }
    }
}

#[async_trait]
impl Specialist for CommandSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn handle(&self, request: &SpecialistRequest) -> SpecialistResponse {
        self.run(request).await.unwrap_or_else(SpecialistResponse::from)
    }
}

/// Posts the request JSON to a URL and reads the response JSON.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpSpecialist {
    name: String,
    url: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpSpecialist {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self { name: name.into(), url: url.into(), timeout, client: reqwest::Client::new() }
    }

    async fn post(&self, request: &SpecialistRequest) -> Result<SpecialistResponse, SpecialistError> {
        let response = self.client.post(&self.url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Ok(SpecialistResponse::failure(format!("HTTP {status}: {}", tail(&body, 5))));
        }

        Ok(response.json().await?)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Specialist for HttpSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn handle(&self, request: &SpecialistRequest) -> SpecialistResponse {
        self.post(request).await.unwrap_or_else(SpecialistResponse::from)
    }
}

/// Confirms the working branch for repository-state steps.
#[derive(Debug, Clone)]
pub struct RepositorySpecialist {
    repository: RepositoryManager,
}

impl RepositorySpecialist {
    pub fn new(repository: RepositoryManager) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Specialist for RepositorySpecialist {
    fn name(&self) -> &str {
        Domain::RepositoryState.specialist_name()
    }

    async fn handle(&self, request: &SpecialistRequest) -> SpecialistResponse {
        let state = self.repository.current_state();
        if !state.is_known() {
            return SpecialistResponse::failure("Repository state is unreadable");
        }

        let details = serde_json::to_value(&state).unwrap_or(Value::Null);
        match &request.subject {
            Some(subject) => {
                let expected = naming::name_branch(&BranchSpec::new(BranchKind::Feature, subject));
                if state.current_branch == expected {
                    SpecialistResponse::success(format!("On branch '{expected}'")).with_details(details)
                } else {
                    SpecialistResponse::failure(format!(
                        "Expected to be on '{expected}' but HEAD is '{}'",
                        state.current_branch
                    ))
                    .with_details(details)
                }
            }
            None => SpecialistResponse::success(format!("On branch '{}'", state.current_branch))
                .with_details(details),
        }
    }
}

/// Runs the analyzer and shares the findings through the collaboration store.
#[derive(Debug, Clone)]
pub struct AnalysisSpecialist {
    analyzer: ProjectAnalyzer,
    store: CollaborationStore,
}

impl AnalysisSpecialist {
    pub fn new(analyzer: ProjectAnalyzer, store: CollaborationStore) -> Self {
        Self { analyzer, store }
    }
}

#[async_trait]
impl Specialist for AnalysisSpecialist {
    fn name(&self) -> &str {
        Domain::Analysis.specialist_name()
    }

    async fn handle(&self, request: &SpecialistRequest) -> SpecialistResponse {
        let analysis = self.analyzer.analyze();
        let summary = analysis.summary();

        for feature in &analysis.structure.features {
            self.store.create(&feature.name);
            for part in &feature.parts {
                self.store.register_fragment(&feature.name, part);
            }
        }
        self.store.send(Message::new(
            Domain::Analysis.as_str(),
            Recipient::All,
            MessageKind::Update,
            serde_json::json!({
                "workflow": request.workflow_id,
                "summary": summary,
                "violations": analysis.violations.len(),
            }),
        ));

        let mut response = SpecialistResponse::success(summary);
        response.warnings = analysis.violations.iter().map(|v| v.message.clone()).collect();
        response.details = serde_json::to_value(&analysis).ok();
        response
    }
}

fn get_shell() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

/// Last `lines` non-empty lines of `text`.
fn tail(text: &str, lines: usize) -> String {
    let kept: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    kept[kept.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(root: &Path, domain: Domain) -> SpecialistRequest {
        SpecialistRequest {
            domain,
            task: "Run the test suite for billing".to_string(),
            workflow_id: "wf-1".to_string(),
            workflow_name: "New feature: billing".to_string(),
            subject: Some("billing".to_string()),
            project_root: root.to_path_buf(),
            step: 3,
        }
    }

    #[test]
    fn test_response_defaults_to_failure() {
        let response: SpecialistResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.success);

        let response: SpecialistResponse =
            serde_json::from_str(r#"{"success": true, "message": "ok"}"#).unwrap();
        assert!(response.success);
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        assert_eq!(tail("a\n\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("", 3), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let ok = CommandSpecialist::new("echo passed", SpecialistProtocol::ExitCode);
        let response = ok.handle(&request(dir.path(), Domain::Testing)).await;
        assert!(response.success);
        assert_eq!(response.message, "passed");

        let failing =
            CommandSpecialist::new("echo 'endpoint /x returned 500' >&2; exit 3", SpecialistProtocol::ExitCode);
        let response = failing.handle(&request(dir.path(), Domain::Testing)).await;
        assert!(!response.success);
        assert!(response.message.contains("endpoint"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_json_protocol_reads_request_from_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let specialist = CommandSpecialist::new(
            r#"grep -q '"step":3' && echo '{"success": true, "message": "step seen"}'"#,
            SpecialistProtocol::Json,
        );
        let response = specialist.handle(&request(dir.path(), Domain::Development)).await;
        assert!(response.success, "{response:?}");
        assert_eq!(response.message, "step seen");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_json_protocol_with_large_request_and_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut large = request(dir.path(), Domain::Development);
        large.task = "x".repeat(256 * 1024);
        // answers before reading the request
        let specialist = CommandSpecialist::new(
            r#"printf '{"success": true, "message": "'; head -c 200000 /dev/zero | tr '\0' y; printf '"}'; cat > /dev/null"#,
            SpecialistProtocol::Json,
        );

        let response =
            tokio::time::timeout(Duration::from_secs(20), specialist.handle(&large)).await.unwrap();

        assert!(response.success, "{:?}", response.errors);
        assert_eq!(response.message.len(), 200_000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_json_protocol_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let specialist = CommandSpecialist::new("echo not json", SpecialistProtocol::Json);
        let response = specialist.handle(&request(dir.path(), Domain::Development)).await;
        assert!(!response.success);
        assert!(response.message.contains("Malformed response"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_commands_see_task_environment() {
        let dir = tempfile::tempdir().unwrap();
        let specialist = CommandSpecialist::new(
            r#"test "$CONDUCTOR_DOMAIN" = schema && test "$CONDUCTOR_SUBJECT" = billing"#,
            SpecialistProtocol::ExitCode,
        );
        let response = specialist.handle(&request(dir.path(), Domain::Schema)).await;
        assert!(response.success, "{response:?}");
    }

    /// Serve one HTTP response on a local port; the task yields the request body.
    #[cfg(feature = "http")]
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/specialist", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            let body_start = loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&received[..body_start]).to_lowercase();
            let length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while received.len() < body_start + length {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&received[body_start..]).into_owned()
        });

        (url, handle)
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_specialist_posts_request() {
        let dir = tempfile::tempdir().unwrap();
        let (url, server) =
            serve_once("200 OK", r#"{"success": true, "message": "views rendered"}"#).await;
        let specialist = HttpSpecialist::new("markup", url, None);

        let response = specialist.handle(&request(dir.path(), Domain::Markup)).await;

        assert!(response.success, "{response:?}");
        assert_eq!(response.message, "views rendered");
        let sent: SpecialistRequest = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent.domain, Domain::Markup);
        assert_eq!(sent.step, 3);
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_specialist_error_status_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (url, server) = serve_once("503 Service Unavailable", "queue is full").await;
        let specialist = HttpSpecialist::new("markup", url, None);

        let response = specialist.handle(&request(dir.path(), Domain::Markup)).await;
        server.await.unwrap();

        assert!(!response.success);
        assert!(response.message.contains("HTTP 503"), "{}", response.message);
        assert!(response.message.contains("queue is full"));
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_specialist_unreachable_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/specialist", listener.local_addr().unwrap());
        drop(listener);

        let specialist = HttpSpecialist::new("markup", url, Some(Duration::from_secs(5)));
        let response = specialist.handle(&request(dir.path(), Domain::Markup)).await;

        assert!(!response.success);
        assert!(response.message.starts_with("HTTP error"), "{}", response.message);
    }

    #[tokio::test]
    async fn test_analysis_specialist_publishes_update() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/features/billing/views")).unwrap();

        let store = CollaborationStore::new();
        let specialist = AnalysisSpecialist::new(
            ProjectAnalyzer::new(dir.path(), Default::default()),
            store.clone(),
        );
        let response = specialist.handle(&request(dir.path(), Domain::Analysis)).await;

        assert!(response.success);
        assert!(!response.warnings.is_empty());
        assert_eq!(store.receive("markup").len(), 1);
        assert_eq!(store.get("billing").unwrap().fragments, vec!["views"]);
    }

    #[test]
    fn test_registry_from_config_has_builtins_and_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config
            .specialists
            .insert("testing".to_string(), SpecialistConfig::command("true", SpecialistProtocol::ExitCode));
        config.specialists.insert("markup".to_string(), SpecialistConfig::default());

        let registry = SpecialistRegistry::from_config(&config, dir.path(), &CollaborationStore::new());
        assert_eq!(
            registry.domains(),
            vec![Domain::Testing, Domain::Analysis, Domain::RepositoryState]
        );
    }
}
