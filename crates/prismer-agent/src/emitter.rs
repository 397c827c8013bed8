//! Streaming invocation: agent output to ordered stream events.
//!
//! One task owns the process and pushes events into a bounded channel; the
//! HTTP layer drains the channel onto the wire. Every invocation ends with
//! exactly one [`StreamEvent::Done`], whatever happened before it. If the
//! receiving side goes away the task stops early and drops the process,
//! which kills it.

use std::collections::HashSet;

use futures::StreamExt;
use prismer_core::{
    canonicalize_path, detect_paths, parse_directives, ArtifactPatterns, Directive,
    DirectiveKind, StreamEvent,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::exit_message;
use crate::framer::{OutputFramer, StderrCollector};
use crate::process::{AgentProcess, ProcessSpawner};
use crate::request::{AgentRequest, Invocation};

// ============================================================================
// Directive bookkeeping
// ============================================================================

/// Per-response directive deduplication.
///
/// A directive is sent at most once per response, keyed by `(type, payload)`
/// after path canonicalization. Explicit `refresh_artifacts` markers are
/// held back and folded into the single refresh sent by [`finish`].
///
/// [`finish`]: DirectiveEmitter::finish
#[derive(Debug)]
pub struct DirectiveEmitter {
    patterns: ArtifactPatterns,
    canonicalize: bool,
    sent: HashSet<(String, String)>,
    any_sent: bool,
    refresh_requested: bool,
}

impl DirectiveEmitter {
    /// Create an emitter for one response.
    #[must_use]
    pub fn new(patterns: ArtifactPatterns, canonicalize: bool) -> Self {
        Self {
            patterns,
            canonicalize,
            sent: HashSet::new(),
            any_sent: false,
            refresh_requested: false,
        }
    }

    /// Create an emitter from the agent configuration.
    #[must_use]
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.patterns.clone(), config.canonicalize_paths)
    }

    /// Returns the directive if it has not been sent in this response yet.
    pub fn admit(&mut self, mut directive: Directive) -> Option<Directive> {
        let kind = directive.known_kind();
        if kind == Some(DirectiveKind::RefreshArtifacts) {
            self.refresh_requested = true;
            return None;
        }
        if self.canonicalize && kind.is_some_and(DirectiveKind::carries_path) {
            directive.payload = canonicalize_path(&directive.payload, &self.patterns);
        }
        if !self.sent.insert(directive.dedup_key()) {
            return None;
        }
        self.any_sent = true;
        Some(directive)
    }

    /// Events for one decoded stdout chunk.
    ///
    /// Emits a `content_delta` if the chunk has prose left after markers are
    /// stripped, then every new directive from the parser and the path
    /// detector, in that order.
    pub fn frame_chunk(&mut self, chunk: &str) -> Vec<StreamEvent> {
        if chunk.is_empty() {
            return Vec::new();
        }
        let parsed = parse_directives(chunk);
        let mut events = Vec::new();
        if !parsed.clean_text.is_empty() {
            events.push(StreamEvent::content(parsed.clean_text));
        }
        let detected = detect_paths(chunk, &self.patterns);
        events.extend(
            parsed
                .directives
                .into_iter()
                .chain(detected)
                .filter_map(|directive| self.admit(directive))
                .map(StreamEvent::from),
        );
        events
    }

    /// Directives for a whole output at once, as a buffered reply carries
    /// them: the parsed `explicit` markers, then paths detected in
    /// `full_output`, deduplicated and canonicalized as in a stream. An
    /// explicit refresh marker is kept once, at the end; nothing synthetic
    /// is added.
    pub fn collect(&mut self, explicit: Vec<Directive>, full_output: &str) -> Vec<Directive> {
        let detected = detect_paths(full_output, &self.patterns);
        let mut directives: Vec<Directive> = explicit
            .into_iter()
            .chain(detected)
            .filter_map(|directive| self.admit(directive))
            .collect();
        if std::mem::take(&mut self.refresh_requested) {
            directives.push(Directive::refresh_artifacts());
        }
        directives
    }

    /// Events for the end of the response.
    ///
    /// Reruns the parser and the detector over the whole output to catch
    /// markers and paths split across chunks, then appends one
    /// `refresh_artifacts` if anything was sent or requested.
    pub fn finish(&mut self, full_output: &str) -> Vec<StreamEvent> {
        let parsed = parse_directives(full_output);
        let detected = detect_paths(full_output, &self.patterns);
        let mut events: Vec<StreamEvent> = parsed
            .directives
            .into_iter()
            .chain(detected)
            .filter_map(|directive| self.admit(directive))
            .map(StreamEvent::from)
            .collect();
        if self.any_sent || self.refresh_requested {
            events.push(Directive::refresh_artifacts().into());
            self.refresh_requested = false;
            self.any_sent = false;
        }
        events
    }
}

// ============================================================================
// Streaming run
// ============================================================================

/// The receiving side of the event channel was dropped.
struct ClientGone;

async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<(), ClientGone> {
    tx.send(event).await.map_err(|_| ClientGone)
}

/// Run one streaming invocation, pushing events into `tx`.
///
/// Never fails: spawn errors, read errors and non-zero exits all become
/// `error` events followed by `done`.
pub async fn run_streaming<P>(
    spawner: &P,
    config: &AgentConfig,
    request: &AgentRequest,
    tx: mpsc::Sender<StreamEvent>,
) where
    P: ProcessSpawner + ?Sized,
{
    if stream_events(spawner, config, request, &tx).await.is_err() {
        info!("client disconnected, abandoning agent process");
    }
}

async fn stream_events<P>(
    spawner: &P,
    config: &AgentConfig,
    request: &AgentRequest,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), ClientGone>
where
    P: ProcessSpawner + ?Sized,
{
    let invocation = match Invocation::build(config, request) {
        Ok(invocation) => invocation,
        Err(e) => {
            send(tx, StreamEvent::error(e.to_string())).await?;
            return send(tx, StreamEvent::Done).await;
        }
    };

    let AgentProcess {
        mut stdout,
        mut stderr,
        exit,
    } = match spawner.spawn(&invocation) {
        Ok(process) => process,
        Err(e) => {
            warn!(program = %invocation.program, error = %e, "failed to start agent");
            send(tx, StreamEvent::error(format!("Failed to start agent: {e}"))).await?;
            return send(tx, StreamEvent::Done).await;
        }
    };

    info!(
        program = %invocation.program,
        session_id = ?request.session_id.as_ref().map(ToString::to_string),
        "agent started"
    );

    let mut framer = OutputFramer::default();
    let mut stderr_text = StderrCollector::default();
    let mut emitter = DirectiveEmitter::from_config(config);
    let mut auth_reported = false;
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        tokio::select! {
            chunk = stdout.next(), if stdout_open => match chunk {
                Some(Ok(bytes)) => {
                    let text = framer.push(&bytes);
                    for event in emitter.frame_chunk(&text) {
                        debug!(event = event.type_name(), "emit");
                        send(tx, event).await?;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "failed to read agent stdout");
                    send(tx, StreamEvent::error(format!("Failed to read agent output: {e}"))).await?;
                    stdout_open = false;
                }
                None => stdout_open = false,
            },
            chunk = stderr.next(), if stderr_open => match chunk {
                Some(Ok(bytes)) => {
                    for line in stderr_text.push(&bytes) {
                        debug!(line = %line, "agent stderr");
                    }
                    if !auth_reported && stderr_text.contains(&config.auth_failure_marker) {
                        auth_reported = true;
                        send(tx, StreamEvent::error(config.auth_failure_message.clone())).await?;
                    }
                }
                Some(Err(e)) => {
                    debug!(error = %e, "failed to read agent stderr");
                    stderr_open = false;
                }
                None => stderr_open = false,
            },
            () = tx.closed() => return Err(ClientGone),
        }
    }

    let tail = framer.finish();
    for event in emitter.frame_chunk(&tail) {
        send(tx, event).await?;
    }
    if let Some(line) = stderr_text.finish() {
        debug!(line = %line, "agent stderr");
    }
    if !auth_reported && stderr_text.contains(&config.auth_failure_marker) {
        send(tx, StreamEvent::error(config.auth_failure_message.clone())).await?;
    }

    let outcome = tokio::select! {
        outcome = exit => outcome,
        () = tx.closed() => return Err(ClientGone),
    };

    for event in emitter.finish(framer.accumulated()) {
        debug!(event = event.type_name(), "emit");
        send(tx, event).await?;
    }

    match outcome {
        Ok(outcome) if outcome.success() => info!("agent finished"),
        Ok(outcome) => {
            warn!(code = ?outcome.code, "agent exited unsuccessfully");
            send(tx, StreamEvent::error(exit_message(outcome.code))).await?;
        }
        Err(e) => {
            warn!(error = %e, "failed to wait for agent");
            send(tx, StreamEvent::error(format!("Failed to wait for agent: {e}"))).await?;
        }
    }

    send(tx, StreamEvent::Done).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::ScriptedSpawner;
    use std::time::Duration;

    async fn collect(spawner: &ScriptedSpawner, request: AgentRequest) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        run_streaming(spawner, &AgentConfig::default(), &request, tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn directive(kind: &str, payload: &str) -> StreamEvent {
        Directive::new(kind, payload).into()
    }

    #[test]
    fn marker_only_chunk_emits_no_content() {
        let mut emitter = DirectiveEmitter::new(ArtifactPatterns::default(), true);
        let events = emitter.frame_chunk("[[UI:open_panel]]");
        assert_eq!(events, vec![directive("open_panel", "")]);
    }

    #[test]
    fn dedups_across_chunks() {
        let mut emitter = DirectiveEmitter::new(ArtifactPatterns::default(), true);
        let first = emitter.frame_chunk("see /workspace/a.png");
        let second = emitter.frame_chunk("again /workspace/a.png [[UI:open_file:/a.png]]");
        assert_eq!(first[1], directive("open_file", "/a.png"));
        assert_eq!(second, vec![StreamEvent::content("again /workspace/a.png")]);
    }

    #[test]
    fn canonicalization_can_be_disabled() {
        let mut on = DirectiveEmitter::new(ArtifactPatterns::default(), true);
        let mut off = DirectiveEmitter::new(ArtifactPatterns::default(), false);
        let chunk = "[[UI:open_file:/workspace/a.png]]";
        assert_eq!(on.frame_chunk(chunk), vec![directive("open_file", "/a.png")]);
        assert_eq!(
            off.frame_chunk(chunk),
            vec![directive("open_file", "/workspace/a.png"), directive("open_file", "/a.png")]
        );
    }

    #[test]
    fn explicit_refresh_is_deferred() {
        let mut emitter = DirectiveEmitter::new(ArtifactPatterns::default(), true);
        assert!(emitter.frame_chunk("[[UI:refresh_artifacts]]").is_empty());
        assert_eq!(emitter.finish(""), vec![directive("refresh_artifacts", "")]);
    }

    #[test]
    fn no_refresh_without_directives() {
        let mut emitter = DirectiveEmitter::new(ArtifactPatterns::default(), true);
        emitter.frame_chunk("plain text");
        assert!(emitter.finish("plain text").is_empty());
    }

    #[tokio::test]
    async fn scenario_explicit_and_detected() {
        let spawner = ScriptedSpawner::new()
            .stdout("Done. [[UI:show_artifact:/output/plot.png]]See /workspace/output/plot.png");
        let events = collect(&spawner, AgentRequest::new("run the script")).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::content("Done. See /workspace/output/plot.png"),
                directive("show_artifact", "/output/plot.png"),
                directive("open_file", "/output/plot.png"),
                directive("refresh_artifacts", ""),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn split_marker_found_by_final_pass() {
        let spawner = ScriptedSpawner::new()
            .stdout("Saved [[UI:show_art")
            .stdout("ifact:/output/a.csv]] ok");
        let events = collect(&spawner, AgentRequest::new("go")).await;
        let directives: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::UiDirective(_)))
            .cloned()
            .collect();
        assert_eq!(
            directives,
            vec![
                directive("show_artifact", "/output/a.csv"),
                directive("refresh_artifacts", ""),
            ]
        );
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn split_path_found_by_final_pass() {
        let spawner = ScriptedSpawner::new()
            .stdout("wrote /workspace/out")
            .stdout("put/r.pdf\n");
        let events = collect(&spawner, AgentRequest::new("go")).await;
        assert!(events.contains(&directive("open_file", "/output/r.pdf")));
    }

    #[tokio::test]
    async fn split_utf8_is_reassembled() {
        let text = "café ✓";
        let bytes = text.as_bytes();
        let spawner = ScriptedSpawner::new().stdout(&bytes[..4]).stdout(&bytes[4..]);
        let events = collect(&spawner, AgentRequest::new("go")).await;
        let content: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ContentDelta { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(content, "café ✓");
    }

    #[tokio::test]
    async fn empty_response_ends_with_done() {
        let events = collect(&ScriptedSpawner::new(), AgentRequest::new("hi")).await;
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[tokio::test]
    async fn spawn_failure_is_error_then_done() {
        let spawner = ScriptedSpawner::new().fail_spawn("no such file");
        let events = collect(&spawner, AgentRequest::new("hi")).await;
        assert_eq!(events.len(), 2);
        let StreamEvent::Error { error } = &events[0] else {
            panic!("expected error, got {:?}", events[0]);
        };
        assert!(error.starts_with("Failed to start agent: "));
        assert!(error.contains("no such file"));
        assert_eq!(events[1], StreamEvent::Done);
    }

    #[tokio::test]
    async fn auth_failure_and_exit_code() {
        let spawner = ScriptedSpawner::new()
            .stderr("Error: No API key found for provider\n")
            .stderr("No API key found\n")
            .exit_code(Some(1));
        let events = collect(&spawner, AgentRequest::new("hi")).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::error(AgentConfig::default().auth_failure_message),
                StreamEvent::error("Agent exited with code 1"),
                StreamEvent::Done,
            ]
        );
    }

    /// Stderr is ready at once; stdout only after a short delay.
    struct LateStdout {
        stdout: &'static str,
        stderr: &'static str,
    }

    impl ProcessSpawner for LateStdout {
        fn spawn(&self, _: &Invocation) -> std::io::Result<AgentProcess> {
            use futures::{stream, FutureExt};
            let stdout = bytes::Bytes::from_static(self.stdout.as_bytes());
            let stderr = bytes::Bytes::from_static(self.stderr.as_bytes());
            Ok(AgentProcess {
                stdout: stream::once(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(stdout)
                })
                .boxed(),
                stderr: stream::iter([Ok(stderr)]).boxed(),
                exit: async { Ok(crate::process::ExitOutcome { code: Some(0) }) }.boxed(),
            })
        }
    }

    #[tokio::test]
    async fn stream_continues_after_auth_advisory() {
        let spawner = LateStdout {
            stdout: "Result ready [[UI:open_panel]] in /workspace/output/r.csv",
            stderr: "warn: No API key found, using fallback\n",
        };
        let (tx, mut rx) = mpsc::channel(32);
        run_streaming(&spawner, &AgentConfig::default(), &AgentRequest::new("go"), tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                StreamEvent::error(AgentConfig::default().auth_failure_message),
                StreamEvent::content("Result ready  in /workspace/output/r.csv"),
                directive("open_panel", ""),
                directive("open_file", "/output/r.csv"),
                directive("refresh_artifacts", ""),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn collect_for_buffered_reply() {
        let mut emitter = DirectiveEmitter::from_config(&AgentConfig::default());
        let output = "[[UI:show_artifact:/workspace/output/a.png]] [[UI:refresh_artifacts]] \
                      saved /workspace/output/a.png and /workspace/output/b.csv";
        let explicit = parse_directives(output).directives;
        assert_eq!(
            emitter.collect(explicit, output),
            vec![
                Directive::new("show_artifact", "/output/a.png"),
                Directive::open_file("/output/a.png"),
                Directive::open_file("/output/b.csv"),
                Directive::refresh_artifacts(),
            ]
        );
    }

    #[tokio::test]
    async fn blank_prompt_is_error_then_done() {
        let spawner = ScriptedSpawner::new();
        let events = collect(&spawner, AgentRequest::new("")).await;
        assert!(matches!(events[0], StreamEvent::Error { .. }));
        assert_eq!(events[1], StreamEvent::Done);
        assert!(spawner.invocations().is_empty());
    }

    #[tokio::test]
    async fn refresh_comes_after_all_directives_and_before_error() {
        let spawner = ScriptedSpawner::new()
            .stdout("[[UI:notify:hello]] made /workspace/x.md")
            .exit_code(Some(2));
        let events = collect(&spawner, AgentRequest::new("go")).await;
        let types: Vec<_> = events.iter().map(StreamEvent::type_name).collect();
        assert_eq!(
            types,
            vec!["content_delta", "ui_directive", "ui_directive", "ui_directive", "error", "done"]
        );
        assert_eq!(events[3], directive("refresh_artifacts", ""));
    }

    #[tokio::test]
    async fn client_disconnect_drops_process() {
        let spawner = std::sync::Arc::new(ScriptedSpawner::new().stdout("working...").hang());
        let (tx, mut rx) = mpsc::channel(1);
        let task = {
            let spawner = std::sync::Arc::clone(&spawner);
            tokio::spawn(async move {
                run_streaming(spawner.as_ref(), &AgentConfig::default(), &AgentRequest::new("go"), tx)
                    .await;
            })
        };
        assert_eq!(rx.recv().await, Some(StreamEvent::content("working...")));
        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(spawner.abandoned());
    }
}
