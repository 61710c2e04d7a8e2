//! Persisted run artifacts under `<run_log.dir>/<run-id>/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::limits::RunLimits;
use crate::core::status::{Failure, RunResult, RunStatus};

#[derive(Debug, Clone, Serialize)]
pub struct LimitsMeta {
    pub max_handoffs: u32,
    pub max_iterations: u32,
    pub execution_timeout_secs: u64,
    pub node_timeout_secs: u64,
}

impl From<&RunLimits> for LimitsMeta {
    fn from(limits: &RunLimits) -> Self {
        Self {
            max_handoffs: limits.max_handoffs,
            max_iterations: limits.max_iterations,
            execution_timeout_secs: limits.execution_timeout.as_secs(),
            node_timeout_secs: limits.node_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub run_id: String,
    pub status: RunStatus,
    pub node_history: Vec<String>,
    pub iterations: u32,
    pub handoffs: u32,
    pub elapsed_ms: u128,
    pub active_worker: String,
    pub failure: Option<Failure>,
    pub article_url: Option<String>,
    pub limits: LimitsMeta,
    pub written_at: DateTime<Utc>,
}

impl RunMeta {
    pub fn new(run_id: &str, result: &RunResult, limits: &RunLimits) -> Self {
        Self {
            run_id: run_id.to_string(),
            status: result.status,
            node_history: result.node_history.clone(),
            iterations: result.iterations,
            handoffs: result.handoffs,
            elapsed_ms: result.elapsed_ms(),
            active_worker: result.active_worker.clone(),
            failure: result.failure.clone(),
            article_url: result.article_url().map(str::to_string),
            limits: limits.into(),
            written_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunLogPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub transcript_path: PathBuf,
}

impl RunLogPaths {
    pub fn new(log_dir: &Path, run_id: &str) -> Self {
        let dir = log_dir.join(run_id);
        Self {
            meta_path: dir.join("meta.json"),
            transcript_path: dir.join("transcript.json"),
            dir,
        }
    }
}

/// Sortable, collision-free identifier: UTC timestamp plus a short random suffix.
pub fn new_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%SZ"), &suffix[..8])
}

pub fn write_run_log(
    log_dir: &Path,
    run_id: &str,
    result: &RunResult,
    limits: &RunLimits,
) -> Result<RunLogPaths> {
    let paths = RunLogPaths::new(log_dir, run_id);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create run log dir {}", paths.dir.display()))?;

    write_json(&paths.meta_path, &RunMeta::new(run_id, result, limits))?;
    write_json(&paths.transcript_path, &result.transcript.view())?;
    Ok(paths)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;

    use super::*;
    use crate::core::status::FailureKind;
    use crate::core::transcript::{
        ArticleRequest, Payload, Producer, PublishConfirmation, Transcript,
    };

    fn result(status: RunStatus, failure: Option<Failure>) -> RunResult {
        let mut transcript = Transcript::new();
        transcript.append(
            Producer::User,
            Payload::Request(ArticleRequest::Topic("rust".to_string())),
        );
        transcript.append(
            Producer::worker("publisher_agent"),
            Payload::Published(PublishConfirmation {
                id: Some(1),
                url: Some("https://dev.to/me/rust-1".to_string()),
                edit_url: None,
                title: "Rust".to_string(),
                draft: true,
            }),
        );
        RunResult {
            status,
            node_history: vec!["publisher_agent".to_string()],
            iterations: 1,
            handoffs: 0,
            elapsed: Duration::from_millis(1_250),
            active_worker: "publisher_agent".to_string(),
            failure,
            transcript,
        }
    }

    #[test]
    fn run_log_paths_are_stable() {
        let paths = RunLogPaths::new(Path::new(".swarm/runs"), "run-1");
        assert!(paths.dir.ends_with("runs/run-1"));
        assert!(paths.meta_path.ends_with("run-1/meta.json"));
        assert!(paths.transcript_path.ends_with("run-1/transcript.json"));
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(new_run_id(), new_run_id());
    }

    #[test]
    fn writes_meta_and_transcript() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = write_run_log(
            temp.path(),
            "run-7",
            &result(RunStatus::Completed, None),
            &RunLimits::default(),
        )
        .expect("write run log");

        let meta: Value =
            serde_json::from_str(&fs::read_to_string(&paths.meta_path).expect("read meta"))
                .expect("parse meta");
        assert_eq!(meta["status"], "completed");
        assert_eq!(meta["elapsed_ms"], 1_250);
        assert_eq!(meta["article_url"], "https://dev.to/me/rust-1");
        assert_eq!(meta["limits"]["max_iterations"], 15);

        let transcript: Value = serde_json::from_str(
            &fs::read_to_string(&paths.transcript_path).expect("read transcript"),
        )
        .expect("parse transcript");
        let messages = transcript.as_array().expect("array");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["seq"], 1);
        assert_eq!(messages[1]["payload"]["type"], "published");
    }

    #[test]
    fn failure_is_recorded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let failure = Failure {
            kind: FailureKind::Adapter,
            worker: "publisher_agent".to_string(),
            message: "publish: api returned 500: boom".to_string(),
        };
        let paths = write_run_log(
            temp.path(),
            "run-8",
            &result(RunStatus::Failed, Some(failure)),
            &RunLimits::default(),
        )
        .expect("write run log");

        let meta: Value =
            serde_json::from_str(&fs::read_to_string(&paths.meta_path).expect("read meta"))
                .expect("parse meta");
        assert_eq!(meta["status"], "failed");
        assert_eq!(meta["failure"]["kind"], "adapter");
    }
}
