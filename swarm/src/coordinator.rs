//! Handoff coordinator: runs workers one at a time over a shared transcript.
//!
//! Each loop turn checks the run deadline, then the iteration ceiling, then
//! invokes the active worker under `min(node_timeout, time left)`. A worker
//! either finishes the run (no handoff) or names the next worker. Targets are
//! validated here, never inside workers, so a typo'd name always fails the run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::agents::Worker;
use crate::core::limits::{InvalidLimits, RunLimits};
use crate::core::status::{Failure, FailureKind, RunResult, RunStatus};
use crate::core::transcript::{ArticleRequest, Payload, Producer, Transcript};

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    WorkerStarted {
        worker: String,
        iteration: u32,
        budget: Duration,
    },
    WorkerFinished {
        worker: String,
        /// Payload kinds appended, in order.
        emitted: Vec<&'static str>,
    },
    HandedOff {
        from: String,
        to: String,
        rationale: String,
    },
    Finished {
        status: RunStatus,
    },
}

/// Invalid coordinator construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    NoWorkers,
    DuplicateWorker(String),
    UnknownEntry(String),
    InvalidLimits(InvalidLimits),
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorkers => f.write_str("no workers configured"),
            Self::DuplicateWorker(name) => write!(f, "duplicate worker name {name:?}"),
            Self::UnknownEntry(name) => write!(f, "entry worker {name:?} is not configured"),
            Self::InvalidLimits(err) => write!(f, "invalid limits: {err}"),
        }
    }
}

impl std::error::Error for CoordinatorError {}

impl From<InvalidLimits> for CoordinatorError {
    fn from(err: InvalidLimits) -> Self {
        Self::InvalidLimits(err)
    }
}

pub struct Coordinator {
    workers: Vec<Arc<dyn Worker>>,
    entry: usize,
    limits: RunLimits,
}

/// Mutable bookkeeping for one run; owned by [`Coordinator::run_with`].
struct RunState {
    active: usize,
    iterations: u32,
    handoffs: u32,
    history: Vec<String>,
    transcript: Transcript,
    started: Instant,
}

struct Stop {
    status: RunStatus,
    failure: Option<Failure>,
}

impl Stop {
    fn at(status: RunStatus) -> Self {
        Self {
            status,
            failure: None,
        }
    }

    fn failed(status: RunStatus, kind: FailureKind, worker: &str, message: String) -> Self {
        Self {
            status,
            failure: Some(Failure {
                kind,
                worker: worker.to_string(),
                message,
            }),
        }
    }
}

impl RunState {
    fn finish(self, stop: Stop, active_worker: &str) -> RunResult {
        RunResult {
            status: stop.status,
            node_history: self.history,
            iterations: self.iterations,
            handoffs: self.handoffs,
            elapsed: self.started.elapsed(),
            active_worker: active_worker.to_string(),
            failure: stop.failure,
            transcript: self.transcript,
        }
    }
}

impl Coordinator {
    pub fn new(
        workers: Vec<Arc<dyn Worker>>,
        entry: &str,
        limits: RunLimits,
    ) -> Result<Self, CoordinatorError> {
        if workers.is_empty() {
            return Err(CoordinatorError::NoWorkers);
        }
        let mut seen = HashSet::new();
        for worker in &workers {
            if !seen.insert(worker.name()) {
                return Err(CoordinatorError::DuplicateWorker(worker.name().to_string()));
            }
        }
        let entry = workers
            .iter()
            .position(|worker| worker.name() == entry)
            .ok_or_else(|| CoordinatorError::UnknownEntry(entry.to_string()))?;
        limits.validate()?;
        Ok(Self {
            workers,
            entry,
            limits,
        })
    }

    pub fn limits(&self) -> &RunLimits {
        &self.limits
    }

    pub fn entry(&self) -> &str {
        self.workers[self.entry].name()
    }

    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.iter().map(|worker| worker.name()).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.workers.iter().position(|worker| worker.name() == name)
    }

    pub async fn run(&self, request: ArticleRequest) -> RunResult {
        self.run_with(request, |_| {}).await
    }

    /// Run to a terminal status, reporting progress through `on_event`.
    #[instrument(
        skip_all,
        fields(
            entry = self.entry(),
            max_handoffs = self.limits.max_handoffs,
            max_iterations = self.limits.max_iterations
        )
    )]
    pub async fn run_with<F: FnMut(&RunEvent)>(
        &self,
        request: ArticleRequest,
        mut on_event: F,
    ) -> RunResult {
        let limits = &self.limits;
        let mut state = RunState {
            active: self.entry,
            iterations: 0,
            handoffs: 0,
            history: Vec::new(),
            transcript: Transcript::new(),
            started: Instant::now(),
        };
        state
            .transcript
            .append(Producer::User, Payload::Request(request));

        let stop = loop {
            let worker = &self.workers[state.active];
            let name = worker.name();
            let elapsed = state.started.elapsed();
            if elapsed >= limits.execution_timeout {
                warn!(worker = name, elapsed_ms = elapsed.as_millis(), "execution timeout reached");
                break Stop::failed(
                    RunStatus::TimedOut,
                    FailureKind::Timeout,
                    name,
                    format!(
                        "execution timeout of {}s reached",
                        limits.execution_timeout.as_secs()
                    ),
                );
            }
            if state.iterations >= limits.max_iterations {
                info!(iterations = state.iterations, "iteration ceiling reached");
                break Stop::at(RunStatus::MaxIterationsReached);
            }

            let (budget, clamped) = limits.invocation_budget(elapsed);
            on_event(&RunEvent::WorkerStarted {
                worker: name.to_string(),
                iteration: state.iterations + 1,
                budget,
            });
            info!(worker = name, budget_ms = budget.as_millis(), clamped, "invoking worker");
            state.history.push(name.to_string());

            let invoked =
                tokio::time::timeout(budget, worker.invoke(state.transcript.view(), budget)).await;
            let output = match invoked {
                Ok(Ok(output)) => output,
                Ok(Err(err)) => {
                    warn!(worker = name, err = %err, "worker failed");
                    break Stop::failed(RunStatus::Failed, err.kind(), name, err.to_string());
                }
                Err(_) if clamped => {
                    warn!(worker = name, "execution timeout reached during invocation");
                    break Stop::failed(
                        RunStatus::TimedOut,
                        FailureKind::Timeout,
                        name,
                        format!(
                            "execution timeout of {}s reached during invocation",
                            limits.execution_timeout.as_secs()
                        ),
                    );
                }
                Err(_) => {
                    warn!(worker = name, budget_ms = budget.as_millis(), "node timeout");
                    break Stop::failed(
                        RunStatus::Failed,
                        FailureKind::Timeout,
                        name,
                        format!("node timeout of {}s exceeded", budget.as_secs()),
                    );
                }
            };

            if output.messages.is_empty() {
                break Stop::failed(
                    RunStatus::Failed,
                    FailureKind::Configuration,
                    name,
                    "worker returned no messages".to_string(),
                );
            }
            let emitted: Vec<&'static str> = output.messages.iter().map(Payload::kind).collect();
            for payload in output.messages {
                let seq = state.transcript.append(Producer::worker(name), payload);
                debug!(worker = name, seq, "appended message");
            }
            state.iterations += 1;
            on_event(&RunEvent::WorkerFinished {
                worker: name.to_string(),
                emitted,
            });

            let Some(handoff) = output.handoff else {
                info!(worker = name, "worker finished without handoff");
                break Stop::at(RunStatus::Completed);
            };
            let Some(target) = self.position(&handoff.target) else {
                warn!(worker = name, target = %handoff.target, "unknown handoff target");
                break Stop::failed(
                    RunStatus::Failed,
                    FailureKind::Configuration,
                    name,
                    format!("unknown handoff target {:?}", handoff.target),
                );
            };
            if state.handoffs >= limits.max_handoffs {
                info!(
                    handoffs = state.handoffs,
                    target = %handoff.target,
                    "handoff ceiling reached"
                );
                break Stop::at(RunStatus::MaxHandoffsReached);
            }
            state.handoffs += 1;
            on_event(&RunEvent::HandedOff {
                from: name.to_string(),
                to: handoff.target.clone(),
                rationale: handoff.rationale,
            });
            state.active = target;
        };

        let active = self.workers[state.active].name();
        on_event(&RunEvent::Finished {
            status: stop.status,
        });
        let result = state.finish(stop, active);
        info!(
            status = %result.status,
            iterations = result.iterations,
            handoffs = result.handoffs,
            elapsed_ms = result.elapsed_ms(),
            "run finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{WorkerError, WorkerOutput};
    use crate::core::handoff::HandoffRequest;
    use crate::test_support::{ScriptedStep, ScriptedWorker};

    fn limits(max_handoffs: u32, max_iterations: u32) -> RunLimits {
        RunLimits {
            max_handoffs,
            max_iterations,
            ..RunLimits::default()
        }
    }

    fn coordinator(workers: Vec<Arc<ScriptedWorker>>, limits: RunLimits) -> Coordinator {
        let entry = workers[0].name().to_string();
        let workers = workers
            .into_iter()
            .map(|worker| worker as Arc<dyn Worker>)
            .collect();
        Coordinator::new(workers, &entry, limits).expect("coordinator")
    }

    fn topic() -> ArticleRequest {
        ArticleRequest::Topic("rust".to_string())
    }

    fn seqs(result: &RunResult) -> Vec<u64> {
        result.transcript.view().iter().map(|m| m.seq).collect()
    }

    #[tokio::test]
    async fn pipeline_runs_to_completion() {
        let a = Arc::new(ScriptedWorker::new("a", vec![ScriptedStep::handoff("b", "draft")]));
        let b = Arc::new(ScriptedWorker::new("b", vec![ScriptedStep::handoff("c", "image")]));
        let c = Arc::new(ScriptedWorker::new("c", vec![ScriptedStep::done("published")]));

        let result = coordinator(vec![a, b, c], RunLimits::default())
            .run(topic())
            .await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.node_history, vec!["a", "b", "c"]);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.handoffs, 2);
        assert_eq!(result.active_worker, "c");
        assert!(result.failure.is_none());
        assert_eq!(seqs(&result), vec![1, 2, 3, 4]);
        let producers: Vec<String> = result
            .transcript
            .view()
            .iter()
            .map(|m| m.producer.to_string())
            .collect();
        assert_eq!(producers, vec!["user", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn zero_handoffs_stops_after_entry_worker() {
        let a = Arc::new(ScriptedWorker::new("a", vec![ScriptedStep::handoff("b", "draft")]));
        let b = Arc::new(ScriptedWorker::new("b", Vec::new()));

        let result = coordinator(vec![a, b.clone()], limits(0, 15))
            .run(topic())
            .await;

        assert_eq!(result.status, RunStatus::MaxHandoffsReached);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.handoffs, 0);
        assert_eq!(result.active_worker, "a");
        assert!(b.invocations().is_empty());
        assert_eq!(result.transcript.len(), 2);

        let solo = Arc::new(ScriptedWorker::new("solo", vec![ScriptedStep::done("all")]));
        let result = coordinator(vec![solo], limits(0, 15)).run(topic()).await;
        assert_eq!(result.status, RunStatus::Completed);
    }

    /// A→B→A→B with max_handoffs=3 stops when the fourth handoff is requested.
    #[tokio::test]
    async fn handoff_cycle_hits_ceiling() {
        let a = Arc::new(ScriptedWorker::repeating("a", ScriptedStep::handoff("b", "ping")));
        let b = Arc::new(ScriptedWorker::repeating("b", ScriptedStep::handoff("a", "pong")));

        let result = coordinator(vec![a, b], limits(3, 15)).run(topic()).await;

        assert_eq!(result.status, RunStatus::MaxHandoffsReached);
        assert_eq!(result.handoffs, 3);
        assert_eq!(result.iterations, 4);
        assert_eq!(result.node_history, vec!["a", "b", "a", "b"]);
        assert_eq!(result.active_worker, "b");
    }

    #[tokio::test]
    async fn self_handoff_counts_toward_both_limits() {
        let a = Arc::new(ScriptedWorker::repeating("a", ScriptedStep::handoff("a", "again")));

        let result = coordinator(vec![a.clone()], limits(10, 3)).run(topic()).await;

        assert_eq!(result.status, RunStatus::MaxIterationsReached);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.handoffs, 3);
        assert_eq!(a.invocations().len(), 3);

        let a = Arc::new(ScriptedWorker::repeating("a", ScriptedStep::handoff("a", "again")));
        let result = coordinator(vec![a], limits(2, 10)).run(topic()).await;
        assert_eq!(result.status, RunStatus::MaxHandoffsReached);
        assert_eq!(result.handoffs, 2);
        assert_eq!(result.iterations, 3);
    }

    #[tokio::test]
    async fn unknown_target_fails_even_without_handoff_budget() {
        for max_handoffs in [0, 10] {
            let a = Arc::new(ScriptedWorker::new(
                "a",
                vec![ScriptedStep::handoff("imgae_agent", "typo")],
            ));
            let result = coordinator(vec![a], limits(max_handoffs, 15))
                .run(topic())
                .await;

            assert_eq!(result.status, RunStatus::Failed);
            let failure = result.failure.expect("failure");
            assert_eq!(failure.kind, FailureKind::Configuration);
            assert!(failure.message.contains("imgae_agent"));
            assert_eq!(result.handoffs, 0);
            assert_eq!(result.transcript.len(), 2);
        }
    }

    #[tokio::test]
    async fn worker_failure_preserves_transcript() {
        let a = Arc::new(ScriptedWorker::new("a", vec![ScriptedStep::handoff("b", "draft")]));
        let b = Arc::new(ScriptedWorker::new(
            "b",
            vec![ScriptedStep::fail(WorkerError::MalformedInput(
                "no draft".to_string(),
            ))],
        ));

        let result = coordinator(vec![a, b], RunLimits::default())
            .run(topic())
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.active_worker, "b");
        assert_eq!(result.node_history, vec!["a", "b"]);
        let failure = result.failure.expect("failure");
        assert_eq!(failure.kind, FailureKind::MalformedInput);
        assert_eq!(failure.worker, "b");
        assert_eq!(result.transcript.len(), 2);
    }

    #[tokio::test]
    async fn empty_emission_fails_run() {
        let a = Arc::new(ScriptedWorker::new(
            "a",
            vec![ScriptedStep::output(WorkerOutput::done(Vec::new()))],
        ));

        let result = coordinator(vec![a], RunLimits::default()).run(topic()).await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.iterations, 0);
        assert_eq!(
            result.failure.map(|f| f.kind),
            Some(FailureKind::Configuration)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn node_timeout_fails_run() {
        let a = Arc::new(ScriptedWorker::new(
            "a",
            vec![ScriptedStep::done("late").after(Duration::from_secs(400))],
        ));

        let result = coordinator(vec![a.clone()], RunLimits::default())
            .run(topic())
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.failure.expect("failure").kind, FailureKind::Timeout);
        assert_eq!(result.transcript.len(), 1);
        assert!(result.elapsed >= Duration::from_secs(300));
        assert!(result.elapsed < Duration::from_secs(301));
        assert_eq!(a.invocations()[0].budget, Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_clamped_budget_times_out_run() {
        let a = Arc::new(ScriptedWorker::new(
            "a",
            vec![ScriptedStep::handoff("b", "draft").after(Duration::from_secs(60))],
        ));
        let b = Arc::new(ScriptedWorker::new(
            "b",
            vec![ScriptedStep::done("late").after(Duration::from_secs(120))],
        ));
        let limits = RunLimits {
            execution_timeout: Duration::from_secs(100),
            ..RunLimits::default()
        };

        let result = coordinator(vec![a, b.clone()], limits).run(topic()).await;

        assert_eq!(result.status, RunStatus::TimedOut);
        assert_eq!(result.failure.expect("failure").worker, "b");
        let budget = b.invocations()[0].budget;
        assert!(budget <= Duration::from_secs(40) && budget > Duration::from_secs(39));
        assert_eq!(result.iterations, 1);
    }

    /// Output of a worker finishing exactly at the deadline is kept.
    #[tokio::test(start_paused = true)]
    async fn worker_finishing_at_deadline_is_recorded() {
        let a = Arc::new(ScriptedWorker::new(
            "a",
            vec![ScriptedStep::handoff("b", "just in time").after(Duration::from_secs(10))],
        ));
        let b = Arc::new(ScriptedWorker::new("b", vec![ScriptedStep::done("never")]));
        let limits = RunLimits {
            execution_timeout: Duration::from_secs(10),
            ..RunLimits::default()
        };

        let result = coordinator(vec![a, b.clone()], limits).run(topic()).await;

        assert_eq!(result.status, RunStatus::TimedOut);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.handoffs, 1);
        assert_eq!(result.transcript.len(), 2);
        assert_eq!(result.active_worker, "b");
        assert!(b.invocations().is_empty());
    }

    #[tokio::test]
    async fn workers_see_full_history() {
        let b = Arc::new(ScriptedWorker::new(
            "b",
            vec![ScriptedStep::output(WorkerOutput::handoff(
                vec![Payload::note("two"), Payload::note("three")],
                HandoffRequest::new("a", "back"),
            ))],
        ));
        let a = Arc::new(ScriptedWorker::new(
            "a",
            vec![
                ScriptedStep::handoff("b", "one"),
                ScriptedStep::done("four"),
            ],
        ));

        let result = coordinator(vec![a.clone(), b.clone()], RunLimits::default())
            .run(topic())
            .await;

        assert_eq!(result.status, RunStatus::Completed);
        let lens: Vec<usize> = a.invocations().iter().map(|i| i.transcript_len).collect();
        assert_eq!(lens, vec![1, 4]);
        assert_eq!(b.invocations()[0].transcript_len, 2);
        assert_eq!(seqs(&result), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn events_follow_run_progress() {
        let a = Arc::new(ScriptedWorker::new("a", vec![ScriptedStep::handoff("b", "x")]));
        let b = Arc::new(ScriptedWorker::new("b", vec![ScriptedStep::done("y")]));
        let mut events = Vec::new();

        coordinator(vec![a, b], RunLimits::default())
            .run_with(topic(), |event| events.push(event.clone()))
            .await;

        let labels: Vec<&str> = events
            .iter()
            .map(|event| match event {
                RunEvent::WorkerStarted { .. } => "started",
                RunEvent::WorkerFinished { .. } => "finished",
                RunEvent::HandedOff { .. } => "handoff",
                RunEvent::Finished { .. } => "done",
            })
            .collect();
        assert_eq!(
            labels,
            vec!["started", "finished", "handoff", "started", "finished", "done"]
        );
        assert_eq!(
            events.last(),
            Some(&RunEvent::Finished {
                status: RunStatus::Completed
            })
        );
    }

    #[test]
    fn construction_is_validated() {
        let worker = |name: &str| -> Arc<dyn Worker> {
            Arc::new(ScriptedWorker::new(name, Vec::new()))
        };

        assert_eq!(
            Coordinator::new(Vec::new(), "a", RunLimits::default()).err(),
            Some(CoordinatorError::NoWorkers)
        );
        assert_eq!(
            Coordinator::new(vec![worker("a"), worker("a")], "a", RunLimits::default()).err(),
            Some(CoordinatorError::DuplicateWorker("a".to_string()))
        );
        assert_eq!(
            Coordinator::new(vec![worker("a")], "b", RunLimits::default()).err(),
            Some(CoordinatorError::UnknownEntry("b".to_string()))
        );
        assert!(matches!(
            Coordinator::new(vec![worker("a")], "a", limits(10, 0)),
            Err(CoordinatorError::InvalidLimits(_))
        ));
    }
}
