//! Scripted workers and capability doubles for deterministic tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::agents::{Worker, WorkerError, WorkerOutput};
use crate::core::handoff::HandoffRequest;
use crate::core::transcript::{Message, Payload, PublishConfirmation};
use crate::io::content::ContentGenerator;
use crate::io::http::AdapterError;
use crate::io::image::{ImageDimensions, ImageGenerator};
use crate::io::prompt::Prompt;
use crate::io::publish::{Article, Publisher};
use crate::io::upload::ImageUploader;

/// One scripted invocation outcome.
#[derive(Debug, Clone)]
pub struct ScriptedStep {
    pub delay: Duration,
    pub result: Result<WorkerOutput, WorkerError>,
}

impl ScriptedStep {
    /// Emit a note and hand off to `target`.
    pub fn handoff(target: &str, note: &str) -> Self {
        Self::output(WorkerOutput::handoff(
            vec![Payload::note(note)],
            HandoffRequest::new(target, format!("over to {target}")),
        ))
    }

    /// Emit a note and finish the run.
    pub fn done(note: &str) -> Self {
        Self::output(WorkerOutput::done(vec![Payload::note(note)]))
    }

    pub fn output(output: WorkerOutput) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(output),
        }
    }

    pub fn fail(err: WorkerError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }

    /// Sleep for `delay` before returning the outcome.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What a scripted worker observed when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub transcript_len: usize,
    pub budget: Duration,
}

/// Worker that replays scripted steps in order.
///
/// Once the script is exhausted the `repeat` step is replayed; without one the
/// worker reports a configuration error.
pub struct ScriptedWorker {
    name: String,
    steps: Mutex<VecDeque<ScriptedStep>>,
    repeat: Option<ScriptedStep>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedWorker {
    pub fn new(name: &str, steps: Vec<ScriptedStep>) -> Self {
        Self {
            name: name.to_string(),
            steps: Mutex::new(steps.into()),
            repeat: None,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Replay `step` forever once the scripted steps run out.
    pub fn repeating(name: &str, step: ScriptedStep) -> Self {
        Self {
            repeat: Some(step),
            ..Self::new(name, Vec::new())
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("invocations lock").clone()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        transcript: &[Message],
        budget: Duration,
    ) -> Result<WorkerOutput, WorkerError> {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push(Invocation {
                transcript_len: transcript.len(),
                budget,
            });
        let next = self.steps.lock().expect("steps lock").pop_front();
        let step = match next.or_else(|| self.repeat.clone()) {
            Some(step) => step,
            None => {
                return Err(WorkerError::Configuration(format!(
                    "{} script exhausted",
                    self.name
                )));
            }
        };
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }
}

fn exhausted(capability: &str) -> AdapterError {
    AdapterError::InvalidResponse(format!("{capability} script exhausted"))
}

/// Content generator that replays scripted responses and records prompts.
pub struct ScriptedContent {
    responses: Mutex<VecDeque<Result<String, AdapterError>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedContent {
    pub fn new(responses: Vec<Result<String, AdapterError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedContent {
    async fn generate(&self, prompt: &Prompt) -> Result<String, AdapterError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("content")))
    }
}

/// Image generator that replays scripted bytes and records prompts.
pub struct ScriptedImages {
    responses: Mutex<VecDeque<Result<Vec<u8>, AdapterError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedImages {
    pub fn new(responses: Vec<Result<Vec<u8>, AdapterError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImages {
    async fn generate_image(
        &self,
        prompt: &str,
        _dimensions: ImageDimensions,
    ) -> Result<Vec<u8>, AdapterError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("image")))
    }
}

/// Uploader that replays scripted URLs and counts uploads.
pub struct ScriptedUploader {
    responses: Mutex<VecDeque<Result<String, AdapterError>>>,
    uploads: Mutex<usize>,
}

impl ScriptedUploader {
    pub fn new(responses: Vec<Result<String, AdapterError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            uploads: Mutex::new(0),
        }
    }

    pub fn uploads(&self) -> usize {
        *self.uploads.lock().expect("uploads lock")
    }
}

#[async_trait]
impl ImageUploader for ScriptedUploader {
    async fn upload(&self, _image: &[u8]) -> Result<String, AdapterError> {
        *self.uploads.lock().expect("uploads lock") += 1;
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("upload")))
    }
}

/// Publisher that replays scripted confirmations and records articles.
pub struct ScriptedPublisher {
    responses: Mutex<VecDeque<Result<PublishConfirmation, AdapterError>>>,
    articles: Mutex<Vec<Article>>,
}

impl ScriptedPublisher {
    pub fn new(responses: Vec<Result<PublishConfirmation, AdapterError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            articles: Mutex::new(Vec::new()),
        }
    }

    pub fn articles(&self) -> Vec<Article> {
        self.articles.lock().expect("articles lock").clone()
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    async fn publish(&self, article: &Article) -> Result<PublishConfirmation, AdapterError> {
        self.articles
            .lock()
            .expect("articles lock")
            .push(article.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("publish")))
    }
}
