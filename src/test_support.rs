use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;

use crate::backend::{
    Capability, DynBackend, GenerativeBackend, ModelInfo, Session, SessionSpec, Turn, TurnReply,
};
use crate::error::BackendError;

pub(crate) fn env_lock<'a>() -> MutexGuard<'a, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub(crate) fn new(vars: &[(&str, Option<&str>)]) -> Self {
        let saved = vars
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect::<Vec<_>>();
        for (key, value) in vars {
            match value {
                Some(val) => unsafe { std::env::set_var(key, val) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(val) => unsafe { std::env::set_var(key, val) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Reply(Vec<String>),
    Fail(BackendError),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub session: usize,
    pub model: String,
    pub system_instruction: Option<String>,
    pub capabilities: BTreeSet<Capability>,
    pub text: String,
}

/// Backend answering exact prompts with canned fragments and recording
/// every turn it receives.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    script: HashMap<String, Scripted>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    sessions: Arc<Mutex<usize>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, prompt: &str, text: &str) -> Self {
        self.fragments(prompt, &[text])
    }

    pub(crate) fn fragments(mut self, prompt: &str, fragments: &[&str]) -> Self {
        self.script.insert(
            prompt.to_string(),
            Scripted::Reply(fragments.iter().map(|f| f.to_string()).collect()),
        );
        self
    }

    pub(crate) fn fail(mut self, prompt: &str, error: BackendError) -> Self {
        self.script
            .insert(prompt.to_string(), Scripted::Fail(error));
        self
    }

    /// Finish scripting; returns the shared backend and a handle on its call log.
    pub(crate) fn build(self) -> (DynBackend, CallLog) {
        let log = CallLog {
            calls: self.calls.clone(),
            sessions: self.sessions.clone(),
        };
        (Arc::new(self), log)
    }
}

#[derive(Clone)]
pub(crate) struct CallLog {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    sessions: Arc<Mutex<usize>>,
}

impl CallLog {
    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.text).collect()
    }

    pub(crate) fn sessions_created(&self) -> usize {
        *self.sessions.lock().unwrap()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn create_session(&self, spec: SessionSpec) -> Result<Box<dyn Session>, BackendError> {
        let mut sessions = self.sessions.lock().unwrap();
        *sessions += 1;
        Ok(Box::new(ScriptedSession {
            id: *sessions,
            spec,
            script: self.script.clone(),
            calls: self.calls.clone(),
            history: Vec::new(),
        }))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        Ok(vec![ModelInfo {
            id: "scripted-model".to_string(),
            display_name: None,
            context_length: None,
        }])
    }
}

struct ScriptedSession {
    id: usize,
    spec: SessionSpec,
    script: HashMap<String, Scripted>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    history: Vec<Turn>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn send_turn(&mut self, text: &str) -> Result<TurnReply, BackendError> {
        self.calls.lock().unwrap().push(RecordedCall {
            session: self.id,
            model: self.spec.model.clone(),
            system_instruction: self.spec.system_instruction.clone(),
            capabilities: self.spec.capabilities.clone(),
            text: text.to_string(),
        });

        match self.script.get(text) {
            Some(Scripted::Reply(fragments)) => {
                self.history.push(Turn::user(text));
                self.history.push(Turn::model(fragments.concat()));
                Ok(TurnReply {
                    fragments: fragments.clone(),
                    grounding: None,
                })
            }
            Some(Scripted::Fail(error)) => Err(error.clone()),
            None => Err(BackendError::InvalidRequest(format!(
                "no scripted reply for {text:?}"
            ))),
        }
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}
