//! Scripted stand-in for the supervision daemon's RPC interface.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::supervisor::{ProcessState, SupervisorClient, SupervisorError};

/// One recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    ProcessState(String),
    StartGroup(String),
    StartProcess(String),
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum Reply {
    State(ProcessState),
    Unreachable,
    Fault(i64),
}

type PollHook = Box<dyn FnMut(&str) + Send>;

#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<Reply>>,
    ping_failures: Option<usize>,
    failing_shutdown: bool,
    calls: Vec<Call>,
    on_poll: Option<PollHook>,
}

/// Answers state queries from per-process reply queues.
///
/// Each process name has a queue; replies are consumed in order and the last
/// one repeats forever. Unscripted names answer with a `BAD_NAME` fault.
/// Clones share the same script and call log.
#[derive(Clone, Default)]
pub struct ScriptedSupervisor {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states(self, name: &str, states: impl IntoIterator<Item = ProcessState>) -> Self {
        self.script_states(name, states);
        self
    }

    pub fn with_connectivity_failures(self, name: &str, failures: usize) -> Self {
        self.push(name, std::iter::repeat_n(Reply::Unreachable, failures));
        self
    }

    pub fn with_fault(self, name: &str, code: i64) -> Self {
        self.push(name, [Reply::Fault(code)]);
        self
    }

    pub fn on_poll(self, hook: impl FnMut(&str) + Send + 'static) -> Self {
        self.script_on_poll(hook);
        self
    }

    /// Appends states to the reply queue for `name`.
    pub fn script_states(&self, name: &str, states: impl IntoIterator<Item = ProcessState>) {
        self.push(name, states.into_iter().map(Reply::State));
    }

    /// Runs `hook` after every state query, with the queried name.
    pub fn script_on_poll(&self, hook: impl FnMut(&str) + Send + 'static) {
        self.lock().on_poll = Some(Box::new(hook));
    }

    /// Makes `ping` fail with a connectivity error `failures` times.
    pub fn script_ping_failures(&self, failures: usize) {
        self.lock().ping_failures = Some(failures);
    }

    /// Makes `ping` fail with a connectivity error forever.
    pub fn script_unreachable(&self) {
        self.lock().ping_failures = Some(usize::MAX);
    }

    /// Makes `shutdown` fail with a connectivity error.
    pub fn script_failing_shutdown(&self) {
        self.lock().failing_shutdown = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn state_queries(&self) -> usize {
        self.count(|call| matches!(call, Call::ProcessState(_)))
    }

    pub fn shutdown_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::Shutdown))
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Index of the first recorded call equal to `call`.
    pub fn first(&self, call: &Call) -> Option<usize> {
        self.lock().calls.iter().position(|recorded| recorded == call)
    }

    /// Index of the last recorded call matching `predicate`.
    pub fn last_matching(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.lock().calls.iter().rposition(predicate)
    }

    fn push(&self, name: &str, replies: impl IntoIterator<Item = Reply>) {
        self.lock()
            .replies
            .entry(name.to_owned())
            .or_default()
            .extend(replies);
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }
}

fn unreachable() -> SupervisorError {
    SupervisorError::Connectivity {
        endpoint: "scripted".to_owned(),
        source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
    }
}

fn fault(method: &'static str, code: i64, name: &str) -> SupervisorError {
    SupervisorError::Fault {
        method,
        code,
        message: format!("BAD_NAME: {name}"),
    }
}

impl SupervisorClient for ScriptedSupervisor {
    fn ping(&self) -> Result<(), SupervisorError> {
        self.record(Call::Ping);
        let mut script = self.lock();
        match script.ping_failures.as_mut() {
            Some(remaining) if *remaining > 0 => {
                *remaining = remaining.saturating_sub(1);
                Err(unreachable())
            }
            _ => Ok(()),
        }
    }

    fn process_state(&self, name: &str) -> Result<ProcessState, SupervisorError> {
        self.record(Call::ProcessState(name.to_owned()));
        let reply = {
            let mut script = self.lock();
            match script.replies.get_mut(name) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().copied(),
                None => None,
            }
        };
        let hook = self.lock().on_poll.take();
        if let Some(mut hook) = hook {
            hook(name);
            let mut script = self.lock();
            if script.on_poll.is_none() {
                script.on_poll = Some(hook);
            }
        }
        match reply {
            Some(Reply::State(state)) => Ok(state),
            Some(Reply::Unreachable) => Err(unreachable()),
            Some(Reply::Fault(code)) => Err(fault("supervisor.getProcessInfo", code, name)),
            None => Err(fault("supervisor.getProcessInfo", 10, name)),
        }
    }

    fn start_group(&self, group: &str) -> Result<(), SupervisorError> {
        self.record(Call::StartGroup(group.to_owned()));
        Ok(())
    }

    fn start_process(&self, name: &str) -> Result<(), SupervisorError> {
        self.record(Call::StartProcess(name.to_owned()));
        Ok(())
    }

    fn shutdown(&self) -> Result<(), SupervisorError> {
        self.record(Call::Shutdown);
        if self.lock().failing_shutdown {
            Err(unreachable())
        } else {
            Ok(())
        }
    }
}
