use async_trait::async_trait;
use futures::channel::oneshot;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    #[value(alias = "default")]
    Undecided,
}

impl PermissionState {
    pub fn is_decided(self) -> bool {
        !matches!(self, PermissionState::Undecided)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Undecided => "undecided",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(PermissionState::Granted),
            "denied" => Ok(PermissionState::Denied),
            "undecided" | "default" => Ok(PermissionState::Undecided),
            other => Err(format!(
                "permission must be one of: granted, denied, undecided (got {other})"
            )),
        }
    }
}

/// Consent for emitting platform-level notifications.
#[async_trait(?Send)]
pub trait PermissionGate {
    fn current_permission(&self) -> PermissionState;

    /// Returns immediately once decided. While undecided, prompts the
    /// platform and resolves with whatever it answers.
    async fn ensure_permission(&self) -> PermissionState;
}

/// Gate whose platform prompt is answered out of band through [`resolve`].
///
/// Callers that arrive while a prompt is outstanding join it instead of
/// prompting again. Once decided the state never changes.
///
/// [`resolve`]: PromptGate::resolve
pub struct PromptGate {
    state: Cell<PermissionState>,
    waiters: RefCell<Vec<oneshot::Sender<PermissionState>>>,
    prompt: Box<dyn Fn()>,
}

impl PromptGate {
    pub fn new(initial: PermissionState, prompt: impl Fn() + 'static) -> Self {
        Self {
            state: Cell::new(initial),
            waiters: RefCell::new(Vec::new()),
            prompt: Box::new(prompt),
        }
    }

    pub fn prompt_pending(&self) -> bool {
        !self.waiters.borrow().is_empty()
    }

    /// Applies the platform's answer and wakes every pending caller. Answers
    /// arriving after a decision are ignored; the effective state is returned.
    pub fn resolve(&self, answer: PermissionState) -> PermissionState {
        let current = self.state.get();
        if current.is_decided() {
            if answer != current {
                tracing::info!(%current, %answer, "ignoring permission report; already decided");
            }
            return current;
        }
        if !answer.is_decided() {
            return current;
        }

        self.state.set(answer);
        tracing::info!(permission = %answer, "notification permission decided");
        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for tx in waiters {
            let _ = tx.send(answer);
        }
        answer
    }
}

#[async_trait(?Send)]
impl PermissionGate for PromptGate {
    fn current_permission(&self) -> PermissionState {
        self.state.get()
    }

    async fn ensure_permission(&self) -> PermissionState {
        let current = self.state.get();
        if current.is_decided() {
            return current;
        }

        let (tx, rx) = oneshot::channel();
        let first = {
            let mut waiters = self.waiters.borrow_mut();
            waiters.push(tx);
            waiters.len() == 1
        };
        if first {
            tracing::debug!("prompting for notification permission");
            (self.prompt)();
        }
        // A dropped sender means the gate went away mid-prompt.
        rx.await.unwrap_or(PermissionState::Undecided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use std::rc::Rc;

    #[test]
    fn decided_gate_returns_without_prompting() {
        let prompts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&prompts);
        let gate = PromptGate::new(PermissionState::Denied, move || {
            counter.set(counter.get() + 1)
        });
        assert_eq!(block_on(gate.ensure_permission()), PermissionState::Denied);
        assert_eq!(prompts.get(), 0);
    }

    #[test]
    fn undecided_gate_suspends_until_resolved() {
        let prompts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&prompts);
        let gate = Rc::new(PromptGate::new(PermissionState::Undecided, move || {
            counter.set(counter.get() + 1)
        }));
        let results = Rc::new(RefCell::new(Vec::new()));

        let mut pool = LocalPool::new();
        for _ in 0..2 {
            let gate = Rc::clone(&gate);
            let results = Rc::clone(&results);
            pool.spawner()
                .spawn_local(async move {
                    let answer = gate.ensure_permission().await;
                    results.borrow_mut().push(answer);
                })
                .expect("spawn");
        }

        pool.run_until_stalled();
        assert!(results.borrow().is_empty());
        assert!(gate.prompt_pending());
        assert_eq!(prompts.get(), 1, "concurrent callers share one prompt");

        assert_eq!(gate.resolve(PermissionState::Granted), PermissionState::Granted);
        pool.run_until_stalled();
        assert_eq!(
            *results.borrow(),
            vec![PermissionState::Granted, PermissionState::Granted]
        );
        assert!(!gate.prompt_pending());
    }

    #[test]
    fn decided_state_is_terminal() {
        let gate = PromptGate::new(PermissionState::Undecided, || {});
        assert_eq!(gate.resolve(PermissionState::Denied), PermissionState::Denied);
        assert_eq!(gate.resolve(PermissionState::Granted), PermissionState::Denied);
        assert_eq!(gate.current_permission(), PermissionState::Denied);
    }

    #[test]
    fn parses_browser_default_as_undecided() {
        assert_eq!(
            "default".parse::<PermissionState>(),
            Ok(PermissionState::Undecided)
        );
        assert!("maybe".parse::<PermissionState>().is_err());
    }
}
