//! # Overwrite Arbiter
//!
//! Decides whether an existing output file may be replaced.
//!
//! ```text
//!            yes / no                 (any answer, no prompt)
//!           ┌────────┐               ┌────────┐
//!           ▼        │     all       ▼        │
//!   ──▶  Fresh ──────┴────────────▶  All ─────┘
//!           │
//!           │ quit
//!           ▼
//!         Abort (run ends, exit status 0)
//! ```
//!
//! - missing target, or state `All`: allowed without asking
//! - otherwise the operator is asked once per (file, format) pair, right before the write
//! - anything that is not a recognized answer counts as `no`
//!
//! The answers come from a [`DecisionSource`], so the state machine can be
//! driven by a terminal or by a script.

use dialoguer::Input;
use indicatif::ProgressBar;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// An operator's answer to the overwrite question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteDecision {
    Yes,
    No,
    All,
    Quit,
}

impl OverwriteDecision {
    /// Single letters or full words, case-insensitive. Unknown input is `No`.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => OverwriteDecision::Yes,
            "a" | "all" => OverwriteDecision::All,
            "q" | "quit" => OverwriteDecision::Quit,
            _ => OverwriteDecision::No,
        }
    }
}

/// Result of asking the arbiter before a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePermission {
    Allowed,
    Denied,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArbiterState {
    Fresh,
    All,
}

/// Where overwrite answers come from.
pub trait DecisionSource {
    /// Ask about `existing` and return the raw answer.
    fn ask(&mut self, existing: &Path) -> std::io::Result<String>;
}

/// Stateful overwrite policy for one run.
pub struct OverwriteArbiter {
    state: ArbiterState,
    source: Box<dyn DecisionSource>,
}

impl OverwriteArbiter {
    pub fn new(source: Box<dyn DecisionSource>) -> Self {
        Self {
            state: ArbiterState::Fresh,
            source,
        }
    }

    /// Whether "all" has been chosen during this run.
    pub fn overwrite_all(&self) -> bool {
        self.state == ArbiterState::All
    }

    /// Decide whether `path` may be written.
    pub fn check_write(&mut self, path: &Path) -> WritePermission {
        if self.state == ArbiterState::All || !path.exists() {
            return WritePermission::Allowed;
        }

        let answer = match self.source.ask(path) {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Could not read answer for {}: {} (keeping existing file)", path.display(), e);
                String::new()
            }
        };

        match OverwriteDecision::parse(&answer) {
            OverwriteDecision::Yes => WritePermission::Allowed,
            OverwriteDecision::No => {
                debug!("Keeping existing file: {}", path.display());
                WritePermission::Denied
            }
            OverwriteDecision::All => {
                debug!("Overwriting all existing files for the rest of the run");
                self.state = ArbiterState::All;
                WritePermission::Allowed
            }
            OverwriteDecision::Quit => WritePermission::Abort,
        }
    }
}

/// Asks on the terminal. Falls back to reading a line from stdin when it is piped.
pub struct TerminalPrompt {
    progress: Option<ProgressBar>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self { progress: None }
    }

    /// Hide `progress` while waiting for an answer.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn prompt_text(existing: &Path) -> String {
        format!(
            "{} already exists. Overwrite? [y]es / [n]o / [a]ll / [q]uit",
            existing.display()
        )
    }

    fn read_answer(existing: &Path) -> std::io::Result<String> {
        let text = Self::prompt_text(existing);

        if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
            return Input::<String>::new()
                .with_prompt(text)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| match e {
                    dialoguer::Error::IO(io) => io,
                });
        }

        let mut stderr = std::io::stderr();
        write!(stderr, "{}: ", text)?;
        stderr.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionSource for TerminalPrompt {
    fn ask(&mut self, existing: &Path) -> std::io::Result<String> {
        match self.progress {
            Some(ref progress) => progress.suspend(|| Self::read_answer(existing)),
            None => Self::read_answer(existing),
        }
    }
}

/// Replays a fixed list of answers and records every path it was asked about.
///
/// Clones share state, so a caller can keep one to inspect after handing the
/// other to an [`OverwriteArbiter`]. Once the answers run out every further
/// question is answered with an empty line, which counts as `no`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    answers: Rc<RefCell<VecDeque<String>>>,
    asked: Rc<RefCell<Vec<PathBuf>>>,
}

impl ScriptedDecisions {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Rc::new(RefCell::new(answers.into_iter().map(Into::into).collect())),
            asked: Rc::default(),
        }
    }

    /// Paths the arbiter prompted for, in order.
    pub fn asked(&self) -> Vec<PathBuf> {
        self.asked.borrow().clone()
    }
}

impl DecisionSource for ScriptedDecisions {
    fn ask(&mut self, existing: &Path) -> std::io::Result<String> {
        self.asked.borrow_mut().push(existing.to_path_buf());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FailingSource;

    impl DecisionSource for FailingSource {
        fn ask(&mut self, _existing: &Path) -> std::io::Result<String> {
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stdin closed"))
        }
    }

    fn existing_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"old").unwrap();
        path
    }

    #[test]
    fn test_parse_answers() {
        assert_eq!(OverwriteDecision::parse("y"), OverwriteDecision::Yes);
        assert_eq!(OverwriteDecision::parse(" YES\n"), OverwriteDecision::Yes);
        assert_eq!(OverwriteDecision::parse("n"), OverwriteDecision::No);
        assert_eq!(OverwriteDecision::parse("All"), OverwriteDecision::All);
        assert_eq!(OverwriteDecision::parse("q"), OverwriteDecision::Quit);
        assert_eq!(OverwriteDecision::parse("quit"), OverwriteDecision::Quit);
        assert_eq!(OverwriteDecision::parse(""), OverwriteDecision::No);
        assert_eq!(OverwriteDecision::parse("sure"), OverwriteDecision::No);
    }

    #[test]
    fn test_missing_target_is_allowed_without_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let script = ScriptedDecisions::new(["q"]);
        let mut arbiter = OverwriteArbiter::new(Box::new(script.clone()));

        let permission = arbiter.check_write(&temp_dir.path().join("new.png"));
        assert_eq!(permission, WritePermission::Allowed);
        assert!(script.asked().is_empty());
    }

    #[test]
    fn test_yes_and_no_keep_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = existing_file(&temp_dir, "a.png");
        let script = ScriptedDecisions::new(["yes", "no", "y"]);
        let mut arbiter = OverwriteArbiter::new(Box::new(script.clone()));

        assert_eq!(arbiter.check_write(&path), WritePermission::Allowed);
        assert_eq!(arbiter.check_write(&path), WritePermission::Denied);
        assert_eq!(arbiter.check_write(&path), WritePermission::Allowed);
        assert!(!arbiter.overwrite_all());
        assert_eq!(script.asked().len(), 3);
    }

    #[test]
    fn test_all_stops_prompting() {
        let temp_dir = TempDir::new().unwrap();
        let first = existing_file(&temp_dir, "a.png");
        let second = existing_file(&temp_dir, "b.webp");
        let script = ScriptedDecisions::new(["a"]);
        let mut arbiter = OverwriteArbiter::new(Box::new(script.clone()));

        assert_eq!(arbiter.check_write(&first), WritePermission::Allowed);
        assert!(arbiter.overwrite_all());
        assert_eq!(arbiter.check_write(&second), WritePermission::Allowed);
        assert_eq!(arbiter.check_write(&first), WritePermission::Allowed);
        assert_eq!(script.asked(), vec![first]);
    }

    #[test]
    fn test_quit_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let path = existing_file(&temp_dir, "a.png");
        let mut arbiter = OverwriteArbiter::new(Box::new(ScriptedDecisions::new(["quit"])));

        assert_eq!(arbiter.check_write(&path), WritePermission::Abort);
    }

    #[test]
    fn test_unrecognized_or_unreadable_answer_denies() {
        let temp_dir = TempDir::new().unwrap();
        let path = existing_file(&temp_dir, "a.png");

        let mut arbiter = OverwriteArbiter::new(Box::new(ScriptedDecisions::new(["overwrite please"])));
        assert_eq!(arbiter.check_write(&path), WritePermission::Denied);
        // script exhausted
        assert_eq!(arbiter.check_write(&path), WritePermission::Denied);

        let mut arbiter = OverwriteArbiter::new(Box::new(FailingSource));
        assert_eq!(arbiter.check_write(&path), WritePermission::Denied);
    }
}
