use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::session::CancelToken;

/// Text shown after each captured unit in interactive mode.
pub const PROMPT: &str = "Press A to listen again or L+R to save and stop";

/// How often a waiting prompt checks for cancellation.
const CANCEL_CHECK: Duration = Duration::from_millis(100);

/// What the operator wants after a unit was captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    ListenAgain,
    Stop,
}

/// Source of continue/stop decisions for an interactive capture session.
pub trait Operator {
    /// Ask whether to keep listening.
    ///
    /// Returns `Ok(None)` when `cancel` fires while waiting for an answer.
    fn choose(&mut self, cancel: &CancelToken) -> io::Result<Option<Choice>>;
}

/// Prompts on stdout and reads answers line by line.
///
/// Lines are read on a helper thread so the prompt keeps observing
/// cancellation while the operator is idle.
pub struct TerminalOperator {
    prompt: String,
    stop_tokens: Vec<String>,
    input: Option<Box<dyn BufRead + Send>>,
    lines: Option<Receiver<String>>,
}

impl TerminalOperator {
    /// Operator reading from the process' stdin.
    pub fn new(stop_tokens: Vec<String>) -> Self {
        Self::with_input(stop_tokens, io::BufReader::new(io::stdin()))
    }

    pub fn with_input(stop_tokens: Vec<String>, input: impl BufRead + Send + 'static) -> Self {
        TerminalOperator {
            prompt: PROMPT.to_string(),
            stop_tokens: stop_tokens.into_iter().map(|t| t.to_lowercase()).collect(),
            input: Some(Box::new(input)),
            lines: None,
        }
    }

    /// Map an answer to a choice. Anything that is not a stop token listens again.
    pub fn interpret(&self, answer: &str) -> Choice {
        let answer = answer.trim().to_lowercase();
        if self.stop_tokens.iter().any(|token| *token == answer) {
            Choice::Stop
        } else {
            Choice::ListenAgain
        }
    }

    fn lines(&mut self) -> &Receiver<String> {
        self.lines.get_or_insert_with(|| spawn_reader(self.input.take()))
    }
}

fn spawn_reader(input: Option<Box<dyn BufRead + Send>>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(input) = input {
        thread::spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    }
    rx
}

impl Operator for TerminalOperator {
    fn choose(&mut self, cancel: &CancelToken) -> io::Result<Option<Choice>> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", self.prompt)?;
        stdout.flush()?;

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            match self.lines().recv_timeout(CANCEL_CHECK) {
                Ok(answer) => return Ok(Some(self.interpret(&answer))),
                Err(RecvTimeoutError::Timeout) => continue,
                // closed input cannot ask for more
                Err(RecvTimeoutError::Disconnected) => return Ok(Some(Choice::Stop)),
            }
        }
    }
}

/// Replays a fixed list of choices, then stops.
#[derive(Clone, Debug, Default)]
pub struct ScriptedOperator {
    choices: VecDeque<Choice>,
    asked: usize,
}

impl ScriptedOperator {
    pub fn new(choices: impl IntoIterator<Item = Choice>) -> Self {
        ScriptedOperator {
            choices: choices.into_iter().collect(),
            asked: 0,
        }
    }

    /// Number of times the session asked for a decision.
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl Operator for ScriptedOperator {
    fn choose(&mut self, cancel: &CancelToken) -> io::Result<Option<Choice>> {
        self.asked += 1;
        if cancel.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(self.choices.pop_front().unwrap_or(Choice::Stop)))
    }
}
