use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::{DeviceError, Error};
use crate::operator::{Choice, Operator, TerminalOperator};
use crate::output::OutputFile;
use crate::source::{Marker, SignalSource, Unit};

/// Answers that end an interactive session.
pub const DEFAULT_STOP_TOKENS: [&str; 5] = ["q", "quit", "stop", "lr", "l+r"];

/// Shared interrupt flag. Cloning hands out another handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Pause between two polls of the source.
    pub poll_interval: Duration,
    /// Ask the operator after every unit instead of stopping after the first.
    pub interactive: bool,
    pub stop_tokens: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            poll_interval: Duration::from_millis(200),
            interactive: false,
            stop_tokens: DEFAULT_STOP_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Dedup state of a listening round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    last_seen_marker: Option<Marker>,
    should_continue: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            last_seen_marker: None,
            should_continue: true,
        }
    }
}

impl SessionState {
    /// Record `marker`; true if it differs from the last one seen.
    pub fn observe(&mut self, marker: Marker) -> bool {
        if self.last_seen_marker == Some(marker) {
            return false;
        }
        self.last_seen_marker = Some(marker);
        true
    }

    /// Forget the last marker so the next reading counts as new.
    pub fn reset(&mut self) {
        self.last_seen_marker = None;
    }

    pub fn last_seen_marker(&self) -> Option<Marker> {
        self.last_seen_marker
    }

    pub fn should_continue(&self) -> bool {
        self.should_continue
    }
}

/// How a capture session ended. None of these are failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Non-interactive session captured its unit.
    Completed { captured: usize },
    /// Operator chose to stop.
    Stopped { captured: usize },
    /// Interrupt signal.
    Interrupted { captured: usize },
}

impl Outcome {
    pub fn captured(&self) -> usize {
        match *self {
            Outcome::Completed { captured }
            | Outcome::Stopped { captured }
            | Outcome::Interrupted { captured } => captured,
        }
    }

    pub fn exit_code(&self) -> i32 {
        0
    }
}

enum Step<U> {
    Acquire,
    Listen,
    Detected(U),
    AwaitOperator,
    Done(Outcome),
}

/// Poll loop over a [`SignalSource`].
///
/// Each distinct unit is logged and optionally written to the output file,
/// then the source is released before the session decides whether to listen
/// again. The source is released exactly once per acquisition, whether the
/// session ends normally, by interrupt, or with an error.
pub struct CaptureSession<S: SignalSource> {
    source: S,
    output: Option<OutputFile>,
    operator: Box<dyn Operator>,
    config: CaptureConfig,
    cancel: CancelToken,
    state: SessionState,
    acquired: bool,
    captured: usize,
}

impl<S: SignalSource> CaptureSession<S> {
    pub fn new(source: S, config: CaptureConfig) -> Self {
        let operator = TerminalOperator::new(config.stop_tokens.clone());
        CaptureSession {
            source,
            output: None,
            operator: Box::new(operator),
            config,
            cancel: CancelToken::new(),
            state: SessionState::default(),
            acquired: false,
            captured: 0,
        }
    }

    pub fn with_output(mut self, output: Option<OutputFile>) -> Self {
        self.output = output;
        self
    }

    pub fn with_operator(mut self, operator: impl Operator + 'static) -> Self {
        self.operator = Box::new(operator);
        self
    }

    /// Share an interrupt flag created before the session.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for the interrupt handler. Cancelling it ends the session at the
    /// next poll or while the operator prompt is open.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run until the first unit (non-interactive), the operator stops, or an interrupt.
    pub fn run(&mut self) -> Result<Outcome, Error> {
        let result = self.drive();
        self.release();
        result
    }

    fn drive(&mut self) -> Result<Outcome, Error> {
        let mut step = Step::Acquire;
        loop {
            step = match step {
                Step::Acquire => {
                    if self.cancel.is_cancelled() {
                        Step::Done(self.interrupted())
                    } else {
                        self.acquire()?;
                        Step::Listen
                    }
                }
                Step::Listen => self.listen()?,
                Step::Detected(unit) => {
                    self.emit(&unit)?;
                    self.release();
                    if self.config.interactive {
                        Step::AwaitOperator
                    } else {
                        self.state.should_continue = false;
                        Step::Done(Outcome::Completed {
                            captured: self.captured,
                        })
                    }
                }
                Step::AwaitOperator => match self.operator.choose(&self.cancel) {
                    Ok(Some(Choice::ListenAgain)) => {
                        log::info!("Listening again");
                        self.state.reset();
                        Step::Acquire
                    }
                    Ok(Some(Choice::Stop)) => {
                        self.state.should_continue = false;
                        Step::Done(Outcome::Stopped {
                            captured: self.captured,
                        })
                    }
                    Ok(None) => Step::Done(self.interrupted()),
                    Err(e) => return Err(DeviceError::Io(e).into()),
                },
                Step::Done(outcome) => return Ok(outcome),
            };
        }
    }

    fn listen(&mut self) -> Result<Step<S::Unit>, Error> {
        if self.cancel.is_cancelled() {
            return Ok(Step::Done(self.interrupted()));
        }
        let reading = self.source.poll()?;
        // the read may have blocked across an interrupt
        if self.cancel.is_cancelled() {
            return Ok(Step::Done(self.interrupted()));
        }
        if let Some(reading) = reading {
            // marker is stored before any logging or file I/O
            if self.state.observe(reading.marker) {
                return Ok(Step::Detected(reading.unit));
            }
        }
        thread::sleep(self.config.poll_interval);
        Ok(Step::Listen)
    }

    fn emit(&mut self, unit: &S::Unit) -> Result<(), Error> {
        self.captured += 1;
        log::info!("{}", unit.summary());
        if let Some(output) = &self.output {
            output.write(&unit.contents())?;
            log::debug!("wrote {}", output.path().display());
        }
        Ok(())
    }

    fn interrupted(&mut self) -> Outcome {
        log::info!("Interrupted, exiting");
        self.state.should_continue = false;
        Outcome::Interrupted {
            captured: self.captured,
        }
    }

    fn acquire(&mut self) -> Result<(), DeviceError> {
        self.source.acquire()?;
        self.acquired = true;
        Ok(())
    }

    fn release(&mut self) {
        if self.acquired {
            self.source.release();
            self.acquired = false;
        }
    }
}

impl<S: SignalSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}
