use std::collections::VecDeque;
use std::fs;
use std::io::Cursor;
use std::time::Duration;

use rfcapture::operator::{Choice, ScriptedOperator, TerminalOperator};
use rfcapture::output::OutputFile;
use rfcapture::session::DEFAULT_STOP_TOKENS;
use rfcapture::transmit::{self, SerialSink};
use rfcapture::{
    CaptureConfig, CaptureSession, ConfigError, DeviceError, Error, Marker, Outcome, PulseCode,
    RawBytes, Reading, SignalSource, Unit,
};

/// In-memory source replaying one poll result per call.
struct Replay<U> {
    polls: VecDeque<Option<Reading<U>>>,
    acquired: usize,
    released: usize,
}

impl<U> Replay<U> {
    fn new(polls: Vec<Option<Reading<U>>>) -> Self {
        Replay {
            polls: polls.into(),
            acquired: 0,
            released: 0,
        }
    }
}

impl<U: Unit> SignalSource for Replay<U> {
    type Unit = U;

    fn acquire(&mut self) -> Result<(), DeviceError> {
        self.acquired += 1;
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Reading<U>>, DeviceError> {
        Ok(self.polls.pop_front().flatten())
    }

    fn release(&mut self) {
        self.released += 1;
    }
}

/// Sink that records everything written to it.
#[derive(Default)]
struct Recorder {
    writes: Vec<Vec<u8>>,
}

impl SerialSink for Recorder {
    fn send_data(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        self.writes.push(data.to_vec());
        Ok(data.len())
    }
}

impl SerialSink for &mut Recorder {
    fn send_data(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        (**self).send_data(data)
    }
}

fn config(interactive: bool) -> CaptureConfig {
    CaptureConfig {
        poll_interval: Duration::ZERO,
        interactive,
        ..CaptureConfig::default()
    }
}

fn stop_tokens() -> Vec<String> {
    DEFAULT_STOP_TOKENS.iter().map(|t| t.to_string()).collect()
}

#[test]
fn gpio_code_is_logged_and_written_then_session_completes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("code.txt");
    let unit = PulseCode {
        code: 4_261_412_864,
        pulse_length: 189,
        protocol: 1,
    };
    let source = Replay::new(vec![None, Some(Reading::new(Marker::Timestamp(1), unit))]);

    let mut session = CaptureSession::new(source, config(false))
        .with_output(Some(OutputFile::new(&path).unwrap()));
    let outcome = session.run().unwrap();

    assert_eq!(unit.summary(), "4261412864;189;1");
    assert_eq!(fs::read_to_string(&path).unwrap(), "4261412864;189;1");
    assert_eq!(outcome, Outcome::Completed { captured: 1 });
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(session.source().released, 1);
}

#[test]
fn serial_payload_after_silence_is_written_then_operator_stops() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    let mut polls = vec![None; 5];
    polls.push(Some(Reading::new(
        Marker::Presence,
        RawBytes(b"hello".to_vec()),
    )));
    let operator = TerminalOperator::with_input(stop_tokens(), Cursor::new(b"q\n".to_vec()));

    let mut session = CaptureSession::new(Replay::new(polls), config(true))
        .with_output(Some(OutputFile::new(&path).unwrap()))
        .with_operator(operator);
    let outcome = session.run().unwrap();

    assert_eq!(RawBytes(b"hello".to_vec()).summary(), "Received: b'hello'");
    assert_eq!(fs::read(&path).unwrap(), b"hello");
    assert_eq!(outcome, Outcome::Stopped { captured: 1 });
    assert_eq!(outcome.exit_code(), 0);
    assert!(session.source().polls.is_empty());
    assert_eq!(session.source().acquired, 1);
    assert_eq!(session.source().released, 1);
}

#[test]
fn later_unit_overwrites_earlier_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    let polls = vec![
        Some(Reading::new(
            Marker::Presence,
            RawBytes(b"first and rather long".to_vec()),
        )),
        Some(Reading::new(Marker::Presence, RawBytes(b"B".to_vec()))),
    ];

    let mut session = CaptureSession::new(Replay::new(polls), config(true))
        .with_output(Some(OutputFile::new(&path).unwrap()))
        .with_operator(ScriptedOperator::new([Choice::ListenAgain, Choice::Stop]));
    let outcome = session.run().unwrap();

    assert_eq!(outcome, Outcome::Stopped { captured: 2 });
    assert_eq!(fs::read(&path).unwrap(), b"B");
}

#[test]
fn output_directory_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Error::from(OutputFile::new(dir.path()).unwrap_err());
    assert!(matches!(err, Error::Config(ConfigError::OutputIsDirectory(_))));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn transmit_missing_file_exits_without_opening_sink() {
    let dir = tempfile::tempdir().unwrap();
    let mut opened = false;

    let result = transmit::send(
        &dir.path().join("nothing-here"),
        || -> Result<Recorder, DeviceError> {
            opened = true;
            Ok(Recorder::default())
        },
        Duration::ZERO,
    );

    let err = result.err().unwrap();
    assert!(matches!(err, Error::Config(ConfigError::InputNotFound(_))));
    assert_eq!(err.exit_code(), 1);
    assert!(!opened);
}

#[test]
fn transmit_writes_whole_file_in_one_call() {
    let file = tempfile::NamedTempFile::new().unwrap();
    fs::write(file.path(), b"0123456789").unwrap();
    let mut recorder = Recorder::default();
    let sink = &mut recorder;

    let written = transmit::send(
        file.path(),
        move || -> Result<&mut Recorder, DeviceError> { Ok(sink) },
        Duration::from_millis(5),
    )
    .unwrap();

    assert_eq!(written, 10);
    assert_eq!(recorder.writes, vec![b"0123456789".to_vec()]);
}
