//! Replay of recorded bus traffic.
//!
//! A recording is a JSON-lines file, one [`Envelope`] per line:
//!
//! ```text
//! {"topic":"turtlebot3/map","payload":{...},"timestamp_ms":1000}
//! {"topic":"turtlebot3/odom","payload":{"x":0.1,"y":0.0},"timestamp_ms":1100}
//! ```
//!
//! With a speed above zero, messages are released at their recorded
//! spacing divided by the speed. Lines without `timestamp_ms` are released
//! immediately. Blank lines are skipped. A line that is not UTF-8 or not a
//! valid envelope is dropped on its own.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::messages::Envelope;

/// Slowest accepted playback speed; lower positive speeds are raised to it.
pub const MIN_PLAYBACK_SPEED: f64 = 0.01;

/// Longest single sleep while pacing, so a cleared running flag is seen.
const PACING_STEP: Duration = Duration::from_millis(50);

/// Reads envelopes from a recording.
pub struct ReplaySource {
    reader: BufReader<File>,
    line: Vec<u8>,
    playback_start: Option<Instant>,
    first_msg_time_ms: Option<u64>,
    playback_speed: f64,
    lines_read: u64,
}

impl ReplaySource {
    /// Open a recording. Playback speed starts at 0 (no pacing).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::Other(format!("Failed to open recording {}: {}", path.display(), e))
        })?;
        Ok(Self {
            reader: BufReader::new(file),
            line: Vec::new(),
            playback_start: None,
            first_msg_time_ms: None,
            playback_speed: 0.0,
            lines_read: 0,
        })
    }

    /// Set playback speed.
    ///
    /// - 0.0 = as fast as possible
    /// - 1.0 = recorded timing
    /// - 2.0 = twice as fast
    ///
    /// Positive speeds below [`MIN_PLAYBACK_SPEED`] are raised to it.
    pub fn set_speed(&mut self, speed: f64) {
        self.playback_speed = if speed.is_finite() && speed > 0.0 {
            speed.max(MIN_PLAYBACK_SPEED)
        } else {
            0.0
        };
    }

    /// Current playback speed.
    pub fn speed(&self) -> f64 {
        self.playback_speed
    }

    /// Lines consumed since open or the last rewind.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Next envelope without pacing. `None` at end of file.
    ///
    /// A line that is not a valid envelope is an error; the source stays
    /// usable and the next call continues with the following line.
    pub fn next_immediate(&mut self) -> Result<Option<Envelope>> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.lines_read += 1;

            let text = match std::str::from_utf8(&self.line) {
                Ok(text) => text.trim(),
                Err(e) => {
                    return Err(Error::decode(
                        "replay",
                        format!("line {}: {}", self.lines_read, e),
                    ));
                }
            };
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text).map(Some).map_err(|e| {
                Error::decode("replay", format!("line {}: {}", self.lines_read, e))
            });
        }
    }

    /// Next envelope, blocking to match recorded timing.
    ///
    /// The wait ends early once `running` is cleared.
    pub fn next_paced(&mut self, running: &AtomicBool) -> Result<Option<Envelope>> {
        let envelope = self.next_immediate()?;
        if self.playback_speed > 0.0
            && let Some(time_ms) = envelope.as_ref().and_then(|e| e.timestamp_ms)
        {
            self.wait_for_timing(time_ms, running);
        }
        Ok(envelope)
    }

    fn wait_for_timing(&mut self, msg_time_ms: u64, running: &AtomicBool) {
        let (Some(start), Some(first)) = (self.playback_start, self.first_msg_time_ms) else {
            self.playback_start = Some(Instant::now());
            self.first_msg_time_ms = Some(msg_time_ms);
            return;
        };

        let offset_ms = msg_time_ms.saturating_sub(first);
        let secs = offset_ms as f64 / 1000.0 / self.playback_speed;
        let Ok(target) = Duration::try_from_secs_f64(secs) else {
            log::warn!("Recorded offset of {} ms is out of range, not pacing", offset_ms);
            return;
        };

        while running.load(Ordering::Relaxed) {
            let elapsed = start.elapsed();
            if elapsed >= target {
                break;
            }
            std::thread::sleep((target - elapsed).min(PACING_STEP));
        }
    }

    /// Back to the first line.
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.playback_start = None;
        self.first_msg_time_ms = None;
        self.lines_read = 0;
        Ok(())
    }
}

/// Counters from one [`play`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Envelopes handed to the bridge
    pub delivered: u64,
    /// Lines or messages dropped
    pub dropped: u64,
    /// Completed passes over the file
    pub passes: u64,
}

/// Feed a recording into the bridge until it ends (or, when looping,
/// until `running` is cleared).
pub fn play(
    source: &mut ReplaySource,
    bridge: &Bridge,
    running: &AtomicBool,
    loop_playback: bool,
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    while running.load(Ordering::Relaxed) {
        match source.next_paced(running) {
            Ok(Some(envelope)) => {
                stats.delivered += 1;
                if bridge.handle_envelope(envelope).is_err() {
                    stats.dropped += 1;
                }
            }
            Ok(None) => {
                stats.passes += 1;
                if !loop_playback {
                    break;
                }
                log::info!("Recording finished, looping");
                source.rewind()?;
            }
            Err(Error::Decode { topic, reason }) => {
                stats.dropped += 1;
                bridge.metrics().decode_errors.fetch_add(1, Ordering::Relaxed);
                log::warn!("Skipping {} input: {}", topic, reason);
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "Replay done: {} delivered, {} dropped, {} passes",
        stats.delivered,
        stats.dropped,
        stats.passes
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_lines_and_skips_blanks() {
        let file = recording(&[
            r#"{"topic":"a","payload":1}"#,
            "",
            r#"{"topic":"b","payload":{"x":1},"timestamp_ms":5}"#,
        ]);
        let mut source = ReplaySource::open(file.path()).unwrap();

        assert_eq!(source.next_immediate().unwrap().unwrap().topic, "a");
        let b = source.next_immediate().unwrap().unwrap();
        assert_eq!(b.topic, "b");
        assert_eq!(b.timestamp_ms, Some(5));
        assert!(source.next_immediate().unwrap().is_none());
        assert_eq!(source.lines_read(), 3);
    }

    #[test]
    fn test_bad_line_does_not_stop_reading() {
        let file = recording(&["garbage", r#"{"topic":"a","payload":null}"#]);
        let mut source = ReplaySource::open(file.path()).unwrap();

        match source.next_immediate() {
            Err(Error::Decode { reason, .. }) => assert!(reason.starts_with("line 1")),
            other => panic!("expected decode error, got {:?}", other),
        }
        assert_eq!(source.next_immediate().unwrap().unwrap().topic, "a");
    }

    #[test]
    fn test_rewind() {
        let file = recording(&[r#"{"topic":"a","payload":1}"#]);
        let mut source = ReplaySource::open(file.path()).unwrap();
        source.next_immediate().unwrap();
        assert!(source.next_immediate().unwrap().is_none());

        source.rewind().unwrap();
        assert_eq!(source.lines_read(), 0);
        assert_eq!(source.next_immediate().unwrap().unwrap().topic, "a");
    }

    #[test]
    fn test_pacing_follows_timestamps() {
        let file = recording(&[
            r#"{"topic":"a","payload":1,"timestamp_ms":1000}"#,
            r#"{"topic":"a","payload":2,"timestamp_ms":1200}"#,
        ]);
        let mut source = ReplaySource::open(file.path()).unwrap();
        source.set_speed(2.0);

        let running = AtomicBool::new(true);
        let start = Instant::now();
        source.next_paced(&running).unwrap();
        source.next_paced(&running).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_tiny_speed_is_raised_and_wait_stops_with_flag() {
        let file = recording(&[
            r#"{"topic":"a","payload":1,"timestamp_ms":0}"#,
            r#"{"topic":"a","payload":2,"timestamp_ms":1000}"#,
        ]);
        let mut source = ReplaySource::open(file.path()).unwrap();
        source.set_speed(1e-300);
        assert_eq!(source.speed(), MIN_PLAYBACK_SPEED);

        // 1 s recorded at the minimum speed is a 100 s wait.
        let running = AtomicBool::new(true);
        source.next_paced(&running).unwrap();
        running.store(false, Ordering::Relaxed);

        let start = Instant::now();
        let second = source.next_paced(&running).unwrap().unwrap();
        assert_eq!(second.payload, serde_json::json!(2));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_utf8_line_is_a_decode_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"topic\":\"a\",\"payload\":\"\xff\xfe\"}\n").unwrap();
        writeln!(file, r#"{{"topic":"b","payload":null}}"#).unwrap();
        file.flush().unwrap();
        let mut source = ReplaySource::open(file.path()).unwrap();

        match source.next_immediate() {
            Err(Error::Decode { reason, .. }) => assert!(reason.starts_with("line 1")),
            other => panic!("expected decode error, got {:?}", other),
        }
        assert_eq!(source.next_immediate().unwrap().unwrap().topic, "b");
    }

    #[test]
    fn test_invalid_speed_disables_pacing() {
        let file = recording(&[]);
        let mut source = ReplaySource::open(file.path()).unwrap();
        source.set_speed(-1.0);
        assert_eq!(source.speed(), 0.0);
        source.set_speed(f64::NAN);
        assert_eq!(source.speed(), 0.0);
    }

    #[test]
    fn test_missing_file() {
        assert!(ReplaySource::open("/nonexistent/session.jsonl").is_err());
    }
}
