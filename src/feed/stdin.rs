//! JSON-lines source: one `{"layer", "magnitudes", "frequencies"?}` object per
//! line on standard input. Objects carrying a `command` key are chart
//! commands instead, e.g. `{"command": "removeSpectrum", "id": "ref"}`.

use super::{FeedFrame, FeedMessage, FeedSender};
use crate::chart::command::ChartCommand;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::io::{self, BufRead};
use tracing::{info, warn};

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<FeedMessage>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line).context("malformed feed line")?;
    if value.get("command").is_some() {
        let command: ChartCommand =
            serde_json::from_value(value).context("malformed chart command")?;
        return Ok(Some(FeedMessage::Command(command)));
    }

    let frame: FeedFrame = serde_json::from_value(value).context("malformed feed frame")?;
    if frame.layer.is_empty() {
        bail!("feed frame has an empty layer id");
    }
    Ok(Some(FeedMessage::Frame(frame)))
}

pub(super) fn run(mut sender: FeedSender) {
    let stdin = io::stdin();
    let mut frames = 0usize;

    for (index, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("[feed] failed to read stdin: {err}");
                break;
            }
        };

        match parse_line(&line) {
            Ok(Some(FeedMessage::Frame(frame))) => {
                frames += 1;
                if !sender.publish(frame) {
                    return;
                }
            }
            Ok(Some(FeedMessage::Command(command))) => {
                if !sender.command(command) {
                    return;
                }
            }
            Ok(None) => {}
            Err(err) => warn!("[feed] line {}: {err:#}", index + 1),
        }
    }

    info!("[feed] stdin closed after {frames} frames");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(line: &str) -> FeedFrame {
        match parse_line(line).expect("valid line") {
            Some(FeedMessage::Frame(frame)) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn parses_frames_with_and_without_frequencies() {
        let frame_a = frame(r#"{"layer":"main","magnitudes":[-10,-20.5]}"#);
        assert_eq!(frame_a.layer, "main");
        assert_eq!(frame_a.magnitudes, vec![-10.0, -20.5]);
        assert!(frame_a.frequencies.is_none());

        let frame_b = frame(r#"{"layer":"b","magnitudes":[1],"frequencies":[100]}"#);
        assert_eq!(frame_b.frequencies, Some(vec![100.0]));
    }

    #[test]
    fn command_lines_become_chart_commands() {
        let message = parse_line(r#"{"command":"removeSpectrum","id":"ref"}"#).expect("valid");
        assert!(matches!(
            message,
            Some(FeedMessage::Command(ChartCommand::RemoveSpectrum { ref id })) if id == "ref"
        ));

        let message = parse_line(r#"{"command":"setDecayTime","value":250}"#).expect("valid");
        assert!(matches!(
            message,
            Some(FeedMessage::Command(ChartCommand::SetDecayTime { value })) if value == 250.0
        ));

        let err = parse_line(r#"{"command":"setMinDb"}"#).expect_err("missing value");
        assert!(format!("{err:#}").contains("malformed chart command"));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("   ").expect("blank").is_none());
        assert!(parse_line("# header").expect("comment").is_none());
    }

    #[test]
    fn reports_malformed_lines() {
        let err = parse_line("{not json").expect_err("malformed");
        assert!(format!("{err:#}").contains("malformed feed line"));
        assert!(parse_line(r#"{"layer":"","magnitudes":[]}"#).is_err());
        assert!(parse_line(r#"{"magnitudes":[1]}"#).is_err());
    }
}
