//! QGC WPL text decoding
//!
//! ```text
//! QGC WPL 110
//! 0	1	0	16	0	0	0	0	47.397742	8.545594	488.0	1
//! ```

use super::command::{MissionCommand, MissionFrame};
use super::waypoint::{MissionList, Waypoint};
use crate::{GcsError, Result};

const HEADER: &str = "QGC WPL";
const FIELD_COUNT: usize = 12;

/// Decode WPL text; `origin` names the source in errors
///
/// Rows keep their explicit sequence numbers and must form a valid list.
pub fn parse(origin: &str, text: &str) -> Result<MissionList> {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.starts_with(HEADER) => {}
        _ => return Err(GcsError::malformed(origin, "missing QGC WPL header")),
    }

    let mut waypoints = Vec::new();
    for (index, line) in lines.enumerate() {
        let line_no = index + 2;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() != FIELD_COUNT {
            continue;
        }

        let mut values = [0.0f64; FIELD_COUNT];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field
                .trim()
                .parse::<f64>()
                .map_err(|_| GcsError::malformed(origin, format!("line {line_no}: '{field}' is not a number")))?;
        }
        waypoints.push(to_waypoint(origin, line_no, &values)?);
    }

    MissionList::new(waypoints)
}

fn to_waypoint(origin: &str, line_no: usize, v: &[f64; FIELD_COUNT]) -> Result<Waypoint> {
    let sequence = integer_field(origin, line_no, "sequence", v[0])?;
    let raw_frame = integer_field(origin, line_no, "frame", v[2])?;
    let raw_command = integer_field(origin, line_no, "command", v[3])?;
    let frame = u8::try_from(raw_frame)
        .ok()
        .and_then(MissionFrame::from_raw)
        .ok_or_else(|| GcsError::malformed(origin, format!("line {line_no}: unsupported frame {raw_frame}")))?;
    let command = u16::try_from(raw_command)
        .ok()
        .and_then(MissionCommand::from_raw)
        .ok_or_else(|| GcsError::malformed(origin, format!("line {line_no}: unsupported command {raw_command}")))?;
    let sequence = u32::try_from(sequence)
        .map_err(|_| GcsError::malformed(origin, format!("line {line_no}: sequence {sequence} out of range")))?;

    Ok(Waypoint {
        sequence,
        frame,
        command,
        is_current: v[1] as i64 != 0,
        auto_continue: v[11] as i64 != 0,
        params: [v[4], v[5], v[6], v[7]],
        latitude: v[8],
        longitude: v[9],
        altitude: v[10],
    })
}

/// Id columns must hold whole, non-negative numbers
fn integer_field(origin: &str, line_no: usize, name: &str, value: f64) -> Result<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(GcsError::malformed(origin, format!("line {line_no}: {name} {value} is not a whole number")));
    }
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mission_fixture;

    #[test]
    fn parses_fixture_and_skips_noise() {
        let text = std::fs::read_to_string(mission_fixture("simple.txt").unwrap()).unwrap();
        let mission = parse("simple.txt", &text).unwrap();
        assert_eq!(mission.len(), 4);

        let takeoff = &mission.items()[0];
        assert!(takeoff.is_current);
        assert_eq!(takeoff.command, MissionCommand::NavTakeoff);
        assert_eq!(takeoff.params[0], 15.0);
        assert_eq!(mission.items()[3].command, MissionCommand::NavReturnToLaunch);
    }

    #[test]
    fn missing_header_is_rejected() {
        let text = std::fs::read_to_string(mission_fixture("missing_header.txt").unwrap()).unwrap();
        assert!(matches!(parse("missing_header.txt", &text), Err(GcsError::MalformedSource { .. })));
        assert!(parse("empty.txt", "").is_err());
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let text = "QGC WPL 110\n0\t1\t3\t22\t15\t0\t0\t0\tnorth\t8.5\t20\t1\n";
        let err = parse("bad.txt", text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn sequence_gap_fails_validation() {
        let text = "QGC WPL 110\n0\t1\t3\t22\t15\t0\t0\t0\t47.3\t8.5\t20\t1\n2\t0\t3\t16\t0\t0\t0\t0\t47.4\t8.5\t20\t1\n";
        assert!(matches!(parse("gap.txt", text), Err(GcsError::MalformedSource { .. })));
    }

    #[test]
    fn fractional_frame_or_command_is_rejected() {
        let frame = "QGC WPL 110\n0\t1\t3.9\t22\t15\t0\t0\t0\t47.3\t8.5\t20\t1\n";
        let err = parse("frame.txt", frame).unwrap_err();
        assert!(matches!(err, GcsError::MalformedSource { .. }));
        assert!(err.to_string().contains("frame 3.9"));

        let command = "QGC WPL 110\n0\t1\t3\t16.5\t0\t0\t0\t0\t47.3\t8.5\t20\t1\n";
        assert!(matches!(parse("command.txt", command), Err(GcsError::MalformedSource { .. })));

        let negative = "QGC WPL 110\n-1\t1\t3\t16\t0\t0\t0\t0\t47.3\t8.5\t20\t1\n";
        assert!(matches!(parse("negative.txt", negative), Err(GcsError::MalformedSource { .. })));
    }
}
