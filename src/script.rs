// Event scripts - JSON Lines of TransportEvent, used to replay sessions
//
//   # comment
//   {"event":"start"}
//   {"event":"locate","target":48000,"with_roll":true}

use std::path::Path;

use crate::error::TransportError;
use crate::transport::TransportEvent;

pub fn parse_script(input: &str) -> Result<Vec<TransportEvent>, TransportError> {
    let mut events = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line).map_err(|source| TransportError::Script {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Vec<TransportEvent>, TransportError> {
    let input = std::fs::read_to_string(path)?;
    parse_script(&input)
}

/// Inverse of [`parse_script`]
pub fn render_script(events: &[TransportEvent]) -> Result<String, TransportError> {
    let mut out = String::new();
    for (index, event) in events.iter().enumerate() {
        let line = serde_json::to_string(event).map_err(|source| TransportError::Script {
            line: index + 1,
            source,
        })?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}
