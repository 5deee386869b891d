//! Wire envelope of distributed commands.
//!
//! A message is one JSON object `{"command": <name>, "data": {...}}`. The
//! socket transport frames messages as JSON lines.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::DispatchError;
use crate::payload::{Mapping, normalize_object};

/// Outbound distributed command, built by publishers.
///
/// # Examples
///
/// ```rust
/// use courier::NetCommand;
///
/// let line = NetCommand::new("addscore")
///     .with_field("player", "Alice")
///     .with_field("amount", 5)
///     .to_line()
///     .expect("serialise command");
/// assert!(line.ends_with('\n'));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetCommand {
    command: String,
    data: Map<String, Value>,
}

impl NetCommand {
    /// Starts a command with an empty `data` object.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            data: Map::new(),
        }
    }

    /// Adds or replaces one `data` field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Command name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Serialises the envelope as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialize`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DispatchError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Serialises the envelope as one newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialize`] if encoding fails.
    pub fn to_line(&self) -> Result<String, DispatchError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Inbound command decoded from a raw payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InboundCommand {
    pub(crate) command: String,
    pub(crate) data: Mapping,
}

impl InboundCommand {
    /// Decodes and normalises a raw payload.
    ///
    /// `max_size` bounds the body without surrounding whitespace, so a framed
    /// line and the same bytes published raw share one limit.
    pub(crate) fn parse(payload: &[u8], max_size: usize) -> Result<Self, DispatchError> {
        let trimmed = payload.trim_ascii();
        if trimmed.len() > max_size {
            return Err(DispatchError::payload_too_large(trimmed.len(), max_size));
        }
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("payload is empty"));
        }

        let value: Value = serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)?;
        let Value::Object(mut envelope) = value else {
            return Err(DispatchError::invalid_structure("payload is not a JSON object"));
        };
        let command = match envelope.remove("command") {
            Some(Value::String(command)) => command,
            Some(_) => return Err(DispatchError::invalid_structure("'command' is not a string")),
            None => return Err(DispatchError::invalid_structure("missing 'command' field")),
        };
        if command.trim().is_empty() {
            return Err(DispatchError::invalid_structure("'command' is blank"));
        }
        let data = match envelope.get("data") {
            Some(Value::Object(data)) => normalize_object(data),
            Some(_) => return Err(DispatchError::invalid_structure("'data' is not an object")),
            None => return Err(DispatchError::invalid_structure("missing 'data' field")),
        };

        Ok(Self {
            command: command.trim().to_owned(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::payload::NormalizedValue;

    const LIMIT: usize = 1024;

    #[test]
    fn parses_and_normalises_the_envelope() {
        let inbound = InboundCommand::parse(
            b"{\"command\":\"addscore\",\"data\":{\"player\":\"Alice\",\"amount\":5}}\n",
            LIMIT,
        )
        .expect("parse");
        assert_eq!(inbound.command, "addscore");
        assert_eq!(inbound.data.get("player").and_then(NormalizedValue::as_str), Some("Alice"));
        assert_eq!(inbound.data.get("amount").and_then(NormalizedValue::as_i64), Some(5));
    }

    #[test]
    fn builder_output_parses_back() {
        let line = NetCommand::new("addscore")
            .with_field("player", "Alice")
            .with_field("tags", vec!["a", "b"])
            .to_line()
            .expect("serialise");
        let inbound = InboundCommand::parse(line.as_bytes(), LIMIT).expect("parse");
        assert_eq!(inbound.command, "addscore");
        assert_eq!(
            inbound
                .data
                .get("tags")
                .and_then(NormalizedValue::as_sequence)
                .map(<[NormalizedValue]>::len),
            Some(2)
        );
    }

    #[rstest]
    #[case::empty(b"   \n".as_slice())]
    #[case::not_json(b"{not json".as_slice())]
    #[case::not_object(b"[1,2]".as_slice())]
    #[case::missing_command(b"{\"data\":{}}".as_slice())]
    #[case::numeric_command(b"{\"command\":7,\"data\":{}}".as_slice())]
    #[case::blank_command(b"{\"command\":\"  \",\"data\":{}}".as_slice())]
    #[case::missing_data(b"{\"command\":\"x\"}".as_slice())]
    #[case::array_data(b"{\"command\":\"x\",\"data\":[]}".as_slice())]
    fn rejects_malformed_payloads(#[case] payload: &[u8]) {
        let error = InboundCommand::parse(payload, LIMIT).expect_err("should reject");
        assert!(error.is_parse_fault(), "unexpected error: {error}");
    }

    #[test]
    fn enforces_size_limit() {
        let payload = b"{\"command\":\"x\",\"data\":{}}";
        let error = InboundCommand::parse(payload, 8).expect_err("too large");
        assert!(matches!(
            error,
            DispatchError::PayloadTooLarge { size, max_size: 8 } if size == payload.len()
        ));
    }

    #[test]
    fn body_at_the_limit_is_accepted_with_or_without_a_newline() {
        let body = b"{\"command\":\"x\",\"data\":{}}";
        let mut line = body.to_vec();
        line.extend_from_slice(b"\r\n");

        for payload in [body.as_slice(), line.as_slice()] {
            let inbound = InboundCommand::parse(payload, body.len()).expect("body fits exactly");
            assert_eq!(inbound.command, "x");
        }
        assert!(InboundCommand::parse(&line, body.len() - 1).is_err());
    }
}
