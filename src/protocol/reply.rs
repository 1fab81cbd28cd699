use std::fmt;

/// Physical capacity of the outbound payload buffer.
pub const MAX_PAYLOAD: usize = 64;

/// Payload of one success frame. The declared length can never pass
/// the buffer capacity: `push` saturates instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    len: u8,
    bytes: [u8; MAX_PAYLOAD],
}

impl Payload {
    pub fn new() -> Payload {
        Payload {
            len: 0,
            bytes: [0; MAX_PAYLOAD],
        }
    }

    pub fn from_slice(data: &[u8]) -> Payload {
        let mut p = Payload::new();
        for &b in data {
            p.push(b);
        }
        p
    }

    pub fn push(&mut self, byte: u8) {
        if (self.len as usize) < MAX_PAYLOAD {
            self.bytes[self.len as usize] = byte;
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::new()
    }
}

/// How a success payload is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coding {
    /// Each payload byte becomes its decimal text, concatenated with
    /// no separators.
    Text,
    /// Payload bytes copied verbatim.
    Binary,
}

/// Protocol result codes. The numeric values are the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidCommand,
    NotImplemented,
    BusBusy,
    /// Reserved: the protocol has a slot for a second bus that is
    /// never selected by the current command set.
    InvalidBusId,
    InvalidAddress,
    Timeout,
    /// Informational, not an error: the handler printed its own
    /// content and the encoder emits a single space line.
    Help,
}

impl ErrorCode {
    pub fn code(self) -> u8 {
        match self {
            ErrorCode::InvalidCommand => 0x01,
            ErrorCode::NotImplemented => 0x02,
            ErrorCode::BusBusy => 0x03,
            ErrorCode::InvalidBusId => 0x20,
            ErrorCode::InvalidAddress => 0x30,
            ErrorCode::Timeout => 0x90,
            ErrorCode::Help => 0x99,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::InvalidCommand => "Invalid Command",
            ErrorCode::NotImplemented => "Command Not Implemented",
            ErrorCode::BusBusy => "DALI BUS Busy",
            ErrorCode::InvalidBusId => "Invalid BUS ID",
            ErrorCode::InvalidAddress => "Invalid DEV Address",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::Help => " ",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of one dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Encode an acknowledgment frame carrying `payload`.
    Success { payload: Payload, coding: Coding },
    /// Encode the fixed line for this code.
    Error(ErrorCode),
    /// The handler already wrote its own response; encode nothing.
    Deferred,
}

impl Reply {
    /// Acknowledgment with no payload.
    pub fn empty() -> Reply {
        Reply::Success {
            payload: Payload::new(),
            coding: Coding::Text,
        }
    }

    pub fn text(payload: Payload) -> Reply {
        Reply::Success {
            payload,
            coding: Coding::Text,
        }
    }
}

/// Encode an acknowledgment frame: `O`, the rendered payload, CRLF.
pub fn encode_success(payload: &Payload, coding: Coding) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() * 3 + 3);
    frame.push(b'O');
    match coding {
        Coding::Text => {
            for &b in payload.as_slice() {
                frame.extend_from_slice(b.to_string().as_bytes());
            }
        }
        Coding::Binary => frame.extend_from_slice(payload.as_slice()),
    }
    frame.extend_from_slice(b"\r\n");
    frame
}

/// Encode the single line reported for an error code.
pub fn encode_error(code: ErrorCode) -> Vec<u8> {
    match code {
        ErrorCode::Help => b" \r\n".to_vec(),
        _ => format!("E{:02X} - {}\r\n", code.code(), code.message()).into_bytes(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn text_coding_renders_decimal() {
        let payload = Payload::from_slice(&[65, 66, 67]);
        assert_eq!(encode_success(&payload, Coding::Text), b"O656667\r\n");
    }

    #[test]
    fn binary_coding_copies_verbatim() {
        let payload = Payload::from_slice(&[65, 66, 67]);
        assert_eq!(encode_success(&payload, Coding::Binary), b"OABC\r\n");
    }

    #[test]
    fn empty_payload_is_bare_ack() {
        assert_eq!(encode_success(&Payload::new(), Coding::Text), b"O\r\n");
    }

    #[test]
    fn error_lines() {
        assert_eq!(
            encode_error(ErrorCode::InvalidCommand),
            b"E01 - Invalid Command\r\n"
        );
        assert_eq!(
            encode_error(ErrorCode::NotImplemented),
            b"E02 - Command Not Implemented\r\n"
        );
        assert_eq!(encode_error(ErrorCode::BusBusy), b"E03 - DALI BUS Busy\r\n");
        assert_eq!(
            encode_error(ErrorCode::InvalidBusId),
            b"E20 - Invalid BUS ID\r\n"
        );
        assert_eq!(
            encode_error(ErrorCode::InvalidAddress),
            b"E30 - Invalid DEV Address\r\n"
        );
        assert_eq!(encode_error(ErrorCode::Timeout), b"E90 - Timeout\r\n");
    }

    #[test]
    fn help_is_a_space_line() {
        assert_eq!(encode_error(ErrorCode::Help), b" \r\n");
    }

    #[test]
    fn payload_saturates_at_capacity() {
        let mut p = Payload::new();
        for i in 0..100u8 {
            p.push(i);
        }
        assert_eq!(p.len(), MAX_PAYLOAD);
        assert_eq!(p.as_slice()[MAX_PAYLOAD - 1], 63);
    }
}
