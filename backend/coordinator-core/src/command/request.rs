use crate::error::command::CommandError;

/// One "close N" command read off a command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionRequest {
    count: usize,
}

impl EvictionRequest {
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    /// Parse a single command line. A trailing `\n` or `\r\n` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Malformed`] for anything but a non-negative base-10 integer.
    #[track_caller]
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        line.parse::<usize>()
            .map(Self::new)
            .map_err(|e| CommandError::malformed(line, e.to_string()))
    }

    /// Parse raw bytes off the wire; invalid UTF-8 is malformed input.
    #[track_caller]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommandError> {
        match std::str::from_utf8(bytes) {
            Ok(line) => Self::parse(line),
            Err(e) => Err(CommandError::malformed(
                String::from_utf8_lossy(bytes),
                e.to_string(),
            )),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Response line for this request. Echoes the requested count, not the
    /// number of connections actually closed.
    pub fn acknowledgement(&self) -> String {
        format!("Closing {} WS connections\n", self.count)
    }
}
