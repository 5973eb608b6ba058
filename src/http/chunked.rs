//! Decoding of `Transfer-Encoding: chunked` bodies.
//!
//! Both sides of the proxy need it: clients may upload chunked request
//! bodies, and backends frequently stream chunked responses. The server
//! always re-frames decoded bodies with `Content-Length`.

#[derive(Debug, PartialEq, Eq)]
pub enum ChunkError {
    /// The chunk size line is not valid hexadecimal, or the size does not
    /// fit in memory.
    InvalidSize,
    /// A chunk's data is not followed by CRLF.
    MissingTerminator,
}

/// Resumable chunked decoder.
///
/// Feed it the same growing buffer after every read. Complete chunks are
/// consumed once; a call only rescans the chunk that is still arriving.
#[derive(Debug, Default)]
pub struct Decoder {
    pos: usize,
    body: Vec<u8>,
    in_trailers: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues decoding `buf`, which must start with the bytes fed in
    /// earlier calls.
    ///
    /// Returns `Ok(None)` when more bytes are needed, otherwise the number
    /// of bytes the body occupied, trailers included.
    pub fn feed(&mut self, buf: &[u8]) -> Result<Option<usize>, ChunkError> {
        loop {
            let Some(line_end) = find_crlf(&buf[self.pos..]) else {
                return Ok(None);
            };

            if self.in_trailers {
                // trailer section ends with an empty line
                self.pos += line_end + 2;
                if line_end == 0 {
                    return Ok(Some(self.pos));
                }
                continue;
            }

            let size = parse_size(&buf[self.pos..self.pos + line_end])?;
            let data_start = self.pos + line_end + 2;

            if size == 0 {
                self.pos = data_start;
                self.in_trailers = true;
                continue;
            }

            let data_end = data_start
                .checked_add(size)
                .ok_or(ChunkError::InvalidSize)?;
            let chunk_end = data_end.checked_add(2).ok_or(ChunkError::InvalidSize)?;

            if buf.len() < chunk_end {
                return Ok(None);
            }
            if &buf[data_end..chunk_end] != b"\r\n" {
                return Err(ChunkError::MissingTerminator);
            }

            self.body.extend_from_slice(&buf[data_start..data_end]);
            self.pos = chunk_end;
        }
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Decodes a chunked body at the start of `buf` in one go.
///
/// Returns `Ok(None)` when more bytes are needed, otherwise the decoded body
/// and the number of bytes consumed, trailers included.
pub fn decode(buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, ChunkError> {
    let mut decoder = Decoder::new();
    Ok(decoder
        .feed(buf)?
        .map(|consumed| (decoder.into_body(), consumed)))
}

fn parse_size(line: &[u8]) -> Result<usize, ChunkError> {
    let line = std::str::from_utf8(line).map_err(|_| ChunkError::InvalidSize)?;
    // chunk extensions follow ';'
    let size = line.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size, 16).map_err(|_| ChunkError::InvalidSize)
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
