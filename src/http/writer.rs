//! Response serialisation for the client side of a connection.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

/// Encodes `resp` as an HTTP/1.1 message: status line, headers in order,
/// blank line, body.
pub fn serialize_response(resp: &Response) -> Bytes {
    let head_len: usize = resp
        .headers
        .iter()
        .map(|(k, v)| k.len() + v.len() + 4)
        .sum();
    let mut out = BytesMut::with_capacity(32 + head_len + resp.body.len());

    out.put_slice(b"HTTP/1.1 ");
    out.put_slice(resp.status.as_u16().to_string().as_bytes());
    out.put_u8(b' ');
    out.put_slice(resp.status.reason_phrase().as_bytes());
    out.put_slice(b"\r\n");

    for (name, value) in &resp.headers {
        out.put_slice(name.as_bytes());
        out.put_slice(b": ");
        out.put_slice(value.as_bytes());
        out.put_slice(b"\r\n");
    }
    out.put_slice(b"\r\n");
    out.put_slice(&resp.body);

    out.freeze()
}

/// An encoded response on its way to the socket. The buffer advances as
/// bytes are accepted, so an interrupted write resumes where it stopped.
pub struct ResponseWriter {
    pending: Bytes,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            pending: serialize_response(response),
        }
    }

    /// Bytes not yet written.
    pub fn remaining(&self) -> usize {
        self.pending.remaining()
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream.write_all_buf(&mut self.pending).await?;
        stream.flush().await?;
        Ok(())
    }
}
