use bytes::{Buf, BytesMut};
use std::io::Cursor;
use std::mem::size_of;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use super::{FrameError, Message};

/// Largest encoded message accepted in either direction. Canvas frames dominate this.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

type LenPrefix = u32;

pub fn from_socket(socket: TcpStream) -> (ConnectionTx, ConnectionRx) {
    let (read_stream, write_stream) = socket.into_split();
    from_split(read_stream, write_stream)
}

/// Build a framed connection over any pair of byte streams.
pub fn from_split<R, W>(read_stream: R, write_stream: W) -> (ConnectionTx<W>, ConnectionRx<R>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (
        ConnectionTx {
            write_stream: BufWriter::new(write_stream),
        },
        ConnectionRx {
            read_stream,
            buffer: BytesMut::with_capacity(64),
        },
    )
}

#[derive(Debug)]
pub struct ConnectionTx<W = OwnedWriteHalf> {
    write_stream: BufWriter<W>,
}

pub struct ConnectionRx<R = OwnedReadHalf> {
    read_stream: R,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> ConnectionTx<W> {
    pub async fn write_frame(&mut self, frame: Message) -> Result<(), FrameError> {
        let bytes = bincode::serialize(&frame)?;
        if bytes.len() > MAX_FRAME_LEN {
            return Err(FrameError::FrameLength);
        }
        let len = LenPrefix::try_from(bytes.len()).map_err(|_| FrameError::FrameLength)?;
        self.write_stream.write_all(&len.to_be_bytes()).await?;
        self.write_stream.write_all(&bytes).await?;
        self.write_stream.flush().await?;
        Ok(())
    }
}

impl<R: AsyncRead + Unpin> ConnectionRx<R> {
    pub async fn read_frame(&mut self) -> Result<Option<Message>, FrameError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if self.read_stream.read_buf(&mut self.buffer).await? == 0 {
                if self.buffer.is_empty() {
                    // Remote closed Connection
                    return Ok(None);
                } else {
                    // Connection closed while still sending data
                    return Err(FrameError::ConnectionReset);
                }
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Message>, FrameError> {
        if self.buffer.len() < size_of::<LenPrefix>() {
            return Ok(None);
        }

        // Use a Cursor to avoid advancing the internal cursor of self.buffer
        let mut buf = Cursor::new(&self.buffer[..]);
        let message_len = buf.get_u32() as usize;
        if message_len > MAX_FRAME_LEN {
            tracing::debug!("Rejecting {message_len} byte frame");
            return Err(FrameError::FrameLength);
        }

        // Check if the buffer contains the full message yet
        if self.buffer.remaining() < message_len + size_of::<LenPrefix>() {
            return Ok(None);
        }

        // Consume the frame from the buffer and deserialize a message
        self.buffer.advance(size_of::<LenPrefix>());
        let message = bincode::deserialize::<Message>(&self.buffer[..message_len]);
        self.buffer.advance(message_len);

        Ok(Some(message?))
    }
}
