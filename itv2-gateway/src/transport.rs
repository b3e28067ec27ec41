//! Delimiter-bounded packet I/O over a duplex byte pipe.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use itv2_proto::stuffing;

use crate::errors::GatewayError;

/// Reads `0x7F`-terminated packets out of a byte stream.
///
/// Bytes are buffered until a terminator is observed; the packet is then
/// sliced through it (inclusive) and returned raw, still stuffed and
/// possibly encrypted. EOF surfaces as [`GatewayError::Disconnected`].
pub struct PacketReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    /// Wrap the read half of a connection.
    pub fn new(inner: R) -> Self {
        Self { inner, buf: Vec::with_capacity(512) }
    }

    /// Block until one complete packet is available.
    pub async fn read_packet(&mut self) -> Result<Vec<u8>, GatewayError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == stuffing::TAIL) {
                let packet: Vec<u8> = self.buf.drain(..=pos).collect();
                return Ok(packet);
            }

            let mut chunk = [0u8; 1024];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Err(GatewayError::Disconnected);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Writes packets to a byte stream, one buffer write per packet.
pub struct PacketWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> PacketWriter<W> {
    /// Wrap the write half of a connection.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one complete packet.
    pub async fn write_packet(&mut self, packet: &[u8]) -> Result<(), GatewayError> {
        self.inner.write_all(packet).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_splits_on_the_terminator() {
        let (client, server) = tokio::io::duplex(256);
        let mut reader = PacketReader::new(server);
        let mut writer = PacketWriter::new(client);

        // two packets in one write
        writer.write_packet(&[0x7E, 0x01, 0x7F, 0x7E, 0x02, 0x7F]).await.unwrap();

        assert_eq!(reader.read_packet().await.unwrap(), [0x7E, 0x01, 0x7F]);
        assert_eq!(reader.read_packet().await.unwrap(), [0x7E, 0x02, 0x7F]);
    }

    #[tokio::test]
    async fn reader_reassembles_split_packets() {
        let (client, server) = tokio::io::duplex(256);
        let mut reader = PacketReader::new(server);
        let (mut tx, _keep) = (client, ());

        tokio::spawn(async move {
            tx.write_all(&[0x7E, 0xAA]).await.unwrap();
            tokio::task::yield_now().await;
            tx.write_all(&[0xBB, 0x7F]).await.unwrap();
            // hold the writer open until the reader is done
            std::future::pending::<()>().await;
        });

        assert_eq!(reader.read_packet().await.unwrap(), [0x7E, 0xAA, 0xBB, 0x7F]);
    }

    #[tokio::test]
    async fn eof_is_disconnected() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut reader = PacketReader::new(server);
        assert!(matches!(
            reader.read_packet().await,
            Err(GatewayError::Disconnected)
        ));
    }
}
