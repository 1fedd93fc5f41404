use bytes::{Buf, Bytes, BytesMut};

use crate::error::Result;
use crate::io::{BufStream, ProtocolEncode, Transport};
use crate::protocol::packet::{Packet, MAX_PAYLOAD};
use crate::protocol::Capabilities;

/// The buffered transport plus the framing state that rides on it: the
/// negotiated capabilities and the sequence id of the current exchange.
///
/// Sequence ids run from 0 at each client command, increment with every
/// frame in either direction, and are verified on receipt; a packet
/// arriving out of order is a framing fault and the connection cannot be
/// trusted afterwards.
pub(crate) struct MySqlStream {
    socket: BufStream,
    pub(crate) capabilities: Capabilities,
    pub(crate) sequence_id: u8,
}

impl MySqlStream {
    pub(crate) fn new(socket: Box<dyn Transport>, capabilities: Capabilities) -> Self {
        Self {
            socket: BufStream::new(socket),
            capabilities,
            sequence_id: 0,
        }
    }

    pub(crate) fn write_buffer_is_empty(&self) -> bool {
        self.socket.write_buffer().is_empty()
    }

    /// Queues a packet continuing the current exchange (handshake
    /// responses, auth continuations).
    pub(crate) fn write_packet<T>(&mut self, payload: &T) -> Result<()>
    where
        T: ProtocolEncode<Capabilities>,
    {
        Packet(payload).write(
            self.socket.write_buffer_mut(),
            self.capabilities,
            &mut self.sequence_id,
        )
    }

    /// Sends a packet opening a new command: the sequence id restarts
    /// at 0 and the write buffer is flushed.
    pub(crate) async fn send_packet<T>(&mut self, payload: &T) -> Result<()>
    where
        T: ProtocolEncode<Capabilities>,
    {
        self.sequence_id = 0;
        self.write_packet(payload)?;
        self.flush().await
    }

    pub(crate) async fn flush(&mut self) -> Result<()> {
        self.socket.flush().await
    }

    async fn recv_frame(&mut self) -> Result<Bytes> {
        let mut header = self.socket.read(4).await?;

        #[allow(clippy::cast_possible_truncation)]
        let len = header.get_uint_le(3) as usize;
        let sequence_id = header.get_u8();

        if sequence_id != self.sequence_id {
            return Err(err_packet!(
                "packets out of order: expected sequence id {}, received {}",
                self.sequence_id,
                sequence_id
            ));
        }

        self.sequence_id = self.sequence_id.wrapping_add(1);

        self.socket.read(len).await
    }

    /// Receives the next packet, joining continuation frames into one
    /// payload.
    pub(crate) async fn recv_packet(&mut self) -> Result<Bytes> {
        let payload = self.recv_frame().await?;

        if payload.len() < MAX_PAYLOAD {
            log::trace!("read packet ({} bytes)", payload.len());

            return Ok(payload);
        }

        let mut joined = BytesMut::from(&payload[..]);

        loop {
            let part = self.recv_frame().await?;
            let finished = part.len() < MAX_PAYLOAD;

            joined.extend_from_slice(&part);

            if finished {
                break;
            }
        }

        log::trace!("read split packet ({} bytes)", joined.len());

        Ok(joined.freeze())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<()> {
        self.socket.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncWriteExt};

    use super::MySqlStream;
    use crate::error::{Error, Result};
    use crate::io::ProtocolEncode;
    use crate::protocol::packet::MAX_PAYLOAD;
    use crate::protocol::Capabilities;

    struct Raw(Vec<u8>);

    impl ProtocolEncode<Capabilities> for Raw {
        fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
            buf.extend_from_slice(&self.0);
            Ok(())
        }
    }

    fn pair(buffer: usize) -> (MySqlStream, MySqlStream) {
        let (a, b) = duplex(buffer);

        (
            MySqlStream::new(Box::new(a), Capabilities::empty()),
            MySqlStream::new(Box::new(b), Capabilities::empty()),
        )
    }

    #[tokio::test]
    async fn packet_round_trip() {
        let (mut client, mut server) = pair(1 << 16);

        client.send_packet(&Raw(b"hello".to_vec())).await.unwrap();

        let payload = server.recv_packet().await.unwrap();

        assert_eq!(&payload[..], b"hello");
        assert_eq!(client.sequence_id, 1);
        assert_eq!(server.sequence_id, 1);
    }

    #[tokio::test]
    async fn continuation_frames_round_trip() {
        // a small pipe so the writer and reader must interleave
        let (mut client, mut server) = pair(1 << 16);

        let payload = vec![0x5a_u8; MAX_PAYLOAD * 2 + 5];
        let expected = payload.clone();

        let writer = tokio::spawn(async move {
            client.send_packet(&Raw(payload)).await.unwrap();
            client
        });

        let received = server.recv_packet().await.unwrap();

        assert_eq!(received.len(), expected.len());
        assert_eq!(&received[..], &expected[..]);

        // three frames in, three frames out
        let client = writer.await.unwrap();
        assert_eq!(client.sequence_id, 3);
        assert_eq!(server.sequence_id, 3);
    }

    #[tokio::test]
    async fn exact_multiple_payload_round_trips() {
        let (mut client, mut server) = pair(1 << 16);

        let payload = vec![0_u8; MAX_PAYLOAD];
        let expected_len = payload.len();

        let writer = tokio::spawn(async move {
            client.send_packet(&Raw(payload)).await.unwrap();
        });

        let received = server.recv_packet().await.unwrap();

        assert_eq!(received.len(), expected_len);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn out_of_order_sequence_id_is_fatal() {
        let (a, b) = duplex(64);
        let mut a = a;

        // length 1, sequence id 5 while 0 is expected
        a.write_all(b"\x01\x00\x00\x05\x00").await.unwrap();

        let mut server = MySqlStream::new(Box::new(b), Capabilities::empty());

        assert!(matches!(
            server.recv_packet().await,
            Err(Error::InvalidPacket(_))
        ));
    }
}
