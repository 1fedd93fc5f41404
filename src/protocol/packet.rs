use crate::error::Result;
use crate::io::{BufMutExt, ProtocolEncode};
use crate::protocol::Capabilities;

/// The largest payload that fits in a single frame. Larger payloads are
/// split across continuation frames.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_packets.html>
/// <https://mariadb.com/kb/en/library/0-packet/#standard-packet>
pub(crate) const MAX_PAYLOAD: usize = 0xff_ff_ff;

/// Wraps a message payload with the packet framing: a 3-byte little-endian
/// length and a 1-byte sequence id per frame.
pub(crate) struct Packet<T>(pub(crate) T);

impl<T> Packet<T>
where
    T: ProtocolEncode<Capabilities>,
{
    pub(crate) fn write(
        &self,
        buf: &mut Vec<u8>,
        capabilities: Capabilities,
        sequence_id: &mut u8,
    ) -> Result<()> {
        // reserve room for the header and encode the payload behind it;
        // the real length is written once it is known
        let header_offset = buf.len();
        buf.extend_from_slice(&[0_u8; 4]);

        self.0.encode_with(buf, capabilities)?;

        let len = buf.len() - header_offset - 4;

        if len < MAX_PAYLOAD {
            let header = &mut buf[header_offset..];
            header[..3].copy_from_slice(&(len as u32).to_le_bytes()[..3]);
            header[3] = *sequence_id;

            *sequence_id = sequence_id.wrapping_add(1);

            return Ok(());
        }

        // the payload does not fit in one frame; pull it back out and
        // re-emit it as a run of full frames closed by a short (possibly
        // empty) one
        let payload = buf.split_off(header_offset + 4);
        buf.truncate(header_offset);

        for chunk in payload.chunks(MAX_PAYLOAD) {
            buf.put_u24_le(chunk.len() as u32);
            buf.push(*sequence_id);
            buf.extend_from_slice(chunk);

            *sequence_id = sequence_id.wrapping_add(1);
        }

        if payload.len() % MAX_PAYLOAD == 0 {
            // an exact multiple needs an empty frame to terminate the run
            buf.put_u24_le(0);
            buf.push(*sequence_id);

            *sequence_id = sequence_id.wrapping_add(1);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Packet, MAX_PAYLOAD};
    use crate::error::Result;
    use crate::io::ProtocolEncode;
    use crate::protocol::Capabilities;

    struct Raw(Vec<u8>);

    impl ProtocolEncode<Capabilities> for Raw {
        fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
            buf.extend_from_slice(&self.0);
            Ok(())
        }
    }

    #[test]
    fn writes_single_frame() {
        let mut buf = Vec::new();
        let mut sequence_id = 3;

        Packet(Raw(b"\x03SELECT 1".to_vec()))
            .write(&mut buf, Capabilities::empty(), &mut sequence_id)
            .unwrap();

        assert_eq!(&buf[..4], b"\x0a\x00\x00\x03");
        assert_eq!(&buf[4..], b"\x03SELECT 1");
        assert_eq!(sequence_id, 4);
    }

    #[test]
    fn splits_oversized_payload() {
        let mut buf = Vec::new();
        let mut sequence_id = 0;

        Packet(Raw(vec![0xab; MAX_PAYLOAD + 10]))
            .write(&mut buf, Capabilities::empty(), &mut sequence_id)
            .unwrap();

        // frame 1: full
        assert_eq!(&buf[..4], b"\xff\xff\xff\x00");

        // frame 2: the 10-byte remainder
        let tail = &buf[4 + MAX_PAYLOAD..];
        assert_eq!(&tail[..4], b"\x0a\x00\x00\x01");
        assert_eq!(tail.len(), 4 + 10);
        assert_eq!(sequence_id, 2);
    }

    #[test]
    fn exact_multiple_gets_empty_terminator() {
        let mut buf = Vec::new();
        let mut sequence_id = 0;

        Packet(Raw(vec![0; MAX_PAYLOAD]))
            .write(&mut buf, Capabilities::empty(), &mut sequence_id)
            .unwrap();

        let tail = &buf[4 + MAX_PAYLOAD..];
        assert_eq!(tail, b"\x00\x00\x00\x01");
        assert_eq!(sequence_id, 2);
    }
}
