use crate::error::Result;

/// A client message that can be written to a packet payload, given a
/// serialization context (normally the negotiated
/// [`Capabilities`](crate::protocol::Capabilities)).
///
/// Encoding a message never performs I/O; the packet framer decides how
/// the payload is chunked onto the wire.
pub(crate) trait ProtocolEncode<Context = ()> {
    fn encode_with(&self, buf: &mut Vec<u8>, context: Context) -> Result<()>;
}

impl<Context, T: ProtocolEncode<Context>> ProtocolEncode<Context> for &T {
    fn encode_with(&self, buf: &mut Vec<u8>, context: Context) -> Result<()> {
        (**self).encode_with(buf, context)
    }
}
