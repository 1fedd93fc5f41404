use bytes::Bytes;

use crate::error::Result;

/// A packet payload that can be parsed, given a deserialization context.
///
/// The context is almost always [`Capabilities`](crate::protocol::Capabilities):
/// several packet shapes changed across protocol revisions and the
/// negotiated flags decide which form is on the wire.
pub(crate) trait ProtocolDecode<Context = ()>: Sized {
    fn decode_with(buf: Bytes, context: Context) -> Result<Self>;
}

#[allow(dead_code)]
pub(crate) fn decode<T: ProtocolDecode>(buf: Bytes) -> Result<T> {
    T::decode_with(buf, ())
}
