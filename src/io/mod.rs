mod buf;
mod buf_mut;
mod buf_stream;
mod decode;
mod encode;

pub(crate) use buf::BufExt;
pub(crate) use buf_mut::BufMutExt;
pub(crate) use buf_stream::{BufStream, Transport};
pub(crate) use decode::ProtocolDecode;
pub(crate) use encode::ProtocolEncode;
