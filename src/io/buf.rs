use bytes::{Buf, Bytes};
use memchr::memchr;

use crate::error::{Error, Result};

/// Checked reads of the MySQL primitive encodings over a packet payload.
///
/// Every reader verifies the remaining length up front; a short buffer
/// produces an error *without* consuming any input.
pub(crate) trait BufExt {
    /// Errors unless at least `n` bytes remain.
    fn require(&self, n: usize) -> Result<()>;

    fn get_bytes(&mut self, n: usize) -> Result<Bytes>;

    fn get_str(&mut self, n: usize) -> Result<String>;

    /// Reads up to (and discards) the next NUL byte.
    fn get_str_nul(&mut self) -> Result<String>;

    /// Reads the remainder of the buffer as UTF-8.
    fn get_str_eof(&mut self) -> Result<String>;

    /// Reads a length-encoded integer.
    ///
    /// `0xfb` and `0xff` never introduce an integer; `0xfb` is the NULL
    /// marker of the text protocol and `0xff` the ERR header, so both are
    /// rejected here.
    ///
    /// <https://dev.mysql.com/doc/internals/en/integer.html#packet-Protocol::LengthEncodedInteger>
    fn get_uint_lenenc(&mut self) -> Result<u64>;

    fn get_str_lenenc(&mut self) -> Result<String>;

    fn get_bytes_lenenc(&mut self) -> Result<Bytes>;
}

impl BufExt for Bytes {
    fn require(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::Parsing(format!(
                "unexpected end of packet: wanted {n} bytes, have {}",
                self.remaining()
            )));
        }

        Ok(())
    }

    fn get_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.require(n)?;

        Ok(self.split_to(n))
    }

    fn get_str(&mut self, n: usize) -> Result<String> {
        let bytes = self.get_bytes(n)?;

        String::from_utf8(bytes.to_vec())
            .map_err(|err| Error::Parsing(format!("string is not UTF-8: {err}")))
    }

    fn get_str_nul(&mut self) -> Result<String> {
        let nul = memchr(b'\0', self)
            .ok_or_else(|| err_parse!("expected a NUL-terminated string"))?;

        let s = self.get_str(nul)?;
        self.advance(1);

        Ok(s)
    }

    fn get_str_eof(&mut self) -> Result<String> {
        let n = self.remaining();
        self.get_str(n)
    }

    fn get_uint_lenenc(&mut self) -> Result<u64> {
        self.require(1)?;

        Ok(match self[0] {
            0xfb | 0xff => {
                return Err(err_parse!(
                    "0x{:02x} is not a valid length-encoded integer prefix",
                    self[0]
                ));
            }

            0xfc => {
                self.require(3)?;
                self.advance(1);
                u64::from(self.get_u16_le())
            }

            0xfd => {
                self.require(4)?;
                self.advance(1);
                self.get_uint_le(3)
            }

            0xfe => {
                self.require(9)?;
                self.advance(1);
                self.get_u64_le()
            }

            v => {
                self.advance(1);
                u64::from(v)
            }
        })
    }

    fn get_str_lenenc(&mut self) -> Result<String> {
        let size = self.get_uint_lenenc()?;
        let size = usize::try_from(size)
            .map_err(|_| err_parse!("string length overflows usize: {size}"))?;

        self.get_str(size)
    }

    fn get_bytes_lenenc(&mut self) -> Result<Bytes> {
        let size = self.get_uint_lenenc()?;
        let size = usize::try_from(size)
            .map_err(|_| err_parse!("byte string length overflows usize: {size}"))?;

        self.get_bytes(size)
    }
}
