/// Writes of the MySQL primitive encodings.
///
/// Writers are infallible; they only ever extend the buffer.
pub(crate) trait BufMutExt {
    fn put_u24_le(&mut self, value: u32);

    fn put_str_nul(&mut self, value: &str);

    /// Writes a length-encoded integer.
    ///
    /// <https://dev.mysql.com/doc/internals/en/integer.html>
    /// <https://mariadb.com/kb/en/library/protocol-data-types/#length-encoded-integers>
    fn put_uint_lenenc(&mut self, value: u64);

    fn put_str_lenenc(&mut self, value: &str);

    fn put_bytes_lenenc(&mut self, value: &[u8]);
}

impl BufMutExt for Vec<u8> {
    fn put_u24_le(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes()[..3]);
    }

    fn put_str_nul(&mut self, value: &str) {
        self.extend_from_slice(value.as_bytes());
        self.push(0);
    }

    fn put_uint_lenenc(&mut self, value: u64) {
        if value < 251 {
            // stored as a 1-byte integer
            #[allow(clippy::cast_possible_truncation)]
            self.push(value as u8);
        } else if value < 0x1_00_00 {
            // 0xfc + 2-byte integer
            self.reserve(3);
            self.push(0xfc);

            #[allow(clippy::cast_possible_truncation)]
            self.extend_from_slice(&(value as u16).to_le_bytes());
        } else if value < 0x1_00_00_00 {
            // 0xfd + 3-byte integer
            self.reserve(4);
            self.push(0xfd);

            #[allow(clippy::cast_possible_truncation)]
            self.put_u24_le(value as u32);
        } else {
            // 0xfe + 8-byte integer
            self.reserve(9);
            self.push(0xfe);
            self.extend_from_slice(&value.to_le_bytes());
        }
    }

    #[inline]
    fn put_str_lenenc(&mut self, value: &str) {
        self.put_bytes_lenenc(value.as_bytes());
    }

    fn put_bytes_lenenc(&mut self, value: &[u8]) {
        self.put_uint_lenenc(value.len() as u64);
        self.extend_from_slice(value);
    }
}

#[cfg(test)]
mod tests {
    use super::BufMutExt;

    #[test]
    fn put_uint_lenenc_u8() {
        let mut buf = Vec::new();
        buf.put_uint_lenenc(0xfa);

        assert_eq!(&buf[..], b"\xfa");
    }

    #[test]
    fn put_uint_lenenc_fb() {
        // 0xfb is reserved as a prefix and must take the 2-byte form
        let mut buf = Vec::new();
        buf.put_uint_lenenc(0xfb);

        assert_eq!(&buf[..], b"\xfc\xfb\x00");
    }

    #[test]
    fn put_uint_lenenc_u16() {
        let mut buf = Vec::new();
        buf.put_uint_lenenc(u64::from(u16::MAX));

        assert_eq!(&buf[..], b"\xfc\xff\xff");
    }

    #[test]
    fn put_uint_lenenc_u24() {
        let mut buf = Vec::new();
        buf.put_uint_lenenc(0xff_ff_ff);

        assert_eq!(&buf[..], b"\xfd\xff\xff\xff");
    }

    #[test]
    fn put_uint_lenenc_u64() {
        let mut buf = Vec::new();
        buf.put_uint_lenenc(u64::MAX);

        assert_eq!(&buf[..], b"\xfe\xff\xff\xff\xff\xff\xff\xff\xff");
    }

    #[test]
    fn put_str_lenenc() {
        let mut buf = Vec::new();
        buf.put_str_lenenc("random_string");

        assert_eq!(&buf[..], b"\x0drandom_string");
    }

    #[test]
    fn put_str_nul() {
        let mut buf = Vec::new();
        buf.put_str_nul("root");

        assert_eq!(&buf[..], b"root\0");
    }
}
