//! A scripted MySQL server for driving the client end-to-end without a
//! real database.
#![allow(dead_code)]

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// capability bits for the scripted greeting
pub const PROTOCOL_41: u32 = 0x0000_0200;
pub const CONNECT_WITH_DB: u32 = 0x0000_0008;
pub const IGNORE_SPACE: u32 = 0x0000_0100;
pub const TRANSACTIONS: u32 = 0x0000_2000;
pub const SECURE_CONNECTION: u32 = 0x0000_8000;
pub const MULTI_STATEMENTS: u32 = 0x0001_0000;
pub const MULTI_RESULTS: u32 = 0x0002_0000;
pub const PLUGIN_AUTH: u32 = 0x0008_0000;
pub const PLUGIN_AUTH_LENENC_DATA: u32 = 0x0020_0000;
pub const DEPRECATE_EOF: u32 = 0x0100_0000;

pub const SERVER_CAPABILITIES: u32 = PROTOCOL_41
    | CONNECT_WITH_DB
    | IGNORE_SPACE
    | TRANSACTIONS
    | SECURE_CONNECTION
    | MULTI_STATEMENTS
    | MULTI_RESULTS
    | PLUGIN_AUTH
    | PLUGIN_AUTH_LENENC_DATA
    | DEPRECATE_EOF;

// column type codes
pub const TYPE_LONG: u8 = 0x03;
pub const TYPE_VAR_STRING: u8 = 0xfd;

// column flags
pub const FLAG_UNSIGNED: u16 = 0x0020;

pub const UTF8_GENERAL_CI: u16 = 0x21;

pub fn put_lenenc(buf: &mut Vec<u8>, value: u64) {
    if value < 251 {
        buf.push(value as u8);
    } else if value < 0x1_0000 {
        buf.push(0xfc);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value < 0x100_0000 {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        buf.push(0xfe);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

pub struct MockServer<S> {
    stream: S,
    sequence_id: u8,
}

impl<S: AsyncRead + AsyncWrite + Unpin> MockServer<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            sequence_id: 0,
        }
    }

    pub async fn send(&mut self, payload: &[u8]) {
        let mut frame = Vec::with_capacity(payload.len() + 4);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes()[..3]);
        frame.push(self.sequence_id);
        frame.extend_from_slice(payload);

        self.sequence_id = self.sequence_id.wrapping_add(1);

        self.stream.write_all(&frame).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        let mut header = [0_u8; 4];

        if self.stream.read_exact(&mut header).await.is_err() {
            return None;
        }

        let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;

        assert_eq!(header[3], self.sequence_id, "client sent packet out of order");
        self.sequence_id = self.sequence_id.wrapping_add(1);

        let mut payload = vec![0_u8; len];
        self.stream.read_exact(&mut payload).await.ok()?;

        Some(payload)
    }

    /// Reads the next command packet; the sequence restarts at 0.
    pub async fn expect_command(&mut self) -> Option<Vec<u8>> {
        self.sequence_id = 0;
        self.recv().await
    }

    fn greeting(auth_plugin: &str) -> Vec<u8> {
        let mut data = Vec::new();

        data.push(0x0a);
        data.extend_from_slice(b"8.0.32\0");
        data.extend_from_slice(&42_u32.to_le_bytes());
        data.extend_from_slice(b"abcdefgh");
        data.push(0);
        data.extend_from_slice(&(SERVER_CAPABILITIES as u16).to_le_bytes());
        data.push(0x21);
        data.extend_from_slice(&0x0002_u16.to_le_bytes());
        data.extend_from_slice(&((SERVER_CAPABILITIES >> 16) as u16).to_le_bytes());
        data.push(21);
        data.extend_from_slice(&[0; 10]);
        data.extend_from_slice(b"ijklmnopqrst\0");
        data.extend_from_slice(auth_plugin.as_bytes());
        data.push(0);

        data
    }

    /// Greets the client and accepts whatever credentials it offers.
    pub async fn handshake(&mut self) {
        self.sequence_id = 0;
        self.send(&Self::greeting("mysql_native_password")).await;

        let response = self.recv().await.expect("no handshake response");
        assert!(!response.is_empty());

        self.send_ok(0, 0).await;
    }

    /// Greets the client, then rejects the credentials with
    /// ER_ACCESS_DENIED_ERROR.
    pub async fn handshake_deny(&mut self) {
        self.sequence_id = 0;
        self.send(&Self::greeting("mysql_native_password")).await;

        let _response = self.recv().await.expect("no handshake response");

        self.send_err(1045, "28000", "Access denied for user 'root'@'localhost'")
            .await;
    }

    /// Greets with `caching_sha2_password` and demands full
    /// authentication.
    pub async fn handshake_full_auth(&mut self) {
        self.sequence_id = 0;
        self.send(&Self::greeting("caching_sha2_password")).await;

        let _response = self.recv().await.expect("no handshake response");

        // AUTH_CONTINUE: full authentication required
        self.send(&[0x01, 0x04]).await;
    }

    pub async fn send_ok(&mut self, affected_rows: u64, last_insert_id: u64) {
        let mut payload = vec![0x00];
        put_lenenc(&mut payload, affected_rows);
        put_lenenc(&mut payload, last_insert_id);
        payload.extend_from_slice(&0x0002_u16.to_le_bytes()); // autocommit
        payload.extend_from_slice(&0_u16.to_le_bytes());

        self.send(&payload).await;
    }

    /// The OK-shaped result set terminator used with DEPRECATE_EOF.
    pub async fn send_ok_eof(&mut self) {
        self.send(b"\xfe\x00\x00\x02\x00\x00\x00").await;
    }

    pub async fn send_err(&mut self, code: u16, sql_state: &str, message: &str) {
        let mut payload = vec![0xff];
        payload.extend_from_slice(&code.to_le_bytes());
        payload.push(b'#');
        payload.extend_from_slice(sql_state.as_bytes());
        payload.extend_from_slice(message.as_bytes());

        self.send(&payload).await;
    }

    pub async fn send_column_count(&mut self, count: u64) {
        let mut payload = Vec::new();
        put_lenenc(&mut payload, count);

        self.send(&payload).await;
    }

    pub async fn send_column(&mut self, name: &str, ty: u8, flags: u16, charset: u16) {
        let mut payload = Vec::new();

        for field in ["def", "", "", "", name, ""] {
            put_lenenc(&mut payload, field.len() as u64);
            payload.extend_from_slice(field.as_bytes());
        }

        payload.push(0x0c);
        payload.extend_from_slice(&charset.to_le_bytes());
        payload.extend_from_slice(&84_u32.to_le_bytes());
        payload.push(ty);
        payload.extend_from_slice(&flags.to_le_bytes());
        payload.push(0x1f);
        payload.extend_from_slice(&[0, 0]);

        self.send(&payload).await;
    }

    pub async fn send_text_row(&mut self, values: &[Option<&str>]) {
        let mut payload = Vec::new();

        for value in values {
            match value {
                Some(text) => {
                    put_lenenc(&mut payload, text.len() as u64);
                    payload.extend_from_slice(text.as_bytes());
                }

                None => payload.push(0xfb),
            }
        }

        self.send(&payload).await;
    }

    pub async fn send_prepare_ok(&mut self, statement_id: u32, params: u16, columns: u16) {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&statement_id.to_le_bytes());
        payload.extend_from_slice(&columns.to_le_bytes());
        payload.extend_from_slice(&params.to_le_bytes());
        payload.push(0);
        payload.extend_from_slice(&0_u16.to_le_bytes());

        self.send(&payload).await;
    }

    /// Answers `SELECT 1` with a one-column, one-row text result.
    pub async fn send_select_one(&mut self) {
        self.send_column_count(1).await;
        self.send_column("1", TYPE_LONG, 0, UTF8_GENERAL_CI).await;
        self.send_text_row(&[Some("1")]).await;
        self.send_ok_eof().await;
    }
}
