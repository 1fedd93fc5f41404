use std::path::PathBuf;
use std::time::Duration;

/// The character set byte sent in the handshake response:
/// `utf8_general_ci`, unless overridden.
pub(crate) const DEFAULT_COLLATION: u8 = 0x21;

/// Whether and how strictly TLS is applied to the connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Never use TLS.
    Off,

    /// Use TLS when the caller supplies a secured stream; fall back to
    /// plaintext otherwise.
    #[default]
    Prefer,

    /// Refuse to connect without TLS.
    Require,
}

/// How the server certificate is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsVerify {
    /// Accept any certificate.
    None,

    /// Verify the certificate chain and hostname.
    #[default]
    Full,
}

/// TLS configuration for the transport.
///
/// The TLS handshake itself happens outside this crate: establish a
/// secured stream however you like and hand it to
/// [`MySqlConnection::establish_with`](crate::MySqlConnection::establish_with).
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub mode: TlsMode,
    pub verify: TlsVerify,
    pub ca_file: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
}

/// Options for connecting to a MySQL server.
#[derive(Debug, Clone)]
pub struct MySqlConnectOptions {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: Option<String>,
    pub(crate) database: Option<String>,
    pub(crate) collation: u8,
    pub(crate) tls: TlsConfig,
    pub(crate) connect_timeout: Duration,
    pub(crate) query_timeout: Option<Duration>,
    pub(crate) allow_multiple_statements: bool,
}

impl Default for MySqlConnectOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3306,
            username: "root".to_owned(),
            password: None,
            database: None,
            collation: DEFAULT_COLLATION,
            tls: TlsConfig::default(),
            connect_timeout: Duration::from_secs(30),
            query_timeout: None,
            allow_multiple_statements: false,
        }
    }
}

impl MySqlConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Overrides the character set byte sent at handshake.
    pub fn collation(mut self, collation: u8) -> Self {
        self.collation = collation;
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Bounds the TCP connect plus handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bounds each wait for a response packet during a command. On
    /// expiry the connection is poisoned and must be discarded.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Permits multiple `;`-separated statements per query string.
    pub fn allow_multiple_statements(mut self, allow: bool) -> Self {
        self.allow_multiple_statements = allow;
        self
    }
}
