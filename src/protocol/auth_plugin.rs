use crate::error::{Error, Result};

/// The authentication plugins this client can answer during the
/// handshake phase.
///
/// `caching_sha2_password` is supported only as far as its fast path: the
/// scramble is sent and an immediate success accepted. A full
/// authentication request is refused; see
/// [`Error::Unsupported`](crate::Error::Unsupported).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthPlugin {
    MySqlNativePassword,
    CachingSha2Password,
}

impl AuthPlugin {
    pub(crate) fn name(self) -> &'static str {
        match self {
            AuthPlugin::MySqlNativePassword => "mysql_native_password",
            AuthPlugin::CachingSha2Password => "caching_sha2_password",
        }
    }

    pub(crate) fn from_name(name: &str) -> Result<Self> {
        match name {
            "mysql_native_password" => Ok(AuthPlugin::MySqlNativePassword),
            "caching_sha2_password" => Ok(AuthPlugin::CachingSha2Password),

            _ => Err(Error::unsupported(format!(
                "authentication plugin `{name}`"
            ))),
        }
    }
}
