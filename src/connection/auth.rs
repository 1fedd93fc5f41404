use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::auth_plugin::AuthPlugin;
use crate::protocol::Capabilities;

/// Computes the scramble for the given plugin over the first 20 bytes of
/// the server nonce. An empty password always answers with an empty
/// scramble.
pub(crate) fn scramble(plugin: AuthPlugin, password: &str, nonce: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let nonce = &nonce[..nonce.len().min(20)];

    match plugin {
        AuthPlugin::MySqlNativePassword => scramble_sha1(password, nonce),
        AuthPlugin::CachingSha2Password => scramble_sha256(password, nonce),
    }
}

// SHA1( password ) ^ SHA1( nonce + SHA1( SHA1( password ) ) )
// https://dev.mysql.com/doc/internals/en/secure-password-authentication.html
// https://mariadb.com/kb/en/connection/#mysql_native_password-plugin
fn scramble_sha1(password: &str, nonce: &[u8]) -> Vec<u8> {
    let mut ctx = Sha1::new();

    ctx.update(password);

    let mut pw_hash = ctx.finalize_reset();

    ctx.update(pw_hash);

    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(nonce);
    ctx.update(pw_hash_hash);

    let wrapped = ctx.finalize();

    xor_eq(&mut pw_hash, &wrapped);

    pw_hash.to_vec()
}

// XOR( SHA256( password ), SHA256( nonce + SHA256( SHA256( password ) ) ) )
// https://mariadb.com/kb/en/caching_sha2_password-authentication-plugin/
fn scramble_sha256(password: &str, nonce: &[u8]) -> Vec<u8> {
    let mut ctx = Sha256::new();

    ctx.update(password);

    let mut pw_hash = ctx.finalize_reset();

    ctx.update(pw_hash);

    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(nonce);
    ctx.update(pw_hash_hash);

    let wrapped = ctx.finalize();

    xor_eq(&mut pw_hash, &wrapped);

    pw_hash.to_vec()
}

// XOR(x, y); wraps around y if it is shorter than x
fn xor_eq(x: &mut [u8], y: &[u8]) {
    let y_len = y.len();

    for i in 0..x.len() {
        x[i] ^= y[i % y_len];
    }
}

/// The raw scramble bytes sent as a continuation of the auth exchange
/// (after an auth switch request).
#[derive(Debug)]
pub(crate) struct AuthResponse<'a>(pub(crate) &'a [u8]);

impl ProtocolEncode<Capabilities> for AuthResponse<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.extend_from_slice(self.0);

        Ok(())
    }
}
