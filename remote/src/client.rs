use russh::keys::PublicKeyBase64;

/// SSH client callbacks: host key verification against an optional fingerprint allow-list.
pub(crate) struct Client {
    /// OpenSSH style `SHA256:...` fingerprints or raw base64 keys
    allowed_fingerprints: Option<Vec<String>>,
}

impl Client {
    pub(crate) fn new(allowed_fingerprints: Option<Vec<String>>) -> Self {
        Self {
            allowed_fingerprints,
        }
    }
}

impl russh::client::Handler for Client {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key
            .fingerprint(russh::keys::HashAlg::Sha256)
            .to_string();
        match &self.allowed_fingerprints {
            Some(allowed) => {
                let key_b64 = server_public_key.public_key_base64();
                let accepted = allowed
                    .iter()
                    .any(|entry| entry == &fingerprint || entry == &key_b64);
                if accepted {
                    tracing::debug!("Server host key {} is in the allow-list", fingerprint);
                } else {
                    tracing::error!("Server host key {} is not in the allow-list", fingerprint);
                }
                Ok(accepted)
            }
            None => {
                tracing::info!("Accepting server host key {}", fingerprint);
                Ok(true)
            }
        }
    }
}
