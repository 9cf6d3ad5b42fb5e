//! Encrypted secret storage
//!
//! Secrets are sealed with AES-256-GCM. The key is derived from
//! machine-specific identifiers, so a copied database or credentials file is
//! useless on another machine. A sealed value is `base64(nonce || ciphertext)`.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const NONCE_SIZE: usize = 12;

/// Get machine ID for key derivation (cross-platform)
fn machine_id() -> String {
    #[cfg(target_os = "linux")]
    {
        for candidate in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = fs::read_to_string(candidate) {
                let id = id.trim();
                if !id.is_empty() {
                    return id.to_string();
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(uuid) = stdout
                .lines()
                .find(|line| line.contains("IOPlatformUUID"))
                .and_then(|line| line.split('"').nth(3))
            {
                return uuid.to_string();
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(output) = std::process::Command::new("reg")
            .args([
                "query",
                r"HKLM\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(guid) = stdout
                .lines()
                .find(|line| line.contains("MachineGuid"))
                .and_then(|line| line.split_whitespace().last())
            {
                return guid.to_string();
            }
        }
    }

    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "socialdesk-fallback-key".to_string())
}

/// AES-256-GCM sealing of individual secrets
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; 32],
}

impl TokenCipher {
    /// Cipher keyed to this machine
    pub fn for_machine() -> Self {
        let mut hasher = Sha256::new();
        hasher.update(machine_id().as_bytes());
        if let Some(home) = dirs::home_dir() {
            hasher.update(home.to_string_lossy().as_bytes());
        }
        hasher.update(b"socialdesk-token-vault-v1");
        Self {
            key: hasher.finalize().into(),
        }
    }

    /// Cipher with an explicit key
    pub const fn from_key(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|_| Error::Internal("invalid vault key length".to_string()))
    }

    /// Encrypt a secret
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| Error::Internal("failed to encrypt secret".to_string()))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);
        Ok(STANDARD.encode(output))
    }

    /// Decrypt a secret produced by [`TokenCipher::seal`]
    pub fn open(&self, sealed: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(sealed)
            .map_err(|_| Error::Internal("sealed secret is not base64".to_string()))?;
        if bytes.len() < NONCE_SIZE {
            return Err(Error::Internal("sealed secret is truncated".to_string()));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::Internal("failed to decrypt secret".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::Internal("invalid UTF-8 in secret".to_string()))
    }
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCipher(<redacted>)")
    }
}

/// Encrypted key/value file (credentials.enc)
#[derive(Debug, Clone)]
pub struct Vault {
    path: PathBuf,
    cipher: TokenCipher,
}

impl Vault {
    /// Vault at the default location with the machine key
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(crate::paths::credentials_path()?, TokenCipher::for_machine()))
    }

    /// Vault at a specific path
    pub fn new(path: impl Into<PathBuf>, cipher: TokenCipher) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    /// File backing this vault
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let sealed = fs::read_to_string(&self.path)?;
        if sealed.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let json = self.cipher.open(sealed.trim())?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let sealed = self.cipher.seal(&serde_json::to_string(entries)?)?;
        fs::write(&self.path, sealed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Read a secret
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    /// Store a secret
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    /// Delete a secret; deleting a missing key succeeds
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
