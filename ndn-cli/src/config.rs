use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use ndn_core::algorithms::{DigestSigning, Ed25519Signer, HmacKey};
use ndn_core::{CodecConfig, KeyLocator, Name, Signer, Verifier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub codec: CodecConfig,
    pub signing: SigningConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Digest,
    Hmac,
    Ed25519,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub algorithm: Algorithm,
    /// Shared secret for HMAC
    pub hmac_key: Option<String>,
    /// Hex-encoded 32-byte Ed25519 seed
    pub ed25519_seed: Option<String>,
    /// KeyLocator name placed in SignatureInfo
    pub key_locator: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl SigningConfig {
    fn key_locator(&self) -> Result<Option<KeyLocator>> {
        self.key_locator
            .as_deref()
            .map(|uri| Ok(KeyLocator::Name(Name::from_uri(uri)?)))
            .transpose()
    }

    fn hmac_key(&self) -> Result<HmacKey> {
        let Some(secret) = &self.hmac_key else {
            bail!("signing.hmac_key is required for the hmac algorithm");
        };
        let key = HmacKey::new(secret.as_bytes());
        Ok(match self.key_locator()? {
            Some(locator) => key.with_key_locator(locator),
            None => key,
        })
    }

    fn ed25519_signer(&self) -> Result<Ed25519Signer> {
        let Some(seed) = &self.ed25519_seed else {
            bail!("signing.ed25519_seed is required for the ed25519 algorithm");
        };
        let seed: [u8; 32] = hex::decode(seed)?
            .try_into()
            .map_err(|_| anyhow::anyhow!("signing.ed25519_seed must be 32 bytes"))?;
        let signer = Ed25519Signer::from_seed(&seed);
        Ok(match self.key_locator()? {
            Some(locator) => signer.with_key_locator(locator),
            None => signer,
        })
    }

    pub fn signer(&self) -> Result<Box<dyn Signer>> {
        Ok(match self.algorithm {
            Algorithm::Digest => Box::new(DigestSigning),
            Algorithm::Hmac => Box::new(self.hmac_key()?),
            Algorithm::Ed25519 => Box::new(self.ed25519_signer()?),
        })
    }

    pub fn verifier(&self) -> Result<Box<dyn Verifier>> {
        Ok(match self.algorithm {
            Algorithm::Digest => Box::new(DigestSigning),
            Algorithm::Hmac => Box::new(self.hmac_key()?),
            Algorithm::Ed25519 => Box::new(self.ed25519_signer()?.verifier()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndn_core::SignatureType;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.codec.max_packet_size, 8800);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ndnpkt.toml");

        let mut config = Config::default();
        config.signing.algorithm = Algorithm::Hmac;
        config.signing.hmac_key = Some("secret".into());
        config.codec.strict_varnum = true;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ndnpkt.toml");
        fs::write(&path, "[signing]\nalgorithm = \"ed25519\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.signing.algorithm, Algorithm::Ed25519);
        assert_eq!(config.codec, CodecConfig::default());
    }

    #[test]
    fn test_signer_selection() {
        let signing = SigningConfig::default();
        assert_eq!(
            signing.signer().unwrap().signature_type(),
            SignatureType::DigestSha256
        );

        let signing = SigningConfig {
            algorithm: Algorithm::Ed25519,
            ed25519_seed: Some("07".repeat(32)),
            key_locator: Some("/keys/alice".into()),
            ..Default::default()
        };
        let signer = signing.signer().unwrap();
        assert_eq!(signer.signature_type(), SignatureType::Ed25519);
        assert!(matches!(signer.key_locator(), Some(KeyLocator::Name(_))));

        let signing = SigningConfig {
            algorithm: Algorithm::Hmac,
            ..Default::default()
        };
        assert!(signing.signer().is_err());
    }
}
