use serde::{Deserialize, Serialize};

use crate::name::Name;
use crate::packets::PacketError;

/// Decoding limits applied to packets received from the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Reject VarNumbers encoded wider than necessary
    pub strict_varnum: bool,
    /// Largest accepted top-level TLV, in bytes
    pub max_packet_size: usize,
    pub max_name_components: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            strict_varnum: false,
            max_packet_size: 8800,
            max_name_components: 64,
        }
    }
}

impl CodecConfig {
    pub fn check_packet_size(&self, size: usize) -> Result<(), PacketError> {
        if size > self.max_packet_size {
            return Err(PacketError::PacketTooLarge {
                size,
                max: self.max_packet_size,
            });
        }
        Ok(())
    }

    pub fn check_name(&self, name: &Name) -> Result<(), PacketError> {
        if name.len() > self.max_name_components {
            return Err(PacketError::NameTooDeep {
                depth: name.len(),
                max: self.max_name_components,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_config() {
        let config = CodecConfig::default();
        assert!(!config.strict_varnum);
        assert_eq!(config.max_packet_size, 8800);

        assert!(config.check_packet_size(8800).is_ok());
        assert!(matches!(
            config.check_packet_size(8801),
            Err(PacketError::PacketTooLarge { size: 8801, max: 8800 })
        ));
    }

    #[test]
    fn test_name_depth() {
        let config = CodecConfig {
            max_name_components: 2,
            ..Default::default()
        };
        assert!(config.check_name(&Name::from_uri("/A/B").unwrap()).is_ok());
        assert!(matches!(
            config.check_name(&Name::from_uri("/A/B/C").unwrap()),
            Err(PacketError::NameTooDeep { depth: 3, max: 2 })
        ));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: CodecConfig = serde_json::from_str(r#"{"strict_varnum": true}"#).unwrap();
        assert!(config.strict_varnum);
        assert_eq!(config.max_name_components, 64);
    }
}
