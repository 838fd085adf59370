use super::ControlError;
use data_encoding::BASE32_NOPAD;
use std::fmt;
use std::str::FromStr;

/// v3 ids are 56 base32 characters, legacy v2 ids 16.
const V3_ID_LEN: usize = 56;
const V2_ID_LEN: usize = 16;

/// Service id of an onion service, without the `.onion` suffix
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OnionId(String);

impl OnionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hostname(&self) -> String {
        format!("{}.onion", self.0)
    }
}

impl FromStr for OnionId {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().trim_end_matches(".onion").to_ascii_lowercase();
        if id.len() != V3_ID_LEN && id.len() != V2_ID_LEN {
            return Err(ControlError::InvalidOnionId(s.to_string()));
        }

        BASE32_NOPAD
            .decode(id.to_ascii_uppercase().as_bytes())
            .map_err(|e| ControlError::InvalidOnionId(format!("{}: {}", s, e)))?;

        Ok(Self(id))
    }
}

impl fmt::Debug for OnionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OnionId({})", self.0)
    }
}

impl fmt::Display for OnionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the control port tells us about a freshly created service
#[derive(Clone, PartialEq, Eq)]
pub struct OnionInfo {
    pub onion_id: OnionId,
    /// Only present when the key was not discarded.
    pub private_key: Option<String>,
}

impl fmt::Debug for OnionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnionInfo")
            .field("onion_id", &self.onion_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V3: &str = "pg6mmjiyjmcrsslvykfwnntlaru7p5svn6y2ymmju6nubxndf4pscryd";

    #[test]
    fn test_parses_v3_id() {
        let id: OnionId = V3.parse().unwrap();
        assert_eq!(id.as_str(), V3);
        assert_eq!(id.hostname(), format!("{}.onion", V3));
    }

    #[test]
    fn test_accepts_suffix_and_case() {
        let id: OnionId = format!("{}.onion", V3.to_uppercase()).parse().unwrap();
        assert_eq!(id.as_str(), V3);
    }

    #[test]
    fn test_parses_legacy_id() {
        assert!("expyuzz4wqqyqhjn".parse::<OnionId>().is_ok());
    }

    #[test]
    fn test_rejects_bad_ids() {
        assert!(matches!(
            "short".parse::<OnionId>().unwrap_err(),
            ControlError::InvalidOnionId(_)
        ));
        // right length, '1' is outside the base32 alphabet
        assert!("1".repeat(56).parse::<OnionId>().is_err());
    }

    #[test]
    fn test_private_key_not_in_debug() {
        let info = OnionInfo {
            onion_id: V3.parse().unwrap(),
            private_key: Some("ED25519-V3:secret".into()),
        };
        assert!(!format!("{:?}", info).contains("secret"));
    }
}
