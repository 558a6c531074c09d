//! Canonical social network categories and the vendor-to-canonical mapping.
//!
//! The analytics vendor reports a raw `network_type` string per profile
//! (`"fb_page"`, `"fb_instagram_account"`, `"linkedin_company"`, ...). Every
//! downstream step works on the closed [`NetworkType`] set instead, so the raw
//! value is mapped exactly once through [`NetworkMapping::from_vendor`].

use serde::{Deserialize, Serialize};

/// Closed set of networks that get a sub-section in a target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Instagram,
    Youtube,
    Linkedin,
    Facebook,
    Twitter,
}

impl NetworkType {
    pub const ALL: [NetworkType; 5] = [
        NetworkType::Instagram,
        NetworkType::Youtube,
        NetworkType::Linkedin,
        NetworkType::Facebook,
        NetworkType::Twitter,
    ];

    /// Name of the sub-section (sheet tab) holding this network's rows.
    #[must_use]
    pub fn subsection_name(self) -> &'static str {
        match self {
            NetworkType::Instagram => "Instagram",
            NetworkType::Youtube => "YouTube",
            NetworkType::Linkedin => "LinkedIn",
            NetworkType::Facebook => "Facebook",
            NetworkType::Twitter => "Twitter",
        }
    }

    /// Parses a canonical lowercase name (`"instagram"`, `"youtube"`, ...).
    #[must_use]
    pub fn from_canonical(name: &str) -> Option<Self> {
        match name {
            "instagram" => Some(NetworkType::Instagram),
            "youtube" => Some(NetworkType::Youtube),
            "linkedin" => Some(NetworkType::Linkedin),
            "facebook" => Some(NetworkType::Facebook),
            "twitter" => Some(NetworkType::Twitter),
            _ => None,
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NetworkType::Instagram => "instagram",
            NetworkType::Youtube => "youtube",
            NetworkType::Linkedin => "linkedin",
            NetworkType::Facebook => "facebook",
            NetworkType::Twitter => "twitter",
        };
        f.write_str(name)
    }
}

/// Result of mapping a raw vendor network identifier.
///
/// `Unmapped` carries the raw value so the caller can report it; it is never
/// folded into one of the known networks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMapping {
    Known(NetworkType),
    Unmapped(String),
}

/// Fixed vendor lookup table. Keys are compared after lowercasing.
const VENDOR_TABLE: &[(&str, NetworkType)] = &[
    ("fb_instagram_account", NetworkType::Instagram),
    ("instagram_business", NetworkType::Instagram),
    ("youtube_channel", NetworkType::Youtube),
    ("linkedin_company", NetworkType::Linkedin),
    ("linkedin_page", NetworkType::Linkedin),
    ("fb_page", NetworkType::Facebook),
    ("facebook_page", NetworkType::Facebook),
    ("x", NetworkType::Twitter),
    ("twitter_profile", NetworkType::Twitter),
];

impl NetworkMapping {
    /// Maps a raw vendor network type onto the closed set.
    ///
    /// Lookup order: the vendor table, then the lowercased raw value read as a
    /// canonical name. Anything else is [`NetworkMapping::Unmapped`].
    #[must_use]
    pub fn from_vendor(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if let Some((_, network)) = VENDOR_TABLE.iter().find(|(key, _)| *key == lowered) {
            return NetworkMapping::Known(*network);
        }
        match NetworkType::from_canonical(&lowered) {
            Some(network) => NetworkMapping::Known(network),
            None => NetworkMapping::Unmapped(raw.to_string()),
        }
    }

    #[must_use]
    pub fn known(&self) -> Option<NetworkType> {
        match self {
            NetworkMapping::Known(network) => Some(*network),
            NetworkMapping::Unmapped(_) => None,
        }
    }
}
