//! Static descriptions of the supported platforms
//!
//! Each platform carries its storage keys and capability flags. The table is
//! fixed at compile time; everything else in the crate looks platforms up here
//! rather than hard-coding key names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for a supported platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    LinkedIn,
    Instagram,
    Facebook,
    YouTube,
    TwitterX,
    WhatsApp,
    TikTok,
}

impl PlatformId {
    /// All supported platforms, in display order
    pub fn all() -> &'static [PlatformId] {
        &[
            PlatformId::LinkedIn,
            PlatformId::Instagram,
            PlatformId::Facebook,
            PlatformId::YouTube,
            PlatformId::TwitterX,
            PlatformId::WhatsApp,
            PlatformId::TikTok,
        ]
    }

    /// Lowercase identifier used in config, CLI arguments, and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::LinkedIn => "linkedin",
            PlatformId::Instagram => "instagram",
            PlatformId::Facebook => "facebook",
            PlatformId::YouTube => "youtube",
            PlatformId::TwitterX => "twitterx",
            PlatformId::WhatsApp => "whatsapp",
            PlatformId::TikTok => "tiktok",
        }
    }

    /// Human-readable platform name
    pub fn display_name(&self) -> &'static str {
        self.descriptor().display_name
    }

    /// Static descriptor for this platform
    pub fn descriptor(&self) -> &'static PlatformDescriptor {
        &DESCRIPTORS[*self as usize]
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linkedin" => Ok(PlatformId::LinkedIn),
            "instagram" => Ok(PlatformId::Instagram),
            "facebook" => Ok(PlatformId::Facebook),
            "youtube" => Ok(PlatformId::YouTube),
            "twitterx" | "twitter" | "x" => Ok(PlatformId::TwitterX),
            "whatsapp" => Ok(PlatformId::WhatsApp),
            "tiktok" => Ok(PlatformId::TikTok),
            _ => Err(format!(
                "Unknown platform: '{}'. Valid options: linkedin, instagram, facebook, youtube, twitterx, whatsapp, tiktok",
                s
            )),
        }
    }
}

/// Static description of one platform's identity and capabilities
#[derive(Debug, Clone)]
pub struct PlatformDescriptor {
    pub id: PlatformId,
    pub display_name: &'static str,
    /// Storage key for the primary (access) token
    pub primary_token_key: &'static str,
    /// Storage key for a companion identifier, if the platform issues one
    pub secondary_token_key: Option<&'static str>,
    /// Platform whose credential this one rides on, if any
    pub requires_parent: Option<PlatformId>,
    /// Whether publishing requires a video attachment
    pub requires_video: bool,
    /// Authorization endpoint for the browser redirect, if the flow starts
    /// client-side rather than via the backend
    pub authorize_url: Option<&'static str>,
    /// Scope string requested at authorization time
    pub default_scope: Option<&'static str>,
}

// Order must match the PlatformId discriminants.
static DESCRIPTORS: [PlatformDescriptor; 7] = [
    PlatformDescriptor {
        id: PlatformId::LinkedIn,
        display_name: "LinkedIn",
        primary_token_key: "linkedin_access_token",
        secondary_token_key: None,
        requires_parent: None,
        requires_video: false,
        authorize_url: Some("https://www.linkedin.com/oauth/v2/authorization"),
        default_scope: Some("openid profile email w_member_social"),
    },
    PlatformDescriptor {
        id: PlatformId::Instagram,
        display_name: "Instagram",
        primary_token_key: "instagram_user_id",
        secondary_token_key: None,
        requires_parent: Some(PlatformId::Facebook),
        requires_video: false,
        authorize_url: Some("https://api.instagram.com/oauth/authorize"),
        default_scope: Some("user_profile,user_media"),
    },
    PlatformDescriptor {
        id: PlatformId::Facebook,
        display_name: "Facebook",
        primary_token_key: "facebook_access_token",
        secondary_token_key: None,
        requires_parent: None,
        requires_video: false,
        authorize_url: Some("https://www.facebook.com/v22.0/dialog/oauth"),
        default_scope: Some("pages_manage_posts,pages_read_engagement,pages_show_list"),
    },
    PlatformDescriptor {
        id: PlatformId::YouTube,
        display_name: "YouTube",
        primary_token_key: "youtube_access_token",
        secondary_token_key: None,
        requires_parent: None,
        requires_video: true,
        authorize_url: None,
        default_scope: None,
    },
    PlatformDescriptor {
        id: PlatformId::TwitterX,
        display_name: "TwitterX",
        primary_token_key: "twitterX_access_token",
        secondary_token_key: None,
        requires_parent: None,
        requires_video: false,
        authorize_url: None,
        default_scope: None,
    },
    PlatformDescriptor {
        id: PlatformId::WhatsApp,
        display_name: "WhatsApp",
        primary_token_key: "whatsapp_access_token",
        secondary_token_key: None,
        requires_parent: None,
        requires_video: false,
        authorize_url: Some("https://www.whatsapp.com/oauth/authorize"),
        default_scope: Some("whatsapp_business_messaging"),
    },
    PlatformDescriptor {
        id: PlatformId::TikTok,
        display_name: "TikTok",
        primary_token_key: "tiktok_access_token",
        secondary_token_key: Some("tiktok_open_id"),
        requires_parent: None,
        requires_video: true,
        authorize_url: None,
        default_scope: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_table_is_consistent() {
        for platform in PlatformId::all() {
            assert_eq!(platform.descriptor().id, *platform);
        }
    }

    #[test]
    fn test_from_str_round_trip() {
        for platform in PlatformId::all() {
            let parsed: PlatformId = platform.as_str().parse().unwrap();
            assert_eq!(parsed, *platform);
        }
    }

    #[test]
    fn test_from_str_aliases_and_case() {
        assert_eq!("twitter".parse::<PlatformId>().unwrap(), PlatformId::TwitterX);
        assert_eq!("x".parse::<PlatformId>().unwrap(), PlatformId::TwitterX);
        assert_eq!("TikTok".parse::<PlatformId>().unwrap(), PlatformId::TikTok);
        assert!("mastodon".parse::<PlatformId>().is_err());
    }

    #[test]
    fn test_instagram_requires_facebook_parent() {
        let descriptor = PlatformId::Instagram.descriptor();
        assert_eq!(descriptor.requires_parent, Some(PlatformId::Facebook));
    }

    #[test]
    fn test_video_platforms() {
        assert!(PlatformId::YouTube.descriptor().requires_video);
        assert!(PlatformId::TikTok.descriptor().requires_video);
        assert!(!PlatformId::Facebook.descriptor().requires_video);
    }

    #[test]
    fn test_tiktok_secondary_key() {
        let descriptor = PlatformId::TikTok.descriptor();
        assert_eq!(descriptor.secondary_token_key, Some("tiktok_open_id"));
        assert!(PlatformId::LinkedIn.descriptor().secondary_token_key.is_none());
    }
}
