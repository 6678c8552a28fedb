//! Publishing targets and the style guide each draft must follow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Twitter,
    Email,
    Reddit,
}

/// Constraints handed to the drafting service for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleGuide {
    pub max_chars: usize,
    pub tone: &'static str,
    pub format: &'static str,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::Email,
        Platform::Reddit,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Email => "email",
            Platform::Reddit => "reddit",
        }
    }

    pub fn style_guide(self) -> StyleGuide {
        match self {
            Platform::LinkedIn => StyleGuide {
                max_chars: 1300,
                tone: "insightful, first person, no hype",
                format: "short paragraphs, one question at the end, at most 3 hashtags",
            },
            Platform::Twitter => StyleGuide {
                max_chars: 280,
                tone: "punchy and concrete",
                format: "single tweet, no hashtags, no links",
            },
            Platform::Email => StyleGuide {
                max_chars: 1200,
                tone: "warm, peer to peer, specific to the event",
                format: "subject line on the first line, then under 120 words of body",
            },
            Platform::Reddit => StyleGuide {
                max_chars: 1500,
                tone: "helpful practitioner, zero selling",
                format: "plain comment, concrete advice, no links",
            },
        }
    }

    /// Checklist label for "it went out": emails are sent, posts are posted.
    pub fn delivery_label(self) -> &'static str {
        match self {
            Platform::Email => "sent",
            _ => "posted",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" | "li" => Ok(Platform::LinkedIn),
            "twitter" | "x" => Ok(Platform::Twitter),
            "email" | "mail" => Ok(Platform::Email),
            "reddit" => Ok(Platform::Reddit),
            other => Err(format!("unknown platform `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_ids_and_aliases() {
        for p in Platform::ALL {
            assert_eq!(p.id().parse::<Platform>().unwrap(), p);
        }
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::Twitter);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn twitter_guide_respects_tweet_length() {
        assert_eq!(Platform::Twitter.style_guide().max_chars, 280);
        assert_eq!(Platform::Email.delivery_label(), "sent");
        assert_eq!(Platform::LinkedIn.delivery_label(), "posted");
    }
}
