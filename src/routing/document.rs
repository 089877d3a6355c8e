//! Gildra routing documents.
//!
//! Field names follow Gildra's wire format (`Rules`, `Matches`,
//! `Destinations`, `URL`).

use serde::{Deserialize, Serialize};

/// Top-level routing document for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingConfig {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    pub matches: Vec<Match>,
}

/// A match with no conditions matches every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Match {
    pub destinations: Vec<Destination>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(rename = "URL")]
    pub url: String,
}

impl RoutingConfig {
    /// A document sending all traffic to `destinations`.
    pub fn forward_all<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: vec![Rule {
                matches: vec![Match {
                    destinations: destinations
                        .into_iter()
                        .map(|url| Destination { url: url.into() })
                        .collect(),
                }],
            }],
        }
    }
}
