use std::collections::HashSet;

use serde::Serialize;

use crate::config::RolesConfig;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
    pub slug: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    pub accent_color: u32,
    pub emoji: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tier {
    pub slug: &'static str,
    pub name: &'static str,
    pub rank: u8,
    pub description: &'static str,
}

pub static PATHWAYS: [Pathway; 4] = [
    Pathway {
        slug: "gaming",
        name: "Gaming",
        tagline: "Squads, tournaments and late-night lobbies.",
        accent_color: 0x5865F2,
        emoji: "🎮",
    },
    Pathway {
        slug: "lorebound",
        name: "Lorebound",
        tagline: "Worldbuilding, fiction and tabletop campaigns.",
        accent_color: 0x9B59B6,
        emoji: "📜",
    },
    Pathway {
        slug: "productive",
        name: "Productive",
        tagline: "Focus sessions, study halls and shipping side projects.",
        accent_color: 0x2ECC71,
        emoji: "🛠️",
    },
    Pathway {
        slug: "news",
        name: "News",
        tagline: "Announcements, digests and community updates.",
        accent_color: 0xE67E22,
        emoji: "📰",
    },
];

// Ordered by rank, lowest first.
pub static TIERS: [Tier; 5] = [
    Tier {
        slug: "initiate",
        name: "Initiate",
        rank: 1,
        description: "Freshly verified and finding their way around.",
    },
    Tier {
        slug: "member",
        name: "Member",
        rank: 2,
        description: "A regular voice of the Conclave.",
    },
    Tier {
        slug: "adept",
        name: "Adept",
        rank: 3,
        description: "Trusted contributor across pathways.",
    },
    Tier {
        slug: "elder",
        name: "Elder",
        rank: 4,
        description: "Long-standing pillar of the community.",
    },
    Tier {
        slug: "council",
        name: "Council",
        rank: 5,
        description: "Stewards who keep the Conclave running.",
    },
];

pub fn tier_by_slug(slug: &str) -> Option<&'static Tier> {
    TIERS.iter().find(|tier| tier.slug == slug)
}

pub fn pathway_by_slug(slug: &str) -> Option<&'static Pathway> {
    PATHWAYS.iter().find(|pathway| pathway.slug == slug)
}

/// Binds configured Discord role ids to the static tier and pathway tables.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    tiers: Vec<(u64, &'static Tier)>,
    pathways: Vec<(u64, &'static Pathway)>,
    staff: HashSet<u64>,
}

impl RoleDirectory {
    pub fn from_config(config: &RolesConfig) -> Self {
        let tiers = config
            .tiers
            .iter()
            .filter_map(|binding| tier_by_slug(&binding.slug).map(|tier| (binding.role_id, tier)))
            .collect();

        let pathways = PATHWAYS
            .iter()
            .filter_map(|pathway| {
                config
                    .pathways
                    .role_for(pathway.slug)
                    .map(|role_id| (role_id, pathway))
            })
            .collect();

        Self {
            tiers,
            pathways,
            staff: config.staff.iter().copied().collect(),
        }
    }

    /// Highest-ranked tier whose role is held, if any.
    pub fn get_member_tier(&self, roles: &[u64]) -> Option<&'static Tier> {
        let mut best: Option<&'static Tier> = None;
        for (role_id, tier) in &self.tiers {
            if roles.contains(role_id) && best.is_none_or(|current| tier.rank > current.rank) {
                best = Some(tier);
            }
        }
        best
    }

    /// Every pathway whose role is held, in table order.
    pub fn get_pathway_roles(&self, roles: &[u64]) -> Vec<&'static Pathway> {
        self.pathways
            .iter()
            .filter(|(role_id, _)| roles.contains(role_id))
            .map(|(_, pathway)| *pathway)
            .collect()
    }

    pub fn pathway_role_id(&self, slug: &str) -> Option<u64> {
        self.pathways
            .iter()
            .find(|(_, pathway)| pathway.slug == slug)
            .map(|(role_id, _)| *role_id)
    }

    pub fn is_staff(&self, roles: &[u64]) -> bool {
        roles.iter().any(|role| self.staff.contains(role))
    }

    pub fn configured_pathways(&self) -> usize {
        self.pathways.len()
    }
}
