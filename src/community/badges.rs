use serde::Serialize;

use super::RoleDirectory;
use crate::db::MemberStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Level(i32),
    AnyPathway,
    EveryPathway,
    Staff,
}

#[derive(Debug, Serialize)]
pub struct Badge {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    requirement: Requirement,
}

static BADGES: [Badge; 7] = [
    Badge {
        slug: "spark",
        name: "Spark",
        description: "Reached level 5.",
        requirement: Requirement::Level(5),
    },
    Badge {
        slug: "flame",
        name: "Flame",
        description: "Reached level 10.",
        requirement: Requirement::Level(10),
    },
    Badge {
        slug: "blaze",
        name: "Blaze",
        description: "Reached level 25.",
        requirement: Requirement::Level(25),
    },
    Badge {
        slug: "inferno",
        name: "Inferno",
        description: "Reached level 50.",
        requirement: Requirement::Level(50),
    },
    Badge {
        slug: "wayfarer",
        name: "Wayfarer",
        description: "Joined a pathway.",
        requirement: Requirement::AnyPathway,
    },
    Badge {
        slug: "polymath",
        name: "Polymath",
        description: "Walks every pathway at once.",
        requirement: Requirement::EveryPathway,
    },
    Badge {
        slug: "warden",
        name: "Warden",
        description: "Part of the Conclave staff.",
        requirement: Requirement::Staff,
    },
];

pub fn all_badges() -> &'static [Badge] {
    &BADGES
}

/// Badges earned by a member, in display order.
pub fn badges_for(
    stats: Option<&MemberStats>,
    roles: &[u64],
    directory: &RoleDirectory,
) -> Vec<&'static Badge> {
    let level = stats.map(|stats| stats.level).unwrap_or(0);
    let pathways = directory.get_pathway_roles(roles).len();
    let configured = directory.configured_pathways();

    BADGES
        .iter()
        .filter(|badge| match badge.requirement {
            Requirement::Level(required) => level >= required,
            Requirement::AnyPathway => pathways > 0,
            Requirement::EveryPathway => configured > 0 && pathways == configured,
            Requirement::Staff => directory.is_staff(roles),
        })
        .collect()
}
