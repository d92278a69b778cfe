use serenity::all::Permissions;

/// Moderation-relevant flags reported back to the site, in display order.
const NAMED_FLAGS: [(Permissions, &str); 7] = [
    (Permissions::ADMINISTRATOR, "ADMINISTRATOR"),
    (Permissions::MANAGE_GUILD, "MANAGE_GUILD"),
    (Permissions::MANAGE_ROLES, "MANAGE_ROLES"),
    (Permissions::MANAGE_CHANNELS, "MANAGE_CHANNELS"),
    (Permissions::BAN_MEMBERS, "BAN_MEMBERS"),
    (Permissions::KICK_MEMBERS, "KICK_MEMBERS"),
    (Permissions::MODERATE_MEMBERS, "MODERATE_MEMBERS"),
];

pub fn has_permission(bits: Permissions, flag: Permissions) -> bool {
    bits.contains(Permissions::ADMINISTRATOR) || bits.contains(flag)
}

pub fn permission_names(bits: Permissions) -> Vec<&'static str> {
    NAMED_FLAGS
        .iter()
        .filter(|(flag, _)| bits.contains(*flag))
        .map(|(_, name)| *name)
        .collect()
}
