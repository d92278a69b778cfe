diesel::table! {
    appeals (id) {
        id -> BigInt,
        kind -> Text,
        discord_id -> Nullable<Text>,
        discord_username -> Nullable<Text>,
        reason -> Text,
        appeal_text -> Text,
        contact_email -> Nullable<Text>,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    analytics (id) {
        id -> BigInt,
        event_type -> Text,
        metadata -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    member_stats (user_id) {
        user_id -> Text,
        xp -> BigInt,
        level -> Integer,
        roles -> Text,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    content (content_key) {
        content_key -> Text,
        title -> Text,
        body -> Text,
        updated_by -> Text,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    events (id) {
        id -> BigInt,
        title -> Text,
        description -> Text,
        pathway -> Nullable<Text>,
        starts_at -> Timestamptz,
        ends_at -> Nullable<Timestamptz>,
        location -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    mod_logs (id) {
        id -> BigInt,
        action -> Text,
        target_id -> Text,
        moderator -> Text,
        reason -> Nullable<Text>,
        duration_minutes -> Nullable<Integer>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    admin_logs (id) {
        id -> BigInt,
        actor -> Text,
        action -> Text,
        details -> Text,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    appeals,
    analytics,
    member_stats,
    content,
    events,
    mod_logs,
    admin_logs,
);
