//! Handler set.
//!
//! Each plugin exposes plain async handlers; [`registrations`] wires them to
//! predicates, access tiers and priority groups.
//!
//! Groups run in order:
//! - 0: audio-only enforcement and commands
//! - 1: roster sync
//! - 2: points, note lookup, welcome flow
//! - 3: service message cleanup

pub mod audio_only;
pub mod members;
pub mod misc;
pub mod notes;
pub mod points;
pub mod welcome;

use crate::bot::{endpoint, HandlerRegistration, Predicate};
use crate::events::EventTag;
use crate::permissions::AccessTier;

/// Every handler the engine knows about.
pub fn registrations() -> Vec<HandlerRegistration> {
    vec![
        // Group 0
        HandlerRegistration::new(
            "audio_only_enforce",
            Predicate::Kind(EventTag::Message),
            endpoint(audio_only::enforce),
        )
        .tier(AccessTier::None)
        .quiet()
        .home_only(),
        HandlerRegistration::new("start", Predicate::Command("start"), endpoint(misc::start)),
        HandlerRegistration::new("reverse", Predicate::Command("reverse"), endpoint(misc::reverse)),
        HandlerRegistration::new("echo", Predicate::Command("echo"), endpoint(misc::echo))
            .tier(AccessTier::Sudo),
        HandlerRegistration::new(
            "audio_only",
            Predicate::Command("audio_only"),
            endpoint(audio_only::audio_only),
        )
        .tier(AccessTier::Owner),
        HandlerRegistration::new(
            "update_group_members",
            Predicate::Command("update_group_members"),
            endpoint(members::update_group_members),
        )
        .tier(AccessTier::Owner),
        HandlerRegistration::new(
            "top_points",
            Predicate::Command("top_points"),
            endpoint(points::top_points),
        ),
        HandlerRegistration::new(
            "group_notes",
            Predicate::Command("group_notes"),
            endpoint(notes::group_notes),
        ),
        HandlerRegistration::new(
            "save_group_note",
            Predicate::Command("save_group_note"),
            endpoint(notes::save_group_note),
        )
        .tier(AccessTier::Owner)
        .serialize_on(notes::note_tag),
        HandlerRegistration::new(
            "remove_group_note",
            Predicate::Command("remove_group_note"),
            endpoint(notes::remove_group_note),
        )
        .tier(AccessTier::Owner)
        .serialize_on(notes::note_tag),
        // Group 1
        HandlerRegistration::new(
            "roster_sync",
            Predicate::Kind(EventTag::MembershipChange),
            endpoint(members::sync_roster),
        )
        .group(1)
        .tier(AccessTier::None)
        .home_only()
        .serialize_on(members::leaving_balance),
        // Group 2
        HandlerRegistration::new(
            "add_points",
            Predicate::reply_pattern(&points::ADD_POINTS_RE),
            endpoint(points::add_points),
        )
        .group(2)
        .home_only()
        .serialize_on(points::receiver_balance),
        HandlerRegistration::new(
            "remove_points",
            Predicate::reply_pattern(&points::REMOVE_POINTS_RE),
            endpoint(points::remove_points),
        )
        .group(2)
        .home_only()
        .serialize_on(points::receiver_balance),
        HandlerRegistration::new(
            "get_group_note",
            Predicate::pattern(&notes::GET_NOTE_RE),
            endpoint(notes::get_group_note),
        )
        .group(2),
        HandlerRegistration::new(
            "welcome",
            Predicate::Kind(EventTag::MembershipChange),
            endpoint(welcome::welcome_new_members),
        )
        .group(2)
        .tier(AccessTier::None)
        .home_only(),
        HandlerRegistration::new(
            "welcome_agree",
            Predicate::Callback {
                prefix: welcome::AGREE_CALLBACK,
            },
            endpoint(welcome::welcome_agree),
        )
        .group(2)
        .tier(AccessTier::None)
        .home_only(),
        // Group 3
        HandlerRegistration::new(
            "service_cleanup",
            Predicate::Kind(EventTag::MembershipChange),
            endpoint(members::cleanup_service_message),
        )
        .group(3)
        .tier(AccessTier::None)
        .home_only(),
    ]
}
