use crate::state::{Named, ResolvedState};
use lodestar_cache::{ResolutionCache, ResolverSet};
use lodestar_link::LinkFrame;

fn named(cache: &ResolutionCache, id: u32) -> Named {
    Named::new(id, cache.get(id).name)
}

/// Project one frame onto display state. Never blocks: misses resolve to
/// placeholder names while the caches fetch in the background.
pub fn resolve(frame: &LinkFrame, resolvers: &ResolverSet) -> ResolvedState {
    if !frame.connected {
        return ResolvedState::disconnected();
    }

    let snapshot = &frame.snapshot;
    let identity = snapshot.identity.clone().unwrap_or_default();
    let context = &snapshot.context;
    let ui = context.ui_state;
    let map_id = if context.map_id != 0 {
        context.map_id
    } else {
        identity.map_id
    };

    ResolvedState {
        connected: true,
        profession: named(&resolvers.profession, identity.profession),
        specialization: named(&resolvers.specialization, identity.specialization),
        map: named(&resolvers.map, map_id),
        game_mode: named(&resolvers.map_type, context.map_type),
        mount: named(&resolvers.mount, u32::from(context.mount_index)),
        wvw_team: named(&resolvers.wvw_team, identity.team_color_id),
        commander: identity.commander,
        character_name: identity.name,
        map_open: ui.map_open(),
        compass_top_right: ui.compass_top_right(),
        compass_rotating: ui.compass_rotating(),
        game_has_focus: ui.game_has_focus(),
        competitive_mode: ui.competitive_mode(),
        textbox_has_focus: ui.textbox_has_focus(),
        in_combat: ui.in_combat(),
    }
}
