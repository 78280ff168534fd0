//! Translation of UCT transport names into `ucx+` provider identifiers.
//!
//! libuct reports transports by resource name (`rc_mlx5`, `ud_verbs`,
//! `dc_mlx5`), while consumers select them by the UCX transport aliases
//! (`rc_x`, `ud_v`, `dc`). See the UCX FAQ, "List of main transports and
//! aliases".

use fabric_types::ProviderSet;

/// Prefix of every UCX provider identifier.
pub const UCX_PROVIDER_PREFIX: &str = "ucx+";

/// Transports that also match their bare alias (e.g. `rc` for `rc_mlx5`).
const GENERIC_TRANSPORT_ALIASES: [&str; 2] = ["rc", "ud"];

/// Returns the provider identifiers a transport can be selected by.
///
/// The set always holds [`provider_id`] of the transport. `rc_*` and `ud_*`
/// transports additionally map to the provider for their bare alias.
pub fn provider_set(transport: &str) -> ProviderSet {
    let mut providers = ProviderSet::new();
    providers.insert(provider_id(transport));

    if should_add_generic(transport) {
        providers.insert(provider_id(generic_transport(transport)));
    }
    providers
}

/// Maps one transport name to its provider identifier.
pub fn provider_id(transport: &str) -> String {
    let mut pieces: Vec<&str> = transport.split('_').collect();
    if pieces.len() < 2 {
        return format!("{}{}", UCX_PROVIDER_PREFIX, transport);
    }

    if pieces[0] == "dc" {
        pieces.truncate(1);
    } else if pieces[1] == "verbs" {
        pieces[1] = "v";
    } else if pieces[1].starts_with("mlx") {
        // accelerated Mellanox transport
        pieces[1] = "x";
    }
    format!("{}{}", UCX_PROVIDER_PREFIX, pieces.join("_"))
}

fn generic_transport(transport: &str) -> &str {
    transport.split('_').next().unwrap_or(transport)
}

fn should_add_generic(transport: &str) -> bool {
    GENERIC_TRANSPORT_ALIASES.iter().any(|alias| {
        transport
            .strip_prefix(alias)
            .is_some_and(|rest| rest.starts_with('_'))
    })
}
