use serde_json::Value;

use crate::engine::models::ServerState;

/// Map a free-form state string such as `"Online"` or `" manutenção "`.
pub fn parse_server_state(raw: &str) -> Option<ServerState> {
    match raw.trim().to_lowercase().as_str() {
        "online" => Some(ServerState::Online),
        "maintenance" | "manutenção" | "manutencao" => Some(ServerState::Maintenance),
        "offline" => Some(ServerState::Offline),
        _ => None,
    }
}

/// Interpret a status payload, returning `None` when nothing in it is conclusive.
///
/// Backends disagree on the shape, so a string `state` (or `status` when
/// `state` is not a string) wins, then a boolean `online`, then a
/// `maintenance: true` flag.
pub fn extract_server_state(payload: &Value) -> Option<ServerState> {
    let object = payload.as_object()?;

    let label = object
        .get("state")
        .and_then(Value::as_str)
        .or_else(|| object.get("status").and_then(Value::as_str));
    if let Some(state) = label.and_then(parse_server_state) {
        return Some(state);
    }

    if let Some(online) = object.get("online").and_then(Value::as_bool) {
        return Some(if online {
            ServerState::Online
        } else {
            ServerState::Offline
        });
    }

    if object.get("maintenance").and_then(Value::as_bool) == Some(true) {
        return Some(ServerState::Maintenance);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_state_strings_case_insensitively() {
        assert_eq!(parse_server_state(" ONLINE "), Some(ServerState::Online));
        assert_eq!(parse_server_state("Manutenção"), Some(ServerState::Maintenance));
        assert_eq!(parse_server_state("manutencao"), Some(ServerState::Maintenance));
        assert_eq!(parse_server_state("Offline"), Some(ServerState::Offline));
        assert_eq!(parse_server_state("degraded"), None);
        assert_eq!(parse_server_state(""), None);
    }

    #[test]
    fn prefers_string_state_fields() {
        assert_eq!(
            extract_server_state(&json!({"state": "Manutenção"})),
            Some(ServerState::Maintenance)
        );
        assert_eq!(
            extract_server_state(&json!({"status": "offline", "online": true})),
            Some(ServerState::Offline)
        );
        assert_eq!(
            extract_server_state(&json!({"state": 3, "status": "online"})),
            Some(ServerState::Online)
        );
    }

    #[test]
    fn unrecognised_strings_fall_through_to_booleans() {
        assert_eq!(
            extract_server_state(&json!({"state": "degraded", "online": false})),
            Some(ServerState::Offline)
        );
        assert_eq!(
            extract_server_state(&json!({"status": "??", "maintenance": true})),
            Some(ServerState::Maintenance)
        );
    }

    #[test]
    fn boolean_flags_follow_precedence() {
        assert_eq!(
            extract_server_state(&json!({"online": false})),
            Some(ServerState::Offline)
        );
        assert_eq!(
            extract_server_state(&json!({"maintenance": true})),
            Some(ServerState::Maintenance)
        );
        assert_eq!(
            extract_server_state(&json!({"online": true, "maintenance": true})),
            Some(ServerState::Online)
        );
    }

    #[test]
    fn inconclusive_payloads_yield_nothing() {
        assert_eq!(extract_server_state(&json!({})), None);
        assert_eq!(extract_server_state(&json!({"maintenance": false})), None);
        assert_eq!(extract_server_state(&json!({"online": "yes"})), None);
        assert_eq!(extract_server_state(&json!(["online"])), None);
        assert_eq!(extract_server_state(&json!("online")), None);
    }
}
