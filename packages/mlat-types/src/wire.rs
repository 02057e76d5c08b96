//! wire.rs — ASCII datagram protocol between the controller's dealer and the
//! node routers.
//!
//! One request frame per expected reply; the transport's peer identity
//! (the datagram source address) routes each reply back to its requester.
//!
//! - Request body: `"GetDistance"`
//! - Reply body:   `"<node_id>:<distance>"` (distance in the host's default
//!   float formatting)
//! - Unknown request → literal reply `"Error"`

/// Request body sent by the dealer to every node router.
pub const GET_DISTANCE: &str = "GetDistance";

/// Reply body for any request the router does not understand.
pub const ERROR_REPLY: &str = "Error";

/// Format a router reply for the given node and its last measured distance.
pub fn format_distance_reply(node_id: i32, distance: f64) -> String {
    format!("{node_id}:{distance}")
}

/// Parse a `"<node_id>:<distance>"` reply. Returns `None` for anything else,
/// including the `"Error"` reply.
pub fn parse_distance_reply(body: &str) -> Option<(i32, f64)> {
    let (id, dist) = body.split_once(':')?;
    Some((id.parse().ok()?, dist.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_round_trip() {
        let reply = format_distance_reply(3, 6.708203932499369);
        assert_eq!(parse_distance_reply(&reply), Some((3, 6.708203932499369)));
    }

    #[test]
    fn infinity_survives_formatting() {
        // A node that has not measured yet reports +∞; "inf" parses back.
        let reply = format_distance_reply(1, f64::INFINITY);
        let (id, dist) = parse_distance_reply(&reply).unwrap();
        assert_eq!(id, 1);
        assert!(dist.is_infinite());
    }

    #[test]
    fn malformed_replies_rejected() {
        assert_eq!(parse_distance_reply(ERROR_REPLY), None);
        assert_eq!(parse_distance_reply("GetDistance"), None);
        assert_eq!(parse_distance_reply("1;2.0"), None);
        assert_eq!(parse_distance_reply("abc:2.0"), None);
        assert_eq!(parse_distance_reply("1:abc"), None);
        assert_eq!(parse_distance_reply(""), None);
    }
}
