pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// ICE configuration for [`WebRtcTransport`](crate::WebRtcTransport).
#[derive(Debug, Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<String>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_owned()],
        }
    }
}
