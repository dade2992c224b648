mod rtc_config;
mod webrtc_transport;

pub use rtc_config::*;
pub use webrtc_transport::*;
