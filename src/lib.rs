//! direwolf-monitor - bridge a direwolf packet modem log to MQTT and back
//!
//! The publish side tails direwolf's log and forwards every packet-bearing
//! line to an MQTT topic. The subscribe side classifies, decodes and renders
//! those lines as one-line colored summaries with APRS symbol icons and the
//! bearing and distance to a reference location.

pub mod classifier;
pub mod config;
pub mod formatter;
pub mod geo;
pub mod line_follower;
pub mod log_format;
pub mod metrics;
pub mod mqtt_bridge;
pub mod packet;
pub mod pipeline;
pub mod summary;
pub mod surface;
pub mod symbols;

pub use classifier::{ClassifiedLine, LineCategory, classify};
pub use geo::GeoFix;
pub use mqtt_bridge::{BrokerConfig, BrokerEvent, BrokerSession, PublishOutcome, SessionState};
pub use packet::{DecodeError, Packet, PacketKind, decode};
pub use pipeline::summarize_line;
pub use summary::{Direction, RenderedSummary, Segment};
