pub mod log_to_mqtt;
pub mod mqtt_to_terminal;
pub mod version;

pub use log_to_mqtt::handle_log_to_mqtt;
pub use mqtt_to_terminal::handle_mqtt_to_terminal;
pub use version::handle_version;
