use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment};
use log::info;

use super::models::Settings;

pub fn load_config() -> Result<Settings, ConfigError> {
    // As Rust has no native support for .env files,
    // we use the dotenv_flow crate to import to actual ENV vars.
    if let Ok(dotenv_path) = dotenv_flow::dotenv_flow() {
        info!("Loaded dotenv file: {:?}", dotenv_path);
    }

    with_defaults(Config::builder())?
        .add_source(Environment::default()
            .prefix("PF2M")
            .separator("_")
            .prefix_separator("_")
            .try_parsing(true))
        .build()?
        .try_deserialize()
}

pub fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("mqtt.host", "localhost")?
        .set_default("mqtt.port", "1883")?
        .set_default("mqtt.secure", "false")?
        .set_default("mqtt.ignoretlserrors", "false")?
        .set_default("mqtt.username", "")?
        .set_default("mqtt.password", "")?
        .set_default("mqtt.clientid", "printflow2mqtt")?
        .set_default("mqtt.roottopic", "printflow")?
        .set_default("printhost.uri", "http://localhost:9091/")?
        .set_default("printhost.printer", "")?
        .set_default("printhost.fetchtimeout", "800ms")?
        .set_default("schedule.fast", "1s")?
        .set_default("schedule.slow", "3s")?
        .set_default("store.path", "printflow2mqtt-state.json")?
        .set_default("panel.initialpage", "idle")?
        .set_default("sentrydsn", "")
}
