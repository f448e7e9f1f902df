//! Test helpers and utilities for integration tests

use lamp_agent::config::AgentConfig;
use lamp_agent::gpio::MemoryPin;
use lamp_agent::protocol::ProtocolVariant;
use lamp_agent::testing::mocks::MockTransport;
use lamp_agent::AgentLifecycle;

/// Configuration for the given variant using the simulated pin backend
#[allow(dead_code)]
pub fn test_config(variant: ProtocolVariant) -> AgentConfig {
    let protocol = match variant {
        ProtocolVariant::Boolean => "boolean",
        ProtocolVariant::Word => "word",
        ProtocolVariant::Minimal => "minimal",
    };

    AgentConfig::from_toml_str(&format!(
        r#"
[agent]
id = "test-lamp"

[mqtt]
broker_url = "mqtt://localhost:1883"

[gpio]
pin = 24
backend = "memory"

[lamp]
protocol = "{protocol}"
topic_base = "bedroom/lamp"
"#
    ))
    .unwrap()
}

/// A lifecycle wired to a fresh pin and mock transport, plus handles to both
#[allow(dead_code)]
pub fn test_lifecycle(
    variant: ProtocolVariant,
) -> (
    AgentLifecycle<MemoryPin, MockTransport>,
    MemoryPin,
    MockTransport,
) {
    lifecycle_from_config(&test_config(variant))
}

#[allow(dead_code)]
pub fn lifecycle_from_config(
    config: &AgentConfig,
) -> (
    AgentLifecycle<MemoryPin, MockTransport>,
    MemoryPin,
    MockTransport,
) {
    let pin = MemoryPin::new(config.gpio.pin);
    let transport = MockTransport::new();
    let lifecycle = AgentLifecycle::new(config, pin.clone(), transport.clone()).unwrap();
    (lifecycle, pin, transport)
}
