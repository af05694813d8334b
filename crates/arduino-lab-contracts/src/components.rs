use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Closed vocabulary of parts the assistant knows about.
///
/// Identifiers double as asset keys (`2dmod/<id>.jpg`) on the headset side,
/// so the serialized form must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Arduino,
    Breadboard,
    DcMotor,
    Diode,
    FlexSensor,
    Led,
    LcdScreen,
    PhotoResistor,
    Potentiometer,
    PushButton,
    Relay,
    ServoMotor,
    SoftPotentiometer,
    TempSensor,
    Transistor,
    IntegratedCircuit,
    PiezoBuzzer,
    Resistor,
}

impl ComponentKind {
    pub const ALL: &'static [ComponentKind] = &[
        ComponentKind::Arduino,
        ComponentKind::Breadboard,
        ComponentKind::DcMotor,
        ComponentKind::Diode,
        ComponentKind::FlexSensor,
        ComponentKind::Led,
        ComponentKind::LcdScreen,
        ComponentKind::PhotoResistor,
        ComponentKind::Potentiometer,
        ComponentKind::PushButton,
        ComponentKind::Relay,
        ComponentKind::ServoMotor,
        ComponentKind::SoftPotentiometer,
        ComponentKind::TempSensor,
        ComponentKind::Transistor,
        ComponentKind::IntegratedCircuit,
        ComponentKind::PiezoBuzzer,
        ComponentKind::Resistor,
    ];

    /// Kinds offered to the vision model and seeded into a fresh inventory.
    /// Resistors are assumed to be on hand and are never scanned.
    pub const DETECTABLE: &'static [ComponentKind] = &[
        ComponentKind::Arduino,
        ComponentKind::Breadboard,
        ComponentKind::DcMotor,
        ComponentKind::Diode,
        ComponentKind::FlexSensor,
        ComponentKind::Led,
        ComponentKind::LcdScreen,
        ComponentKind::PhotoResistor,
        ComponentKind::Potentiometer,
        ComponentKind::PushButton,
        ComponentKind::Relay,
        ComponentKind::ServoMotor,
        ComponentKind::SoftPotentiometer,
        ComponentKind::TempSensor,
        ComponentKind::Transistor,
        ComponentKind::IntegratedCircuit,
        ComponentKind::PiezoBuzzer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Arduino => "arduino",
            ComponentKind::Breadboard => "breadboard",
            ComponentKind::DcMotor => "dc_motor",
            ComponentKind::Diode => "diode",
            ComponentKind::FlexSensor => "flex_sensor",
            ComponentKind::Led => "led",
            ComponentKind::LcdScreen => "lcd_screen",
            ComponentKind::PhotoResistor => "photo_resistor",
            ComponentKind::Potentiometer => "potentiometer",
            ComponentKind::PushButton => "push_button",
            ComponentKind::Relay => "relay",
            ComponentKind::ServoMotor => "servo_motor",
            ComponentKind::SoftPotentiometer => "soft_potentiometer",
            ComponentKind::TempSensor => "temp_sensor",
            ComponentKind::Transistor => "transistor",
            ComponentKind::IntegratedCircuit => "integrated_circuit",
            ComponentKind::PiezoBuzzer => "piezo_buzzer",
            ComponentKind::Resistor => "resistor",
        }
    }

    /// `photo_resistor` -> `Photo resistor`.
    pub fn display_name(self) -> String {
        let spaced = self.as_str().replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn thumbnail_path(self) -> String {
        format!("2dmod/{}.jpg", self.as_str())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown component '{0}'")]
pub struct UnknownComponent(pub String);

impl FromStr for ComponentKind {
    type Err = UnknownComponent;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        ComponentKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownComponent(raw.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub item: ComponentKind,
    pub quantity: u32,
    /// Rating such as ohms; zero means "none given".
    #[serde(
        default,
        deserialize_with = "zero_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<i64>,
}

fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.filter(|rating| *rating != 0))
}

impl Component {
    pub fn new(item: ComponentKind, quantity: u32) -> Self {
        Self {
            item,
            quantity,
            value: None,
        }
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value).filter(|value| *value != 0);
        self
    }

    /// `Photo resistor (x2)`.
    pub fn label(&self) -> String {
        format!("{} (x{})", self.item.display_name(), self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::{Component, ComponentKind};

    #[test]
    fn identifiers_round_trip_through_from_str() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.as_str().parse::<ComponentKind>(), Ok(*kind));
        }
    }

    #[test]
    fn from_str_trims_and_ignores_case() {
        assert_eq!(" LED ".parse::<ComponentKind>(), Ok(ComponentKind::Led));
        assert!("flux_capacitor".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn detectable_excludes_resistor_only() {
        assert_eq!(ComponentKind::DETECTABLE.len(), ComponentKind::ALL.len() - 1);
        assert!(!ComponentKind::DETECTABLE.contains(&ComponentKind::Resistor));
    }

    #[test]
    fn display_name_humanizes_identifier() {
        assert_eq!(ComponentKind::PhotoResistor.display_name(), "Photo resistor");
        assert_eq!(ComponentKind::Led.display_name(), "Led");
        assert_eq!(
            Component::new(ComponentKind::DcMotor, 2).label(),
            "Dc motor (x2)"
        );
    }

    #[test]
    fn unknown_component_reads_as_an_error() {
        let err = "flux_capacitor".parse::<ComponentKind>().err();
        assert_eq!(
            err.map(|err| err.to_string()).as_deref(),
            Some("unknown component 'flux_capacitor'")
        );
    }

    #[test]
    fn deserialized_zero_value_means_no_value() -> anyhow::Result<()> {
        let component: Component =
            serde_json::from_str(r#"{"item":"led","quantity":1,"value":0}"#)?;
        assert_eq!(component, Component::new(ComponentKind::Led, 1));
        assert_eq!(component.value, None);

        let rated: Component =
            serde_json::from_str(r#"{"item":"resistor","quantity":4,"value":220}"#)?;
        assert_eq!(rated.value, Some(220));
        let bare: Component = serde_json::from_str(r#"{"item":"led","quantity":2}"#)?;
        assert_eq!(bare.value, None);
        Ok(())
    }

    #[test]
    fn serde_uses_snake_case_ids() -> anyhow::Result<()> {
        let component = Component::new(ComponentKind::ServoMotor, 1).with_value(0);
        let encoded = serde_json::to_string(&component)?;
        assert_eq!(encoded, r#"{"item":"servo_motor","quantity":1}"#);
        Ok(())
    }
}
