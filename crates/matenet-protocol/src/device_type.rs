use std::fmt;

/// Kind of device found on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceType {
    /// Nothing answered, or the answer was not recognized.
    #[default]
    None,
    Hub,
    /// FX inverter/charger.
    Inverter,
    /// MX/FM charge controller.
    ChargeController,
    /// FLEXnet DC battery monitor.
    DcMonitor,
}

impl DeviceType {
    /// Every known device type, in code order.
    pub const ALL: [DeviceType; 5] = [
        DeviceType::None,
        DeviceType::Hub,
        DeviceType::Inverter,
        DeviceType::ChargeController,
        DeviceType::DcMonitor,
    ];

    /// Map a raw device type register value. `None` (the `Option`) for codes
    /// with no known device.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(DeviceType::None),
            1 => Some(DeviceType::Hub),
            2 => Some(DeviceType::Inverter),
            3 => Some(DeviceType::ChargeController),
            4 => Some(DeviceType::DcMonitor),
            _ => None,
        }
    }

    /// The register value that identifies this device type.
    pub fn code(self) -> u16 {
        match self {
            DeviceType::None => 0,
            DeviceType::Hub => 1,
            DeviceType::Inverter => 2,
            DeviceType::ChargeController => 3,
            DeviceType::DcMonitor => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceType::None => "None",
            DeviceType::Hub => "Hub",
            DeviceType::Inverter => "Inverter",
            DeviceType::ChargeController => "Charge Controller",
            DeviceType::DcMonitor => "DC Monitor",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip_through_table() {
        for device in DeviceType::ALL {
            assert_eq!(DeviceType::from_code(device.code()), Some(device));
        }
    }

    #[test]
    fn charge_controller_is_code_three() {
        assert_eq!(DeviceType::from_code(3), Some(DeviceType::ChargeController));
        assert_eq!(DeviceType::ChargeController.to_string(), "Charge Controller");
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        assert_eq!(DeviceType::from_code(5), None);
        assert_eq!(DeviceType::from_code(0xFFFF), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&DeviceType::ChargeController).unwrap();
        assert_eq!(json, "\"charge_controller\"");
    }
}
