use serde::{Deserialize, Serialize};

/// Device frames shipped with the app. Their screen cutout is part of the
/// frame's visual template, so no calibration data exists for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinDevice {
    Iphone,
    Android,
    Ipad,
    Macbook,
}

impl BuiltinDevice {
    pub const ALL: [BuiltinDevice; 4] = [
        BuiltinDevice::Iphone,
        BuiltinDevice::Android,
        BuiltinDevice::Ipad,
        BuiltinDevice::Macbook,
    ];

    /// Identifier used by the shell's device buttons and in export file names.
    pub fn id(&self) -> &'static str {
        match self {
            BuiltinDevice::Iphone => "iphone",
            BuiltinDevice::Android => "android",
            BuiltinDevice::Ipad => "ipad",
            BuiltinDevice::Macbook => "macbook",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BuiltinDevice::Iphone => "iPhone",
            BuiltinDevice::Android => "Android",
            BuiltinDevice::Ipad => "iPad",
            BuiltinDevice::Macbook => "MacBook",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.id() == id)
    }
}
