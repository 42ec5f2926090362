pub mod decoder;
pub mod types;

pub use decoder::{assign_channels, decode_error_bitmask, guess_color, percentage};
pub use types::{
    Channel, ColorLevels, DataSource, Device, DeviceKind, PollResult, SupplyReading,
};
