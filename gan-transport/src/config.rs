//! GATT service/characteristic UUIDs and command opcode tables, one set per
//! protocol generation. These are fixed by the device firmware, not
//! user-tunable, so they live here as `pub const`s rather than a loaded
//! config file.

/// GATT identifiers for a single protocol generation.
pub struct GattProfile {
    pub service_uuid: &'static str,
    pub command_uuid: &'static str,
    pub state_uuid: &'static str,
}

pub const GEN2_PROFILE: GattProfile = GattProfile {
    service_uuid: "0000fff0-0000-1000-8000-00805f9b34fb",
    command_uuid: "0000fff3-0000-1000-8000-00805f9b34fb",
    state_uuid: "0000fff2-0000-1000-8000-00805f9b34fb",
};

pub const GEN3_PROFILE: GattProfile = GattProfile {
    service_uuid: "8653000a-43e6-47b7-9cb0-5fc21d4ae340",
    command_uuid: "8653000c-43e6-47b7-9cb0-5fc21d4ae340",
    state_uuid: "8653000b-43e6-47b7-9cb0-5fc21d4ae340",
};

pub const GEN4_PROFILE: GattProfile = GattProfile {
    service_uuid: "6e400001-b5a3-f393-e0a9-e50e24dcca9e",
    command_uuid: "28be4a4a-cd67-11e9-a32f-2a2ae2dbcce4",
    state_uuid: "28be4cb6-cd67-11e9-a32f-2a2ae2dbcce4",
};

pub const TIMER_PROFILE: GattProfile = GattProfile {
    service_uuid: "0000fff0-0000-1000-8000-00805f9b34fb",
    command_uuid: "0000fff5-0000-1000-8000-00805f9b34fb",
    state_uuid: "0000fff6-0000-1000-8000-00805f9b34fb",
};

/// Gen2 command opcodes (first byte of a 20-byte command frame).
pub mod gen2_cmd {
    pub const REQUEST_FACELETS: u8 = 0x04;
    pub const REQUEST_HARDWARE: u8 = 0x05;
    pub const REQUEST_BATTERY: u8 = 0x09;
    pub const REQUEST_RESET: u8 = 0x0A;
}

/// Gen3 command opcodes (second byte, after the fixed `0x68` prefix).
pub mod gen3_cmd {
    pub const REQUEST_FACELETS: u8 = 0x01;
    pub const REQUEST_HARDWARE: u8 = 0x04;
    pub const REQUEST_HISTORY: u8 = 0x03;
    pub const REQUEST_RESET: u8 = 0x05;
    pub const REQUEST_BATTERY: u8 = 0x07;
}

/// Gen4 command opcodes (first byte of a 20-byte command frame).
pub mod gen4_cmd {
    pub const REQUEST_FACELETS: u8 = 0xDD;
    pub const REQUEST_HARDWARE: u8 = 0xDF;
    pub const REQUEST_RESET: u8 = 0xD2;
    pub const REQUEST_HISTORY: u8 = 0xD1;
    pub const REQUEST_BATTERY: u8 = 0xEF;
}

/// The fixed 12-byte "solved state" literal embedded in every generation's
/// reset command at a generation-specific offset.
pub const RESET_TO_SOLVED: [u8; 12] = [
    0x39, 0x77, 0x00, 0x00, 0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0x00, 0x00,
];
