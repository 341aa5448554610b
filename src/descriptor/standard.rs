//! Standard USB 2.0 descriptors (chapter 9).
//!
//! Each type owns its fields in wire order and serialises with
//! `to_bytes`, so layouts are exact without packed structs.

use super::{
    le16, TransferType, DESC_CONFIGURATION, DESC_DEVICE, DESC_ENDPOINT, DESC_INTERFACE,
    DESC_INTERFACE_ASSOCIATION,
};

/// Device descriptor (Table 9-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub bcd_usb: u16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size_0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub bcd_device: u16,
    pub manufacturer: u8,
    pub product: u8,
    pub serial_number: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub const LEN: usize = 18;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let usb = le16(self.bcd_usb);
        let vid = le16(self.vendor_id);
        let pid = le16(self.product_id);
        let dev = le16(self.bcd_device);
        [
            Self::LEN as u8,
            DESC_DEVICE,
            usb[0],
            usb[1],
            self.device_class,
            self.device_subclass,
            self.device_protocol,
            self.max_packet_size_0,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            dev[0],
            dev[1],
            self.manufacturer,
            self.product,
            self.serial_number,
            self.num_configurations,
        ]
    }
}

/// Configuration descriptor header (Table 9-10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration: u8,
    pub attributes: u8,
    /// In 2 mA units.
    pub max_power: u8,
}

impl ConfigurationDescriptor {
    pub const LEN: usize = 9;

    /// Reserved bit 7, always set.
    pub const ATTR_BUS_POWERED: u8 = 0x80;
    pub const ATTR_SELF_POWERED: u8 = 0x40;
    pub const ATTR_REMOTE_WAKEUP: u8 = 0x20;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let total = le16(self.total_length);
        [
            Self::LEN as u8,
            DESC_CONFIGURATION,
            total[0],
            total[1],
            self.num_interfaces,
            self.configuration_value,
            self.configuration,
            self.attributes,
            self.max_power,
        ]
    }
}

/// Interface association descriptor (IAD ECN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAssociationDescriptor {
    pub first_interface: u8,
    pub interface_count: u8,
    pub function_class: u8,
    pub function_subclass: u8,
    pub function_protocol: u8,
    pub function: u8,
}

impl InterfaceAssociationDescriptor {
    pub const LEN: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESC_INTERFACE_ASSOCIATION,
            self.first_interface,
            self.interface_count,
            self.function_class,
            self.function_subclass,
            self.function_protocol,
            self.function,
        ]
    }
}

/// Interface descriptor (Table 9-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface: u8,
}

impl InterfaceDescriptor {
    pub const LEN: usize = 9;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESC_INTERFACE,
            self.interface_number,
            self.alternate_setting,
            self.num_endpoints,
            self.interface_class,
            self.interface_subclass,
            self.interface_protocol,
            self.interface,
        ]
    }
}

/// Endpoint descriptor (Table 9-13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub transfer: TransferType,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub const LEN: usize = 7;

    pub fn bulk(address: u8, max_packet_size: u16) -> Self {
        Self {
            address,
            transfer: TransferType::Bulk,
            max_packet_size,
            interval: 0,
        }
    }

    pub fn interrupt(address: u8, max_packet_size: u16, interval: u8) -> Self {
        Self {
            address,
            transfer: TransferType::Interrupt,
            max_packet_size,
            interval,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let size = le16(self.max_packet_size);
        [
            Self::LEN as u8,
            DESC_ENDPOINT,
            self.address,
            self.transfer as u8,
            size[0],
            size[1],
            self.interval,
        ]
    }

    /// Audio 1.0 flavour with the trailing `bRefresh` and
    /// `bSynchAddress` bytes (9 bytes total).
    pub fn to_audio_bytes(&self) -> [u8; 9] {
        let b = self.to_bytes();
        [9, b[1], b[2], b[3], b[4], b[5], b[6], 0, 0]
    }
}
