//! The composite device: identity, strings, registered interfaces, and
//! the composed configuration descriptor.

use core::fmt::Write as _;

use heapless::String;

use crate::config::{
    CDC_INSTANCE_MAX, CONFIG_DESC_BUFFER_SIZE, DEVICE_BCD, EP0_SIZE, LANGUAGE_ID,
    SERIAL_ID_MAX_BYTES, USB_BCD, USB_MANUFACTURER, USB_MAX_POWER_MA, USB_PID, USB_PRODUCT,
    USB_VID,
};
use crate::descriptor::standard::{ConfigurationDescriptor, DeviceDescriptor};
use crate::descriptor::string::StringDescriptor;
use crate::descriptor::CLASS_MISC;
use crate::error::{Error, Resource};
use crate::port::Port;
use crate::usb::allocator::{EndpointPolicy, StringTable};
use crate::usb::composer::{self, ConfigAttributes};
use crate::usb::registry::{InterfaceProvider, InterfaceRegistry};

enum ConfigBuffer<'a> {
    Internal([u8; CONFIG_DESC_BUFFER_SIZE]),
    External(&'a mut [u8]),
}

impl ConfigBuffer<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            ConfigBuffer::Internal(buf) => &buf[..],
            ConfigBuffer::External(buf) => &buf[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            ConfigBuffer::Internal(buf) => &mut buf[..],
            ConfigBuffer::External(buf) => &mut buf[..],
        }
    }
}

/// Composite USB device.
///
/// Providers are registered by reference and must outlive the device.
/// The configuration descriptor is composed lazily the first time the
/// host asks for it after any change to the interface set.
pub struct UsbDevice<'a> {
    descriptor: DeviceDescriptor,
    language_id: u16,
    manufacturer: &'a str,
    product: &'a str,
    serial: Option<&'a str>,
    serial_fallback: String<{ 2 * SERIAL_ID_MAX_BYTES }>,
    strings: StringTable<'a>,
    registry: InterfaceRegistry<'a>,
    policy: EndpointPolicy,
    attrs: ConfigAttributes,
    config: ConfigBuffer<'a>,
    /// Length of the composed configuration; 0 when it must be rebuilt.
    config_len: usize,
    cdc_slots: u8,
    initialized: bool,
}

impl Default for UsbDevice<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> UsbDevice<'a> {
    pub fn new() -> Self {
        Self {
            descriptor: DeviceDescriptor {
                bcd_usb: USB_BCD,
                // Misc / common class / IAD, required for multi-interface
                // functions such as CDC and MIDI.
                device_class: CLASS_MISC,
                device_subclass: 0x02,
                device_protocol: 0x01,
                max_packet_size_0: EP0_SIZE,
                vendor_id: USB_VID,
                product_id: USB_PID,
                bcd_device: DEVICE_BCD,
                manufacturer: StringTable::MANUFACTURER,
                product: StringTable::PRODUCT,
                serial_number: StringTable::SERIAL,
                num_configurations: 1,
            },
            language_id: LANGUAGE_ID,
            manufacturer: USB_MANUFACTURER,
            product: USB_PRODUCT,
            serial: None,
            serial_fallback: String::new(),
            strings: StringTable::new(),
            registry: InterfaceRegistry::new(),
            policy: EndpointPolicy::DEFAULT,
            attrs: ConfigAttributes {
                attributes: ConfigurationDescriptor::ATTR_BUS_POWERED
                    | ConfigurationDescriptor::ATTR_REMOTE_WAKEUP,
                max_power_ma: USB_MAX_POWER_MA,
            },
            config: ConfigBuffer::Internal([0; CONFIG_DESC_BUFFER_SIZE]),
            config_len: 0,
            cdc_slots: 0,
            initialized: false,
        }
    }

    // Identity

    pub fn set_id(&mut self, vendor_id: u16, product_id: u16) {
        self.descriptor.vendor_id = vendor_id;
        self.descriptor.product_id = product_id;
    }

    /// bcdUSB.
    pub fn set_version(&mut self, bcd: u16) {
        self.descriptor.bcd_usb = bcd;
    }

    /// bcdDevice.
    pub fn set_device_version(&mut self, bcd: u16) {
        self.descriptor.bcd_device = bcd;
    }

    pub fn set_language_descriptor(&mut self, language_id: u16) {
        self.language_id = language_id;
    }

    pub fn set_manufacturer_descriptor(&mut self, text: &'a str) {
        self.manufacturer = text;
    }

    pub fn set_product_descriptor(&mut self, text: &'a str) {
        self.product = text;
    }

    /// Override the serial string. Without one the platform unique id is
    /// reported in hex.
    pub fn set_serial_descriptor(&mut self, text: &'a str) {
        self.serial = Some(text);
    }

    /// Register an extra string and return its index, or 0 when the table
    /// is full.
    pub fn add_string_descriptor(&mut self, text: &'a str) -> u8 {
        let index = self.strings.add(text);
        if index == 0 {
            warn!("string not added: {}", Error::ResourceExhausted(Resource::String));
        }
        index
    }

    pub fn set_endpoint_policy(&mut self, policy: EndpointPolicy) {
        self.policy = policy;
        self.config_len = 0;
    }

    pub fn set_max_power(&mut self, milliamps: u16) {
        self.attrs.max_power_ma = milliamps;
        self.config_len = 0;
    }

    // Lifecycle

    /// Capture the platform serial number and start the peripheral.
    pub fn begin<P: Port>(&mut self, rhport: u8, port: &P) {
        let mut id = [0u8; SERIAL_ID_MAX_BYTES];
        let n = port.serial_number(&mut id).min(SERIAL_ID_MAX_BYTES);
        self.serial_fallback.clear();
        for b in &id[..n] {
            // Capacity is exactly two digits per id byte.
            let _ = write!(self.serial_fallback, "{:02X}", b);
        }

        port.init_device(rhport);
        self.initialized = true;
        info!("USB device started on rhport {}", rhport);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // Interfaces

    /// Append a provider. Its descriptor is placed after every provider
    /// registered before it.
    pub fn add_interface(&mut self, provider: &'a dyn InterfaceProvider) -> Result<(), Error> {
        self.registry.add(provider)?;
        self.config_len = 0;
        Ok(())
    }

    pub fn remove_interface(&mut self, provider: &dyn InterfaceProvider) -> bool {
        let removed = self.registry.remove(provider);
        if removed {
            self.config_len = 0;
        }
        removed
    }

    /// Drop every registered provider. CDC instance slots stay with the
    /// sessions that own them.
    pub fn clear_configuration(&mut self) {
        self.registry.clear();
        self.config_len = 0;
    }

    /// Force the next configuration request to recompose, for providers
    /// whose descriptor content changed after registration.
    pub fn invalidate_configuration(&mut self) {
        self.config_len = 0;
    }

    pub fn interface_providers(&self) -> &[&'a dyn InterfaceProvider] {
        self.registry.as_slice()
    }

    /// Compose into `buf` instead of the built-in buffer.
    pub fn set_configuration_buffer(&mut self, buf: &'a mut [u8]) {
        self.config = ConfigBuffer::External(buf);
        self.config_len = 0;
    }

    // Descriptors

    /// Build the configuration descriptor from the registered providers.
    pub fn compose(&mut self) -> Result<&[u8], Error> {
        let composition = composer::compose(
            self.registry.as_slice(),
            self.policy,
            self.attrs,
            self.config.as_mut_slice(),
        );
        match composition {
            Ok(c) => {
                debug!(
                    "configuration composed: {} bytes, {} interfaces",
                    c.len,
                    c.interfaces
                );
                self.config_len = c.len;
                Ok(&self.config.as_slice()[..c.len])
            }
            Err(e) => {
                self.config_len = 0;
                Err(e)
            }
        }
    }

    /// Answer a GET_DESCRIPTOR(Configuration) request. Returns `None` when
    /// the configuration cannot be built; the reason is logged.
    pub fn configuration_descriptor(&mut self, index: u8) -> Option<&[u8]> {
        if index != 0 {
            return None;
        }
        if self.config_len == 0 {
            if let Err(e) = self.compose() {
                error!("configuration descriptor unavailable: {}", e);
                return None;
            }
        }
        Some(&self.config.as_slice()[..self.config_len])
    }

    pub fn device_descriptor(&self) -> [u8; DeviceDescriptor::LEN] {
        self.descriptor.to_bytes()
    }

    /// Answer a GET_DESCRIPTOR(String) request. Only one language is
    /// supported, so `language_id` is not consulted.
    pub fn string_descriptor(&self, index: u8, _language_id: u16) -> Option<StringDescriptor> {
        let text = match index {
            0 => return Some(StringDescriptor::languages(self.language_id)),
            StringTable::MANUFACTURER => self.manufacturer,
            StringTable::PRODUCT => self.product,
            StringTable::SERIAL => self.serial.unwrap_or(self.serial_fallback.as_str()),
            _ => self.strings.get(index)?,
        };
        Some(StringDescriptor::encode(text))
    }

    // CDC instances

    /// Claim the lowest free CDC instance number.
    pub fn alloc_cdc_instance(&mut self) -> Option<u8> {
        let free = (0..CDC_INSTANCE_MAX).find(|i| self.cdc_slots & (1 << i) == 0)?;
        self.cdc_slots |= 1 << free;
        Some(free)
    }

    pub fn release_cdc_instance(&mut self, instance: u8) {
        if instance < CDC_INSTANCE_MAX {
            self.cdc_slots &= !(1 << instance);
        }
    }

    /// Number of CDC instances currently claimed.
    pub fn cdc_instance_count(&self) -> u8 {
        self.cdc_slots.count_ones() as u8
    }
}
