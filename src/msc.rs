//! Mass-storage (bulk-only transport, SCSI transparent) interface provider.
//!
//! The protocol engine answers SCSI commands itself and asks this object
//! for the per-LUN inquiry strings, capacity and readiness.

use core::cell::Cell;

use crate::config::{BULK_PACKET_SIZE, MSC_LUN_MAX};
use crate::descriptor::standard::{EndpointDescriptor, InterfaceDescriptor};
use crate::descriptor::{DescriptorWriter, CLASS_MSC};
use crate::error::Error;
use crate::usb::allocator::{Direction, ResourceAllocator};
use crate::usb::{InterfaceProvider, UsbDevice};

const SUBCLASS_SCSI_TRANSPARENT: u8 = 0x06;
const PROTOCOL_BULK_ONLY: u8 = 0x50;

/// Per-LUN inquiry data and media state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LunInfo {
    /// SCSI vendor id, at most 8 bytes.
    pub vendor: &'static str,
    /// SCSI product id, at most 16 bytes.
    pub product: &'static str,
    /// SCSI product revision, at most 4 bytes.
    pub revision: &'static str,
    pub block_count: u32,
    pub block_size: u16,
    pub ready: bool,
}

impl Default for LunInfo {
    fn default() -> Self {
        Self {
            vendor: "",
            product: "",
            revision: "",
            block_count: 0,
            block_size: 512,
            ready: false,
        }
    }
}

pub struct MscInterface {
    luns: Cell<[LunInfo; MSC_LUN_MAX as usize]>,
    max_lun: Cell<u8>,
    string_index: Cell<u8>,
}

impl Default for MscInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl MscInterface {
    pub fn new() -> Self {
        Self {
            luns: Cell::new([LunInfo::default(); MSC_LUN_MAX as usize]),
            max_lun: Cell::new(0),
            string_index: Cell::new(0),
        }
    }

    /// Number of logical units, 1..=`MSC_LUN_MAX`.
    pub fn set_max_lun(&self, count: u8) -> bool {
        if count == 0 || count > MSC_LUN_MAX {
            return false;
        }
        self.max_lun.set(count - 1);
        true
    }

    /// Highest LUN index, as reported to GET_MAX_LUN.
    pub fn max_lun(&self) -> u8 {
        self.max_lun.get()
    }

    pub fn set_id(
        &self,
        lun: u8,
        vendor: &'static str,
        product: &'static str,
        revision: &'static str,
    ) -> bool {
        self.update(lun, |info| {
            info.vendor = vendor;
            info.product = product;
            info.revision = revision;
        })
    }

    pub fn set_capacity(&self, lun: u8, block_count: u32, block_size: u16) -> bool {
        self.update(lun, |info| {
            info.block_count = block_count;
            info.block_size = block_size;
        })
    }

    /// Media present; the engine reports "not ready" to TEST UNIT READY
    /// while this is false.
    pub fn set_unit_ready(&self, lun: u8, ready: bool) -> bool {
        self.update(lun, |info| info.ready = ready)
    }

    pub fn lun(&self, lun: u8) -> Option<LunInfo> {
        self.luns.get().get(lun as usize).copied()
    }

    fn update(&self, lun: u8, f: impl FnOnce(&mut LunInfo)) -> bool {
        let mut luns = self.luns.get();
        let Some(info) = luns.get_mut(lun as usize) else {
            return false;
        };
        f(info);
        self.luns.set(luns);
        true
    }

    pub fn set_interface_name(&self, device: &mut UsbDevice<'_>, name: &'static str) -> bool {
        let strid = device.add_string_descriptor(name);
        self.string_index.set(strid);
        device.invalidate_configuration();
        strid > 0
    }

    pub fn begin<'a>(&'a self, device: &mut UsbDevice<'a>) -> bool {
        match device.add_interface(self) {
            Ok(()) => true,
            Err(e) => {
                warn!("MSC begin: {}", e);
                false
            }
        }
    }
}

impl InterfaceProvider for MscInterface {
    fn write_descriptor(
        &self,
        alloc: &mut ResourceAllocator,
        out: &mut DescriptorWriter<'_>,
    ) -> Result<(), Error> {
        let itf = alloc.alloc_interfaces(1)?;
        let ep_out = alloc.alloc_endpoint(Direction::Out)?;
        let ep_in = alloc.alloc_endpoint(Direction::In)?;

        out.write(
            &InterfaceDescriptor {
                interface_number: itf,
                alternate_setting: 0,
                num_endpoints: 2,
                interface_class: CLASS_MSC,
                interface_subclass: SUBCLASS_SCSI_TRANSPARENT,
                interface_protocol: PROTOCOL_BULK_ONLY,
                interface: self.string_index.get(),
            }
            .to_bytes(),
        )?;
        out.write(&EndpointDescriptor::bulk(ep_out.raw(), BULK_PACKET_SIZE).to_bytes())?;
        out.write(&EndpointDescriptor::bulk(ep_in.raw(), BULK_PACKET_SIZE).to_bytes())
    }
}
