//! UVC 1.5 bulk-streaming camera interface provider.
//!
//! One VideoControl interface (camera terminal feeding an output terminal)
//! and one VideoStreaming interface carrying a single uncompressed format
//! with one continuous-interval frame. The five class-specific parts are
//! supplied by the application; lengths and subtypes are fixed here.

use crate::config::BULK_PACKET_SIZE;
use crate::descriptor::standard::{
    EndpointDescriptor, InterfaceAssociationDescriptor, InterfaceDescriptor,
};
use crate::descriptor::{le16, DescriptorWriter, CLASS_VIDEO, DESC_CS_INTERFACE};
use crate::error::Error;
use crate::usb::allocator::{Direction, ResourceAllocator};
use crate::usb::{InterfaceProvider, UsbDevice};

const SUBCLASS_CONTROL: u8 = 0x01;
const SUBCLASS_STREAMING: u8 = 0x02;
const SUBCLASS_INTERFACE_COLLECTION: u8 = 0x03;
const PROTOCOL_15: u8 = 0x01;

const UVC_VERSION: u16 = 0x0150;
const CLOCK_FREQUENCY_HZ: u32 = 27_000_000;

// VideoControl subtypes
const VC_HEADER: u8 = 0x01;
const VC_INPUT_TERMINAL: u8 = 0x02;
const VC_OUTPUT_TERMINAL: u8 = 0x03;

// VideoStreaming subtypes
const VS_INPUT_HEADER: u8 = 0x01;
const VS_FORMAT_UNCOMPRESSED: u8 = 0x04;
const VS_FRAME_UNCOMPRESSED: u8 = 0x05;
const VS_COLORFORMAT: u8 = 0x0D;

const VC_HEADER_LEN: usize = 13;
const VS_INPUT_HEADER_LEN: usize = 14;

/// ITT_CAMERA.
pub const TERMINAL_TYPE_CAMERA: u16 = 0x0201;
/// TT_STREAMING.
pub const TERMINAL_TYPE_STREAMING: u16 = 0x0101;

/// GUID for YUY2 (4:2:2 packed).
pub const GUID_YUY2: [u8; 16] = [
    0x59, 0x55, 0x59, 0x32, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];
/// GUID for NV12 (4:2:0 planar).
pub const GUID_NV12: [u8; 16] = [
    0x4E, 0x56, 0x31, 0x32, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// Camera input terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraTerminal {
    pub terminal_id: u8,
    pub assoc_terminal: u8,
    pub terminal: u8,
    pub objective_focal_length_min: u16,
    pub objective_focal_length_max: u16,
    pub ocular_focal_length: u16,
    /// Supported camera controls, 24 bits.
    pub controls: u32,
}

impl CameraTerminal {
    pub const LEN: usize = 18;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let ty = le16(TERMINAL_TYPE_CAMERA);
        let min = le16(self.objective_focal_length_min);
        let max = le16(self.objective_focal_length_max);
        let ocular = le16(self.ocular_focal_length);
        let controls = self.controls.to_le_bytes();
        [
            Self::LEN as u8,
            DESC_CS_INTERFACE,
            VC_INPUT_TERMINAL,
            self.terminal_id,
            ty[0],
            ty[1],
            self.assoc_terminal,
            self.terminal,
            min[0],
            min[1],
            max[0],
            max[1],
            ocular[0],
            ocular[1],
            3,
            controls[0],
            controls[1],
            controls[2],
        ]
    }
}

/// Streaming output terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputTerminal {
    pub terminal_id: u8,
    pub assoc_terminal: u8,
    pub source_id: u8,
    pub terminal: u8,
}

impl OutputTerminal {
    pub const LEN: usize = 9;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let ty = le16(TERMINAL_TYPE_STREAMING);
        [
            Self::LEN as u8,
            DESC_CS_INTERFACE,
            VC_OUTPUT_TERMINAL,
            self.terminal_id,
            ty[0],
            ty[1],
            self.assoc_terminal,
            self.source_id,
            self.terminal,
        ]
    }
}

/// Uncompressed video format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UncompressedFormat {
    pub format_index: u8,
    pub num_frame_descriptors: u8,
    pub guid: [u8; 16],
    pub bits_per_pixel: u8,
    pub default_frame_index: u8,
    pub aspect_ratio_x: u8,
    pub aspect_ratio_y: u8,
    pub interlace_flags: u8,
    pub copy_protect: u8,
}

impl UncompressedFormat {
    pub const LEN: usize = 27;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut b = [0u8; Self::LEN];
        b[..5].copy_from_slice(&[
            Self::LEN as u8,
            DESC_CS_INTERFACE,
            VS_FORMAT_UNCOMPRESSED,
            self.format_index,
            self.num_frame_descriptors,
        ]);
        b[5..21].copy_from_slice(&self.guid);
        b[21..].copy_from_slice(&[
            self.bits_per_pixel,
            self.default_frame_index,
            self.aspect_ratio_x,
            self.aspect_ratio_y,
            self.interlace_flags,
            self.copy_protect,
        ]);
        b
    }
}

/// Uncompressed frame with a continuous frame interval range.
/// Intervals are in 100 ns units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UncompressedFrame {
    pub frame_index: u8,
    pub capabilities: u8,
    pub width: u16,
    pub height: u16,
    pub min_bit_rate: u32,
    pub max_bit_rate: u32,
    pub max_frame_buffer_size: u32,
    pub default_frame_interval: u32,
    pub min_frame_interval: u32,
    pub max_frame_interval: u32,
    pub frame_interval_step: u32,
}

impl UncompressedFrame {
    pub const LEN: usize = 38;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut b = [0u8; Self::LEN];
        b[..5].copy_from_slice(&[
            Self::LEN as u8,
            DESC_CS_INTERFACE,
            VS_FRAME_UNCOMPRESSED,
            self.frame_index,
            self.capabilities,
        ]);
        b[5..7].copy_from_slice(&le16(self.width));
        b[7..9].copy_from_slice(&le16(self.height));
        b[9..13].copy_from_slice(&self.min_bit_rate.to_le_bytes());
        b[13..17].copy_from_slice(&self.max_bit_rate.to_le_bytes());
        b[17..21].copy_from_slice(&self.max_frame_buffer_size.to_le_bytes());
        b[21..25].copy_from_slice(&self.default_frame_interval.to_le_bytes());
        // bFrameIntervalType 0: continuous
        b[25] = 0;
        b[26..30].copy_from_slice(&self.min_frame_interval.to_le_bytes());
        b[30..34].copy_from_slice(&self.max_frame_interval.to_le_bytes());
        b[34..38].copy_from_slice(&self.frame_interval_step.to_le_bytes());
        b
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMatching {
    pub color_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
}

impl Default for ColorMatching {
    /// BT.709 primaries and transfer, SMPTE 170M matrix.
    fn default() -> Self {
        Self {
            color_primaries: 1,
            transfer_characteristics: 1,
            matrix_coefficients: 4,
        }
    }
}

impl ColorMatching {
    pub const LEN: usize = 6;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESC_CS_INTERFACE,
            VS_COLORFORMAT,
            self.color_primaries,
            self.transfer_characteristics,
            self.matrix_coefficients,
        ]
    }
}

/// Length of the video function's descriptor block.
pub const VIDEO_DESCRIPTOR_LEN: usize = InterfaceAssociationDescriptor::LEN
    + InterfaceDescriptor::LEN
    + VC_HEADER_LEN
    + CameraTerminal::LEN
    + OutputTerminal::LEN
    + InterfaceDescriptor::LEN
    + VS_INPUT_HEADER_LEN
    + UncompressedFormat::LEN
    + UncompressedFrame::LEN
    + ColorMatching::LEN
    + EndpointDescriptor::LEN;

pub struct VideoInterface {
    camera: CameraTerminal,
    output: OutputTerminal,
    format: UncompressedFormat,
    frame: UncompressedFrame,
    color: ColorMatching,
    string_index: u8,
}

impl VideoInterface {
    pub fn new(
        camera: CameraTerminal,
        output: OutputTerminal,
        format: UncompressedFormat,
        frame: UncompressedFrame,
        color: ColorMatching,
    ) -> Self {
        Self {
            camera,
            output,
            format,
            frame,
            color,
            string_index: 0,
        }
    }

    /// Name both video interfaces. Call before `begin`.
    pub fn set_interface_name(&mut self, device: &mut UsbDevice<'_>, name: &'static str) -> bool {
        self.string_index = device.add_string_descriptor(name);
        self.string_index > 0
    }

    pub fn begin<'a>(&'a self, device: &mut UsbDevice<'a>) -> bool {
        match device.add_interface(self) {
            Ok(()) => true,
            Err(e) => {
                warn!("video begin: {}", e);
                false
            }
        }
    }
}

impl InterfaceProvider for VideoInterface {
    fn write_descriptor(
        &self,
        alloc: &mut ResourceAllocator,
        out: &mut DescriptorWriter<'_>,
    ) -> Result<(), Error> {
        let itf = alloc.alloc_interfaces(2)?;
        let ep_in = alloc.alloc_endpoint(Direction::In)?;
        let vs_itf = itf + 1;

        out.write(
            &InterfaceAssociationDescriptor {
                first_interface: itf,
                interface_count: 2,
                function_class: CLASS_VIDEO,
                function_subclass: SUBCLASS_INTERFACE_COLLECTION,
                function_protocol: 0,
                function: 0,
            }
            .to_bytes(),
        )?;

        // Video control
        out.write(
            &InterfaceDescriptor {
                interface_number: itf,
                alternate_setting: 0,
                num_endpoints: 0,
                interface_class: CLASS_VIDEO,
                interface_subclass: SUBCLASS_CONTROL,
                interface_protocol: PROTOCOL_15,
                interface: self.string_index,
            }
            .to_bytes(),
        )?;
        let version = le16(UVC_VERSION);
        let vc_total = le16((VC_HEADER_LEN + CameraTerminal::LEN + OutputTerminal::LEN) as u16);
        let clock = CLOCK_FREQUENCY_HZ.to_le_bytes();
        out.write(&[
            VC_HEADER_LEN as u8,
            DESC_CS_INTERFACE,
            VC_HEADER,
            version[0],
            version[1],
            vc_total[0],
            vc_total[1],
            clock[0],
            clock[1],
            clock[2],
            clock[3],
            1,
            vs_itf,
        ])?;
        out.write(&self.camera.to_bytes())?;
        out.write(&self.output.to_bytes())?;

        // Video streaming
        out.write(
            &InterfaceDescriptor {
                interface_number: vs_itf,
                alternate_setting: 0,
                num_endpoints: 1,
                interface_class: CLASS_VIDEO,
                interface_subclass: SUBCLASS_STREAMING,
                interface_protocol: PROTOCOL_15,
                interface: self.string_index,
            }
            .to_bytes(),
        )?;
        let vs_total = le16(
            (VS_INPUT_HEADER_LEN + UncompressedFormat::LEN + UncompressedFrame::LEN + ColorMatching::LEN)
                as u16,
        );
        out.write(&[
            VS_INPUT_HEADER_LEN as u8,
            DESC_CS_INTERFACE,
            VS_INPUT_HEADER,
            1,
            vs_total[0],
            vs_total[1],
            ep_in.raw(),
            0,
            self.output.terminal_id,
            0,
            0,
            0,
            1,
            0,
        ])?;
        out.write(&self.format.to_bytes())?;
        out.write(&self.frame.to_bytes())?;
        out.write(&self.color.to_bytes())?;

        let mut ep = EndpointDescriptor::bulk(ep_in.raw(), BULK_PACKET_SIZE);
        ep.interval = 1;
        out.write(&ep.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> VideoInterface {
        VideoInterface::new(
            CameraTerminal {
                terminal_id: 1,
                ..Default::default()
            },
            OutputTerminal {
                terminal_id: 2,
                source_id: 1,
                ..Default::default()
            },
            UncompressedFormat {
                format_index: 1,
                num_frame_descriptors: 1,
                guid: GUID_YUY2,
                bits_per_pixel: 16,
                default_frame_index: 1,
                aspect_ratio_x: 0,
                aspect_ratio_y: 0,
                interlace_flags: 0,
                copy_protect: 0,
            },
            UncompressedFrame {
                frame_index: 1,
                width: 128,
                height: 96,
                min_bit_rate: 128 * 96 * 16 * 10,
                max_bit_rate: 128 * 96 * 16 * 30,
                max_frame_buffer_size: 128 * 96 * 2,
                default_frame_interval: 333_333,
                min_frame_interval: 333_333,
                max_frame_interval: 1_000_000,
                frame_interval_step: 333_333,
                ..Default::default()
            },
            ColorMatching::default(),
        )
    }

    #[test]
    fn descriptor_length() {
        assert_eq!(VIDEO_DESCRIPTOR_LEN, 158);
        assert_eq!(camera().descriptor_len(), Ok(158));
    }

    #[test]
    fn descriptor_layout() {
        let video = camera();
        let mut alloc = ResourceAllocator::new(Default::default());
        alloc.alloc_interfaces(1).unwrap();
        alloc.alloc_endpoint(Direction::In).unwrap();
        let mut buf = [0u8; VIDEO_DESCRIPTOR_LEN];
        let mut out = DescriptorWriter::new(&mut buf);
        video.write_descriptor(&mut alloc, &mut out).unwrap();
        assert_eq!(out.len(), VIDEO_DESCRIPTOR_LEN);

        assert_eq!(&buf[..8], &[8, 0x0B, 1, 2, 0x0E, 0x03, 0, 0]);
        assert_eq!(&buf[8..17], &[9, 4, 1, 0, 0, 0x0E, 0x01, 0x01, 0]);
        // VC header: bcdUVC 1.50, wTotalLength 40, 27 MHz, streaming itf 2
        assert_eq!(
            &buf[17..30],
            &[13, 0x24, 0x01, 0x50, 0x01, 40, 0, 0xC0, 0xFC, 0x9B, 0x01, 1, 2]
        );
        assert_eq!(&buf[30..36], &[18, 0x24, 0x02, 1, 0x01, 0x02]);
        assert_eq!(&buf[48..57], &[9, 0x24, 0x03, 2, 0x01, 0x01, 0, 1, 0]);
        assert_eq!(&buf[57..66], &[9, 4, 2, 0, 1, 0x0E, 0x02, 0x01, 0]);
        // VS input header: wTotalLength 85, IN 0x82, terminal link 2
        assert_eq!(
            &buf[66..80],
            &[14, 0x24, 0x01, 1, 85, 0, 0x82, 0, 2, 0, 0, 0, 1, 0]
        );
        assert_eq!(&buf[80..83], &[27, 0x24, 0x04]);
        assert_eq!(&buf[85..101], &GUID_YUY2);
        assert_eq!(&buf[107..112], &[38, 0x24, 0x05, 1, 0]);
        assert_eq!(buf[107 + 25], 0);
        assert_eq!(&buf[145..151], &[6, 0x24, 0x0D, 1, 1, 4]);
        assert_eq!(&buf[151..], &[7, 5, 0x82, 2, 64, 0, 1]);
    }

    #[test]
    fn registers_with_device() {
        let mut video = camera();
        let mut device = UsbDevice::new();
        assert!(video.set_interface_name(&mut device, "Camera"));
        assert!(video.begin(&mut device));
        let config = device.configuration_descriptor(0).unwrap();
        assert_eq!(config.len(), 9 + 158);
        assert_eq!(config[9 + 8 + 8], 4);
    }
}
