// Copyright (C) 2026  Braiins Systems s.r.o.
//
// This file is part of Braiins Open-Source Initiative (BOSI).
//
// BOSI is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// Please, keep in mind that we may also license BOSI or any part thereof
// under a proprietary license. For more information on the terms and conditions
// of such proprietary license or if you have any other questions, please
// contact us at opensource@braiins.com.

//! FTDI control-transfer plumbing underneath the BitForce ASCII
//! protocol (spec.md §4.7 "Initialization sequence").
//!
//! Grounded in `bitforce_initialise`'s call sequence in
//! `driver-bitforce.c` (reset, set data characteristics, set baud, set
//! flow control, set modem control, purge TX, purge RX) and in
//! `bosminer-erupter`'s use of the `libusb` crate for direct vendor
//! control transfers.

use crate::error::DeviceError;
use std::time::Duration;

pub const BITFORCE_VID: u16 = 0x0403;
pub const BITFORCE_PID: u16 = 0x6014;

const FTDI_DEVICE_OUT: u8 = 0x40;
const SIO_RESET: u8 = 0x00;
const SIO_SET_MODEM_CTRL: u8 = 0x01;
const SIO_SET_FLOW_CTRL: u8 = 0x02;
const SIO_SET_DATA: u8 = 0x04;
const SIO_SET_BAUD_RATE: u8 = 0x03;

const SIO_RESET_PURGE_RX: u16 = 0x01;
const SIO_RESET_PURGE_TX: u16 = 0x02;

/// BitForce firmware runs the FTDI at 115200 8N1 with RTS/CTS flow
/// control; this is the divisor libftdi emits for that rate with the
/// standard 3 MHz FTDI clock.
const BAUD_115200_DIVISOR: u16 = 0x001A;
const DATA_8N1: u16 = 0x0008;
const MODEM_CTRL_DTR_RTS_HIGH: u16 = 0x0303;
const FLOW_CTRL_RTS_CTS: u16 = 0x0100;

const CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);

/// One opened FTDI endpoint. Bulk transfer endpoint addresses are the
/// conventional first in/out pair on FT232R-class chips.
pub struct FtdiHandle<'ctx> {
    handle: libusb::DeviceHandle<'ctx>,
    interface: u8,
    read_ep: u8,
    write_ep: u8,
}

impl<'ctx> FtdiHandle<'ctx> {
    pub fn open(context: &'ctx libusb::Context, bus: u8, address: u8) -> Result<Self, DeviceError> {
        let devices = context
            .devices()
            .map_err(|e| DeviceError::Usb(e.to_string()))?;

        for device in devices.iter() {
            if device.bus_number() == bus && device.address() == address {
                let handle = device
                    .open()
                    .map_err(|e| DeviceError::Usb(e.to_string()))?;
                let interface = 0;
                handle
                    .claim_interface(interface)
                    .map_err(|e| DeviceError::Usb(e.to_string()))?;
                return Ok(Self {
                    handle,
                    interface,
                    read_ep: 0x81,
                    write_ep: 0x02,
                });
            }
        }
        Err(DeviceError::Usb(format!(
            "no USB device at bus {bus} address {address}"
        )))
    }

    /// Runs the full initialization sequence: reset, set baud/data/flow
    /// control, assert modem control lines, purge both FIFOs. Mirrors
    /// the sequence `bitforce_initialise` runs on detect, on comms
    /// error, on throttle, and on thread re-enable.
    pub fn initialise(&self) -> Result<(), DeviceError> {
        self.control_out(SIO_RESET, 0x00)?;
        self.control_out(SIO_SET_DATA, DATA_8N1)?;
        self.control_out(SIO_SET_BAUD_RATE, BAUD_115200_DIVISOR)?;
        self.control_out(SIO_SET_FLOW_CTRL, FLOW_CTRL_RTS_CTS)?;
        self.control_out(SIO_SET_MODEM_CTRL, MODEM_CTRL_DTR_RTS_HIGH)?;
        self.control_out(SIO_RESET, SIO_RESET_PURGE_TX)?;
        self.control_out(SIO_RESET, SIO_RESET_PURGE_RX)?;
        Ok(())
    }

    fn control_out(&self, request: u8, value: u16) -> Result<(), DeviceError> {
        self.handle
            .write_control(
                FTDI_DEVICE_OUT,
                request,
                value,
                u16::from(self.interface) + 1,
                &[],
                CONTROL_TIMEOUT,
            )
            .map(|_| ())
            .map_err(|e| DeviceError::Usb(e.to_string()))
    }

    /// Writes `cmd` (typically a 3-byte ASCII opcode or a work frame)
    /// to the bulk-out endpoint.
    pub fn write(&self, data: &[u8]) -> Result<usize, DeviceError> {
        self.handle
            .write_bulk(self.write_ep, data, CONTROL_TIMEOUT)
            .map_err(|e| DeviceError::Usb(e.to_string()))
    }

    /// Reads up to `buf.len()` bytes from the bulk-in endpoint.
    pub fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, DeviceError> {
        self.handle
            .read_bulk(self.read_ep, buf, timeout)
            .map_err(|e| DeviceError::Usb(e.to_string()))
    }
}
