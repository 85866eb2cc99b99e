//! Radio channel control
//!
//! The hop coordinator only needs "set channel N on interface X". Platforms
//! provide that through [`ChannelControl`]; on Linux it is a wireless
//! extensions `SIOCSIWFREQ` ioctl.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Invalid interface name '{0}'")]
    InvalidInterface(String),
    #[error("Invalid channel {0}")]
    InvalidChannel(u8),
    #[error("Failed to set channel {channel} on {iface}: {source}")]
    SetChannel {
        iface: String,
        channel: u8,
        #[source]
        source: std::io::Error,
    },
    #[error("Channel control is not supported on this platform")]
    Unsupported,
}

/// Switches the channel a radio listens on
pub trait ChannelControl: Send + Sync {
    fn set_channel(&self, iface: &str, channel: u8) -> Result<(), RadioError>;
}

/// Linux wireless extensions
#[derive(Debug, Clone, Copy, Default)]
pub struct WirelessExtensions;

#[cfg(target_os = "linux")]
impl ChannelControl for WirelessExtensions {
    fn set_channel(&self, iface: &str, channel: u8) -> Result<(), RadioError> {
        if iface.is_empty() || iface.len() >= libc::IFNAMSIZ || iface.contains('\0') {
            return Err(RadioError::InvalidInterface(iface.to_string()));
        }
        if channel == 0 {
            return Err(RadioError::InvalidChannel(channel));
        }
        wext::set_channel(iface, channel).map_err(|source| RadioError::SetChannel {
            iface: iface.to_string(),
            channel,
            source,
        })
    }
}

#[cfg(not(target_os = "linux"))]
impl ChannelControl for WirelessExtensions {
    fn set_channel(&self, _iface: &str, _channel: u8) -> Result<(), RadioError> {
        Err(RadioError::Unsupported)
    }
}

#[cfg(target_os = "linux")]
mod wext {
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    const SIOCSIWFREQ: u32 = 0x8B04;

    /// `struct iw_freq`; values <= 1000 in `m` with `e == 0` are channels
    #[repr(C)]
    struct IwFreq {
        m: i32,
        e: i16,
        i: u8,
        flags: u8,
    }

    /// `struct iwreq` with the frequency member of the request union
    #[repr(C)]
    struct IwReq {
        name: [libc::c_char; libc::IFNAMSIZ],
        freq: IwFreq,
        // union iwreq_data is 16 bytes wide
        _pad: [u8; 8],
    }

    pub(super) fn set_channel(iface: &str, channel: u8) -> io::Result<()> {
        let mut req = IwReq {
            name: [0; libc::IFNAMSIZ],
            freq: IwFreq {
                m: i32::from(channel),
                e: 0,
                i: 0,
                flags: 0,
            },
            _pad: [0; 8],
        };
        for (dst, src) in req.name.iter_mut().zip(iface.as_bytes()) {
            *dst = *src as libc::c_char;
        }

        // SAFETY: plain datagram socket, ownership moves into OwnedFd
        let raw = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: req is a properly laid out iwreq that outlives the call
        let r = unsafe { libc::ioctl(fd.as_raw_fd(), SIOCSIWFREQ as _, &mut req as *mut IwReq) };
        if r < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
