//! # Status Datagram Format
//!
//! The fixed-format frame the tag pushes to the companion radio once per
//! reporting interval.
//!
//! ```text
//!  0       1       2       3       4
//! +-------+-------+-------+-------+-------+
//! | 'D'/'U' |  sensor (BE16)  |  temp (BE16)  |
//! +-------+-------+-------+-------+-------+
//! ```
//!
//! The verdict byte is always present: `'D'` tells the companion to stand
//! down (primary link good), `'U'` tells it to take over (primary link bad).
//! The sensor and temperature words are each optional and big-endian; which
//! of them a build carries is fixed by configuration, so the frame length is
//! 1, 3, or 5 bytes and both ends agree on the layout out of band.

use crate::SidelinkError;
use bytes::{Buf, BufMut};

/// Largest possible frame: verdict byte + two big-endian u16 fields.
pub const FRAME_MAX: usize = 5;

/// What the tag asks of the companion radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAdvice {
    /// Primary link is healthy; the companion radio should stay quiet.
    Disable,
    /// Primary link is poor; the companion radio should carry traffic.
    Engage,
}

impl ChannelAdvice {
    /// Wire byte for this advice.
    pub fn to_byte(self) -> u8 {
        match self {
            ChannelAdvice::Disable => b'D',
            ChannelAdvice::Engage => b'U',
        }
    }

    /// Parse a wire byte.
    pub fn from_byte(byte: u8) -> Result<Self, SidelinkError> {
        match byte {
            b'D' => Ok(ChannelAdvice::Disable),
            b'U' => Ok(ChannelAdvice::Engage),
            other => Err(SidelinkError::BadAdvice(other)),
        }
    }
}

/// Which optional fields a build's frames carry.
///
/// Both ends of the sidelink must be built with the same layout; the frame
/// itself carries no field markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub sensor: bool,
    pub temperature: bool,
}

impl FrameLayout {
    /// Encoded size of a frame with this layout.
    pub fn encoded_len(&self) -> usize {
        1 + if self.sensor { 2 } else { 0 } + if self.temperature { 2 } else { 0 }
    }
}

/// One status report: verdict plus the latest readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    pub advice: ChannelAdvice,
    pub sensor: Option<u16>,
    pub temperature: Option<u16>,
}

impl StatusFrame {
    /// Encoded size of this frame.
    pub fn encoded_len(&self) -> usize {
        1 + if self.sensor.is_some() { 2 } else { 0 }
            + if self.temperature.is_some() { 2 } else { 0 }
    }

    /// Layout implied by the populated fields.
    pub fn layout(&self) -> FrameLayout {
        FrameLayout {
            sensor: self.sensor.is_some(),
            temperature: self.temperature.is_some(),
        }
    }

    /// Serialize into `buf`. Panics if `buf` has less than
    /// [`encoded_len`](Self::encoded_len) remaining.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.advice.to_byte());
        if let Some(sensor) = self.sensor {
            buf.put_u16(sensor);
        }
        if let Some(temperature) = self.temperature {
            buf.put_u16(temperature);
        }
    }

    /// Parse a frame with the given layout.
    pub fn decode(buf: &mut impl Buf, layout: FrameLayout) -> Result<Self, SidelinkError> {
        let expected = layout.encoded_len();
        if buf.remaining() < expected {
            return Err(SidelinkError::Truncated {
                expected,
                got: buf.remaining(),
            });
        }
        let advice = ChannelAdvice::from_byte(buf.get_u8())?;
        let sensor = layout.sensor.then(|| buf.get_u16());
        let temperature = layout.temperature.then(|| buf.get_u16());
        Ok(StatusFrame {
            advice,
            sensor,
            temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_bytes_match_wire_contract() {
        assert_eq!(ChannelAdvice::Disable.to_byte(), b'D');
        assert_eq!(ChannelAdvice::Engage.to_byte(), b'U');
    }

    #[test]
    fn full_frame_is_five_bytes_big_endian() {
        let frame = StatusFrame {
            advice: ChannelAdvice::Engage,
            sensor: Some(0x1234),
            temperature: Some(0xABCD),
        };
        let mut buf = Vec::new();
        frame.encode(&mut buf);
        assert_eq!(buf, vec![b'U', 0x12, 0x34, 0xAB, 0xCD]);
        assert_eq!(frame.encoded_len(), FRAME_MAX);
    }

    #[test]
    fn verdict_only_frame_is_one_byte() {
        let frame = StatusFrame {
            advice: ChannelAdvice::Disable,
            sensor: None,
            temperature: None,
        };
        let mut buf = Vec::new();
        frame.encode(&mut buf);
        assert_eq!(buf, vec![b'D']);
    }

    #[test]
    fn decode_round_trips_each_layout() {
        for (sensor, temperature) in [(None, None), (Some(7u16), None), (Some(7), Some(290))] {
            let frame = StatusFrame {
                advice: ChannelAdvice::Engage,
                sensor,
                temperature,
            };
            let mut buf = Vec::new();
            frame.encode(&mut buf);
            let decoded = StatusFrame::decode(&mut buf.as_slice(), frame.layout()).unwrap();
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn decode_rejects_short_input() {
        let err = StatusFrame::decode(
            &mut [b'U', 0x01].as_slice(),
            FrameLayout {
                sensor: true,
                temperature: false,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SidelinkError::Truncated {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn decode_rejects_unknown_advice() {
        let err = StatusFrame::decode(
            &mut [b'X'].as_slice(),
            FrameLayout {
                sensor: false,
                temperature: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SidelinkError::BadAdvice(b'X')));
    }
}
