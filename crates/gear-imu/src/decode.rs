use thiserror::Error;

/// Characters in one record, terminator excluded.
pub const IMU_MESSAGE_LEN: usize = 39;

// time, status, roll, pitch, yaw
const FIELD_WIDTHS: [usize; 5] = [8, 2, 8, 8, 8];

/// One decoded IMU record.
///
/// Record layout: `"tttttttt,ff,rrrrrrrr,pppppppp,yyyyyyyy,"`
/// - t: IMU time in microseconds, 32-bit unsigned
/// - f: fusion status, one byte boolean
/// - r/p/y: roll, pitch, yaw in radians, each the raw bit pattern of an
///   IEEE 754 single-precision float
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    pub timestamp_us: u64,
    pub fusion_ok: bool,
    pub roll_rad: f32,
    pub pitch_rad: f32,
    pub yaw_rad: f32,
}

impl ImuSample {
    /// Yaw in degrees, right-hand rule with z up.
    ///
    /// The sensor reports yaw with the opposite sign, so it is negated here.
    pub fn yaw_deg(&self) -> f64 {
        -(self.yaw_rad as f64).to_degrees()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("line length {got}, expected 39")]
    Length { got: usize },
    #[error("{got} fields, expected 5")]
    FieldCount { got: usize },
    #[error("field {index} is {got} chars wide, expected {expected}")]
    FieldWidth { index: usize, got: usize, expected: usize },
    #[error("field {index} is not hex")]
    Hex { index: usize },
    #[error("field {index} is not a finite float")]
    NonFinite { index: usize },
}

pub fn decode(line: &str) -> Result<ImuSample, Rejected> {
    if line.len() != IMU_MESSAGE_LEN {
        return Err(Rejected::Length { got: line.len() });
    }
    // every field is comma-terminated, including the last
    let body = line.strip_suffix(',').ok_or(Rejected::FieldCount { got: line.split(',').count() - 1 })?;
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() != FIELD_WIDTHS.len() {
        return Err(Rejected::FieldCount { got: fields.len() });
    }
    for (index, (f, expected)) in fields.iter().zip(FIELD_WIDTHS).enumerate() {
        if f.len() != expected {
            return Err(Rejected::FieldWidth { index, got: f.len(), expected });
        }
    }

    let mut status = [0u8; 1];
    hex::decode_to_slice(fields[1], &mut status).map_err(|_| Rejected::Hex { index: 1 })?;

    Ok(ImuSample {
        timestamp_us: u64::from(hex_u32(fields[0], 0)?),
        fusion_ok: status[0] != 0,
        roll_rad: hex_f32(fields[2], 2)?,
        pitch_rad: hex_f32(fields[3], 3)?,
        yaw_rad: hex_f32(fields[4], 4)?,
    })
}

// NaN or inf would poison the unwrap state
fn hex_f32(s: &str, index: usize) -> Result<f32, Rejected> {
    let v = f32::from_bits(hex_u32(s, index)?);
    if !v.is_finite() {
        return Err(Rejected::NonFinite { index });
    }
    Ok(v)
}

fn hex_u32(s: &str, index: usize) -> Result<u32, Rejected> {
    let mut b = [0u8; 4];
    hex::decode_to_slice(s, &mut b).map_err(|_| Rejected::Hex { index })?;
    Ok(u32::from_be_bytes(b))
}
