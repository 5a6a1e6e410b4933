use half::f16;


pub fn encode(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

pub fn decode(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}


/// `x` lands in the low 16 bits and `y` in the high 16 bits, matching glsl `unpackHalf2x16`
pub fn pack_half2(x: f32, y: f32) -> u32 {
    pack_f16s_to_u32(
        f16::from_f32(y),
        f16::from_f32(x),
    )
}

/// `x` in the low 16 bits, high bits zero
pub fn pack_half1(x: f32) -> u32 {
    encode(x) as u32
}

/// inverse of [`pack_half2`], returns `(x, y)`
pub fn unpack_half2(value: u32) -> (f32, f32) {
    let (upper, lower) = unpack_u32_to_f16s(value);
    (lower.to_f32(), upper.to_f32())
}

pub fn unpack_half1(value: u32) -> f32 {
    decode((value & 0xFFFF) as u16)
}


pub fn pack_f16s_to_u32(upper: f16, lower: f16) -> u32 {
    let upper_bits = (upper.to_bits() as u32) << 16;
    let lower_bits = lower.to_bits() as u32;
    upper_bits | lower_bits
}

pub fn unpack_u32_to_f16s(value: u32) -> (f16, f16) {
    let upper = f16::from_bits((value >> 16) as u16);
    let lower = f16::from_bits((value & 0xFFFF) as u16);
    (upper, lower)
}
