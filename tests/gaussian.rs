use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use bevy_splat_stream::{
    gaussian::{
        f16,
        packed::{
            base_color_from_sh0,
            pack,
            pack_all,
            PackedTexture,
        },
        rand::random_raw_buffer,
        raw::write_raw_buffer,
        RawSplat,
    },
    settings::{
        DATA_TEXTURE_WIDTH,
        RAW_FLOAT_PER_SPLAT,
    },
    PackedSplatRecord,
    RawLayout,
    SplatData,
};


fn pack_one(splat: RawSplat) -> PackedSplatRecord {
    let buffer = write_raw_buffer(&RawLayout::FULL, &[splat]);
    pack(&RawLayout::FULL.record(&buffer, 0))
}


#[test]
fn test_f16_codec_is_exact_for_every_half() {
    for bits in 0..=u16::MAX {
        let value = f16::decode(bits);
        if value.is_nan() {
            assert!(f16::decode(f16::encode(value)).is_nan());
            continue;
        }

        assert_eq!(f16::encode(value), bits, "bits {bits:#06x}");
    }
}

#[test]
fn test_half2_word_order() {
    let word = f16::pack_half2(1.0, -2.0);

    assert_eq!(word & 0xFFFF, f16::encode(1.0) as u32);
    assert_eq!(word >> 16, f16::encode(-2.0) as u32);
    assert_eq!(f16::unpack_half2(word), (1.0, -2.0));
    assert_eq!(f16::pack_half1(0.5) >> 16, 0);
}


#[test]
fn test_layout_strides() {
    assert_eq!(RawLayout::FULL.stride(), RAW_FLOAT_PER_SPLAT);
    assert_eq!(RawLayout::BASIC.stride(), 13);
    assert_eq!(std::mem::size_of::<PackedSplatRecord>(), 64);
}

#[test]
fn test_base_color_within_quantization() {
    for sh0 in [
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(0.3, -0.7, 2.5),
        Vec3::new(-3.0, 0.01, 0.9),
    ] {
        let record = pack_one(RawSplat {
            sh0,
            ..default()
        });

        let expected = base_color_from_sh0(sh0).clamp(Vec3::ZERO, Vec3::ONE);
        let [r, g, b, a] = record.base_color();

        for (byte, channel) in [r, g, b].into_iter().zip(expected.to_array()) {
            assert!((byte as f32 / 255.0 - channel).abs() <= 0.5 / 255.0 + 1e-6);
        }
        assert_eq!(a, 255);
    }
}

#[test]
fn test_rotation_scale_columns() {
    let identity = pack_one(RawSplat {
        scale: Vec3::new(2.0, 3.0, 0.0),
        ..default()
    });
    assert_eq!(
        identity.rotation_scale_columns(),
        [Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)],
    );
    assert_eq!(identity.radius(), 9.0);

    let quarter_turn = pack_one(RawSplat {
        scale: Vec3::new(1.0, 1.0, 0.0),
        rotation: Quat::from_rotation_z(FRAC_PI_2),
        ..default()
    });
    let [column0, column1] = quarter_turn.rotation_scale_columns();
    assert!(column0.abs_diff_eq(Vec3::Y, 1e-3));
    assert!(column1.abs_diff_eq(-Vec3::X, 1e-3));
}

#[test]
fn test_zero_rotation_stays_finite() {
    let splat = RawSplat {
        rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        ..default()
    };
    let record = pack_one(splat);

    for column in record.rotation_scale_columns() {
        assert!(column.is_finite());
    }
}

#[test]
fn test_record_words() {
    let splat = RawSplat {
        position: Vec3::new(1.0, -2.0, 3.5),
        opacity: 0.75,
        sh1: [0.5, -0.25, 0.125, 1.0, -1.0, 0.0, 0.75, -0.5, 0.25],
        pbr: Vec3::new(0.5, 0.25, 1.0),
        origin_color: Vec3::new(1.0, 0.0, 0.5),
        ..default()
    };
    let record = pack_one(splat);
    let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&record));

    assert_eq!(words.len(), 16);
    assert_eq!(f32::from_bits(words[0]), 1.0);
    assert_eq!(f32::from_bits(words[1]), -2.0);
    assert_eq!(f32::from_bits(words[2]), 3.5);
    assert_eq!(f32::from_bits(words[3]), 0.75);
    assert_eq!(words[7], record.base_color);
    assert_eq!(words[13], u32::from_le_bytes([255, 0, 128, 255]));

    assert_eq!(record.sh1(), splat.sh1);
    assert_eq!(record.pbr(), splat.pbr);
}

#[test]
fn test_basic_layout_packs_euler_rotation() {
    let splat = RawSplat {
        scale: Vec3::new(1.0, 2.0, 0.5),
        rotation: Quat::from_rotation_z(FRAC_PI_2),
        sh1: [1.0; 9],
        ..default()
    };
    let buffer = write_raw_buffer(&RawLayout::BASIC, &[splat]);
    let record = pack(&RawLayout::BASIC.record(&buffer, 0));

    let [column0, column1] = record.rotation_scale_columns();
    assert!(column0.abs_diff_eq(Vec3::Y, 1e-3));
    assert!(column1.abs_diff_eq(-2.0 * Vec3::X, 1e-3));

    // absent optional fields pack as zero
    assert_eq!(record.sh1, [0; 5]);
    assert_eq!(record.pbr, [0; 2]);
    assert_eq!(record.origin_color, 0);
}

#[test]
fn test_pack_all_preserves_order() {
    let count = 2500;
    let buffer = random_raw_buffer(count);
    let records = pack_all(RawLayout::FULL, &buffer);

    assert_eq!(records.len(), count);
    for (index, record) in records.iter().enumerate() {
        let raw = RawLayout::FULL.record(&buffer, index);
        assert_eq!(record.position(), raw.position());
        assert_eq!(record.opacity(), raw.opacity());
    }
}

#[test]
fn test_packed_texture_rows() {
    let texture = SplatData::raw(random_raw_buffer(1500)).into_texture();

    assert_eq!(texture.vertex_count(), 1500);
    assert_eq!(texture.width(), 4096);
    assert_eq!(texture.height(), 2);
    assert_eq!(texture.records().len(), 1500);
    assert_eq!(texture.as_bytes().len(), 2 * DATA_TEXTURE_WIDTH * 64);

    let padding = &texture.as_bytes()[1500 * 64..];
    assert!(padding.iter().all(|byte| *byte == 0));

    assert_eq!(PackedTexture::from_records(Vec::new()).height(), 0);
}
