use std::io::BufRead;

use ply_rs::{
    parser::Parser,
    ply::{
        Property,
        PropertyAccess,
    },
};

use crate::{
    error::{
        SplatError,
        ValidationError,
    },
    gaussian::raw::RawLayout,
    settings::RAW_FLOAT_PER_SPLAT,
};


pub const LOG_SCALE_CLIP: f32 = 20.0;

const REQUIRED_PROPERTIES: [&str; 13] = [
    "x", "y", "z", "opacity", "scale_0", "scale_1", "rot_0", "rot_1", "rot_2", "rot_3",
    "f_dc_0", "f_dc_1", "f_dc_2",
];


/// One ply vertex, laid out as a full raw record before activation.
#[derive(Clone, Copy, Debug)]
struct PlyVertex {
    record: [f32; RAW_FLOAT_PER_SPLAT],
}

impl PropertyAccess for PlyVertex {
    fn new() -> Self {
        Self {
            record: [0.0; RAW_FLOAT_PER_SPLAT],
        }
    }

    fn set_property(&mut self, key: String, property: Property) {
        let Property::Float(v) = property else {
            return;
        };

        let layout = RawLayout::FULL;
        let slot = match key.as_ref() {
            "x" => RawLayout::POSITION_OFFSET,
            "y" => RawLayout::POSITION_OFFSET + 1,
            "z" => RawLayout::POSITION_OFFSET + 2,
            "opacity" => RawLayout::OPACITY_OFFSET,
            "scale_0" => RawLayout::SCALE_OFFSET,
            "scale_1" => RawLayout::SCALE_OFFSET + 1,
            "rot_0" => layout.rotation_offset(),
            "rot_1" => layout.rotation_offset() + 1,
            "rot_2" => layout.rotation_offset() + 2,
            "rot_3" => layout.rotation_offset() + 3,
            "f_dc_0" => layout.sh0_offset(),
            "f_dc_1" => layout.sh0_offset() + 1,
            "f_dc_2" => layout.sh0_offset() + 2,
            "refl_strength" => layout.pbr_offset(),
            "roughness" => layout.pbr_offset() + 1,
            "metalness" => layout.pbr_offset() + 2,
            "ori_color_0" => layout.origin_color_offset(),
            "ori_color_1" => layout.origin_color_offset() + 1,
            "ori_color_2" => layout.origin_color_offset() + 2,
            _ if key.starts_with("f_rest_") => match key[7..].parse::<usize>() {
                // only the first band is kept
                Ok(i) if i < 9 => layout.sh1_offset() + i,
                _ => return,
            },
            _ => return,
        };

        self.record[slot] = v;
    }
}


fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl PlyVertex {
    fn is_degenerate(&self) -> bool {
        if self.record.iter().any(|v| v.is_nan()) {
            return true;
        }

        let offset = RawLayout::FULL.rotation_offset();
        let norm = self.record[offset..offset + 4]
            .iter()
            .map(|v| v * v)
            .sum::<f32>()
            .sqrt();

        norm <= 1e-8 || norm >= 1e20
    }

    /// activations: sigmoid opacity and material channels, exponentiated scales
    fn activate(&mut self, has_pbr: bool, has_origin_color: bool) {
        let layout = RawLayout::FULL;

        self.record[RawLayout::OPACITY_OFFSET] = sigmoid(self.record[RawLayout::OPACITY_OFFSET]);

        for scale in &mut self.record[RawLayout::SCALE_OFFSET..RawLayout::SCALE_OFFSET + 2] {
            *scale = scale.clamp(-LOG_SCALE_CLIP, LOG_SCALE_CLIP).exp();
        }

        if has_pbr {
            for v in &mut self.record[layout.pbr_offset()..layout.pbr_offset() + 3] {
                *v = sigmoid(*v);
            }
        }

        if has_origin_color {
            for v in &mut self.record[layout.origin_color_offset()..layout.origin_color_offset() + 3] {
                *v = sigmoid(*v);
            }
        }
    }
}


/// Reads a gaussian splat ply into a raw buffer in [`RawLayout::FULL`].
///
/// Rows with NaNs or a degenerate rotation are dropped.
pub fn parse_ply(mut reader: &mut dyn BufRead) -> Result<Vec<f32>, SplatError> {
    let vertex_parser = Parser::<PlyVertex>::new();
    let header = vertex_parser.read_header(&mut reader)?;

    let mut vertices = Vec::new();
    let mut has_pbr = false;
    let mut has_origin_color = false;

    for (_key, element) in &header.elements {
        if element.name != "vertex" {
            continue;
        }

        let missing: Vec<String> = REQUIRED_PROPERTIES
            .iter()
            .filter(|name| !element.properties.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ValidationError::MissingProperties(missing).into());
        }

        has_pbr = element.properties.contains_key("refl_strength");
        has_origin_color = element.properties.contains_key("ori_color_0");

        vertices = vertex_parser.read_payload_for_element(&mut reader, element, &header)?;
    }

    let total = vertices.len();
    let mut buffer = Vec::with_capacity(total * RAW_FLOAT_PER_SPLAT);
    for mut vertex in vertices.into_iter().filter(|vertex| !vertex.is_degenerate()) {
        vertex.activate(has_pbr, has_origin_color);
        buffer.extend_from_slice(&vertex.record);
    }

    let kept = buffer.len() / RAW_FLOAT_PER_SPLAT;
    if kept < total {
        bevy::log::debug!("dropped {} degenerate ply vertices of {}", total - kept, total);
    }

    Ok(buffer)
}
