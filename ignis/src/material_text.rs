// Copyright (c) 2024-present Ignis Engine Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Text serialization for material assets, per `SPEC_FULL.md` §6: a
//! `version N` header followed by typed key/value lines, with the property
//! block mirroring the shader's reflected schema line-for-line. Shares the
//! split-on-first-whitespace, typed-via-`FromStr` approach
//! `ignis-resource::config` uses for the same reason: this is a flat
//! line-oriented format, not a document format that needs a real parser
//! crate.

use ignis_core::uuid_gen::AssetId;
use ignis_renderer::{Material, PropertyDataType, PropertyValue, Shader};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug)]
pub enum MaterialTextError {
    MissingVersionHeader,
    UnsupportedVersion(u32),
    MissingShaderUuid,
    MalformedLine(String),
    Material(ignis_renderer::MaterialError),
}

impl From<ignis_renderer::MaterialError> for MaterialTextError {
    fn from(err: ignis_renderer::MaterialError) -> Self {
        Self::Material(err)
    }
}

fn write_floats(out: &mut String, values: &[f32]) {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&v.to_string());
    }
}

fn read_floats(text: &str) -> Option<Vec<f32>> {
    text.split_whitespace().map(|s| s.parse::<f32>().ok()).collect()
}

/// Serializes `material` to the scene/material text format, reading every
/// value in `shader`'s property schema back out of the material's buffer or
/// texture table.
pub fn write_material(material: &Material, shader: &Shader) -> String {
    let mut out = String::new();
    out.push_str(&format!("version {FORMAT_VERSION}\n"));
    out.push_str(&format!("shader_uuid {}\n", material.shader_uuid));

    for property in &shader.schema {
        if property.is_texture {
            let uuid = material.get_texture(&property.name).unwrap_or(0);
            out.push_str(&format!("{} texture {}\n", property.name, uuid));
            continue;
        }

        let value = material.get_property(&property.name).expect("schema-declared property");
        let value_text = match value {
            PropertyValue::Bool(v) => v.to_string(),
            PropertyValue::U32(v) => v.to_string(),
            PropertyValue::S32(v) => v.to_string(),
            PropertyValue::F32(v) => v.to_string(),
            PropertyValue::Vec2(v) => {
                let mut floats = String::new();
                write_floats(&mut floats, &v);
                floats
            }
            PropertyValue::Vec3(v) => {
                let mut floats = String::new();
                write_floats(&mut floats, &v);
                floats
            }
            PropertyValue::Vec4(v) | PropertyValue::Color(v) => {
                let mut floats = String::new();
                write_floats(&mut floats, &v);
                floats
            }
        };
        out.push_str(&format!("{} {}\n", property.name, value_text));
    }

    out
}

/// Parses a material text file against an already-reflected `shader`,
/// building a fresh [`Material`] and applying every property/texture line.
pub fn parse_material(text: &str, shader: &Shader) -> Result<Material, MaterialTextError> {
    let mut lines = text.lines();
    let header = lines.next().ok_or(MaterialTextError::MissingVersionHeader)?;
    let version: u32 = header
        .strip_prefix("version ")
        .and_then(|v| v.trim().parse().ok())
        .ok_or(MaterialTextError::MissingVersionHeader)?;
    if version != FORMAT_VERSION {
        return Err(MaterialTextError::UnsupportedVersion(version));
    }

    let shader_line = lines.next().ok_or(MaterialTextError::MissingShaderUuid)?;
    let shader_uuid: AssetId = shader_line
        .strip_prefix("shader_uuid ")
        .and_then(|v| v.trim().parse().ok())
        .ok_or(MaterialTextError::MissingShaderUuid)?;

    let mut material = Material::new(shader_uuid, shader);

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, ' ');
        let name = parts.next().ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?;
        let kind_or_value = parts.next().ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?;
        let rest = parts.next();

        let property = shader
            .property(name)
            .ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?
            .clone();

        if kind_or_value == "texture" {
            let uuid: AssetId = rest
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?;
            material.set_texture(name, uuid)?;
            continue;
        }

        let value_text = if let Some(rest) = rest {
            format!("{kind_or_value} {rest}")
        } else {
            kind_or_value.to_string()
        };

        let value = match property.data_type {
            PropertyDataType::Bool => PropertyValue::Bool(value_text.trim() == "true"),
            PropertyDataType::U32 => PropertyValue::U32(
                value_text.trim().parse().map_err(|_| MaterialTextError::MalformedLine(line.to_string()))?,
            ),
            PropertyDataType::S32 => PropertyValue::S32(
                value_text.trim().parse().map_err(|_| MaterialTextError::MalformedLine(line.to_string()))?,
            ),
            PropertyDataType::F32 => PropertyValue::F32(
                value_text.trim().parse().map_err(|_| MaterialTextError::MalformedLine(line.to_string()))?,
            ),
            PropertyDataType::Vec2 => {
                let v = read_floats(&value_text).ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?;
                PropertyValue::Vec2([v[0], v[1]])
            }
            PropertyDataType::Vec3 => {
                let v = read_floats(&value_text).ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?;
                PropertyValue::Vec3([v[0], v[1], v[2]])
            }
            PropertyDataType::Vec4 => {
                let v = read_floats(&value_text).ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?;
                PropertyValue::Vec4([v[0], v[1], v[2], v[3]])
            }
            PropertyDataType::Color => {
                let v = read_floats(&value_text).ok_or_else(|| MaterialTextError::MalformedLine(line.to_string()))?;
                PropertyValue::Color([v[0], v[1], v[2], v[3]])
            }
            PropertyDataType::Texture => unreachable!("handled above"),
        };
        material.set_property(name, value)?;
    }

    Ok(material)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_then_serialize_then_parse_yields_equal_property_values() {
        let shader = Shader::new(
            "unlit",
            vec![
                ("tint".into(), PropertyDataType::Color),
                ("metallic".into(), PropertyDataType::F32),
                ("uv_scale".into(), PropertyDataType::Vec2),
                ("albedo_map".into(), PropertyDataType::Texture),
            ],
        );

        let mut original = Material::new(42, &shader);
        original.set_property("tint", PropertyValue::Color([0.1, 0.2, 0.3, 1.0])).unwrap();
        original.set_property("metallic", PropertyValue::F32(0.75)).unwrap();
        original.set_property("uv_scale", PropertyValue::Vec2([2.0, 4.0])).unwrap();
        original.set_texture("albedo_map", 1234).unwrap();

        let text = write_material(&original, &shader);
        let imported = parse_material(&text, &shader).unwrap();

        assert_eq!(imported.shader_uuid, original.shader_uuid);
        assert_eq!(imported.raw_buffer(), original.raw_buffer());
        assert_eq!(imported.get_texture("albedo_map"), original.get_texture("albedo_map"));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let shader = Shader::new("unlit", vec![]);
        let err = parse_material("version 99\nshader_uuid 1\n", &shader);
        assert!(matches!(err, Err(MaterialTextError::UnsupportedVersion(99))));
    }
}
