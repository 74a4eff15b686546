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

//! Shader property reflection.
//!
//! Scanning actual GPU bytecode is backend-specific and out of scope (see
//! `SPEC_FULL.md` §1: "the specific GPU API backend" is a collaborator, not
//! part of the core). What the core owns is the *shape* reflection produces:
//! a schema a [`crate::material::Material`] can allocate a matching buffer
//! from and type-check writes against. A concrete backend calls
//! [`Shader::new`] with the schema it extracted from its own bytecode format.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyDataType {
    Bool,
    U32,
    S32,
    F32,
    Vec2,
    Vec3,
    Vec4,
    Color,
    Texture,
}

impl PropertyDataType {
    /// Byte size of this property inside a material's property buffer.
    /// Texture properties store a bindless slot index (u32), not pixel data.
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::U32 | Self::S32 | Self::F32 | Self::Texture => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 | Self::Color => 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShaderProperty {
    pub name: String,
    pub data_type: PropertyDataType,
    pub offset: usize,
    pub is_color: bool,
    pub is_texture: bool,
}

#[derive(Clone)]
pub struct Shader {
    pub name: String,
    pub schema: Vec<ShaderProperty>,
    /// Total size of the property buffer a [`crate::material::Material`]
    /// built from this shader must allocate.
    pub buffer_size: usize,
}

impl Shader {
    /// Builds a shader from an already-reflected property list, assigning
    /// each property a packed offset in declaration order.
    pub fn new(name: impl Into<String>, properties: Vec<(String, PropertyDataType)>) -> Self {
        let mut schema = Vec::with_capacity(properties.len());
        let mut offset = 0usize;
        for (name, data_type) in properties {
            schema.push(ShaderProperty {
                is_color: data_type == PropertyDataType::Color,
                is_texture: data_type == PropertyDataType::Texture,
                name,
                data_type,
                offset,
            });
            offset += data_type.size();
        }
        Self {
            name: name.into(),
            buffer_size: offset,
            schema,
        }
    }

    pub fn property(&self, name: &str) -> Option<&ShaderProperty> {
        self.schema.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn properties_are_packed_in_declaration_order() {
        let shader = Shader::new(
            "unlit",
            vec![
                ("albedo".into(), PropertyDataType::Color),
                ("albedo_map".into(), PropertyDataType::Texture),
                ("metallic".into(), PropertyDataType::F32),
            ],
        );
        assert_eq!(shader.property("albedo").unwrap().offset, 0);
        assert_eq!(shader.property("albedo_map").unwrap().offset, 16);
        assert_eq!(shader.property("metallic").unwrap().offset, 20);
        assert_eq!(shader.buffer_size, 24);
    }
}
