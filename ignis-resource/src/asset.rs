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

//! On-disk asset records and the import pipeline that produces them.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ignis_core::uuid_gen::{content_id, embedded_child_id, AssetId};
use ignis_core::{FxHashMap, FxHashSet};

/// What kind of importer produced an asset, and therefore what the resource
/// manager's load job decodes it as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    Texture,
    Mesh,
    Material,
    Shader,
    Model,
    Scene,
}

impl AssetType {
    /// Maps a file extension to the asset type that imports it, or `None`
    /// for an unregistered extension (import is then a no-op per
    /// `SPEC_FULL.md` §4.3).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "tga" | "dds" => Some(Self::Texture),
            "mesh" | "obj" | "gltf" => Some(Self::Mesh),
            "material" => Some(Self::Material),
            "shader" | "hlsl" | "glsl" | "spv" => Some(Self::Shader),
            "model" | "fbx" => Some(Self::Model),
            "scene" => Some(Self::Scene),
            _ => None,
        }
    }
}

/// A durable, on-disk description of an asset, addressed by a content-derived
/// [`AssetId`]. Composite imports (a model) link their produced embedded
/// assets (meshes, materials) back to this record via `children`.
#[derive(Debug, Clone)]
pub struct Asset {
    pub uuid: AssetId,
    pub type_tag: AssetType,
    pub relative_path: PathBuf,
    pub parent_uuid: Option<AssetId>,
    pub children: FxHashSet<AssetId>,
    pub embedded: FxHashSet<AssetId>,
    pub last_write_time: SystemTime,
}

/// Registry of imported [`Asset`] records, keyed by content-derived id.
/// Importing the same path twice is idempotent: the second call returns the
/// existing record's id without re-scanning.
#[derive(Default)]
pub struct AssetRegistry {
    assets: FxHashMap<AssetId, Asset>,
    by_path: FxHashMap<PathBuf, AssetId>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uuid: AssetId) -> Option<&Asset> {
        self.assets.get(&uuid)
    }

    pub fn uuid_for_path(&self, relative_path: &Path) -> Option<AssetId> {
        self.by_path.get(relative_path).copied()
    }

    /// Imports a single file from disk, registering it under a content
    /// hash of its bytes. Returns `None` if the extension isn't a
    /// registered asset type.
    pub fn import_asset(&mut self, root: &Path, relative_path: &Path) -> Option<AssetId> {
        if let Some(existing) = self.by_path.get(relative_path) {
            return Some(*existing);
        }

        let ext = relative_path.extension()?.to_str()?;
        let type_tag = AssetType::from_extension(ext)?;
        let full_path = root.join(relative_path);
        let bytes = std::fs::read(&full_path).ok()?;
        let last_write_time = std::fs::metadata(&full_path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let uuid = content_id(&bytes);
        self.assets.insert(
            uuid,
            Asset {
                uuid,
                type_tag,
                relative_path: relative_path.to_path_buf(),
                parent_uuid: None,
                children: FxHashSet::default(),
                embedded: FxHashSet::default(),
                last_write_time,
            },
        );
        self.by_path.insert(relative_path.to_path_buf(), uuid);
        Some(uuid)
    }

    /// Registers an embedded child produced while importing a composite
    /// asset (e.g. a mesh baked out of an imported model), linking parent and
    /// child in both directions. The child's id is derived from the parent's
    /// id and its local name, so rerunning the import over unchanged content
    /// reproduces the same id.
    pub fn register_embedded(
        &mut self,
        parent: AssetId,
        local_name: &str,
        type_tag: AssetType,
    ) -> AssetId {
        let child_id = embedded_child_id(parent, local_name);
        let parent_path = self
            .assets
            .get(&parent)
            .map(|a| a.relative_path.clone())
            .unwrap_or_default();

        self.assets.insert(
            child_id,
            Asset {
                uuid: child_id,
                type_tag,
                relative_path: parent_path,
                parent_uuid: Some(parent),
                children: FxHashSet::default(),
                embedded: FxHashSet::default(),
                last_write_time: SystemTime::UNIX_EPOCH,
            },
        );
        if let Some(parent_asset) = self.assets.get_mut(&parent) {
            parent_asset.embedded.insert(child_id);
            parent_asset.children.insert(child_id);
        }
        child_id
    }

    /// Walks `root` importing every file with a registered extension.
    pub fn import_directory(&mut self, root: &Path) {
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if let Ok(relative) = entry.path().strip_prefix(root) {
                self.import_asset(root, relative);
            }
        }
    }

    /// Rewrites a moved/renamed asset's path in place. The id is
    /// content-derived and therefore unchanged by the move.
    pub fn rename(&mut self, uuid: AssetId, new_relative_path: PathBuf) {
        if let Some(asset) = self.assets.get_mut(&uuid) {
            self.by_path.remove(&asset.relative_path);
            asset.relative_path = new_relative_path.clone();
            self.by_path.insert(new_relative_path, uuid);
        }
    }

    pub fn remove(&mut self, uuid: AssetId) -> Option<Asset> {
        let asset = self.assets.remove(&uuid)?;
        self.by_path.remove(&asset.relative_path);
        Some(asset)
    }

    /// Inserts an already-built asset record directly, bypassing the
    /// filesystem import path. Used by other crates' tests to wire up a
    /// dependency graph (e.g. a material with a shader and textures) without
    /// writing files to disk.
    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, asset: Asset) {
        self.by_path.insert(asset.relative_path.clone(), asset.uuid);
        self.assets.insert(asset.uuid, asset);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn importing_same_path_twice_is_idempotent() {
        let dir = std::env::temp_dir().join(format!("ignis-test-{:x}", content_id(b"asset-import")));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("a.material");
        std::fs::File::create(&file).unwrap().write_all(b"shader_uuid 1").unwrap();

        let mut registry = AssetRegistry::new();
        let first = registry.import_asset(&dir, Path::new("a.material"));
        let second = registry.import_asset(&dir, Path::new("a.material"));
        assert_eq!(first, second);
        assert!(first.is_some());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unregistered_extension_is_not_imported() {
        let dir = std::env::temp_dir().join(format!("ignis-test-{:x}", content_id(b"asset-import-unknown")));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("readme.txt");
        std::fs::File::create(&file).unwrap().write_all(b"hello").unwrap();

        let mut registry = AssetRegistry::new();
        assert!(registry.import_asset(&dir, Path::new("readme.txt")).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn embedded_children_link_back_to_parent() {
        let mut registry = AssetRegistry::new();
        let parent = content_id(b"model bytes");
        registry.assets.insert(
            parent,
            Asset {
                uuid: parent,
                type_tag: AssetType::Model,
                relative_path: PathBuf::from("x.model"),
                parent_uuid: None,
                children: FxHashSet::default(),
                embedded: FxHashSet::default(),
                last_write_time: SystemTime::UNIX_EPOCH,
            },
        );
        let mesh = registry.register_embedded(parent, "mesh_0", AssetType::Mesh);
        assert_eq!(registry.get(mesh).unwrap().parent_uuid, Some(parent));
        assert!(registry.get(parent).unwrap().children.contains(&mesh));
    }

    #[test]
    fn registering_the_same_embedded_child_twice_does_not_duplicate() {
        let mut registry = AssetRegistry::new();
        let parent = content_id(b"model bytes, take two");
        registry.assets.insert(
            parent,
            Asset {
                uuid: parent,
                type_tag: AssetType::Model,
                relative_path: PathBuf::from("y.model"),
                parent_uuid: None,
                children: FxHashSet::default(),
                embedded: FxHashSet::default(),
                last_write_time: SystemTime::UNIX_EPOCH,
            },
        );
        registry.register_embedded(parent, "mesh_0", AssetType::Mesh);
        registry.register_embedded(parent, "mesh_0", AssetType::Mesh);
        assert_eq!(registry.get(parent).unwrap().children.len(), 1);
        assert_eq!(registry.get(parent).unwrap().embedded.len(), 1);
    }
}
