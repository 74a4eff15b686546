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

//! The cooker's asset cache file: a flat table of `{path, last_write_time}`
//! entries, read back by the cooker CLI to skip up-to-date assets.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub const CACHE_MAGIC: u32 = 0x5555_5555;
pub const CACHE_VERSION: u32 = 0;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetCache {
    pub entries: BTreeMap<PathBuf, u64>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(CACHE_MAGIC)?;
        w.write_u32::<LittleEndian>(CACHE_VERSION)?;
        w.write_u32::<LittleEndian>(self.entries.len() as u32)?;
        for (path, last_write_time) in &self.entries {
            let path_str = path.to_string_lossy();
            let bytes = path_str.as_bytes();
            // length + 1 includes the NUL terminator written below.
            w.write_u32::<LittleEndian>(bytes.len() as u32 + 1)?;
            w.write_all(bytes)?;
            w.write_u8(0)?;
            w.write_u64::<LittleEndian>(*last_write_time)?;
        }
        Ok(())
    }

    /// Reads a cache file back. A magic or version mismatch is not an
    /// error: it means the file is from an older cooker and must be
    /// discarded and rebuilt, so this returns an empty cache rather than
    /// `Err`.
    pub fn read_from<R: Read>(mut r: R) -> io::Result<Self> {
        let magic = match r.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(_) => return Ok(Self::new()),
        };
        let version = r.read_u32::<LittleEndian>()?;
        if magic != CACHE_MAGIC || version != CACHE_VERSION {
            return Ok(Self::new());
        }

        let count = r.read_u32::<LittleEndian>()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let len = r.read_u32::<LittleEndian>()? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            // Drop the trailing NUL written by `write_to`.
            buf.pop();
            let path = PathBuf::from(String::from_utf8_lossy(&buf).into_owned());
            let last_write_time = r.read_u64::<LittleEndian>()?;
            entries.insert(path, last_write_time);
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_entry_set() {
        let mut cache = AssetCache::new();
        cache.entries.insert(PathBuf::from("a/b.mesh"), 12345);
        cache.entries.insert(PathBuf::from("c.material"), 999);

        let mut buf = Vec::new();
        cache.write_to(&mut buf).unwrap();
        let back = AssetCache::read_from(&buf[..]).unwrap();
        assert_eq!(cache, back);
    }

    #[test]
    fn version_mismatch_discards_cache() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(CACHE_MAGIC).unwrap();
        buf.write_u32::<LittleEndian>(CACHE_VERSION + 1).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();

        let cache = AssetCache::read_from(&buf[..]).unwrap();
        assert!(cache.entries.is_empty());
    }
}
