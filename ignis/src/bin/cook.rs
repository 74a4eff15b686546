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

//! Asset cooker CLI: `ignis-cook cook <asset-dir> <output-dir>`.
//!
//! Walks the asset directory, skips anything unchanged since the last run
//! (tracked in `assets.cache` next to the source assets), and copies
//! everything else into the output directory under its relative path. The
//! "what actually gets baked" step (shader compilation, texture block
//! compression) is backend-specific and out of scope, same as the renderer
//! backend itself (`SPEC_FULL.md` §1); this owns the up-to-date check and
//! the cache file, ported from `AssetProcessor/main.cpp`'s
//! `load_asset_cache`/`save_asset_cache`/cook-loop shape.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use ignis_core::log::Log;
use ignis_resource::{AssetCache, AssetRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cooks every out-of-date asset under `asset_dir` into `output_dir`.
    Cook {
        asset_dir: PathBuf,
        output_dir: PathBuf,
    },
}

const CACHE_FILE_NAME: &str = "assets.cache";

fn system_time_to_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn run(asset_dir: PathBuf, output_dir: PathBuf) -> Result<(), String> {
    if !asset_dir.is_dir() {
        return Err(format!("asset directory {} doesn't exist", asset_dir.display()));
    }
    fs::create_dir_all(&output_dir).map_err(|e| format!("can't create output directory {}: {e}", output_dir.display()))?;

    let cache_path = asset_dir.join(CACHE_FILE_NAME);
    let mut cache = match fs::File::open(&cache_path) {
        Ok(file) => AssetCache::read_from(file).map_err(|e| format!("couldn't read asset cache: {e}"))?,
        Err(_) => {
            Log::info("no existing asset cache, cooking everything");
            AssetCache::new()
        }
    };

    let mut registry = AssetRegistry::new();
    registry.import_directory(&asset_dir);

    Log::info(format!("cooking assets from {} into {}", asset_dir.display(), output_dir.display()));

    let mut cooked = 0u32;
    for entry in walkdir::WalkDir::new(&asset_dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(&asset_dir) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        if relative == PathBuf::from(CACHE_FILE_NAME) {
            continue;
        }
        if registry.uuid_for_path(&relative).is_none() {
            continue;
        }

        let last_write_time = fs::metadata(entry.path()).and_then(|m| m.modified()).unwrap_or(UNIX_EPOCH);
        let stamp = system_time_to_secs(last_write_time);
        let up_to_date = cache.entries.get(&relative).is_some_and(|cached| *cached == stamp);
        if up_to_date {
            continue;
        }

        let destination = output_dir.join(&relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("can't create {}: {e}", parent.display()))?;
        }
        fs::copy(entry.path(), &destination).map_err(|e| format!("can't cook {}: {e}", relative.display()))?;
        cache.entries.insert(relative, stamp);
        cooked += 1;
    }

    let cache_file = fs::File::create(&cache_path).map_err(|e| format!("can't write asset cache {}: {e}", cache_path.display()))?;
    cache.write_to(cache_file).map_err(|e| format!("can't write asset cache: {e}"))?;

    Log::info(format!("cooked {cooked} asset(s)"));
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let Command::Cook { asset_dir, output_dir } = cli.command;

    match run(asset_dir, output_dir) {
        Ok(()) => std::process::exit(0),
        Err(message) => {
            Log::err(&message);
            std::process::exit(1);
        }
    }
}
