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

//! Reference-counted, in-memory realization of assets.
//!
//! The renderer backend that actually uploads bytes to the GPU is injected
//! as a [`GpuBackend`] trait object - the "inheritance/virtual-dispatch for
//! renderer backends" design note in `SPEC_FULL.md` §9 replaces a base-class
//! hierarchy with exactly this kind of capability interface. `ignis-renderer`
//! is the concrete implementation; this crate never depends on it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ignis_core::log::Log;
use ignis_core::pool::ErasedHandle;
use ignis_core::uuid_gen::AssetId;
use ignis_core::FxHashMap;
use ignis_jobs::{JobContext, JobHandle, JobOutcome, JobSystem};
use parking_lot::Mutex;

use crate::asset::{AssetRegistry, AssetType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Unloaded,
    Pending,
    Loaded,
    Failed,
}

/// The in-memory realization of an [`crate::asset::Asset`]. Invariants (see
/// `SPEC_FULL.md` §3): `ref_count == 0` implies `state` is `Unloaded` or
/// `Failed`; `state == Loaded` implies `typed_handle` is `Some`.
pub struct Resource {
    pub asset_uuid: AssetId,
    pub type_tag: AssetType,
    pub state: ResourceState,
    pub ref_count: AtomicU32,
    pub job_handle: Option<JobHandle>,
    pub typed_handle: Option<ErasedHandle>,
    pub dependencies: Vec<AssetId>,
    /// Set when a `release` arrives while a load job is still in flight; the
    /// load completes normally and the pending unload is applied right after.
    pending_unload: bool,
}

/// Capability interface the resource manager uses to turn decoded asset
/// bytes into a GPU-resident object, without knowing which graphics backend
/// is active.
pub trait GpuBackend: Send + Sync {
    fn upload(
        &self,
        asset_uuid: AssetId,
        type_tag: AssetType,
        bytes: &[u8],
        dependencies: &[ErasedHandle],
    ) -> Result<ErasedHandle, String>;
    fn destroy(&self, type_tag: AssetType, handle: ErasedHandle);
}

/// Reads and decodes the bytes behind an asset. Supplied by the host
/// application (it alone knows the `assets/` root), kept separate from
/// [`GpuBackend`] because decode can run entirely off the main thread.
pub trait AssetReader: Send + Sync {
    fn read(&self, relative_path: &std::path::Path) -> std::io::Result<Vec<u8>>;
}

pub struct FilesystemAssetReader {
    pub root: PathBuf,
}

impl AssetReader for FilesystemAssetReader {
    fn read(&self, relative_path: &std::path::Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.root.join(relative_path))
    }
}

struct Inner {
    registry: AssetRegistry,
    resources: FxHashMap<AssetId, Resource>,
}

/// Owns the asset registry and the live resource table; guarded by a single
/// mutex per `SPEC_FULL.md` §5 ("the registry is guarded by a single mutex").
/// Ref-count increments themselves are atomic so a hot `acquire`/`release`
/// pair doesn't need the registry lock at all.
pub struct ResourceManager {
    inner: Mutex<Inner>,
    jobs: Arc<JobSystem>,
    gpu: Arc<dyn GpuBackend>,
    reader: Arc<dyn AssetReader>,
}

impl ResourceManager {
    pub fn new(jobs: Arc<JobSystem>, gpu: Arc<dyn GpuBackend>, reader: Arc<dyn AssetReader>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                registry: AssetRegistry::new(),
                resources: FxHashMap::default(),
            }),
            jobs,
            gpu,
            reader,
        }
    }

    pub fn import_directory(&self, root: &std::path::Path) {
        self.inner.lock().registry.import_directory(root);
    }

    pub fn import_asset(&self, root: &std::path::Path, relative_path: &std::path::Path) -> Option<AssetId> {
        self.inner.lock().registry.import_asset(root, relative_path)
    }

    pub fn state_of(&self, uuid: AssetId) -> Option<ResourceState> {
        self.inner.lock().resources.get(&uuid).map(|r| r.state)
    }

    pub fn ref_count_of(&self, uuid: AssetId) -> u32 {
        self.inner
            .lock()
            .resources
            .get(&uuid)
            .map(|r| r.ref_count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Acquires `uuid`, recursively acquiring its declared dependencies
    /// first. The first acquire schedules a load job (waiting on every
    /// dependency's own load job); later acquires just bump `ref_count` and
    /// hand back the already-stored job handle.
    pub fn acquire(self: &Arc<Self>, uuid: AssetId) -> JobHandle {
        let mut inner = self.inner.lock();

        if let Some(resource) = inner.resources.get(&uuid) {
            resource.ref_count.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = resource.job_handle {
                return handle;
            }
        }

        let dependencies: Vec<AssetId> = inner
            .registry
            .get(uuid)
            .map(|a| a.children.iter().copied().collect())
            .unwrap_or_default();

        let type_tag = inner
            .registry
            .get(uuid)
            .map(|a| a.type_tag)
            .unwrap_or(AssetType::Scene);

        inner.resources.insert(
            uuid,
            Resource {
                asset_uuid: uuid,
                type_tag,
                state: ResourceState::Pending,
                ref_count: AtomicU32::new(1),
                job_handle: None,
                typed_handle: None,
                dependencies: dependencies.clone(),
                pending_unload: false,
            },
        );
        drop(inner);

        let dependency_jobs: Vec<JobHandle> = dependencies
            .iter()
            .map(|dep| self.acquire(*dep))
            .collect();

        let relative_path = {
            let inner = self.inner.lock();
            inner
                .registry
                .get(uuid)
                .map(|a| a.relative_path.clone())
                .unwrap_or_default()
        };

        let manager = self.clone();
        let job = self.jobs.execute(&dependency_jobs, move |_ctx: &JobContext| {
            manager.run_load(uuid, &relative_path)
        });

        let mut inner = self.inner.lock();
        if let Some(resource) = inner.resources.get_mut(&uuid) {
            resource.job_handle = Some(job);
        }
        job
    }

    /// Runs on a worker thread: decode the asset's bytes and hand them to the
    /// GPU backend. Updates the resource's state and typed handle on
    /// completion, applying any unload that arrived while this load was
    /// in flight.
    fn run_load(self: Arc<Self>, uuid: AssetId, relative_path: &std::path::Path) -> JobOutcome {
        let bytes = match self.reader.read(relative_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.mark_failed(uuid);
                return JobOutcome::Failed(format!("failed to read asset: {err}"));
            }
        };

        let (type_tag, dependency_handles) = {
            let inner = self.inner.lock();
            let Some(resource) = inner.resources.get(&uuid) else {
                return JobOutcome::Failed(format!("resource {uuid:#x} vanished before load ran"));
            };
            let handles: Vec<ErasedHandle> = resource
                .dependencies
                .iter()
                .filter_map(|dep| inner.resources.get(dep))
                .filter_map(|r| r.typed_handle)
                .collect();
            (resource.type_tag, handles)
        };

        match self.gpu.upload(uuid, type_tag, &bytes, &dependency_handles) {
            Ok(handle) => {
                let mut inner = self.inner.lock();
                if let Some(resource) = inner.resources.get_mut(&uuid) {
                    resource.typed_handle = Some(handle);
                    resource.state = ResourceState::Loaded;
                    let should_unload = resource.pending_unload;
                    drop(inner);
                    if should_unload {
                        self.release(uuid);
                    }
                }
                JobOutcome::Succeeded
            }
            Err(err) => {
                self.mark_failed(uuid);
                JobOutcome::Failed(err)
            }
        }
    }

    fn mark_failed(&self, uuid: AssetId) {
        let mut inner = self.inner.lock();
        if let Some(resource) = inner.resources.get_mut(&uuid) {
            resource.state = ResourceState::Failed;
        }
    }

    /// Decrements `ref_count`; on reaching zero while no load is in flight,
    /// destroys the GPU resource and moves the resource to `Unloaded`, then
    /// releases every dependency transitively. If a load is still pending,
    /// the unload is deferred until that load completes.
    pub fn release(self: &Arc<Self>, uuid: AssetId) {
        let mut dependencies_to_release = Vec::new();
        {
            let mut inner = self.inner.lock();
            let Some(resource) = inner.resources.get_mut(&uuid) else {
                return;
            };
            let previous = resource.ref_count.fetch_sub(1, Ordering::SeqCst);
            if previous != 1 {
                return;
            }

            if resource.state == ResourceState::Pending {
                resource.pending_unload = true;
                return;
            }

            if let Some(handle) = resource.typed_handle.take() {
                self.gpu.destroy(resource.type_tag, handle);
            }
            resource.state = ResourceState::Unloaded;
            resource.job_handle = None;
            dependencies_to_release = resource.dependencies.clone();
        }
        for dep in dependencies_to_release {
            self.release(dep);
        }
    }

    /// Hot-reload entry point: called by the engine root when the
    /// filesystem watcher reports a modification. If the resource is
    /// `Loaded` and referenced, schedules a fresh load job; the freshly
    /// uploaded handle replaces the old one and the old one is destroyed
    /// only after the new job completes, so in-flight draws never see a
    /// torn resource.
    pub fn reload(self: &Arc<Self>, uuid: AssetId) {
        let (should_reload, relative_path) = {
            let inner = self.inner.lock();
            match inner.resources.get(&uuid) {
                Some(r) if r.state == ResourceState::Loaded && r.ref_count.load(Ordering::SeqCst) > 0 => {
                    let path = inner
                        .registry
                        .get(uuid)
                        .map(|a| a.relative_path.clone())
                        .unwrap_or_default();
                    (true, path)
                }
                _ => (false, PathBuf::new()),
            }
        };
        if !should_reload {
            return;
        }

        {
            let mut inner = self.inner.lock();
            if let Some(resource) = inner.resources.get_mut(&uuid) {
                resource.state = ResourceState::Pending;
            }
        }

        let manager = self.clone();
        let job = self.jobs.execute(&[], move |_ctx| {
            let outcome = manager.clone().run_load(uuid, &relative_path);
            if matches!(outcome, JobOutcome::Succeeded) {
                Log::info(format!("hot-reloaded asset {uuid:#x}"));
            }
            outcome
        });

        let mut inner = self.inner.lock();
        if let Some(resource) = inner.resources.get_mut(&uuid) {
            resource.job_handle = Some(job);
        }
    }

    /// Device-lost recovery (`SPEC_FULL.md` §4.4): every GPU resource the
    /// backend holds is gone, but the decoded bytes behind it aren't, so each
    /// `Loaded` resource is re-uploaded from scratch rather than treated as a
    /// failure. Resources already `Pending` are left alone - their own load
    /// job will populate a fresh handle when it completes.
    pub fn reload_all_loaded(self: &Arc<Self>) {
        let uuids: Vec<AssetId> = {
            let inner = self.inner.lock();
            inner
                .resources
                .values()
                .filter(|r| r.state == ResourceState::Loaded)
                .map(|r| r.asset_uuid)
                .collect()
        };
        for uuid in uuids {
            self.reload(uuid);
        }
    }

    /// Marks an asset missing after a filesystem delete. Any resource built
    /// on it surfaces `Failed` the next time it's touched, matching
    /// `SPEC_FULL.md` §4.3's "dependents surface Failed" rule.
    pub fn mark_deleted(&self, uuid: AssetId) {
        self.mark_failed(uuid);
        self.inner.lock().registry.remove(uuid);
    }

    pub fn rename_asset(&self, uuid: AssetId, new_relative_path: PathBuf) {
        self.inner.lock().registry.rename(uuid, new_relative_path);
    }

    pub fn uuid_for_path(&self, relative_path: &std::path::Path) -> Option<AssetId> {
        self.inner.lock().registry.uuid_for_path(relative_path)
    }

    /// Marks the asset at `relative_path` missing, for a filesystem delete
    /// event where the bytes are already gone and can't be re-hashed.
    pub fn mark_deleted_by_path(&self, relative_path: &std::path::Path) {
        if let Some(uuid) = self.uuid_for_path(relative_path) {
            self.mark_deleted(uuid);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ignis_core::pool::Handle;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    struct FakeGpu {
        uploaded: StdMutex<HashSet<AssetId>>,
    }

    impl GpuBackend for FakeGpu {
        fn upload(
            &self,
            asset_uuid: AssetId,
            _type_tag: AssetType,
            _bytes: &[u8],
            _deps: &[ErasedHandle],
        ) -> Result<ErasedHandle, String> {
            self.uploaded.lock().unwrap().insert(asset_uuid);
            Ok(Handle::<()>::new(asset_uuid as u32, 1).into_erased())
        }
        fn destroy(&self, _type_tag: AssetType, _handle: ErasedHandle) {}
    }

    struct FakeReader;
    impl AssetReader for FakeReader {
        fn read(&self, _relative_path: &std::path::Path) -> std::io::Result<Vec<u8>> {
            Ok(vec![0u8; 4])
        }
    }

    /// A reader that sleeps before returning, so a test can call `release`
    /// while the load job is still `Pending`.
    struct SlowReader;
    impl AssetReader for SlowReader {
        fn read(&self, _relative_path: &std::path::Path) -> std::io::Result<Vec<u8>> {
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(vec![0u8; 4])
        }
    }

    #[test]
    fn acquire_then_release_reaches_unloaded() {
        let jobs = JobSystem::with_worker_count(2);
        let gpu = Arc::new(FakeGpu { uploaded: StdMutex::new(HashSet::new()) });
        let manager = Arc::new(ResourceManager::new(jobs.clone(), gpu, Arc::new(FakeReader)));

        let uuid: AssetId = 123;
        manager.acquire(uuid);
        jobs.wait_for_all();
        assert_eq!(manager.state_of(uuid), Some(ResourceState::Loaded));

        manager.release(uuid);
        assert_eq!(manager.state_of(uuid), Some(ResourceState::Unloaded));
    }

    #[test]
    fn release_while_load_is_pending_defers_the_unload() {
        let jobs = JobSystem::with_worker_count(2);
        let gpu = Arc::new(FakeGpu { uploaded: StdMutex::new(HashSet::new()) });
        let manager = Arc::new(ResourceManager::new(jobs.clone(), gpu, Arc::new(SlowReader)));

        let uuid: AssetId = 999;
        manager.acquire(uuid);
        assert_eq!(manager.state_of(uuid), Some(ResourceState::Pending));

        manager.release(uuid);
        // Still Pending: the deferred unload hasn't run yet, it rides along
        // with the load job's own completion.
        assert_eq!(manager.state_of(uuid), Some(ResourceState::Pending));

        jobs.wait_for_all();
        assert_eq!(manager.state_of(uuid), Some(ResourceState::Unloaded));
        assert_eq!(manager.ref_count_of(uuid), 0);
    }

    /// A material that depends on a shader and two textures: acquiring the
    /// material must transitively acquire and load all three dependencies,
    /// and releasing it back to zero must transitively unload them too.
    #[test]
    fn acquire_and_release_of_a_multi_dependency_material_walks_every_dependency() {
        let jobs = JobSystem::with_worker_count(2);
        let gpu = Arc::new(FakeGpu { uploaded: StdMutex::new(HashSet::new()) });
        let manager = Arc::new(ResourceManager::new(jobs.clone(), gpu.clone(), Arc::new(FakeReader)));

        let shader: AssetId = 10;
        let texture_a: AssetId = 11;
        let texture_b: AssetId = 12;
        let material: AssetId = 13;

        {
            let mut inner = manager.inner.lock();
            inner.registry.insert_for_test(test_asset(shader, AssetType::Shader, &[]));
            inner.registry.insert_for_test(test_asset(texture_a, AssetType::Texture, &[]));
            inner.registry.insert_for_test(test_asset(texture_b, AssetType::Texture, &[]));
            inner.registry.insert_for_test(test_asset(material, AssetType::Material, &[shader, texture_a, texture_b]));
        }

        manager.acquire(material);
        jobs.wait_for_all();

        for uuid in [shader, texture_a, texture_b, material] {
            assert_eq!(manager.state_of(uuid), Some(ResourceState::Loaded));
            assert!(gpu.uploaded.lock().unwrap().contains(&uuid));
        }

        manager.release(material);

        for uuid in [shader, texture_a, texture_b, material] {
            assert_eq!(manager.state_of(uuid), Some(ResourceState::Unloaded));
            assert_eq!(manager.ref_count_of(uuid), 0);
        }
    }

    fn test_asset(uuid: AssetId, type_tag: AssetType, children: &[AssetId]) -> crate::asset::Asset {
        crate::asset::Asset {
            uuid,
            type_tag,
            relative_path: PathBuf::from(format!("{uuid:x}")),
            parent_uuid: None,
            children: children.iter().copied().collect(),
            embedded: Default::default(),
            last_write_time: std::time::SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn n_acquires_then_n_releases_reaches_unloaded_with_no_leak() {
        let jobs = JobSystem::with_worker_count(2);
        let gpu = Arc::new(FakeGpu { uploaded: StdMutex::new(HashSet::new()) });
        let manager = Arc::new(ResourceManager::new(jobs.clone(), gpu, Arc::new(FakeReader)));

        let uuid: AssetId = 77;
        for _ in 0..4 {
            manager.acquire(uuid);
        }
        jobs.wait_for_all();
        assert_eq!(manager.ref_count_of(uuid), 4);

        for _ in 0..4 {
            manager.release(uuid);
        }
        assert_eq!(manager.state_of(uuid), Some(ResourceState::Unloaded));
    }

    struct CountingGpu {
        uploads: StdMutex<Vec<AssetId>>,
    }

    impl GpuBackend for CountingGpu {
        fn upload(
            &self,
            asset_uuid: AssetId,
            _type_tag: AssetType,
            _bytes: &[u8],
            _deps: &[ErasedHandle],
        ) -> Result<ErasedHandle, String> {
            self.uploads.lock().unwrap().push(asset_uuid);
            Ok(Handle::<()>::new(asset_uuid as u32, 1).into_erased())
        }
        fn destroy(&self, _type_tag: AssetType, _handle: ErasedHandle) {}
    }

    /// Device-lost recovery: every `Loaded` resource gets a fresh upload,
    /// without the caller having to know which resources were affected.
    #[test]
    fn reload_all_loaded_reuploads_every_loaded_resource() {
        let jobs = JobSystem::with_worker_count(2);
        let gpu = Arc::new(CountingGpu { uploads: StdMutex::new(Vec::new()) });
        let manager = Arc::new(ResourceManager::new(jobs.clone(), gpu.clone(), Arc::new(FakeReader)));

        let a: AssetId = 201;
        let b: AssetId = 202;
        manager.acquire(a);
        manager.acquire(b);
        jobs.wait_for_all();
        assert_eq!(gpu.uploads.lock().unwrap().len(), 2);

        manager.reload_all_loaded();
        jobs.wait_for_all();

        let uploads = gpu.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 4);
        assert_eq!(uploads.iter().filter(|&&u| u == a).count(), 2);
        assert_eq!(uploads.iter().filter(|&&u| u == b).count(), 2);
    }
}
