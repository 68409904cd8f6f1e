//! Render state cache tests
//!
//! Tests for:
//! - Content hashing and deduplication (including across threads)
//! - Weak-reference expiry of cached shaders
//! - Archive write → load round trips without recompilation, including
//!   write → reset → load on one cache with the default create info
//! - Multi-backend archives and missing compilers
//! - Corrupted archives, copied vs shared blobs, reset
//! - Pipeline state passthrough

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use kiln::core::DeviceObject;
use kiln::device::{DeviceType, RenderDevice};
use kiln::errors::ErrorKind;
use kiln::settings::{CacheLogLevel, RenderStateCacheSettings};
use kiln::shader::{
    archive_name, ArchiveDeviceFlags, ArchiveReader, CompilingSerializationDevice, DataBlob, Dearchiver,
    PipelineState, PipelineStateCreateInfo, PipelineType, Shader, ShaderCreateInfo, ShaderType, ARCHIVE_MAGIC,
};
use kiln::{RenderStateCache, RenderStateCacheCreateInfo};

use common::{init_logging, MockCompiler, MockDevice};

// ============================================================================
// Helpers
// ============================================================================

fn vertex_shader() -> ShaderCreateInfo {
    ShaderCreateInfo::from_source("VS", ShaderType::Vertex, "float4 main() : SV_Position { return 0; }")
}

fn pixel_shader() -> ShaderCreateInfo {
    ShaderCreateInfo::from_source("PS", ShaderType::Pixel, "float4 main() : SV_Target { return 1; }")
}

/// Cache built from the default create info: compiles through the device and
/// archives bytecode for the device's backend.
fn default_cache(device: &Arc<MockDevice>) -> RenderStateCache {
    init_logging();
    RenderStateCache::new(RenderStateCacheCreateInfo::new(device.clone()))
}

/// Cache whose serialization device has no compilers; nothing is archived.
fn device_only_cache(device: &Arc<MockDevice>) -> RenderStateCache {
    init_logging();
    RenderStateCache::new(
        RenderStateCacheCreateInfo::new(device.clone())
            .with_serialization_device(Arc::new(CompilingSerializationDevice::new())),
    )
}

/// Cache with an offline compiler for the device's backend, so shaders are archived.
fn archiving_cache(device: &Arc<MockDevice>) -> (RenderStateCache, Arc<AtomicUsize>) {
    init_logging();
    let compiler = MockCompiler::new(device.device_type());
    let compiles = Arc::clone(&compiler.compiles);
    let serialization = CompilingSerializationDevice::new()
        .with_compiler(compiler)
        .with_render_device(device.clone());
    let cache = RenderStateCache::new(
        RenderStateCacheCreateInfo::new(device.clone())
            .with_serialization_device(Arc::new(serialization))
            .with_settings(RenderStateCacheSettings {
                log_level: CacheLogLevel::Verbose,
                ..RenderStateCacheSettings::default()
            }),
    );
    (cache, compiles)
}

// ============================================================================
// Deduplication
// ============================================================================

#[test]
fn identical_create_infos_share_one_shader() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = default_cache(&device);

    let (a, cached_a) = cache.create_shader(&vertex_shader()).unwrap();
    let (b, cached_b) = cache.create_shader(&vertex_shader()).unwrap();

    assert!(!cached_a);
    assert!(cached_b);
    assert_eq!(a.unique_id(), b.unique_id());
    assert_eq!(device.source_compiles(), 1);
    assert_eq!(cache.shader_count(), 1);
}

#[test]
fn different_content_gives_different_shaders() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = default_cache(&device);

    let (vs, _) = cache.create_shader(&vertex_shader()).unwrap();
    let (ps, _) = cache.create_shader(&pixel_shader()).unwrap();
    let (vs_macro, cached) = cache
        .create_shader(&vertex_shader().with_macro("USE_SKINNING", "1"))
        .unwrap();

    assert!(!cached);
    assert_ne!(vs.unique_id(), ps.unique_id());
    assert_ne!(vs.unique_id(), vs_macro.unique_id());
    assert_eq!(device.source_compiles(), 3);
}

#[test]
fn name_does_not_participate_in_the_hash() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = default_cache(&device);

    let mut renamed = vertex_shader();
    renamed.desc.name = "Renamed VS".into();
    assert_eq!(renamed.content_hash(), vertex_shader().content_hash());

    let (first, _) = cache.create_shader(&vertex_shader()).unwrap();
    let (second, cached) = cache.create_shader(&renamed).unwrap();
    assert!(cached);
    assert_eq!(first.unique_id(), second.unique_id());
}

#[test]
fn concurrent_requests_yield_valid_shaders() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = Arc::new(default_cache(&device));
    let barrier = Arc::new(Barrier::new(2));

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.create_shader(&vertex_shader()).unwrap().0
            })
        })
        .collect();
    let shaders: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    for shader in &shaders {
        assert!(shader.name().starts_with("VS ["));
        assert_eq!(shader.desc().shader_type, ShaderType::Vertex);
    }
    assert!((1..=2).contains(&device.source_compiles()));

    // Later requests settle on one of the racing shaders.
    let (later, cached) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(cached);
    assert!(shaders.iter().any(|s| s.unique_id() == later.unique_id()));
}

#[test]
fn dropped_shaders_expire_and_are_recreated() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = device_only_cache(&device);

    let (shader, _) = cache.create_shader(&vertex_shader()).unwrap();
    let first_id = shader.unique_id();
    drop(shader);
    assert_eq!(cache.shader_count(), 0);
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.purge_expired(), 0);

    let (again, cached) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(!cached);
    assert_ne!(again.unique_id(), first_id);
    assert_eq!(device.source_compiles(), 2);
}

#[test]
fn device_errors_are_propagated() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = default_cache(&device);

    let broken = ShaderCreateInfo::from_source("Broken", ShaderType::Pixel, "syntax error");
    let err = cache.create_shader(&broken).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::BackendResourceCreationFailed);
    assert_eq!(cache.shader_count(), 0);
}

// ============================================================================
// Archiving
// ============================================================================

#[test]
fn archived_shader_is_loaded_from_bytecode() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let (cache, compiles) = archiving_cache(&device);

    let (shader, cached) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(!cached);
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
    assert_eq!(device.source_compiles(), 0);
    assert_eq!(device.bytecode_loads(), 1);
    assert_eq!(shader.name(), archive_name("VS", vertex_shader().content_hash()));

    // The archiver keeps the serialized shader alive.
    drop(shader);
    let (_again, cached) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(cached);
    assert_eq!(compiles.load(Ordering::SeqCst), 1);
}

#[test]
fn default_cache_archives_through_the_device() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = default_cache(&device);
    let entry = archive_name("VS", vertex_shader().content_hash());

    let (vs, cached) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(!cached);
    assert_eq!(vs.name(), entry);
    assert_eq!(device.source_compiles(), 1);

    let blob = cache.write_to_blob().unwrap();
    let reader = ArchiveReader::new();
    reader.load_archive(&blob, false).unwrap();
    assert!(reader.contains(&entry));

    cache.reset();
    cache.load(&blob, false).unwrap();
    let (vs, from_archive) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(from_archive);
    assert_eq!(vs.name(), "VS");
    assert_eq!(device.source_compiles(), 1);
}

#[test]
fn same_cache_round_trip_over_several_shaders() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let (cache, compiles) = archiving_cache(&device);
    let create_infos = [
        vertex_shader(),
        pixel_shader(),
        vertex_shader().with_macro("USE_SKINNING", "1"),
    ];

    for create_info in &create_infos {
        let (_, cached) = cache.create_shader(create_info).unwrap();
        assert!(!cached);
    }
    assert_eq!(compiles.load(Ordering::SeqCst), 3);

    let blob = cache.write_to_blob().unwrap();
    cache.reset();
    assert_eq!(cache.shader_count(), 0);
    cache.load(&blob, false).unwrap();

    for create_info in &create_infos {
        let (shader, from_archive) = cache.create_shader(create_info).unwrap();
        assert!(from_archive, "'{}' was not unpacked from the archive", create_info.name());
        assert_eq!(shader.desc().shader_type, create_info.desc.shader_type);
    }
    assert_eq!(compiles.load(Ordering::SeqCst), 3);
    assert_eq!(device.source_compiles(), 0);
    assert_eq!(device.bytecode_loads(), 6);
}

#[test]
fn archive_round_trip_skips_compilation() {
    let writer_device = MockDevice::new(DeviceType::Vulkan);
    let (writer, _) = archiving_cache(&writer_device);
    writer.create_shader(&vertex_shader()).unwrap();
    writer.create_shader(&pixel_shader()).unwrap();
    let blob = writer.write_to_blob().unwrap();
    assert_eq!(&blob[..4], &ARCHIVE_MAGIC);

    let reader_device = MockDevice::new(DeviceType::Vulkan);
    let reader = default_cache(&reader_device);
    reader.load(&blob, false).unwrap();

    let (vs, from_archive) = reader.create_shader(&vertex_shader()).unwrap();
    assert!(from_archive);
    assert_eq!(vs.name(), "VS");
    assert_eq!(reader_device.source_compiles(), 0);
    assert_eq!(reader_device.bytecode_loads(), 1);

    let (ps, from_archive) = reader.create_shader(&pixel_shader()).unwrap();
    assert!(from_archive);
    assert_eq!(ps.desc().shader_type, ShaderType::Pixel);

    // Content not in the archive is compiled.
    let (_, from_archive) = reader
        .create_shader(&vertex_shader().with_entry_point("vs_main"))
        .unwrap();
    assert!(!from_archive);
    assert_eq!(reader_device.source_compiles(), 1);
}

#[test]
fn archives_can_target_several_backends() {
    init_logging();
    let vulkan = MockDevice::new(DeviceType::Vulkan);
    let serialization = CompilingSerializationDevice::new()
        .with_compiler(MockCompiler::new(DeviceType::Vulkan))
        .with_compiler(MockCompiler::new(DeviceType::D3D12))
        .with_render_device(vulkan.clone());
    assert_eq!(
        serialization.supported_devices(),
        ArchiveDeviceFlags::VULKAN | ArchiveDeviceFlags::D3D12
    );

    let writer = RenderStateCache::new(
        RenderStateCacheCreateInfo::new(vulkan.clone())
            .with_serialization_device(Arc::new(serialization))
            .with_settings(RenderStateCacheSettings {
                archive_device_flags: Some(ArchiveDeviceFlags::VULKAN | ArchiveDeviceFlags::D3D12),
                ..RenderStateCacheSettings::default()
            }),
    );
    writer.create_shader(&vertex_shader()).unwrap();
    let blob = writer.write_to_blob().unwrap();

    let d3d12 = MockDevice::new(DeviceType::D3D12);
    let reader = default_cache(&d3d12);
    reader.load(&blob, true).unwrap();
    let (shader, from_archive) = reader.create_shader(&vertex_shader()).unwrap();
    assert!(from_archive);
    assert_eq!(shader.device_type(), DeviceType::D3D12);
    assert_eq!(d3d12.source_compiles(), 0);

    // A backend the archive was not built for compiles from source.
    let metal = MockDevice::new(DeviceType::Metal);
    let reader = default_cache(&metal);
    reader.load(&blob, false).unwrap();
    let (_, from_archive) = reader.create_shader(&vertex_shader()).unwrap();
    assert!(!from_archive);
    assert_eq!(metal.source_compiles(), 1);
}

#[test]
fn missing_compiler_falls_back_to_the_device() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let serialization = CompilingSerializationDevice::new().with_compiler(MockCompiler::new(DeviceType::D3D12));
    let cache = RenderStateCache::new(
        RenderStateCacheCreateInfo::new(device.clone()).with_serialization_device(Arc::new(serialization)),
    );

    let (_shader, cached) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(!cached);
    assert_eq!(device.source_compiles(), 1);

    let blob = cache.write_to_blob().unwrap();
    let reader = ArchiveReader::new();
    reader.load_archive(&blob, false).unwrap();
    assert!(!reader.contains(&archive_name("VS", vertex_shader().content_hash())));
}

#[test]
fn write_to_stream_matches_write_to_blob() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let (cache, _) = archiving_cache(&device);
    cache.create_shader(&vertex_shader()).unwrap();
    cache.create_shader(&pixel_shader()).unwrap();

    let blob = cache.write_to_blob().unwrap();
    let mut stream = Vec::new();
    cache.write_to_stream(&mut stream).unwrap();
    assert_eq!(stream.as_slice(), blob.as_bytes());
}

#[test]
fn archive_blob_is_deterministic() {
    let (first, second) = (MockDevice::new(DeviceType::Vulkan), MockDevice::new(DeviceType::Vulkan));
    let (a, _) = archiving_cache(&first);
    let (b, _) = archiving_cache(&second);

    a.create_shader(&vertex_shader()).unwrap();
    a.create_shader(&pixel_shader()).unwrap();
    b.create_shader(&pixel_shader()).unwrap();
    b.create_shader(&vertex_shader()).unwrap();

    assert_eq!(a.write_to_blob().unwrap(), b.write_to_blob().unwrap());
}

// ============================================================================
// Archive Loading
// ============================================================================

#[test]
fn corrupted_blobs_are_rejected() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = default_cache(&device);

    let garbage = DataBlob::from(b"not an archive".to_vec());
    assert_eq!(cache.load(&garbage, false).unwrap_err().kind(), ErrorKind::ArchiveCorrupted);

    let short = DataBlob::from(b"KI".to_vec());
    assert_eq!(cache.load(&short, false).unwrap_err().kind(), ErrorKind::ArchiveCorrupted);

    let (writer, _) = archiving_cache(&device);
    writer.create_shader(&vertex_shader()).unwrap();
    let valid = writer.write_to_blob().unwrap();

    let mut bad_version = valid.to_vec();
    bad_version[4] = 0xFF;
    let err = cache.load(&DataBlob::from(bad_version), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchiveCorrupted);
    assert!(err.to_string().contains("version"));

    let truncated = valid[..valid.len() - 1].to_vec();
    assert_eq!(
        cache.load(&DataBlob::from(truncated), false).unwrap_err().kind(),
        ErrorKind::ArchiveCorrupted
    );

    // Failed loads leave the cache usable.
    let (_, from_archive) = cache.create_shader(&vertex_shader()).unwrap();
    assert!(!from_archive);
}

#[test]
fn load_shares_or_copies_the_blob() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let (writer, _) = archiving_cache(&device);
    writer.create_shader(&vertex_shader()).unwrap();
    let blob = writer.write_to_blob().unwrap();

    let shared = ArchiveReader::new();
    shared.load_archive(&blob, false).unwrap();
    assert!(shared.shares_buffer_with(&blob));

    let copied = ArchiveReader::new();
    copied.load_archive(&blob, true).unwrap();
    assert!(!copied.shares_buffer_with(&blob));
    assert!(copied.contains(&archive_name("VS", vertex_shader().content_hash())));

    // The copy stays usable after the caller's blob is gone.
    drop(blob);
    let reader_device = MockDevice::new(DeviceType::Vulkan);
    let shader = copied
        .unpack_shader(
            &archive_name("VS", vertex_shader().content_hash()),
            reader_device.as_ref(),
            &mut |_| {},
        )
        .unwrap();
    assert!(shader.is_some());
    assert!(copied
        .unpack_shader("unknown [0]", reader_device.as_ref(), &mut |_| {})
        .unwrap()
        .is_none());
}

#[test]
fn newest_archive_wins() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let (writer, _) = archiving_cache(&device);
    writer.create_shader(&vertex_shader()).unwrap();
    let first = writer.write_to_blob().unwrap();
    writer.create_shader(&pixel_shader()).unwrap();
    let second = writer.write_to_blob().unwrap();

    let reader = ArchiveReader::new();
    reader.load_archive(&first, false).unwrap();
    reader.load_archive(&second, false).unwrap();
    assert_eq!(reader.archive_count(), 2);
    assert!(reader.contains(&archive_name("PS", pixel_shader().content_hash())));

    reader.reset();
    assert_eq!(reader.archive_count(), 0);
}

#[test]
fn reset_forgets_everything() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let (writer, _) = archiving_cache(&device);
    writer.create_shader(&vertex_shader()).unwrap();
    let blob = writer.write_to_blob().unwrap();

    let reader_device = MockDevice::new(DeviceType::Vulkan);
    let reader = default_cache(&reader_device);
    reader.load(&blob, false).unwrap();
    let (_vs, from_archive) = reader.create_shader(&vertex_shader()).unwrap();
    assert!(from_archive);

    reader.reset();
    assert_eq!(reader.shader_count(), 0);
    let (_vs, from_archive) = reader.create_shader(&vertex_shader()).unwrap();
    assert!(!from_archive);
    assert_eq!(reader_device.source_compiles(), 1);

    writer.reset();
    let empty = writer.write_to_blob().unwrap();
    assert!(empty.len() < blob.len());
}

// ============================================================================
// Pipeline States
// ============================================================================

#[test]
fn pipeline_states_pass_through_to_the_device() {
    let device = MockDevice::new(DeviceType::Vulkan);
    let cache = default_cache(&device);
    let (vs, _) = cache.create_shader(&vertex_shader()).unwrap();

    let create_info = PipelineStateCreateInfo {
        name: "Opaque".into(),
        pipeline_type: PipelineType::Graphics,
        shaders: vec![vs],
    };
    let (a, cached_a) = cache.create_pipeline_state(&create_info).unwrap();
    let (b, cached_b) = cache.create_pipeline_state(&create_info).unwrap();

    assert!(!cached_a && !cached_b);
    assert_ne!(a.unique_id(), b.unique_id());
    assert_eq!(a.pipeline_type(), PipelineType::Graphics);
    assert_eq!(a.name(), "Opaque");
    assert_eq!(device.pipelines.load(Ordering::SeqCst), 2);
}
