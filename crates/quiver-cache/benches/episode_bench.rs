use criterion::{criterion_group, criterion_main, Criterion};
use quiver_cache::{BindRequest, BindingCache, BindingCacheConfig};
use quiver_core::{
    BindingKind, BufferId, ImageViewId, ReflectedLayouts, ResourcePayload, SamplerId, ScopePolicy,
    SetLayout, SetLayoutBinding, ShaderStageFlags,
};
use quiver_infra::HeadlessDevice;
use std::hint::black_box;
use std::sync::Arc;

fn layouts() -> ReflectedLayouts {
    ReflectedLayouts::new()
        .with_set(
            SetLayout::new(
                0,
                [SetLayoutBinding::new(
                    0,
                    BindingKind::UniformBufferDynamic,
                    ShaderStageFlags::VERTEX_FRAGMENT,
                )],
            )
            .unwrap(),
        )
        .unwrap()
        .with_set(
            SetLayout::new(
                1,
                [
                    SetLayoutBinding::new(0, BindingKind::UniformBuffer, ShaderStageFlags::VERTEX),
                    SetLayoutBinding::new(
                        1,
                        BindingKind::CombinedImageSampler,
                        ShaderStageFlags::FRAGMENT,
                    ),
                ],
            )
            .unwrap(),
        )
        .unwrap()
}

fn draw(cache: &mut BindingCache, material: usize) {
    cache.begin_episode().unwrap();
    cache
        .plan(
            BindRequest::at(0, 0, ResourcePayload::whole_buffer(BufferId(0)))
                .with_policy(ScopePolicy::PerFrameShared)
                .with_dynamic_offsets([material as u32 * 256]),
        )
        .unwrap();
    cache
        .plan(
            BindRequest::at(1, 0, ResourcePayload::whole_buffer(BufferId(100 + material)))
                .with_policy(ScopePolicy::GlobalPerCall),
        )
        .unwrap();
    cache
        .plan(
            BindRequest::at(
                1,
                1,
                ResourcePayload::sampled_image(ImageViewId(material), Some(SamplerId(0))),
            )
            .with_policy(ScopePolicy::GlobalPerCall),
        )
        .unwrap();
    cache.end_episode().unwrap();
}

fn bench_episodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bind Episodes");

    for materials in [1usize, 8, 32] {
        let mut cache = BindingCache::new(
            Arc::new(HeadlessDevice::default()),
            layouts(),
            BindingCacheConfig::default(),
        );
        // Warm the cache so that every iteration hits an existing instance.
        for material in 0..materials {
            draw(&mut cache, material);
        }

        group.bench_function(format!("Steady state ({materials} materials)"), |b| {
            let mut material = 0;
            b.iter(|| {
                draw(&mut cache, material);
                material = (material + 1) % materials;
                black_box(cache.current_dynamic_offsets());
            });
        });
    }

    group.bench_function("Cold episode after reset", |b| {
        let mut cache = BindingCache::new(
            Arc::new(HeadlessDevice::default()),
            layouts(),
            BindingCacheConfig::default(),
        );
        b.iter(|| {
            cache.reset();
            draw(&mut cache, 0);
            black_box(cache.current_set_handles());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_episodes);
criterion_main!(benches);
