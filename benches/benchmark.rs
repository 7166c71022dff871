//! Benchmarks for the configuration-resolution engine.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use sitesmith::card::{CardConfig, CardTemplate};
use sitesmith::config::merge_config_layers;
use sitesmith::site::{AddCardOptions, Site, SiteConfig, SiteMode, SiteOptions};
use sitesmith::theme::{Theme, ThemeRegistry};

fn registry() -> ThemeRegistry {
    ThemeRegistry::new(vec![Theme::new("bench")
        .with_templates(vec![
            CardTemplate::new("wrap").as_page_card(),
            CardTemplate::new("hero")
                .with_user_config(json!({ "heading": "Hello", "layout": { "align": "center" } })),
        ])
        .with_user_config(json!({
            "branding": { "logo": "bench.svg" },
            "styling": { "fonts": { "title": { "fontKey": "Poppins" } } },
        }))])
}

fn site_with_pages(page_count: usize) -> Site {
    let pages = (0..page_count)
        .map(|i| {
            CardConfig::new()
                .with_card_id(format!("pg_{i}"))
                .with_slug(format!("page-{i}"))
                .with_cards(vec![
                    CardConfig::new()
                        .with_template_id("hero")
                        .with_user_config(json!({ "heading": format!("Page {i}") })),
                ])
        })
        .collect();
    Site::create(
        SiteConfig::new().with_theme_id("bench").with_pages(pages),
        &registry(),
        SiteOptions {
            mode: SiteMode::Standard,
            load_theme_pages: false,
        },
    )
    .expect("bench site")
}

fn bench_merge_config_layers(c: &mut Criterion) {
    let theme = json!({
        "branding": { "logo": "a.svg", "favicon": "f.ico" },
        "styling": { "fonts": { "title": { "fontKey": "Poppins" }, "body": { "stack": "serif" } } },
    });
    let base = json!({ "layout": { "align": "center", "columns": 3 } });
    let user = json!({
        "branding": { "logo": "b.svg" },
        "layout": { "columns": 2 },
        "heading": "Hello world",
    });

    c.bench_function("merge_config_layers", |b| {
        b.iter(|| black_box(merge_config_layers(&[&theme, &base, &user])))
    });
}

fn bench_site_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("site_create");
    for page_count in [1usize, 10, 50] {
        group.bench_with_input(
            BenchmarkId::from_parameter(page_count),
            &page_count,
            |b, &count| b.iter(|| black_box(site_with_pages(count))),
        );
    }
    group.finish();
}

fn bench_view_map(c: &mut Criterion) {
    let site = site_with_pages(50);
    c.bench_function("view_map_50_pages", |b| b.iter(|| black_box(site.view_map())));
}

fn bench_card_full_config(c: &mut Criterion) {
    let site = site_with_pages(10);
    let hero_id = site.pages[0].cards[0].card_id.clone();
    c.bench_function("card_full_config", |b| {
        b.iter(|| black_box(site.card_full_config(&hero_id).unwrap()))
    });
}

fn bench_add_card(c: &mut Criterion) {
    c.bench_function("add_nested_card", |b| {
        let mut site = site_with_pages(1);
        b.iter(|| {
            let id = site
                .add_card(
                    CardConfig::new().with_template_id("hero"),
                    AddCardOptions {
                        add_to_card_id: Some("pg_0".into()),
                        ..Default::default()
                    },
                )
                .unwrap();
            black_box(id);
        })
    });
}

criterion_group!(
    benches,
    bench_merge_config_layers,
    bench_site_create,
    bench_view_map,
    bench_card_full_config,
    bench_add_card,
);
criterion_main!(benches);
