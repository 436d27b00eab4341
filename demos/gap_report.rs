//! Gap report: detects the gaps in a small parcel coverage and repairs them.
//!
//! Usage:
//! ```text
//! cargo run --example gap_report
//! RUST_LOG=gapcheck=debug cargo run --example gap_report
//! ```

use gapcheck::feature::{FeatureSink, LayerId, MemoryFeaturePool};
use gapcheck::geometry::{BoundingBox, Geometry};
use gapcheck::transform::{AffineTransform, LayerTransforms};
use gapcheck::{DetectGaps, FixMethod, GapCheckConfig, GapFixer};

fn parcel(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry {
    BoundingBox::new(x0, y0, x1, y1).to_polygon().into()
}

fn main() -> gapcheck::Result<()> {
    // Default: WARN for everything, INFO for gapcheck.
    // Override with RUST_LOG env var (e.g. RUST_LOG=gapcheck=trace).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("gapcheck=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let parcels = LayerId::new("parcels");
    let roads = LayerId::new("roads");
    let mut pool = MemoryFeaturePool::new();

    // Parcels are stored in local coordinates offset by (100, 0).
    pool.add_feature(&parcels, parcel(-100.0, 0.0, -96.0, 2.0));
    pool.add_feature(&parcels, parcel(-100.0, 2.0, -98.0, 6.0));
    pool.add_feature(&parcels, parcel(-97.5, 2.5, -96.0, 6.0));
    pool.add_feature(&parcels, parcel(-98.0, 6.0, -96.0, 8.0));
    pool.add_feature(&parcels, parcel(-100.0, 6.0, -98.0, 8.0));

    // The road runs along the east side in map coordinates.
    pool.add_feature(&roads, parcel(4.0, 0.0, 5.0, 8.0));

    let transforms = LayerTransforms::identity()
        .with_layer(parcels.clone(), AffineTransform::translation(100.0, 0.0));
    let config = GapCheckConfig::new(5.0);

    let mut detection = DetectGaps::new(&config).execute(&pool, &transforms, None)?;
    for message in &detection.messages {
        println!("{message}");
    }
    println!("{} gap(s) found", detection.gaps.len());

    let fixer = GapFixer::new(&config);
    for gap in &mut detection.gaps {
        let bbox = gap.geometry().bounding_box();
        println!(
            "gap area={:.3} neighbours={} at {bbox:?}",
            gap.area(),
            gap.neighbor_count()
        );
        match fixer.fix(gap, FixMethod::MergeLongestEdge, &pool, &transforms) {
            Ok(Some(instruction)) => {
                pool.replace_geometry_part(&instruction)?;
                println!(
                    "  merged into {} {:?} part {}",
                    instruction.layer, instruction.feature, instruction.part
                );
            }
            Ok(None) => {}
            Err(err) => println!("  {:?}: {err}", gap.status()),
        }
    }

    let after = DetectGaps::new(&config).execute(&pool, &transforms, None)?;
    println!("{} gap(s) left after repair", after.gaps.len());
    Ok(())
}
