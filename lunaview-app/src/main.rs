use std::sync::Arc;
use std::time::Duration;

use lunaview::{HttpTileApi, InputEvent, Point, TilePaint, Viewer, ViewerConfig};

/// Headless tile viewer shell: lists the backend's products, opens the
/// first one (or the one named on the command line) and drives the render
/// loop with a scripted pan/zoom session, reporting cache state per pass.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let wanted_product = args.next();

    let api = HttpTileApi::new(&base_url);
    let products = api.list_products().await?;
    if products.is_empty() {
        return Err("backend reports no products".into());
    }

    println!("Products served by {}:", base_url);
    for p in &products {
        println!(
            "  {} - {} (max zoom {}, {} tiles cached)",
            p.id, p.name, p.max_zoom, p.cached_tiles
        );
    }

    let product = match wanted_product {
        Some(id) => products
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| format!("no such product: {}", id))?,
        None => products.into_iter().next().unwrap(),
    };
    println!("\nViewing {}\n", product.id);

    let viewport = Point::new(1024.0, 768.0);
    let mut viewer = Viewer::new(Arc::new(api.clone()), viewport, ViewerConfig::default());
    viewer.set_product(product.clone());

    // Ask the backend to pre-generate the baseline neighbourhood; the
    // viewer does not wait for this, it only refreshes metadata after.
    match api.request_generation(&product.id, 2, 0..=3, 0..=3).await {
        Ok(receipt) => log::info!("generation accepted: {}", receipt.message),
        Err(e) => eprintln!("generation request failed: {}", e),
    }

    // A small scripted session: settle, drag, zoom in, settle again.
    run_frames(&mut viewer, 120).await;

    viewer.handle_event(InputEvent::DragStart {
        position: Point::new(500.0, 400.0),
    });
    viewer.handle_event(InputEvent::Drag {
        position: Point::new(340.0, 310.0),
    });
    viewer.handle_event(InputEvent::DragEnd);
    run_frames(&mut viewer, 60).await;

    viewer.handle_event(InputEvent::Scroll {
        delta: 1.0,
        position: Point::new(512.0, 384.0),
    });
    run_frames(&mut viewer, 120).await;

    if let Ok(info) = api.product_info(&product.id).await {
        println!(
            "\nBackend now holds {} cached tiles for {}",
            info.cached_tiles, info.id
        );
    }

    Ok(())
}

/// Drives the free-running render pass: one snapshot per frame, never
/// waiting on fetches. Prints a summary when the frame content changes.
async fn run_frames(viewer: &mut Viewer, frames: u32) {
    let mut last_loaded = usize::MAX;
    for _ in 0..frames {
        let snapshot = viewer.render_snapshot();
        let loaded = snapshot.iter().filter(|f| f.paint.is_image()).count();
        let loading = snapshot
            .iter()
            .filter(|f| matches!(f.paint, TilePaint::Loading))
            .count();
        if loaded != last_loaded {
            println!(
                "zoom {} pan ({:.0},{:.0}): {}/{} tiles loaded, {} in flight, {} cached",
                viewer.zoom(),
                viewer.pan().x,
                viewer.pan().y,
                loaded,
                snapshot.len(),
                loading,
                viewer.cached_tile_count()
            );
            last_loaded = loaded;
        }
        tokio::time::sleep(Duration::from_millis(16)).await;
    }
}
