use async_trait::async_trait;
use devframe_lib::calibration::CalibrationSession;
use devframe_lib::commands::Composer;
use devframe_lib::config::AppConfig;
use devframe_lib::devices::{DeviceRef, DeviceRegistry, FileStore, MemoryStore};
use devframe_lib::errors::DevframeResult;
use devframe_lib::geometry::{contain_fit, Point, Rect, Size};
use devframe_lib::media::{ExportScene, Rasterizer};
use devframe_lib::render::{CutoutPlacement, RenderMapper};

const KEY: &str = "customDevices";

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([200, 200, 200, 255]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

fn positioned(placement: CutoutPlacement) -> Rect {
    match placement {
        CutoutPlacement::Positioned { rect, degraded } => {
            assert!(!degraded, "unexpected degraded placement");
            rect
        }
        other => panic!("expected positioned cutout, got {other:?}"),
    }
}

async fn calibrate(
    session: &mut CalibrationSession,
    bytes: &[u8],
    image_box: Rect,
    from: Point,
    to: Point,
) {
    session.load_image_bytes(bytes).await.unwrap();
    session.next().unwrap();
    assert!(session.pointer_down(from, image_box));
    session.pointer_move(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
    session.pointer_up(to).expect("non-degenerate drag");
    session.next().unwrap();
}

#[tokio::test]
async fn happy_path_scenario() {
    let store = MemoryStore::new();
    let mut registry = DeviceRegistry::load(Box::new(store.clone()), KEY);
    let mut session = CalibrationSession::new();

    calibrate(
        &mut session,
        &png(1000, 2000),
        Rect::new(0.0, 0.0, 200.0, 400.0),
        Point::new(40.0, 80.0),
        Point::new(160.0, 320.0),
    )
    .await;
    session.set_name("Scenario phone");
    let saved = session.save(&mut registry).unwrap().value;

    let r = saved.screen_region;
    for (actual, expected) in [(r.x, 0.2), (r.y, 0.2), (r.width, 0.6), (r.height, 0.6)] {
        assert!((actual - expected).abs() < 1e-9, "{r:?}");
    }

    let fit = contain_fit(100.0, 300.0, 1000.0, 2000.0).unwrap();
    assert_eq!((fit.rendered_width, fit.rendered_height), (100.0, 200.0));
    assert_eq!((fit.offset_x, fit.offset_y), (0.0, 50.0));

    let rect = positioned(RenderMapper::default().map_custom(&saved, Size::new(100.0, 300.0)));
    for (actual, expected) in [(rect.x, 20.0), (rect.y, 90.0), (rect.width, 60.0), (rect.height, 120.0)] {
        assert!((actual - expected).abs() < 1e-6, "{rect:?}");
    }

    let reloaded = DeviceRegistry::load(Box::new(store), KEY);
    assert_eq!(reloaded.get(&saved.id), Some(&saved));
}

#[tokio::test]
async fn drawn_rectangle_round_trips_within_a_pixel() {
    let cases = [
        // natural size, display box, drag start, drag end (relative to the image content)
        ((50, 100), Size::new(300.0, 300.0), (10.0, 20.0), (140.0, 250.0)),
        ((160, 90), Size::new(400.0, 600.0), (390.0, 200.0), (15.0, 7.5)),
        ((64, 64), Size::new(250.0, 100.0), (5.0, 95.0), (77.7, 3.3)),
        ((90, 200), Size::new(123.0, 457.0), (0.0, 0.0), (123.0, 273.0)),
    ];

    for ((nw, nh), display, start, end) in cases {
        let fit = contain_fit(display.width, display.height, nw as f64, nh as f64).unwrap();
        let image_box = fit.content_rect();
        let from = Point::new(image_box.x + start.0, image_box.y + start.1);
        let to = Point::new(image_box.x + end.0, image_box.y + end.1);
        let drawn = Rect::from_corners(image_box.clamp_point(from), image_box.clamp_point(to));

        let mut registry = DeviceRegistry::load(Box::new(MemoryStore::new()), KEY);
        let mut session = CalibrationSession::new();
        calibrate(&mut session, &png(nw, nh), image_box, from, to).await;
        session.set_name("Round trip");
        let saved = session.save(&mut registry).unwrap().value;

        let r = saved.screen_region;
        assert!(r.x >= 0.0 && r.y >= 0.0);
        assert!(r.x + r.width <= 1.0 + 1e-9 && r.y + r.height <= 1.0 + 1e-9);

        let mapped = positioned(RenderMapper::default().map_custom(&saved, display));
        for (a, b) in [
            (mapped.x, drawn.x),
            (mapped.y, drawn.y),
            (mapped.width, drawn.width),
            (mapped.height, drawn.height),
        ] {
            assert!((a - b).abs() <= 1.0, "natural {nw}x{nh} box {display:?}: {mapped:?} vs {drawn:?}");
        }
    }
}

struct TestRasterizer;

#[async_trait]
impl Rasterizer for TestRasterizer {
    async fn rasterize(&self, scene: &ExportScene, scale: f32) -> DevframeResult<Vec<u8>> {
        let w = (scene.display_size.width * scale as f64).round() as u32;
        let h = (scene.display_size.height * scale as f64).round() as u32;
        Ok(png(w, h))
    }
}

#[tokio::test]
async fn composer_flow_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.dir = Some(dir.path().to_path_buf());

    let open = |config: &AppConfig| {
        let store = FileStore::new(config.storage.resolved_dir());
        Composer::new(config.clone(), DeviceRegistry::load(Box::new(store), config.storage.key.clone()))
    };

    let mut composer = open(&config);
    let mut session = composer.begin_custom_device();
    calibrate(
        &mut session,
        &png(100, 200),
        Rect::new(0.0, 0.0, 100.0, 200.0),
        Point::new(10.0, 20.0),
        Point::new(90.0, 180.0),
    )
    .await;
    session.set_name("Restart phone");

    #[derive(Default)]
    struct Cutout(Vec<Rect>);
    impl devframe_lib::render::ScreenCutout for Cutout {
        fn use_template(&mut self, _device: devframe_lib::devices::BuiltinDevice) {}
        fn set_rect(&mut self, rect: Rect) {
            self.0.push(rect);
        }
    }
    let mut cutout = Cutout::default();
    let saved = composer.save_custom_device(&mut session, &mut cutout).unwrap();
    assert!(saved.warning.is_none());

    composer.set_screenshot(&png(30, 60)).await.unwrap();
    let artifact = composer.export(&TestRasterizer).await.unwrap();
    assert_eq!(artifact.file_name, format!("{}-mockup.png", saved.value.id));

    drop(composer);
    let mut reopened = open(&config);
    let device = reopened.resolve_device(&saved.value.id).unwrap();
    assert_eq!(device, DeviceRef::Custom(saved.value.clone()));
    reopened.select_device(&saved.value.id, &mut cutout).unwrap();
    assert_eq!(cutout.0.len(), 2);
    assert_eq!(cutout.0[0], cutout.0[1]);
}
