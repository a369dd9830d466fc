use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use eframe::{App, CreationContext, Frame, egui};
use egui::{
    CentralPanel, Color32, ColorImage, Image, Painter, Pos2, Rect, Stroke, TextureOptions,
    TopBottomPanel,
};
use glint::{
    Camera, DebugDraw, FrameLoop, FrameTracer, Key, KeyEvent, RenderSettings,
    geometry::{FloatType, ScreenSize, WorldPoint},
    scene::demo::{StaticScene, demo_lights, demo_shapes, demo_view},
    util::{Rgba, color_to_image},
};
use log::LevelFilter;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

pub struct GlintGui {
    frame_loop: FrameLoop,
    texture: egui::TextureHandle,
}

impl GlintGui {
    pub fn new(frame_tracer: FrameTracer, cc: &CreationContext<'_>) -> anyhow::Result<Self> {
        let texture = cc.egui_ctx.load_texture(
            "rendered",
            egui_image(&frame_tracer.frame_buffer().snapshot()),
            TextureOptions::NEAREST,
        );
        let frame_loop = Arc::new(frame_tracer).spawn()?;

        Ok(GlintGui {
            frame_loop,
            texture,
        })
    }

    fn handle_input(&self, ctx: &egui::Context) {
        let events = ctx.input(|input| input.events.clone());
        let marker = self.frame_loop.frame_tracer().marker();

        for event in events {
            let egui::Event::Key { key, pressed, .. } = event else {
                continue;
            };
            let Some(key) = map_key(key) else {
                continue;
            };
            let event = if pressed {
                KeyEvent::press(key)
            } else {
                KeyEvent::release(key)
            };
            marker.handle_key(event);
        }
    }
}

impl App for GlintGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.handle_input(ctx);

        let frame_tracer = Arc::clone(self.frame_loop.frame_tracer());
        if frame_tracer.frame_buffer().take_dirty() {
            let image = frame_tracer.frame_buffer().snapshot();
            self.texture.set(egui_image(&image), TextureOptions::NEAREST);
        }

        TopBottomPanel::bottom("status").show(ctx, |ui| {
            let marked = frame_tracer.marker().position();
            let state = if self.frame_loop.is_finished() {
                "stopped"
            } else {
                "running"
            };
            ui.label(format!(
                "Frame {} ({state}), marked pixel {}, {} (arrows move, P traces verbosely)",
                self.frame_loop.frames(),
                marked.x,
                marked.y
            ));
        });

        CentralPanel::default().show(ctx, |ui| {
            let response = ui
                .centered_and_justified(|ui| {
                    ui.add(Image::from_texture(&self.texture).shrink_to_fit())
                })
                .inner;

            let camera = match frame_tracer.camera() {
                Ok(camera) => camera,
                Err(e) => {
                    log::debug!("No debug overlay: {e}");
                    return;
                }
            };
            let mut drawer = EguiDrawer {
                painter: ui.painter_at(response.rect),
                rect: response.rect,
                camera,
            };
            if let Err(e) = frame_tracer.draw_debug(&mut drawer) {
                log::debug!("No debug overlay: {e:#}");
            }
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// Draws world space debug geometry over the displayed image.
struct EguiDrawer {
    painter: Painter,
    rect: Rect,
    camera: Camera,
}

impl EguiDrawer {
    fn to_screen(&self, point: &WorldPoint) -> Option<Pos2> {
        let projected = self.camera.project(point)?;
        let resolution = self.camera.get_resolution();
        Some(Pos2::new(
            self.rect.min.x + projected.x / resolution.x as f32 * self.rect.width(),
            self.rect.min.y + projected.y / resolution.y as f32 * self.rect.height(),
        ))
    }
}

impl DebugDraw for EguiDrawer {
    fn draw_line(&mut self, from: &WorldPoint, to: &WorldPoint, color: Rgba, width: FloatType) {
        if let (Some(from), Some(to)) = (self.to_screen(from), self.to_screen(to)) {
            self.painter
                .line_segment([from, to], Stroke::new(width, egui_color(color)));
        }
    }

    fn draw_point(&mut self, center: &WorldPoint, color: Rgba, size: FloatType) {
        if let Some(center) = self.to_screen(center) {
            self.painter
                .circle_filled(center, size / 2.0, egui_color(color));
        }
    }
}

fn map_key(key: egui::Key) -> Option<Key> {
    match key {
        egui::Key::ArrowLeft => Some(Key::Left),
        egui::Key::ArrowRight => Some(Key::Right),
        egui::Key::ArrowUp => Some(Key::Up),
        egui::Key::ArrowDown => Some(Key::Down),
        egui::Key::P => Some(Key::Verbose),
        _ => None,
    }
}

fn egui_color(color: Rgba) -> Color32 {
    let [r, g, b, a] = color_to_image(color).0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn egui_image(image: &image::RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [image.width() as usize, image.height() as usize],
        image.as_raw(),
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    eframe::run_native(
        "Glint",
        Default::default(),
        Box::new(|cc| {
            let resolution = ScreenSize::new(WIDTH, HEIGHT);
            let settings = RenderSettings::builder().highlight_marked(true).build();
            let frame_tracer = FrameTracer::builder()
                .source(Arc::new(StaticScene::new(demo_shapes())))
                .viewing_volume(Arc::new(demo_view(resolution)))
                .resolution(resolution)
                .lights(demo_lights())
                .settings(settings)
                .build();

            Ok(Box::new(GlintGui::new(frame_tracer, cc)?))
        }),
    )
    .map_err(|e| anyhow!("Failed to run the window: {e}"))
}
