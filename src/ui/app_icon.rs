use eframe::epaint::textures::TextureOptions;
use eframe::epaint::{ColorImage, TextureHandle};
use egui::{Context, IconData, Id, Ui, vec2};
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};

const ICON_PATH: &str = "assets/icon.png";

pub fn get_app_icon() -> IconData {
    let image = image::open(ICON_PATH).unwrap_or_else(|e| {
        log::debug!("No icon at {}: {}", ICON_PATH, e);
        generate_fallback_icon(128)
    });
    let image_rgba = image.to_rgba8();
    let (width, height) = image_rgba.dimensions();

    IconData {
        rgba: image_rgba.into_raw(),
        width,
        height,
    }
}

pub fn show_app_icon(ui: &mut Ui, size: f32) {
    let handle = get_texture_icon(ui.ctx());
    ui.image((handle.id(), vec2(size, size)));
}

fn get_texture_icon(ctx: &Context) -> TextureHandle {
    let texture_name = "app_icon";

    if let Some(handle) = ctx.data(|d| d.get_temp::<TextureHandle>(Id::from(texture_name))) {
        return handle;
    }
    let icon_data = get_app_icon();
    let size = [icon_data.width as usize, icon_data.height as usize];
    let color_image = ColorImage::from_rgba_unmultiplied(size, &icon_data.rgba);

    let handle = ctx.load_texture(texture_name, color_image, TextureOptions::NEAREST);
    ctx.data_mut(|d| d.insert_temp(Id::from(texture_name), handle.clone()));
    handle
}

/// Pixel-art grass block on an 8x8 grid
fn generate_fallback_icon(size: u32) -> DynamicImage {
    const GRID: u32 = 8;
    let grass = [Rgba([96, 160, 64, 255]), Rgba([76, 138, 48, 255])];
    let dirt = [Rgba([134, 96, 67, 255]), Rgba([112, 78, 52, 255])];

    let cell = (size / GRID).max(1);
    let mut img: RgbaImage = ImageBuffer::new(size, size);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let (cx, cy) = ((x / cell).min(GRID - 1), (y / cell).min(GRID - 1));
        let shade = ((cx * 7 + cy * 3) % 5 == 0) as usize;
        // grass hangs a little lower on every other column
        let grass_depth = if cx % 2 == 0 { 2 } else { 3 };
        *pixel = if cy < grass_depth { grass[shade] } else { dirt[shade] };
    }

    DynamicImage::ImageRgba8(img)
}
