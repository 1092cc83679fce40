mod app;
mod domain;
mod infra;
mod launcher;
mod ui;

use app::App;
use eframe::NativeOptions;
use tokio::runtime::Runtime;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let runtime = Runtime::new().expect("Failed to create Tokio runtime");

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 750.0])
            .with_min_inner_size([760.0, 520.0])
            .with_title("Quarry Launcher")
            .with_icon(ui::app_icon::get_app_icon()),
        ..Default::default()
    };

    eframe::run_native(
        "Quarry Launcher",
        options,
        Box::new(|cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(App::new(cc, runtime)) as Box<dyn eframe::App>)
        }),
    )
}
