use crate::app::Tab;
use crate::ui::app_icon::show_app_icon;
use eframe::egui;
use eframe::epaint::Color32;
use egui::RichText;

pub struct TopPanel;

impl TopPanel {
    pub fn show(ctx: &egui::Context, open_tab: &mut Tab, running_games: usize) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                show_app_icon(ui, 25.0);
                ui.add_space(3.0);
                ui.heading("Quarry");
                ui.add_space(8.0);
                for tab in Tab::ALL {
                    if tab_button(ui, tab.title(), *open_tab == tab).clicked() {
                        *open_tab = tab;
                    }
                    ui.add_space(2.0);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if running_games > 0 {
                        ui.colored_label(
                            Color32::from_rgb(90, 200, 90),
                            format!("● {} running", running_games),
                        );
                    }
                });
            });
        });
    }
}

fn tab_button(ui: &mut egui::Ui, text: &str, is_selected: bool) -> egui::Response {
    let bg_color = if is_selected {
        Color32::from_rgba_unmultiplied(0, 0, 0, 130)
    } else {
        Color32::TRANSPARENT
    };

    ui.spacing_mut().item_spacing = egui::vec2(0.0, 0.0);

    let button = egui::Button::new(RichText::new(text).heading())
        .fill(bg_color)
        .stroke(egui::Stroke::NONE)
        .corner_radius(0.0);

    let response = ui.add(button);

    if response.hovered() && !is_selected {
        ui.painter().rect_filled(
            response.rect,
            0.0,
            Color32::from_rgba_unmultiplied(255, 255, 255, 20),
        );
    }

    response
}
