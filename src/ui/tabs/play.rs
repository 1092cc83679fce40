use crate::app::AppState;
use crate::launcher::GameLoader;
use crate::ui::dialogs::Dialogs;
use eframe::egui;
use egui::RichText;

pub fn show(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("Play");
    ui.add_space(8.0);

    ui.group(|ui| {
        egui::Grid::new("play_grid")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("Version:");
                version_combo(ui, state);
                ui.end_row();

                ui.label("Mod loader:");
                egui::ComboBox::from_id_salt("play_loader")
                    .selected_text(state.settings.selected_mod_loader.display_name())
                    .width(240.0)
                    .show_ui(ui, |ui| {
                        for loader in GameLoader::ALL {
                            ui.selectable_value(
                                &mut state.settings.selected_mod_loader,
                                loader,
                                loader.display_name(),
                            );
                        }
                    });
                ui.end_row();

                ui.label("Username:");
                ui.add(
                    egui::TextEdit::singleline(&mut state.settings.username)
                        .desired_width(240.0),
                );
                ui.end_row();

                ui.label("Server:");
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut state.settings.server_ip)
                            .hint_text("optional, joins on start")
                            .desired_width(180.0),
                    );
                    ui.label(":");
                    ui.add(
                        egui::TextEdit::singleline(&mut state.settings.server_port)
                            .desired_width(52.0),
                    );
                    saved_servers_menu(ui, state);
                });
                ui.end_row();
            });
    });

    ui.add_space(10.0);

    ui.horizontal(|ui| {
        let launch = egui::Button::new(RichText::new("▶ Launch").heading())
            .min_size(egui::vec2(180.0, 44.0));
        if ui.add_enabled(!state.is_busy(), launch).clicked() {
            state.launch();
        }
        if let Some(loader) = state.settings.selected_mod_loader.mod_loader() {
            ui.weak(format!(
                "Uses the newest installed {} profile for this version",
                loader
            ));
        }
    });

    ui.add_space(12.0);
    log_box(ui, state);
}

fn version_combo(ui: &mut egui::Ui, state: &mut AppState) {
    let versions = state.playable_versions();
    if versions.is_empty() {
        ui.colored_label(
            egui::Color32::YELLOW,
            "⚠ No versions installed. Install one from the Versions tab",
        );
        return;
    }

    let selected = if state.settings.selected_version.is_empty() {
        "Select a version...".to_string()
    } else {
        state.settings.selected_version.clone()
    };

    egui::ComboBox::from_id_salt("play_version")
        .selected_text(selected)
        .width(240.0)
        .show_ui(ui, |ui| {
            for version in &versions {
                let text = if state.settings.is_favorite(version) {
                    format!("★ {}", version)
                } else {
                    version.clone()
                };
                ui.selectable_value(&mut state.settings.selected_version, version.clone(), text);
            }
        });
}

fn saved_servers_menu(ui: &mut egui::Ui, state: &mut AppState) {
    if state.settings.saved_servers.is_empty() {
        return;
    }
    let mut chosen = None;
    ui.menu_button("Saved", |ui| {
        for server in &state.settings.saved_servers {
            if ui.button(server).clicked() {
                chosen = Some(server.clone());
                ui.close();
            }
        }
    });
    if let Some(server) = chosen {
        state.settings.use_server(&server);
    }
}

fn log_box(ui: &mut egui::Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("Log").strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let has_lines = !state.log.is_empty();
            if ui.add_enabled(has_lines, egui::Button::new("Clear")).clicked() {
                state.log.clear();
            }
            if ui
                .add_enabled(has_lines, egui::Button::new("Export Log"))
                .clicked()
                && let Some(path) = Dialogs::save_log_file()
            {
                state.export_log(&path);
            }
        });
    });

    egui::ScrollArea::vertical()
        .id_salt("play_log")
        .auto_shrink([false; 2])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            let mut text: &str = state.log.text();
            ui.add(
                egui::TextEdit::multiline(&mut text)
                    .font(egui::TextStyle::Monospace)
                    .desired_width(f32::INFINITY),
            );
        });
}
