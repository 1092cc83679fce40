use crate::app::{AppState, format_duration};
use crate::domain::Theme;
use crate::domain::settings::{MAX_RAM_MB, MIN_RAM_MB};
use crate::ui::dialogs::Dialogs;
use eframe::egui;
use egui::RichText;

#[derive(Default)]
pub struct SettingsView {
    confirm_reset: bool,
    profile_name: String,
    selected_profile: Option<String>,
}

impl SettingsView {
    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, state: &mut AppState) {
        ui.heading("Settings");
        ui.add_space(6.0);

        egui::ScrollArea::vertical()
            .id_salt("settings_scroll")
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                java_section(ui, state);
                ui.add_space(8.0);
                game_section(ui, state);
                ui.add_space(8.0);
                servers_section(ui, state);
                ui.add_space(8.0);
                self.profiles_section(ui, state);
                ui.add_space(8.0);
                statistics_section(ui, state);
                ui.add_space(8.0);
                self.file_section(ui, state);
            });

        self.reset_dialog(ctx, state);
    }

    fn profiles_section(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.group(|ui| {
            ui.label(RichText::new("Profiles").strong());

            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.profile_name)
                        .hint_text("profile name")
                        .desired_width(200.0),
                );
                if ui.button("Save Current as Profile").clicked() {
                    state.save_profile(&self.profile_name);
                    if state.settings.profiles.contains_key(self.profile_name.trim()) {
                        self.selected_profile = Some(self.profile_name.trim().to_string());
                        self.profile_name.clear();
                    }
                }
            });

            if state.settings.profiles.is_empty() {
                ui.weak("No profiles saved");
            }
            for (name, profile) in &state.settings.profiles {
                let current = *name == state.settings.current_profile;
                let text = format!(
                    "{}{}  -  {} {}, {} MB",
                    if current { "▶ " } else { "" },
                    name,
                    profile.mod_loader.display_name(),
                    profile.version,
                    profile.ram
                );
                let selected = self.selected_profile.as_deref() == Some(name.as_str());
                let response = ui.selectable_label(selected, text);
                let response = if profile.created.is_empty() {
                    response
                } else {
                    response.on_hover_text(format!("Created {}", profile.created))
                };
                if response.clicked() {
                    self.selected_profile = Some(name.clone());
                }
            }

            let selected = self
                .selected_profile
                .clone()
                .filter(|name| state.settings.profiles.contains_key(name));
            ui.horizontal(|ui| {
                if ui.add_enabled(selected.is_some(), egui::Button::new("Load")).clicked()
                    && let Some(name) = &selected
                {
                    state.load_profile(name);
                }
                if ui.add_enabled(selected.is_some(), egui::Button::new("Delete")).clicked()
                    && let Some(name) = &selected
                {
                    state.delete_profile(name);
                    self.selected_profile = None;
                }
                if ui.add_enabled(selected.is_some(), egui::Button::new("Export...")).clicked()
                    && let Some(name) = &selected
                    && let Some(path) = Dialogs::save_profile_file(name)
                {
                    state.export_profile(name, &path);
                }
                if ui.button("Import...").clicked()
                    && let Some(path) = Dialogs::pick_profile_file()
                {
                    state.import_profiles(&path);
                }
            });
        });
    }

    fn file_section(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.horizontal(|ui| {
            if ui
                .button(RichText::new("💾 Save").strong())
                .clicked()
            {
                state.save_settings();
            }
            if ui.button("Export...").clicked()
                && let Some(path) = Dialogs::save_settings_file()
            {
                state.export_settings(&path);
            }
            if ui.button("Import...").clicked()
                && let Some(path) = Dialogs::pick_settings_file()
            {
                state.import_settings(&path);
            }
            if ui.button("Reset").clicked() {
                self.confirm_reset = true;
            }
        });
        ui.weak(format!("Stored in {}", state.settings_path().display()));
    }

    fn reset_dialog(&mut self, ctx: &egui::Context, state: &mut AppState) {
        if !self.confirm_reset {
            return;
        }
        egui::Window::new("Reset Settings")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Restore all settings to their defaults? Statistics are cleared too.");
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Reset").clicked() {
                        state.reset_settings();
                        self.confirm_reset = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.confirm_reset = false;
                    }
                });
            });
    }
}

fn java_section(ui: &mut egui::Ui, state: &mut AppState) {
    ui.group(|ui| {
        ui.label(RichText::new("Java").strong());

        ui.horizontal(|ui| {
            ui.label("Executable:");
            let mut java = state.settings.java_path.clone().unwrap_or_default();
            let edit = egui::TextEdit::singleline(&mut java)
                .hint_text("java from PATH")
                .desired_width(320.0);
            if ui.add(edit).changed() {
                state.settings.java_path = (!java.trim().is_empty()).then_some(java);
            }
            if ui.button("Browse...").clicked()
                && let Some(path) = Dialogs::pick_java_executable()
            {
                state.settings.java_path = Some(path.to_string_lossy().to_string());
            }
            if ui
                .add_enabled(!state.is_busy(), egui::Button::new("Auto-detect"))
                .clicked()
            {
                state.detect_java();
            }
        });

        if !state.java_installations.is_empty() {
            let current = state.settings.java_path.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("detected_java")
                .selected_text("Detected installations")
                .width(320.0)
                .show_ui(ui, |ui| {
                    for java in &state.java_installations {
                        let path = java.path.to_string_lossy().to_string();
                        let text = format!("Java {} - {}", java.version, path);
                        let clicked = ui
                            .add_enabled_ui(java.is_valid, |ui| ui.selectable_label(current == path, text))
                            .inner
                            .clicked();
                        if clicked {
                            state.settings.java_path = Some(path);
                        }
                    }
                });
        }

        ui.add_space(4.0);
        ui.label(format!("Memory: {} MB", state.settings.allocated_ram));
        ui.add(
            egui::Slider::new(&mut state.settings.allocated_ram, MIN_RAM_MB..=MAX_RAM_MB)
                .step_by(512.0)
                .suffix(" MB"),
        );

        ui.add_space(4.0);
        ui.label("Custom JVM arguments (one per line):");
        ui.add(
            egui::TextEdit::multiline(&mut state.settings.custom_jvm_args)
                .font(egui::TextStyle::Monospace)
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );
    });
}

fn game_section(ui: &mut egui::Ui, state: &mut AppState) {
    ui.group(|ui| {
        ui.label(RichText::new("Game").strong());
        egui::Grid::new("game_settings_grid")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Username:");
                ui.text_edit_singleline(&mut state.settings.username);
                ui.end_row();

                ui.label("Window size:");
                ui.horizontal(|ui| {
                    ui.add(egui::DragValue::new(&mut state.settings.window_width).range(0..=7680));
                    ui.label("×");
                    ui.add(egui::DragValue::new(&mut state.settings.window_height).range(0..=4320));
                    ui.checkbox(&mut state.settings.fullscreen, "Fullscreen");
                });
                ui.end_row();

                ui.label("Theme:");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut state.settings.theme, Theme::Light, "Light");
                    ui.radio_value(&mut state.settings.theme, Theme::Dark, "Dark");
                });
                ui.end_row();
            });
    });
}

fn servers_section(ui: &mut egui::Ui, state: &mut AppState) {
    ui.group(|ui| {
        ui.label(RichText::new("Saved Servers").strong());

        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut state.settings.server_ip)
                    .hint_text("server address")
                    .desired_width(200.0),
            );
            ui.label(":");
            ui.add(egui::TextEdit::singleline(&mut state.settings.server_port).desired_width(52.0));
            if ui.button("Save Server").clicked() && !state.settings.save_current_server() {
                state.status = "Enter a new server address first".to_string();
            }
        });

        let mut use_server = None;
        let mut remove_server = None;
        for server in &state.settings.saved_servers {
            ui.horizontal(|ui| {
                ui.label(server);
                if ui.small_button("Use").clicked() {
                    use_server = Some(server.clone());
                }
                if ui.small_button("Remove").clicked() {
                    remove_server = Some(server.clone());
                }
            });
        }
        if let Some(server) = use_server {
            state.settings.use_server(&server);
        }
        if let Some(server) = remove_server {
            state.settings.remove_server(&server);
        }
    });
}

fn statistics_section(ui: &mut egui::Ui, state: &AppState) {
    let stats = &state.settings.statistics;
    ui.group(|ui| {
        ui.label(RichText::new("Statistics").strong());
        egui::Grid::new("statistics_grid")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label("Launches:");
                ui.label(stats.total_launches.to_string());
                ui.end_row();

                ui.label("Play time:");
                ui.label(format_duration(stats.total_playtime_secs));
                ui.end_row();

                ui.label("Last launch:");
                ui.label(
                    stats
                        .last_launch
                        .map(|at| {
                            at.with_timezone(&chrono::Local)
                                .format("%Y-%m-%d %H:%M")
                                .to_string()
                        })
                        .unwrap_or_else(|| "never".to_string()),
                );
                ui.end_row();

                ui.label("Most played:");
                ui.label(if stats.most_used_version.is_empty() {
                    "-"
                } else {
                    stats.most_used_version.as_str()
                });
                ui.end_row();
            });

        if !state.settings.recent_versions.is_empty() {
            ui.label(format!(
                "Recent: {}",
                state
                    .settings
                    .recent_versions
                    .iter()
                    .rev()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    });
}
