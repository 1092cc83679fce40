use crate::app::{AppState, VersionFilter};
use crate::launcher::{ModLoaderKind, ModLoaderSelection, VersionType};
use eframe::egui;
use egui::{Color32, RichText};

pub struct VersionsView {
    pub filter: VersionFilter,
    selected: Option<String>,
    confirm_delete: Option<String>,
    loader_version: String,
    loader_kind: ModLoaderKind,
}

impl VersionsView {
    pub fn new() -> Self {
        Self {
            filter: VersionFilter::default(),
            selected: None,
            confirm_delete: None,
            loader_version: String::new(),
            loader_kind: ModLoaderKind::Fabric,
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, state: &mut AppState) {
        ui.heading("Versions");
        ui.add_space(6.0);

        self.filter_bar(ui, state);
        ui.add_space(6.0);

        let list_height = (ui.available_height() - 190.0).max(160.0);
        egui::ScrollArea::vertical()
            .id_salt("versions_list")
            .auto_shrink([false; 2])
            .max_height(list_height)
            .show(ui, |ui| self.version_list(ui, state));

        ui.separator();
        self.actions(ui, state);
        ui.separator();
        self.loader_form(ui, state);

        self.delete_dialog(ctx, state);
    }

    fn filter_bar(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.horizontal(|ui| {
            ui.label("🔍");
            ui.add(
                egui::TextEdit::singleline(&mut self.filter.query)
                    .hint_text("Search versions")
                    .desired_width(180.0),
            );
            ui.checkbox(&mut self.filter.releases, "Releases");
            ui.checkbox(&mut self.filter.snapshots, "Snapshots");
            ui.checkbox(&mut self.filter.old, "Old");
            ui.checkbox(&mut self.filter.modded, "Modded");
            ui.checkbox(&mut self.filter.installed_only, "Installed");
            ui.checkbox(&mut self.filter.favorites_only, "★ Only");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!state.is_busy(), egui::Button::new("⟳ Refresh"))
                    .clicked()
                {
                    state.load_versions();
                }
            });
        });
    }

    fn version_list(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        if state.versions.is_empty() {
            ui.weak("No versions loaded yet. Press Refresh to fetch the version list");
            return;
        }

        let mut toggled_favorite = None;
        egui::Grid::new("versions_grid")
            .num_columns(4)
            .striped(true)
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                for entry in &state.versions {
                    let favorite = state.settings.is_favorite(&entry.id);
                    if !self.filter.matches(entry, favorite) {
                        continue;
                    }

                    let star = if favorite { "★" } else { "☆" };
                    if ui.small_button(star).on_hover_text("Favorite").clicked() {
                        toggled_favorite = Some(entry.id.clone());
                    }

                    let is_selected = self.selected.as_deref() == Some(entry.id.as_str());
                    if ui.selectable_label(is_selected, &entry.id).clicked() {
                        self.selected = Some(entry.id.clone());
                    }

                    ui.label(RichText::new(entry.version_type.label()).color(type_color(entry.version_type)));

                    if entry.installed {
                        ui.colored_label(Color32::from_rgb(90, 200, 90), "✓ Installed");
                    } else {
                        ui.weak("-");
                    }
                    ui.end_row();
                }
            });

        if let Some(id) = toggled_favorite {
            state.settings.toggle_favorite(&id);
        }
    }

    fn actions(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        let selected = self
            .selected
            .as_ref()
            .and_then(|id| state.versions.iter().find(|v| &v.id == id))
            .cloned();
        let busy = state.is_busy();

        ui.horizontal(|ui| {
            match &selected {
                Some(entry) => ui.label(format!("Selected: {}", entry.id)),
                None => ui.weak("Select a version"),
            };
            ui.add_space(12.0);

            let installable = selected.as_ref().is_some_and(|v| !v.installed && v.version_type != VersionType::Modded);
            if ui
                .add_enabled(!busy && installable, egui::Button::new("⬇ Install"))
                .clicked()
                && let Some(entry) = &selected
            {
                state.install_version(&entry.id);
            }

            let installed = selected.as_ref().is_some_and(|v| v.installed);
            if ui
                .add_enabled(!busy && installed, egui::Button::new("🗑 Delete"))
                .clicked()
                && let Some(entry) = &selected
            {
                self.confirm_delete = Some(entry.id.clone());
            }

            if ui
                .add_enabled(selected.is_some(), egui::Button::new("★ Favorite"))
                .clicked()
                && let Some(entry) = &selected
            {
                state.settings.toggle_favorite(&entry.id);
            }

            if ui
                .add_enabled(installed, egui::Button::new("▶ Select for Play"))
                .clicked()
                && let Some(entry) = &selected
            {
                state.select_version(&entry.id);
            }
        });
    }

    fn loader_form(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.label(RichText::new("Install Mod Loader").strong());

        if self.loader_version.is_empty()
            && let Some(entry) = self.selected.as_ref()
        {
            self.loader_version = entry.clone();
        }

        ui.horizontal(|ui| {
            ui.label("Minecraft version:");
            egui::ComboBox::from_id_salt("loader_mc_version")
                .selected_text(if self.loader_version.is_empty() {
                    "Select..."
                } else {
                    self.loader_version.as_str()
                })
                .width(140.0)
                .show_ui(ui, |ui| {
                    for entry in state
                        .versions
                        .iter()
                        .filter(|v| v.version_type == VersionType::Release)
                    {
                        ui.selectable_value(&mut self.loader_version, entry.id.clone(), &entry.id);
                    }
                });

            for kind in ModLoaderKind::ALL {
                ui.radio_value(&mut self.loader_kind, kind, kind.display_name());
            }

            if ui
                .add_enabled(!state.is_busy(), egui::Button::new("Install Loader"))
                .clicked()
            {
                state.install_mod_loader(ModLoaderSelection {
                    minecraft_version: self.loader_version.clone(),
                    kind: self.loader_kind,
                });
            }
        });
        ui.weak("Installs the base version too when it is missing. Forge runs its official installer with your Java");
    }

    fn delete_dialog(&mut self, ctx: &egui::Context, state: &mut AppState) {
        let Some(version_id) = self.confirm_delete.clone() else {
            return;
        };

        let mut keep_open = true;
        egui::Window::new("Delete Version")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "Delete {} and its files from the versions folder?",
                    version_id
                ));
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Delete").clicked() {
                        state.delete_version(&version_id);
                        keep_open = false;
                    }
                    if ui.button("Cancel").clicked() {
                        keep_open = false;
                    }
                });
            });

        if !keep_open {
            self.confirm_delete = None;
        }
    }
}

fn type_color(version_type: VersionType) -> Color32 {
    match version_type {
        VersionType::Release => Color32::from_rgb(90, 200, 90),
        VersionType::Snapshot => Color32::from_rgb(230, 180, 60),
        VersionType::Old => Color32::GRAY,
        VersionType::Modded => Color32::from_rgb(120, 150, 240),
    }
}
