use crate::app::{AppState, ContentKind};
use crate::ui::dialogs::Dialogs;
use eframe::egui;
use egui::RichText;

/// Mods and Resource Packs tabs share this view
pub struct ContentView {
    kind: ContentKind,
    selected: Option<String>,
}

impl ContentView {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            selected: None,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        let kind = self.kind;
        ui.heading(match kind {
            ContentKind::Mods => "Mods",
            ContentKind::ResourcePacks => "Resource Packs",
        });
        ui.weak(state.content_dir(kind).display().to_string());
        ui.add_space(6.0);

        self.toolbar(ui, state);
        ui.add_space(6.0);

        let entries = state.content(kind).to_vec();
        if entries.is_empty() {
            ui.weak(format!(
                "No {} yet. Use Add or drop files onto the window",
                kind.label()
            ));
            return;
        }

        let enabled_count = entries.iter().filter(|e| e.enabled).count();
        if kind == ContentKind::Mods {
            ui.label(format!(
                "{} mods, {} enabled",
                entries.len(),
                enabled_count
            ));
        }

        egui::ScrollArea::vertical()
            .id_salt(("content_list", kind.label()))
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for entry in &entries {
                    let icon = if entry.is_dir { "📁" } else { "📦" };
                    let mut text = RichText::new(format!("{} {}", icon, entry.filename));
                    if !entry.enabled {
                        text = text.weak().italics();
                    }
                    let is_selected = self.selected.as_deref() == Some(entry.filename.as_str());
                    let response = ui.selectable_label(is_selected, text);
                    let response = if entry.enabled {
                        response
                    } else {
                        response.on_hover_text("Disabled: kept in mods/disabled")
                    };
                    if response.clicked() {
                        self.selected = Some(entry.filename.clone());
                    }
                }
            });
    }

    fn toolbar(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        let kind = self.kind;
        let selected = self.selected.as_ref().and_then(|name| {
            state
                .content(kind)
                .iter()
                .find(|e| &e.filename == name)
                .cloned()
        });

        ui.horizontal(|ui| {
            if ui.button("➕ Add...").clicked() {
                let dir = state.content_dir(kind).to_path_buf();
                let picked = match kind {
                    ContentKind::Mods => Dialogs::pick_mod_files(&dir),
                    ContentKind::ResourcePacks => Dialogs::pick_resource_pack_files(&dir),
                };
                if let Some(paths) = picked {
                    state.add_content(kind, paths);
                }
            }

            if kind == ContentKind::ResourcePacks
                && ui.button("📁 Add Folder...").clicked()
                && let Some(path) = Dialogs::pick_resource_pack_folder(state.content_dir(kind))
            {
                state.add_content(kind, vec![path]);
            }

            if ui
                .add_enabled(selected.is_some(), egui::Button::new("🗑 Remove"))
                .clicked()
                && let Some(entry) = &selected
            {
                state.remove_content(kind, entry);
                self.selected = None;
            }

            if kind == ContentKind::Mods {
                let label = match &selected {
                    Some(entry) if !entry.enabled => "Enable",
                    _ => "Disable",
                };
                if ui
                    .add_enabled(selected.is_some(), egui::Button::new(label))
                    .clicked()
                    && let Some(entry) = &selected
                {
                    state.set_content_enabled(kind, entry, !entry.enabled);
                }
            }

            if ui.button("⟳ Refresh").clicked() {
                state.refresh_content(kind);
            }

            if ui.button("Open Folder").clicked() {
                state.open_content_folder(kind);
            }
        });
    }
}
