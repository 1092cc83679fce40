use crate::app::{AppState, ContentKind, Tab};
use crate::domain::Theme;
use crate::ui::tabs::{self, ContentView, SettingsView, VersionsView};
use crate::ui::top_panel::TopPanel;
use eframe::egui;
use std::path::PathBuf;

pub struct App {
    _tokio_runtime: tokio::runtime::Runtime,
    state: AppState,
    open_tab: Tab,
    applied_theme: Option<Theme>,

    versions_view: VersionsView,
    mods_view: ContentView,
    packs_view: ContentView,
    settings_view: SettingsView,
}

impl App {
    pub fn new(_cc: &eframe::CreationContext<'_>, runtime: tokio::runtime::Runtime) -> Self {
        let mut state = AppState::new(runtime.handle().clone());
        state.load_versions();

        Self {
            _tokio_runtime: runtime,
            state,
            open_tab: Tab::Play,
            applied_theme: None,
            versions_view: VersionsView::new(),
            mods_view: ContentView::new(ContentKind::Mods),
            packs_view: ContentView::new(ContentKind::ResourcePacks),
            settings_view: SettingsView::default(),
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.process_events() {
            ctx.request_repaint();
        }
        self.apply_theme(ctx);
        self.handle_dropped_files(ctx);

        TopPanel::show(ctx, &mut self.open_tab, self.state.running_games);
        self.draw_status_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.open_tab {
            Tab::Play => tabs::play::show(ui, &mut self.state),
            Tab::Versions => self.versions_view.show(ctx, ui, &mut self.state),
            Tab::Mods => self.mods_view.show(ui, &mut self.state),
            Tab::ResourcePacks => self.packs_view.show(ui, &mut self.state),
            Tab::Settings => self.settings_view.show(ctx, ui, &mut self.state),
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(50));
    }
}

impl App {
    fn apply_theme(&mut self, ctx: &egui::Context) {
        let theme = self.state.settings.theme;
        if self.applied_theme == Some(theme) {
            return;
        }
        ctx.set_visuals(match theme {
            Theme::Light => egui::Visuals::light(),
            Theme::Dark => egui::Visuals::dark(),
        });
        self.applied_theme = Some(theme);
    }

    /// Files dropped on the window go to the open content tab
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let kind = match self.open_tab {
            Tab::Mods => self.mods_view.kind(),
            Tab::ResourcePacks => self.packs_view.kind(),
            _ => return,
        };
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.state.add_content(kind, dropped);
        }
    }

    fn draw_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.add_space(2.0);
            ui.horizontal(|ui| {
                if self.state.is_busy() {
                    ui.add(egui::Spinner::new());
                }
                ui.label(&self.state.status);
            });
            let busy = self.state.is_busy();
            ui.add(
                egui::ProgressBar::new(self.state.progress)
                    .show_percentage()
                    .animate(busy),
            );
            ui.add_space(2.0);
        });
    }
}
