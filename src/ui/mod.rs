pub mod app_icon;
pub mod dialogs;
pub mod tabs;
pub mod top_panel;
