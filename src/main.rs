// main.rs
mod app;
mod utils;

use app::App;
use eframe::NativeOptions;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let native_options = NativeOptions {
        initial_window_size: Some(egui::Vec2::new(900.0, 760.0)),
        resizable: true,
        ..Default::default()
    };
    eframe::run_native(
        "Os-WEBP Converter",
        native_options,
        Box::new(|_cc| Box::new(App::default())),
    );
}
