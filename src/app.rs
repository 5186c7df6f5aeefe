// app.rs
pub mod config;
pub mod error;
pub mod file_dialogs;
pub mod gui;
pub mod image_processing;

#[cfg(test)]
mod fixtures;

use crate::utils::Logger;
use config::ConverterConfig;
use eframe::egui;
use eframe::App as EframeApp;
use egui_extras::RetainedImage;
use error::{ConverterError, ConverterResult};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Controller for the converter window.
///
/// Every field is owned by the UI thread. Worker threads only talk back through
/// `update_receiver`, and their results are applied by [`App::apply_update`]
/// after checking the generation tokens they were started with.
pub struct App {
    pub config: ConverterConfig,
    pub source: Option<SourceImage>,
    pub preview: Option<PreviewHandle>,
    pub options: ConversionOptions,
    pub converted: Option<ConvertedImage>,
    pub error: Option<String>,
    pub is_converting: bool,
    pub source_generation: u64,
    pub conversion_generation: u64,
    pub log_messages: Arc<Mutex<Vec<String>>>,
    logger: Logger,
    update_sender: Sender<ConverterUpdate>,
    update_receiver: Receiver<ConverterUpdate>,
    repaint_ctx: Option<egui::Context>,
}

pub enum ConverterUpdate {
    PreviewReady {
        source_generation: u64,
        result: ConverterResult<PreviewHandle>,
    },
    ConversionFinished {
        source_generation: u64,
        conversion_generation: u64,
        result: ConverterResult<ConvertedImage>,
    },
}

/// The file the user picked. Its bytes are read in the background and end up
/// inside the matching [`PreviewHandle`].
#[derive(Clone, Debug, PartialEq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: &'static str,
}

/// Decodable reference to the source bytes, plus the on-screen preview when
/// the bytes could be decoded for display.
pub struct PreviewHandle {
    pub data_uri: String,
    pub dimensions: Option<(u32, u32)>,
    pub image: Option<RetainedImage>,
}

pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub data_uri: String,
    pub image: Option<RetainedImage>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ScaleFactor {
    #[default]
    One,
    OneAndHalf,
    Two,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConversionOptions {
    pub output_format: OutputFormat,
    pub scale_factor: ScaleFactor,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Png, OutputFormat::Jpeg];

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPG",
        }
    }
}

impl ScaleFactor {
    pub const ALL: [ScaleFactor; 3] = [ScaleFactor::One, ScaleFactor::OneAndHalf, ScaleFactor::Two];

    pub fn as_f64(self) -> f64 {
        match self {
            ScaleFactor::One => 1.0,
            ScaleFactor::OneAndHalf => 1.5,
            ScaleFactor::Two => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScaleFactor::One => "1x (Original Size)",
            ScaleFactor::OneAndHalf => "1.5x",
            ScaleFactor::Two => "2x",
        }
    }
}

impl ConvertedImage {
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("data_uri_len", &self.data_uri.len())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ConvertedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertedImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl Default for App {
    fn default() -> Self {
        let log_messages = Arc::new(Mutex::new(Vec::new()));
        let (update_sender, update_receiver) = channel();
        Self {
            config: ConverterConfig::default(),
            source: None,
            preview: None,
            options: ConversionOptions::default(),
            converted: None,
            error: None,
            is_converting: false,
            source_generation: 0,
            conversion_generation: 0,
            logger: Logger::new(log_messages.clone()),
            log_messages,
            update_sender,
            update_receiver,
            repaint_ctx: None,
        }
    }
}

impl App {
    /// Handles a file picked by the user.
    ///
    /// A non-WEBP file only sets the error message. A WEBP file replaces the
    /// current source, drops the previous result and starts reading the bytes
    /// on a worker thread.
    pub fn select_file(&mut self, path: PathBuf) {
        let source = match image_processing::validate_source(&path, &self.config) {
            Ok(source) => source,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        self.source_generation += 1;
        self.error = None;
        self.converted = None;
        self.preview = None;
        // a conversion still in flight belongs to the previous source
        self.is_converting = false;
        self.logger.log(format!("Selected {} ({})", source.name, source.mime_type));

        let generation = self.source_generation;
        let sender = self.update_sender.clone();
        let logger = self.logger.clone();
        let repaint_ctx = self.repaint_ctx.clone();
        let config = self.config.clone();
        let path = source.path.clone();
        self.source = Some(source);

        std::thread::spawn(move || {
            let result = image_processing::read_preview(&path, &config, &logger);
            send_update(
                &sender,
                &repaint_ctx,
                ConverterUpdate::PreviewReady {
                    source_generation: generation,
                    result,
                },
            );
        });
    }

    pub fn convert(&mut self) {
        let preview_uri = match (&self.source, &self.preview) {
            (Some(_), Some(preview)) => preview.data_uri.clone(),
            _ => {
                self.fail(ConverterError::NoFileSelected);
                return;
            }
        };

        self.is_converting = true;
        self.error = None;
        self.conversion_generation += 1;

        let source_generation = self.source_generation;
        let conversion_generation = self.conversion_generation;
        let options = self.options;
        let config = self.config.clone();
        let sender = self.update_sender.clone();
        let logger = self.logger.clone();
        let repaint_ctx = self.repaint_ctx.clone();
        self.logger.log(format!(
            "Starting conversion to {} at {}",
            options.output_format.label(),
            options.scale_factor.label()
        ));

        std::thread::spawn(move || {
            let result = image_processing::convert_image(&preview_uri, options, &config, &logger);
            send_update(
                &sender,
                &repaint_ctx,
                ConverterUpdate::ConversionFinished {
                    source_generation,
                    conversion_generation,
                    result,
                },
            );
        });
    }

    /// Applies a worker result if it still belongs to the current source and
    /// conversion. Returns whether the state changed.
    pub fn apply_update(&mut self, update: ConverterUpdate) -> bool {
        match update {
            ConverterUpdate::PreviewReady {
                source_generation,
                result,
            } => {
                if source_generation != self.source_generation {
                    self.logger.log("Discarding preview for a previously selected file");
                    return false;
                }
                match result {
                    Ok(preview) => {
                        self.preview = Some(preview);
                        self.logger.log("Preview ready");
                    }
                    Err(err) => self.fail(err),
                }
                true
            }
            ConverterUpdate::ConversionFinished {
                source_generation,
                conversion_generation,
                result,
            } => {
                if source_generation != self.source_generation
                    || conversion_generation != self.conversion_generation
                {
                    self.logger.log("Discarding stale conversion result");
                    return false;
                }
                self.is_converting = false;
                match result {
                    Ok(converted) => {
                        self.logger.log(format!(
                            "Conversion successful: {}x{} {}, {} bytes",
                            converted.width,
                            converted.height,
                            converted.format.label(),
                            converted.bytes.len()
                        ));
                        self.converted = Some(converted);
                    }
                    Err(err) => self.fail(err),
                }
                true
            }
        }
    }

    /// Drains every pending worker result without blocking.
    pub fn poll_updates(&mut self) -> bool {
        let mut changed = false;
        while let Ok(update) = self.update_receiver.try_recv() {
            changed |= self.apply_update(update);
        }
        changed
    }

    pub fn download_file_name(&self) -> Option<String> {
        self.converted
            .as_ref()
            .map(|converted| converted.file_name(self.config.output_file_stem))
    }

    pub fn save_converted(&mut self, path: &Path) {
        let Some(converted) = &self.converted else {
            return;
        };
        match file_dialogs::write_output(&converted.bytes, path) {
            Ok(()) => {
                self.error = None;
                self.logger.log(format!("Saved converted image to {}", path.display()));
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.is_converting
    }

    fn fail(&mut self, err: ConverterError) {
        self.logger.error(format!("{} ({})", err, err.detail()));
        self.error = Some(err.to_string());
    }
}

fn send_update(sender: &Sender<ConverterUpdate>, repaint_ctx: &Option<egui::Context>, update: ConverterUpdate) {
    // the receiver only goes away with the window
    if sender.send(update).is_ok() {
        if let Some(ctx) = repaint_ctx {
            ctx.request_repaint();
        }
    }
}

impl EframeApp for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.repaint_ctx.is_none() {
            self.repaint_ctx = Some(ctx.clone());
        }

        let needs_redraw = self.poll_updates();

        gui::render(self, ctx);

        if needs_redraw {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fixtures::{write_png_named, write_webp};
    use std::time::Duration;

    fn wait_for_update(app: &mut App) -> bool {
        let update = app
            .update_receiver
            .recv_timeout(Duration::from_secs(30))
            .expect("worker should report back");
        app.apply_update(update)
    }

    fn app_with_preview(dir: &Path, width: u32, height: u32) -> App {
        let path = write_webp(dir, "photo.webp", width, height);
        let mut app = App::default();
        app.select_file(path);
        assert!(wait_for_update(&mut app));
        assert!(app.preview.is_some());
        app
    }

    #[test]
    fn rejects_non_webp_without_touching_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png_named(dir.path(), "photo.png", 8, 8);
        let mut app = App::default();

        app.select_file(path);

        assert_eq!(app.error.as_deref(), Some("Please upload a WEBP image."));
        assert!(app.source.is_none());
        assert!(app.preview.is_none());
        assert_eq!(app.source_generation, 0);
    }

    #[test]
    fn invalid_selection_keeps_previous_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_preview(dir.path(), 4, 4);
        let png = write_png_named(dir.path(), "other.png", 4, 4);

        app.select_file(png);

        assert_eq!(app.error.as_deref(), Some("Please upload a WEBP image."));
        assert_eq!(app.source.as_ref().map(|s| s.name.as_str()), Some("photo.webp"));
        assert!(app.preview.is_some());
    }

    #[test]
    fn valid_selection_sets_preview_and_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_webp(dir.path(), "photo.webp", 40, 30);
        let mut app = App::default();
        app.error = Some("Please upload a WEBP image.".to_string());

        app.select_file(path);
        assert!(app.error.is_none());
        assert!(app.preview.is_none());

        assert!(wait_for_update(&mut app));
        let preview = app.preview.as_ref().unwrap();
        assert!(preview.data_uri.starts_with("data:image/webp;base64,"));
        assert_eq!(preview.dimensions, Some((40, 30)));
        assert_eq!(app.source.as_ref().unwrap().mime_type, "image/webp");
    }

    #[test]
    fn convert_without_file_does_not_toggle_busy_flag() {
        let mut app = App::default();

        app.convert();

        assert_eq!(app.error.as_deref(), Some("Please select a file first."));
        assert!(!app.is_converting);
        assert_eq!(app.conversion_generation, 0);
    }

    #[test]
    fn convert_before_preview_is_ready_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_webp(dir.path(), "photo.webp", 4, 4);
        let mut app = App::default();
        app.select_file(path);

        app.convert();

        assert_eq!(app.error.as_deref(), Some("Please select a file first."));
        assert!(!app.is_converting);
        // the pending preview still lands
        assert!(wait_for_update(&mut app));
        assert!(app.preview.is_some());
    }

    #[test]
    fn photo_to_jpeg_at_double_scale() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_preview(dir.path(), 400, 300);
        app.options = ConversionOptions {
            output_format: OutputFormat::Jpeg,
            scale_factor: ScaleFactor::Two,
        };

        app.convert();
        assert!(app.is_converting);
        assert!(wait_for_update(&mut app));

        assert!(!app.is_converting);
        assert!(app.error.is_none());
        let converted = app.converted.as_ref().unwrap();
        assert_eq!((converted.width, converted.height), (800, 600));
        assert_eq!(image::guess_format(&converted.bytes).unwrap(), image::ImageFormat::Jpeg);
        assert_eq!(app.download_file_name().as_deref(), Some("converted_image.jpg"));
    }

    #[test]
    fn png_download_name_follows_converted_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_preview(dir.path(), 10, 10);

        app.convert();
        assert!(wait_for_update(&mut app));
        // changing the option afterwards does not rename the existing result
        app.options.output_format = OutputFormat::Jpeg;

        assert_eq!(app.download_file_name().as_deref(), Some("converted_image.png"));
    }

    #[test]
    fn new_selection_clears_result_and_discards_stale_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_preview(dir.path(), 16, 16);
        app.convert();
        assert!(wait_for_update(&mut app));
        assert!(app.converted.is_some());

        app.convert();
        let second = write_webp(dir.path(), "second.webp", 8, 8);
        app.select_file(second);
        assert!(app.converted.is_none());
        assert!(!app.is_converting);

        // one conversion result and one preview are pending, in either order
        let mut applied = 0;
        for _ in 0..2 {
            if wait_for_update(&mut app) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert!(app.converted.is_none());
        assert_eq!(app.preview.as_ref().unwrap().dimensions, Some((8, 8)));
    }

    #[test]
    fn double_convert_applies_only_latest_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_preview(dir.path(), 20, 10);

        app.convert();
        app.options.scale_factor = ScaleFactor::Two;
        app.convert();

        let mut applied = 0;
        for _ in 0..2 {
            if wait_for_update(&mut app) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert!(!app.is_converting);
        let converted = app.converted.as_ref().unwrap();
        assert_eq!((converted.width, converted.height), (40, 20));
    }

    #[test]
    fn stale_preview_is_ignored() {
        let mut app = App::default();
        app.source_generation = 3;
        let update = ConverterUpdate::PreviewReady {
            source_generation: 2,
            result: Err(ConverterError::decode("late")),
        };

        assert!(!app.apply_update(update));
        assert!(app.error.is_none());
    }

    #[test]
    fn read_failure_sets_error_and_leaves_preview_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_webp(dir.path(), "photo.webp", 4, 4);
        let mut app = App::default();
        app.select_file(path.clone());
        let update = ConverterUpdate::PreviewReady {
            source_generation: app.source_generation,
            result: Err(ConverterError::ReadFailure(std::io::Error::other("permission denied"))),
        };

        assert!(app.apply_update(update));

        assert_eq!(app.error.as_deref(), Some("Could not read the selected file."));
        assert!(app.preview.is_none());
        assert_eq!(app.source.as_ref().map(|s| s.path.clone()), Some(path));
    }

    #[test]
    fn deleted_file_reports_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::default();

        app.select_file(dir.path().join("vanished.webp"));
        assert!(wait_for_update(&mut app));

        assert_eq!(app.error.as_deref(), Some("Could not read the selected file."));
        assert!(app.preview.is_none());
        app.convert();
        assert_eq!(app.error.as_deref(), Some("Please select a file first."));
    }

    #[test]
    fn corrupt_preview_data_reports_decode_failure() {
        let mut app = App::default();
        app.source = Some(SourceImage {
            path: PathBuf::from("broken.webp"),
            name: "broken.webp".to_string(),
            mime_type: "image/webp",
        });
        app.preview = Some(PreviewHandle {
            data_uri: image_processing::to_data_uri("image/webp", b"RIFF0000WEBPjunk"),
            dimensions: None,
            image: None,
        });

        app.convert();
        assert!(wait_for_update(&mut app));

        assert_eq!(
            app.error.as_deref(),
            Some("Could not load the image for conversion.")
        );
        assert!(app.converted.is_none());
        assert!(!app.is_converting);
    }

    #[test]
    fn save_writes_converted_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_preview(dir.path(), 6, 6);
        app.convert();
        assert!(wait_for_update(&mut app));

        let target = dir.path().join("converted_image.png");
        app.save_converted(&target);

        let written = std::fs::read(&target).unwrap();
        assert_eq!(written, app.converted.as_ref().unwrap().bytes);
        assert!(app.error.is_none());
    }

    #[test]
    fn save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_preview(dir.path(), 6, 6);
        app.convert();
        assert!(wait_for_update(&mut app));

        app.save_converted(&dir.path().join("missing").join("out.png"));

        assert_eq!(app.error.as_deref(), Some("Could not save the converted image."));
    }
}
