use crate::app::file_dialogs;
use crate::app::{App, OutputFormat, ScaleFactor};
use crate::utils::is_error_line;
use egui::{Color32, Frame, RichText, Rounding, Stroke};
use egui_extras::RetainedImage;

const ACCENT: Color32 = Color32::from_rgb(100, 200, 250);
const BUTTON_HEIGHT: f32 = 36.0;
const PREVIEW_HEIGHT: f32 = 220.0;

pub fn render(app: &mut App, ctx: &egui::Context) {
    let frame = Frame {
        fill: Color32::from_rgb(30, 30, 40),
        rounding: Rounding::same(10.0),
        stroke: Stroke::new(1.0, ACCENT),
        inner_margin: egui::style::Margin::same(20.0),
        ..Default::default()
    };

    egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.heading(RichText::new("Os-WEBP Converter").size(28.0).color(ACCENT));
            ui.label(RichText::new("Image Converter & Upscaler").size(16.0).color(Color32::from_rgb(200, 200, 200)));
        });
        ui.add_space(16.0);

        let select_label = match &app.source {
            Some(source) => source.name.clone(),
            None => "Select WEBP Image".to_string(),
        };
        let full_width = ui.available_width();
        if ui.add_sized([full_width, BUTTON_HEIGHT], egui::Button::new(select_label)).clicked() {
            if let Some(path) = file_dialogs::select_webp_image() {
                app.select_file(path);
            }
        }

        if let Some(error) = &app.error {
            ui.add_space(8.0);
            ui.vertical_centered(|ui| {
                ui.label(RichText::new(error).color(Color32::RED));
            });
        }

        ui.add_space(16.0);

        ui.columns(2, |columns| {
            let original = app.preview.as_ref().and_then(|preview| preview.image.as_ref());
            let original_size = app.preview.as_ref().and_then(|preview| preview.dimensions);
            image_display(&mut columns[0], "Original", original, original_size);
            let converted = app.converted.as_ref().and_then(|converted| converted.image.as_ref());
            let converted_size = app.converted.as_ref().map(|converted| (converted.width, converted.height));
            image_display(&mut columns[1], "Converted", converted, converted_size);
        });

        ui.add_space(16.0);

        ui.columns(2, |columns| {
            columns[0].label(RichText::new("Output Format").color(Color32::GRAY));
            egui::ComboBox::from_id_source("output_format")
                .width(columns[0].available_width())
                .selected_text(app.options.output_format.label())
                .show_ui(&mut columns[0], |ui| {
                    for format in OutputFormat::ALL {
                        ui.selectable_value(&mut app.options.output_format, format, format.label());
                    }
                });

            columns[1].label(RichText::new("Upscale").color(Color32::GRAY));
            egui::ComboBox::from_id_source("scale_factor")
                .width(columns[1].available_width())
                .selected_text(app.options.scale_factor.label())
                .show_ui(&mut columns[1], |ui| {
                    for scale in ScaleFactor::ALL {
                        ui.selectable_value(&mut app.options.scale_factor, scale, scale.label());
                    }
                });
        });

        ui.add_space(16.0);

        let can_convert = app.source.is_some() && !app.is_busy();
        if app.is_busy() {
            ui.vertical_centered(|ui| {
                ui.spinner();
            });
        } else {
            let clicked = ui
                .add_enabled_ui(can_convert, |ui| {
                    ui.add_sized([full_width, BUTTON_HEIGHT], egui::Button::new("Convert Image")).clicked()
                })
                .inner;
            if clicked {
                app.convert();
            }
        }

        if let Some(file_name) = app.download_file_name() {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let half_width = (full_width - ui.spacing().item_spacing.x) / 2.0;
                if ui.add_sized([half_width, BUTTON_HEIGHT], egui::Button::new("Download Converted Image")).clicked() {
                    let format = app.converted.as_ref().map(|converted| converted.format).unwrap_or_default();
                    if let Some(path) = file_dialogs::select_save_path(&file_name, format) {
                        app.save_converted(&path);
                    }
                }
                if ui.add_sized([half_width, BUTTON_HEIGHT], egui::Button::new("Copy as Data URI")).clicked() {
                    if let Some(converted) = &app.converted {
                        ui.output().copied_text = converted.data_uri.clone();
                    }
                }
            });
        }

        ui.add_space(20.0);

        ui.group(|ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("Conversion Log").size(16.0).color(ACCENT));

            egui::ScrollArea::vertical()
                .max_height(160.0)
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let logs = app.log_messages.lock();
                    for log in logs.iter() {
                        if is_error_line(log) {
                            ui.label(RichText::new(log).color(Color32::RED));
                        } else {
                            ui.label(log);
                        }
                    }
                });
        });
    });
}

fn image_display(ui: &mut egui::Ui, label: &str, image: Option<&RetainedImage>, dimensions: Option<(u32, u32)>) {
    ui.vertical_centered(|ui| {
        let caption = match dimensions {
            Some((width, height)) => format!("{} ({}x{})", label, width, height),
            None => label.to_string(),
        };
        ui.label(RichText::new(caption).color(Color32::GRAY));
        ui.group(|ui| {
            ui.set_min_size(egui::vec2(ui.available_width(), PREVIEW_HEIGHT));
            ui.centered_and_justified(|ui| match image {
                Some(image) => {
                    image.show_max_size(ui, egui::vec2(ui.available_width(), PREVIEW_HEIGHT));
                }
                None => {
                    ui.label(RichText::new("Image will appear here").size(12.0).color(Color32::GRAY));
                }
            });
        });
    });
}
