use eframe::egui::{self, Align, Color32, RichText};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};
use rfd::FileDialog;

use super::results::ResultsView;
use super::ExifAnalyzer;
use crate::app::state::AnalysisPhase;
use crate::pipeline::ExtractionStatus;
use crate::utils::file_size::format_size;

/// Scale of the exposure-profile axes, matching the server's 0-50 metrics.
const EXPOSURE_SCALE: f64 = 50.0;

impl ExifAnalyzer {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let total_height = ui.available_height();
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = total_height - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Photographer Type Analyzer");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new(
                                "Find out what kind of photographer you are from your photos' EXIF data",
                            )
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(20.0);

                    if self.state.phase.allows_input() {
                        self.render_form(ui);
                    }

                    if self.state.phase.is_running() {
                        self.render_progress(ui);
                    }

                    let mut do_reset = false;
                    if self.state.phase == AnalysisPhase::Done {
                        if let Some(results) = &self.state.results {
                            render_results(ui, results);
                        }
                        ui.add_space(10.0);
                        ui.vertical_centered(|ui| {
                            if ui.button("🔄 Start New Analysis").clicked() {
                                do_reset = true;
                            }
                        });
                    }
                    if do_reset {
                        self.reset();
                    }

                    if !self.state.file_statuses.is_empty() {
                        ui.add_space(10.0);
                        self.render_details(ui);
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });
    }

    fn render_form(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Analysis server");
                ui.add(
                    egui::TextEdit::singleline(&mut self.server_url)
                        .desired_width(ui.available_width())
                        .font(egui::TextStyle::Monospace),
                );
            });
        });

        ui.add_space(10.0);

        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button("🖼 Select Images").clicked() {
                    if let Some(paths) = FileDialog::new()
                        .add_filter("JPEG images", &["jpg", "jpeg", "jpe"])
                        .pick_files()
                    {
                        self.add_files(paths);
                    }
                }
                if ui.button("📁 Select Folder").clicked() {
                    if let Some(dir) = FileDialog::new().pick_folder() {
                        self.add_folder(&dir);
                    }
                }
                if !self.selected.is_empty() && ui.button("Clear").clicked() {
                    self.clear_selection();
                }
            });
            if let Some(summary) = self.selection_summary() {
                ui.label(summary);
            }
        });

        ui.add_space(20.0);

        ui.vertical_centered(|ui| {
            if self.whitelist_ready() {
                ui.add_enabled_ui(self.can_start(), |ui| {
                    let button =
                        egui::Button::new("🔍 Analyze Images").min_size(egui::vec2(200.0, 40.0));
                    if ui.add(button).clicked() {
                        self.start_analysis();
                    }
                });
            } else {
                ui.label(
                    RichText::new("⏳ Contacting analysis server…")
                        .color(ui.visuals().text_color().gamma_multiply(0.7)),
                );
            }
        });
    }

    fn render_progress(&self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        ui.group(|ui| {
            if let AnalysisPhase::Reading { .. } = self.state.phase {
                if let Some(current_file) = &self.state.current_file {
                    ui.label(format!("🖼 Reading: {current_file}"));
                } else {
                    ui.label("Extracting exif from image data...");
                }
            }

            let progress_bar = egui::ProgressBar::new(self.state.progress_fraction())
                .show_percentage()
                .animate(self.state.phase.is_running());
            ui.add(progress_bar);

            if let Some(status) = self.state.status_line() {
                ui.label(status);
            }
        });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        if ui
            .button(if self.state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.state.show_details = !self.state.show_details;
        }

        if self.state.show_details {
            egui::ScrollArea::vertical()
                .max_height(200.0)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            ui.add_space(8.0);
                            for status in &self.state.file_statuses {
                                match &status.status {
                                    ExtractionStatus::Extracted { field_count } => {
                                        ui.horizontal(|ui| {
                                            ui.label("✅");
                                            ui.colored_label(
                                                Color32::from_rgb(0, 180, 0),
                                                format!(
                                                    "{} ({}) - {} fields",
                                                    status.name,
                                                    format_size(status.size),
                                                    field_count
                                                ),
                                            );
                                        });
                                    }
                                    ExtractionStatus::Failed(err) => {
                                        ui.horizontal(|ui| {
                                            ui.label("❌");
                                            ui.colored_label(
                                                Color32::from_rgb(220, 50, 50),
                                                format!("{} - {}", status.name, err),
                                            );
                                        });
                                    }
                                }
                                ui.add_space(4.0);
                            }
                            ui.add_space(8.0);
                        });
                });
        }
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.label(
                RichText::new("Your photos never leave this machine; only EXIF metadata is submitted.")
                    .small()
                    .color(ui.visuals().text_color().gamma_multiply(0.6)),
            );
        });

        if let Some(error) = &self.state.error_message {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(Color32::from_rgb(220, 50, 50), error);
            });
        }
    }
}

fn render_results(ui: &mut egui::Ui, results: &ResultsView) {
    ui.group(|ui| {
        ui.heading(RichText::new("Your classification").color(results.lead_colour()));
        ui.add_space(8.0);
        ui.label(&results.summary);
    });

    if results.has_focal_data {
        ui.add_space(10.0);
        ui.group(|ui| {
            ui.heading(RichText::new("How you shoot").color(results.lead_colour()));
            ui.add_space(8.0);
            render_binned_chart(ui, results);
            render_discrete_chart(ui, results);
            ui.add_space(8.0);
            render_exposure_profile(ui, results);
        });
    }

    if let Some(recommendations) = &results.recommendations {
        ui.add_space(10.0);
        ui.group(|ui| {
            ui.heading(RichText::new("How you can improve").color(results.lead_colour()));
            ui.add_space(8.0);
            ui.label(recommendations);
        });
    }

    if let Some(share_url) = &results.share_url {
        ui.add_space(10.0);
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Share your result:");
                ui.monospace(share_url);
                if ui.button("🌐 Open").clicked() {
                    if let Err(err) = open::that(share_url) {
                        tracing::warn!("Failed to open link: {err}");
                    }
                }
                if ui.button("📋 Copy link").clicked() {
                    ui.output_mut(|out| out.copied_text = share_url.clone());
                }
            });
        });
    }
}

fn render_binned_chart(ui: &mut egui::Ui, results: &ResultsView) {
    let binned = &results.response.additional_data.focal_lengths.binned;
    let series: [(&str, &Vec<(String, f64)>); 3] = [
        ("Prime lenses", &binned.primes),
        ("Zoom lenses", &binned.zooms),
        ("All lenses", &binned.all),
    ];

    ui.label("Focal length ranges");
    Plot::new("focal_length_binned")
        .legend(Legend::default())
        .height(220.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (index, (name, points)) in series.iter().enumerate() {
                if points.is_empty() {
                    continue;
                }
                let bars: Vec<Bar> = points
                    .iter()
                    .enumerate()
                    .map(|(bin, (label, count))| {
                        Bar::new(bin as f64 + index as f64 * 0.25, *count)
                            .width(0.22)
                            .name(label)
                    })
                    .collect();
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .name(*name)
                        .color(results.series_colour(index)),
                );
            }
        });

    let labels: Vec<&str> = binned.all.iter().map(|(label, _)| label.as_str()).collect();
    if !labels.is_empty() {
        ui.label(
            RichText::new(labels.join("  ·  "))
                .small()
                .color(ui.visuals().text_color().gamma_multiply(0.6)),
        );
    }
}

fn render_discrete_chart(ui: &mut egui::Ui, results: &ResultsView) {
    let discrete = &results.response.additional_data.focal_lengths.discrete;
    if discrete.zooms.is_empty() {
        return;
    }

    ui.add_space(8.0);
    ui.label("Focal length (mm), zoom lenses");
    let points: PlotPoints = discrete.zooms.iter().map(|&(mm, count)| [mm, count]).collect();
    Plot::new("focal_length_discrete")
        .legend(Legend::default())
        .height(180.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(points)
                    .name("Zoom lenses")
                    .color(results.series_colour(1)),
            );
        });
}

fn render_exposure_profile(ui: &mut egui::Ui, results: &ResultsView) {
    let data = &results.response.additional_data;
    let metrics = [
        ("Aperture", data.aperture),
        ("ISO amplitude", data.iso),
        ("Shutter speed", data.shutter_speed),
        ("Dark conditions", data.exposure),
    ];

    ui.label("Exposure profile");
    for (label, value) in metrics {
        ui.horizontal(|ui| {
            ui.label(format!("{label:>15}"));
            let fraction = (value / EXPOSURE_SCALE).clamp(0.0, 1.0) as f32;
            ui.add(
                egui::ProgressBar::new(fraction)
                    .desired_width(240.0)
                    .text(format!("{value:.1}")),
            );
        });
    }
}
