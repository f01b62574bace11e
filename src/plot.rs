//! Plot window for acquired step-response data.
//!
//! Renders one line per channel trace with an egui_plot line chart and
//! blocks until the window is dismissed. This is the tail end of the batch
//! flow; it gets handed a finished [`StepResponseData`] and owns nothing
//! else.

use anyhow::{anyhow, Result};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::experiment::StepResponseData;

/// Show the acquired traces in a native window. Returns when the user
/// closes the window.
pub fn show_step_response(data: StepResponseData) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 480.0])
            .with_title("Step Response"),
        ..Default::default()
    };

    eframe::run_native(
        "Step Response",
        options,
        Box::new(move |_cc| Ok(Box::new(PlotApp { data }))),
    )
    .map_err(|e| anyhow!("plot window failed: {e}"))
}

struct PlotApp {
    data: StepResponseData,
}

impl eframe::App for PlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label(format!(
                "Acquired {}",
                self.data.started_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));

            Plot::new("step_response")
                .legend(Legend::default())
                .x_axis_label("Time (s)")
                .y_axis_label("Voltage (V)")
                .show(ui, |plot_ui| {
                    for trace in &self.data.traces {
                        let points = PlotPoints::from_iter(
                            trace.samples.iter().map(|s| [s.elapsed, s.volts]),
                        );
                        plot_ui.line(Line::new(points).name(trace.label()));
                    }
                });
        });
    }
}
