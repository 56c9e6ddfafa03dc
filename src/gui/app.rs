use std::sync::mpsc;

use egui_extras::{Column, TableBuilder};

use crate::config::Config;
use crate::core::dispatcher::Dispatcher;
use crate::core::view_model::{hover_text, row_labels, ChartView};
use crate::models::{
    ActionKind, Outcome, RefSource, Resolution, SongAction, SongRecord, Surface,
};
use crate::sources::billboard::BillboardClient;

enum BgResult {
    ChartLoaded {
        ticket: u64,
        songs: Vec<SongRecord>,
    },
    ActionDone {
        generation: u64,
        action: SongAction,
        resolution: Option<Resolution>,
        outcome: Result<Outcome, String>,
    },
    ChartFailed {
        ticket: u64,
        msg: String,
    },
}

pub struct TopSongsApp {
    view: ChartView,
    dispatcher: Dispatcher,
    chart_url: String,
    limit_input: String,

    // Background tasks
    tx: mpsc::Sender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
    status_msg: String,
}

/// What the pointer did to one table row during a frame.
#[derive(Default)]
struct RowEvents {
    hovered: Option<String>,
    clicked: Option<SongAction>,
}

impl RowEvents {
    fn observe(&mut self, response: &egui::Response, song: &SongRecord, action: SongAction) {
        if response.hovered() {
            self.hovered = Some(hover_text(song, action.kind));
        }
        if response.clicked() {
            self.clicked = Some(action);
        }
    }
}

impl TopSongsApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, dispatcher: Dispatcher) -> Self {
        let (tx, rx) = mpsc::channel();
        let view = ChartView::new(config.chart.limit, config.spotify.launcher);

        let mut app = Self {
            limit_input: view.limit().to_string(),
            view,
            dispatcher,
            chart_url: config.chart.url,
            tx,
            rx,
            status_msg: String::new(),
        };

        app.start_fetch(&cc.egui_ctx);
        app
    }

    fn start_fetch(&mut self, ctx: &egui::Context) {
        let Some(ticket) = self.view.begin_fetch() else {
            self.status_msg = "Still loading the chart...".to_string();
            return;
        };
        let url = self.chart_url.clone();
        let limit = self.view.limit();
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.status_msg = "Loading chart...".to_string();

        std::thread::spawn(move || {
            let msg = match BillboardClient::with_url(url) {
                Ok(client) => BgResult::ChartLoaded {
                    ticket,
                    songs: client.fetch(limit),
                },
                Err(e) => BgResult::ChartFailed {
                    ticket,
                    msg: format!("Chart client failed: {:#}", e),
                },
            };
            let _ = tx.send(msg);
            ctx.request_repaint();
        });
    }

    fn refresh(&mut self, ctx: &egui::Context) {
        if self.view.is_fetching() {
            self.status_msg = "Still loading the chart...".to_string();
            return;
        }
        let limit = self.view.apply_limit_input(&self.limit_input);
        self.limit_input = limit.to_string();
        self.start_fetch(ctx);
    }

    fn start_action(&mut self, ctx: &egui::Context, action: SongAction) {
        let Some(mut song) = self.view.begin(action) else {
            self.status_msg = "Still looking that up...".to_string();
            return;
        };

        let generation = self.view.generation();
        let mut dispatcher = self.dispatcher.clone();
        dispatcher.set_mode(self.view.launch_mode());
        let tx = self.tx.clone();
        let ctx = ctx.clone();

        std::thread::spawn(move || {
            let mut resolution = None;
            let outcome = dispatcher
                .resolve_missing(&song, action.kind)
                .and_then(|found| {
                    if let Some(found) = found {
                        song.apply(&found);
                        resolution = Some(found);
                    }
                    dispatcher.perform(action.kind, &song)
                })
                .map_err(|e| e.to_string());

            let _ = tx.send(BgResult::ActionDone {
                generation,
                action,
                resolution,
                outcome,
            });
            ctx.request_repaint();
        });
    }

    fn process_bg_results(&mut self) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                BgResult::ChartLoaded { ticket, songs } => {
                    let status = if songs.is_empty() {
                        "Could not load the chart".to_string()
                    } else {
                        format!("Top {} songs", songs.len())
                    };
                    if self.view.finish_fetch(ticket, Some(songs)) {
                        self.status_msg = status;
                    }
                }
                BgResult::ActionDone {
                    generation,
                    action,
                    resolution,
                    outcome,
                } => {
                    self.view.complete(generation, action, resolution.as_ref());
                    self.status_msg = match outcome {
                        Ok(outcome) => outcome.to_string(),
                        Err(msg) => msg,
                    };
                }
                BgResult::ChartFailed { ticket, msg } => {
                    if self.view.finish_fetch(ticket, None) {
                        self.status_msg = msg;
                    }
                }
            }
        }
    }

    /// Start the desktop app or open the web player.
    fn open_player(&mut self, surface: Surface) {
        self.status_msg = match self.dispatcher.open_player(surface) {
            Ok(outcome) => outcome.to_string(),
            Err(e) => e.to_string(),
        };
    }

    fn song_table(&self, ui: &mut egui::Ui) -> RowEvents {
        let mut events = RowEvents::default();

        TableBuilder::new(ui)
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(36.0))
            .column(Column::auto().at_least(180.0))
            .column(Column::auto().at_least(180.0))
            .column(Column::remainder())
            .header(22.0, |mut header| {
                header.col(|ui| {
                    ui.strong("#");
                });
                header.col(|ui| {
                    ui.strong("Song");
                });
                header.col(|ui| {
                    ui.strong("Artist");
                });
                header.col(|ui| {
                    ui.strong("Video");
                });
            })
            .body(|mut body| {
                for (i, song) in self.view.songs().iter().enumerate() {
                    let labels = row_labels(song);
                    body.row(28.0, |mut row| {
                        row.col(|ui| {
                            let r = ui.add(egui::Button::new(song.rank.to_string()).frame(false));
                            events.observe(&r, song, SongAction::new(ActionKind::OpenChart, i));
                        });
                        row.col(|ui| {
                            let r = ui.add(egui::Button::new(labels.title.as_str()).frame(false));
                            events.observe(&r, song, SongAction::new(ActionKind::PlayTrack, i));
                            if self.view.is_pending(i, RefSource::Streaming) {
                                ui.spinner();
                            }
                        });
                        row.col(|ui| {
                            let r = ui.add(egui::Button::new(labels.artist.as_str()).frame(false));
                            events.observe(&r, song, SongAction::new(ActionKind::OpenArtist, i));
                        });
                        row.col(|ui| {
                            let r = ui.button("▶ MV");
                            events.observe(&r, song, SongAction::new(ActionKind::OpenVideo, i));
                            if self.view.is_pending(i, RefSource::Video) {
                                ui.spinner();
                            }
                        });
                    });
                }
            });

        events
    }
}

impl eframe::App for TopSongsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_bg_results();

        // Top panel: song count, refresh, launcher, player buttons
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Top Songs");
                ui.add_space(16.0);
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.limit_input).desired_width(36.0),
                );
                if ui.button("⟳ Refresh").clicked()
                    || (response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)))
                {
                    self.refresh(ctx);
                }
                if ui.button(self.view.launch_mode().label()).clicked() {
                    self.view.toggle_launch_mode();
                }
                ui.separator();
                if ui
                    .button("App")
                    .on_hover_text("Start the Spotify app")
                    .clicked()
                {
                    self.open_player(Surface::Desktop);
                }
                if ui
                    .button("Web")
                    .on_hover_text("Open the Spotify web player")
                    .clicked()
                {
                    self.open_player(Surface::Web);
                }
                if self.view.is_fetching() {
                    ui.spinner();
                }
            });
        });

        // Bottom panel: hover text, else last status
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            let text = if self.view.hover().is_empty() {
                self.status_msg.as_str()
            } else {
                self.view.hover()
            };
            ui.label(text);
        });

        let events = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if self.view.songs().is_empty() {
                    ui.centered_and_justified(|ui| {
                        ui.label("No songs loaded. Press refresh to try again.");
                    });
                    return RowEvents::default();
                }
                self.song_table(ui)
            })
            .inner;

        match events.hovered {
            Some(text) => self.view.set_hover(text),
            None => self.view.clear_hover(),
        }
        if let Some(action) = events.clicked {
            self.start_action(ctx, action);
        }
    }
}
