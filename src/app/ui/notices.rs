use std::collections::VecDeque;
use std::time::Duration;

use eframe::egui::{self, Align2, Color32, Context, RichText};

const NOTICE_SECS: f64 = 6.0;
const MAX_NOTICES: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum NoticeLevel {
    Info,
    Error,
}

struct Notice {
    level: NoticeLevel,
    message: String,
    expires_at: f64,
}

/// Short-lived messages stacked in the bottom-right corner of the window.
#[derive(Default)]
pub(in crate::app) struct Notices {
    entries: VecDeque<Notice>,
    now: f64,
}

impl Notices {
    pub(in crate::app) fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.entries.len() >= MAX_NOTICES {
            self.entries.pop_front();
        }
        self.entries.push_back(Notice {
            level,
            message: message.into(),
            expires_at: self.now + NOTICE_SECS,
        });
    }

    #[cfg(test)]
    pub(in crate::app) fn messages(&self) -> impl Iterator<Item = (NoticeLevel, &str)> {
        self.entries
            .iter()
            .map(|notice| (notice.level, notice.message.as_str()))
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.now = ctx.input(|input| input.time);
        let now = self.now;
        self.entries.retain(|notice| notice.expires_at > now);

        let Some(next_expiry) = self
            .entries
            .iter()
            .map(|notice| notice.expires_at)
            .reduce(f64::min)
        else {
            return;
        };
        ctx.request_repaint_after(Duration::from_secs_f64((next_expiry - now).max(0.05)));

        egui::Area::new(egui::Id::new("notices"))
            .anchor(Align2::RIGHT_BOTTOM, [-12.0, -12.0])
            .interactable(false)
            .show(ctx, |ui| {
                for notice in &self.entries {
                    let color = match notice.level {
                        NoticeLevel::Info => Color32::from_rgb(150, 205, 255),
                        NoticeLevel::Error => Color32::from_rgb(255, 140, 120),
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(RichText::new(notice.message.as_str()).color(color));
                    });
                }
            });
    }
}
