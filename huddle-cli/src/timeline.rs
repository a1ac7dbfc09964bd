use colored::*;
use std::time::Instant;

/// Prints simulation lines stamped with the time since the run started.
#[derive(Clone, Copy)]
pub struct Timeline {
    started: Instant,
}

impl Timeline {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    fn line(&self, actor: ColoredString, text: ColoredString) {
        let stamp = format!("[{:>7.3}s]", self.started.elapsed().as_secs_f64());
        println!("{} {} {}", stamp.dimmed(), actor, text);
    }

    pub fn script(&self, text: &str) {
        self.line(format!("{:<9}", "script").bold(), text.bold());
    }

    pub fn server(&self, text: &str) {
        self.line(format!("{:<9}", "server").yellow(), text.normal());
    }

    pub fn signaling(&self, text: &str) {
        self.line(format!("{:<9}", "signaling").cyan(), text.normal());
    }

    pub fn media(&self, text: &str) {
        self.line(format!("{:<9}", "media").green(), text.normal());
    }

    pub fn failure(&self, text: &str) {
        self.line(format!("{:<9}", "error").red().bold(), text.red());
    }
}
