// src/app.rs

use std::fmt::Write as FmtWrite;
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate},
};
use log::warn;

use crate::controller::EffectController;
use crate::graph::SpatialPreset;

pub const KEY_HELP: &str =
    "[4/6/8] Spatial | [S] Surround | [B] Bass | [R] Reset | [SPACE] Play/Pause | [←/→] Seek | [↑/↓] Volume | [N] Next | [Q] Quit";

/// Terminal front end: a playlist, key bindings and one status line.
pub struct EnhancerApp {
    controller: EffectController,
    playlist: Vec<PathBuf>,
    current: Option<usize>,

    // Artifacts already written to disk
    saved_artifacts: usize,
    message: String,

    cached_secs: u64,
    force_redraw: bool,
    draw_buffer: String,
}

impl EnhancerApp {
    pub fn new(controller: EffectController, playlist: Vec<PathBuf>) -> Self {
        Self {
            controller,
            playlist,
            current: None,
            saved_artifacts: 0,
            message: String::new(),
            cached_secs: u64::MAX,
            force_redraw: true,
            draw_buffer: String::with_capacity(512),
        }
    }

    /// Load the playlist entry after the current one, wrapping around.
    pub fn load_next(&mut self) {
        if self.playlist.is_empty() {
            self.set_message("no files given on the command line");
            return;
        }
        let next = self.current.map_or(0, |i| (i + 1) % self.playlist.len());
        let path = self.playlist[next].clone();

        match self.controller.load_file(&path) {
            Ok(()) => {
                self.current = Some(next);
                self.set_message(format!("loaded {}", path.display()));
            }
            Err(e) => self.set_message(format!("failed to load {}: {e:#}", path.display())),
        }
        self.save_new_artifacts();
    }

    pub fn run_tick(&mut self) -> Result<(), anyhow::Error> {
        if let Err(e) = self.controller.tick() {
            self.set_message(format!("recorder error: {e:#}"));
        }
        self.save_new_artifacts();

        let position = self.controller.position();
        if position.as_secs() == self.cached_secs && !self.force_redraw {
            return Ok(());
        }
        self.cached_secs = position.as_secs();
        self.force_redraw = false;

        self.draw_buffer.clear();
        let _ = write!(self.draw_buffer, "{}", MoveTo(0, 1));
        let _ = write!(self.draw_buffer, "{}", Clear(ClearType::UntilNewLine));
        self.render_status(position);
        let _ = write!(self.draw_buffer, "{}", MoveTo(0, 2));
        let _ = write!(self.draw_buffer, "{}{}", Clear(ClearType::UntilNewLine), self.message);

        let mut stdout = stdout();
        execute!(stdout, BeginSynchronizedUpdate)?;
        stdout.write_all(self.draw_buffer.as_bytes())?;
        execute!(stdout, EndSynchronizedUpdate)?;
        stdout.flush()?;

        Ok(())
    }

    fn render_status(&mut self, position: Duration) {
        let name = self
            .current
            .and_then(|i| self.playlist.get(i))
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "-".into());

        let _ = write!(
            self.draw_buffer,
            "🎵 {name} {} / {}",
            fmt_time(position),
            fmt_time(self.controller.duration())
        );

        if let (Some(vol), Some(pos), Some(bass)) = (
            self.controller.volume(),
            self.controller.spatial_position(),
            self.controller.bass_gain_db(),
        ) {
            let _ = write!(self.draw_buffer, " | vol {:>3}% | pos {pos} | bass {bass:+.0} dB", (vol * 100.0).round() as i32);
        }
        if self.controller.is_orbiting() {
            let _ = write!(self.draw_buffer, " | 🔄");
        }
        if self.controller.is_recording() {
            let _ = write!(self.draw_buffer, " 🔴 REC");
        }
    }

    fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.force_redraw = true;
    }

    fn save_new_artifacts(&mut self) {
        if self.controller.artifact_count() == self.saved_artifacts {
            return;
        }
        self.saved_artifacts = self.controller.artifact_count();
        match self.controller.save_last_artifact() {
            Ok(Some(path)) => self.set_message(format!("⏹️  saved {}", path.display())),
            Ok(None) => {}
            Err(e) => {
                warn!("saving recording failed: {e:#}");
                self.set_message(format!("❌ saving recording failed: {e:#}"));
            }
        }
    }

    fn adjust_volume(&mut self, delta: f32) {
        if let Some(current) = self.controller.volume() {
            self.controller.set_volume(current + delta);
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, _modifiers: KeyModifiers) {
        match key {
            KeyCode::Char('4') => self.controller.apply_spatial_preset(SpatialPreset::FourD),
            KeyCode::Char('6') => self.controller.apply_spatial_preset(SpatialPreset::SixD),
            KeyCode::Char('8') => self.controller.apply_spatial_preset(SpatialPreset::EightD),
            KeyCode::Char('s') | KeyCode::Char('S') => self.controller.start_surround(),
            KeyCode::Char('b') | KeyCode::Char('B') => self.controller.toggle_bass_boost(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.controller.reset_effects(),
            KeyCode::Char(' ') => {
                if let Err(e) = self.controller.toggle_play() {
                    self.set_message(format!("❌ {e:#}"));
                }
                self.save_new_artifacts();
            }
            KeyCode::Up => self.adjust_volume(0.1),
            KeyCode::Down => self.adjust_volume(-0.1),
            KeyCode::Right => self.controller.seek_by(5.0),
            KeyCode::Left => self.controller.seek_by(-5.0),
            KeyCode::Char('n') | KeyCode::Char('N') => self.load_next(),
            _ => return,
        }
        self.force_redraw = true;
    }

    pub fn should_quit(&self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        matches!(key, KeyCode::Char('q') | KeyCode::Char('Q'))
            || (key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL))
    }

    /// Close the session and save whatever was still recording.
    pub fn shutdown(&mut self) {
        self.controller.close();
        self.save_new_artifacts();
    }
}

fn fmt_time(d: Duration) -> String {
    format!("{:02}:{:02}", d.as_secs() / 60, d.as_secs() % 60)
}
