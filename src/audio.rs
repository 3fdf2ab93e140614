//! Background music toggle
//!
//! Playback sits behind [`AudioSink`]. [`RodioSink`] streams the track to the
//! default output device; [`LogSink`] stands in when no device can be opened.
//! The diorama only tracks whether the looping track should be playing and
//! flips that on request.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::config::MusicSettings;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device: {0}")]
    OutputUnavailable(#[from] rodio::StreamError),
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode audio: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
    #[error("failed to start playback: {0}")]
    Playback(#[from] rodio::PlayError),
}

/// Output device for the background track
pub trait AudioSink {
    fn play(&mut self, track: &Path, volume: f32, looping: bool) -> Result<(), AudioError>;
    fn pause(&mut self);
}

/// Sink that only reports what it would play
#[derive(Default)]
pub struct LogSink;

impl AudioSink for LogSink {
    fn play(&mut self, track: &Path, volume: f32, looping: bool) -> Result<(), AudioError> {
        log::info!(
            "Music playing: {} (volume {:.2}, looping {})",
            track.display(),
            volume,
            looping
        );
        Ok(())
    }

    fn pause(&mut self) {
        log::info!("Music paused");
    }
}

/// Streams the track to the default output device
pub struct RodioSink {
    /// Output stream (must be kept alive)
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
}

impl RodioSink {
    pub fn try_new() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            sink: None,
        })
    }

    fn start(&mut self, track: &Path, volume: f32, looping: bool) -> Result<Sink, AudioError> {
        let file = File::open(track).map_err(|source| AudioError::Open {
            path: track.to_path_buf(),
            source,
        })?;
        let sink = Sink::try_new(&self.handle)?;
        sink.set_volume(volume);
        if looping {
            sink.append(Decoder::new_looped(BufReader::new(file))?);
        } else {
            sink.append(Decoder::new(BufReader::new(file))?);
        }
        Ok(sink)
    }
}

impl AudioSink for RodioSink {
    fn play(&mut self, track: &Path, volume: f32, looping: bool) -> Result<(), AudioError> {
        // Resume where the track was paused unless it already ran out
        if let Some(sink) = self.sink.as_ref().filter(|sink| !sink.empty()) {
            sink.set_volume(volume);
            sink.play();
            return Ok(());
        }

        let sink = self.start(track, volume, looping)?;
        log::info!("Music playing: {}", track.display());
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
    }
}

/// Opens the default output device, falling back to [`LogSink`] without one
pub fn default_sink() -> Box<dyn AudioSink> {
    match RodioSink::try_new() {
        Ok(sink) => Box::new(sink),
        Err(err) => {
            log::warn!("Audio disabled: {}", err);
            Box::new(LogSink)
        }
    }
}

pub struct MusicToggle {
    settings: MusicSettings,
    sink: Box<dyn AudioSink>,
    playing: bool,
}

impl MusicToggle {
    /// Starts playing right away when `settings.autoplay` is set
    pub fn new(settings: MusicSettings, sink: Box<dyn AudioSink>) -> Self {
        let mut toggle = Self {
            settings,
            sink,
            playing: false,
        };
        if toggle.settings.autoplay {
            toggle.toggle();
        }
        toggle
    }

    /// Flips between playing and paused, returning whether music now plays
    ///
    /// A track that fails to start leaves the toggle paused.
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.sink.pause();
            self.playing = false;
            return false;
        }

        match self
            .sink
            .play(&self.settings.track, self.settings.volume, self.settings.looping)
        {
            Ok(()) => self.playing = true,
            Err(err) => log::warn!("Music unavailable: {}", err),
        }
        self.playing
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedSink {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl AudioSink for SharedSink {
        fn play(&mut self, _track: &Path, volume: f32, looping: bool) -> Result<(), AudioError> {
            self.events
                .borrow_mut()
                .push(format!("play {} {}", volume, looping));
            Ok(())
        }

        fn pause(&mut self) {
            self.events.borrow_mut().push("pause".to_string());
        }
    }

    struct MissingTrackSink;

    impl AudioSink for MissingTrackSink {
        fn play(&mut self, track: &Path, _volume: f32, _looping: bool) -> Result<(), AudioError> {
            Err(AudioError::Open {
                path: track.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }

        fn pause(&mut self) {}
    }

    #[test]
    fn test_toggle_alternates() {
        let sink = SharedSink::default();
        let mut music = MusicToggle::new(MusicSettings::default(), Box::new(sink.clone()));
        assert!(!music.is_playing());

        assert!(music.toggle());
        assert!(!music.toggle());
        assert!(music.toggle());
        assert_eq!(
            *sink.events.borrow(),
            vec!["play 0.12 true", "pause", "play 0.12 true"]
        );
    }

    #[test]
    fn test_autoplay_starts_playing() {
        let sink = SharedSink::default();
        let settings = MusicSettings {
            autoplay: true,
            ..Default::default()
        };
        let music = MusicToggle::new(settings, Box::new(sink.clone()));
        assert!(music.is_playing());
        assert_eq!(sink.events.borrow().len(), 1);
    }

    #[test]
    fn test_failed_playback_stays_paused() {
        let settings = MusicSettings {
            autoplay: true,
            ..Default::default()
        };
        let mut music = MusicToggle::new(settings, Box::new(MissingTrackSink));
        assert!(!music.is_playing());
        assert!(!music.toggle());
    }

    #[test]
    fn test_log_sink_always_plays() {
        let mut sink = LogSink;
        assert!(sink.play(Path::new("missing.mp3"), 0.5, true).is_ok());
    }
}
