// src/playback/mod.rs

pub mod engine;
pub mod peaks;

use anyhow::Result;
use std::time::{Duration, Instant};

pub use engine::{EngineEvent, TransportEngine, WavEngine};

/// How long engine-originated play/pause events are swallowed after a
/// programmatic transport call. Not a lock, just a debounce against the
/// engine echoing our own command back as an event.
pub const GUARD_WINDOW_MS: u64 = 100;

/// Builds a fresh engine for a source URL/path. Kept as a factory so the
/// wrapper - not its caller - controls engine lifetime, and tests can
/// substitute a scripted engine.
pub type EngineFactory = Box<dyn FnMut(&str) -> Result<Box<dyn TransportEngine>>>;

/// Controlled wrapper over a transport engine.
///
/// The parent owns the `is_playing` boolean and mirrors it in through
/// [`set_playing`]; the engine's own play/pause events flow back out
/// through `on_play_pause` only when they were not caused by that mirror
/// call. Without the guard the parent's toggle would re-trigger itself
/// through the engine's event stream indefinitely.
///
/// [`set_playing`]: PlaybackWaveform::set_playing
pub struct PlaybackWaveform {
    factory: EngineFactory,
    engine: Option<Box<dyn TransportEngine>>,
    source: Option<String>,
    is_ready: bool,
    guard_until: Option<Instant>,
    on_play_pause: Box<dyn FnMut()>,
    on_finish: Option<Box<dyn FnMut()>>,
    on_seek: Option<Box<dyn FnMut(f64)>>,
}

impl PlaybackWaveform {
    pub fn new(factory: EngineFactory, on_play_pause: Box<dyn FnMut()>) -> Self {
        Self {
            factory,
            engine: None,
            source: None,
            is_ready: false,
            guard_until: None,
            on_play_pause,
            on_finish: None,
            on_seek: None,
        }
    }

    pub fn with_on_finish(mut self, on_finish: Box<dyn FnMut()>) -> Self {
        self.on_finish = Some(on_finish);
        self
    }

    pub fn with_on_seek(mut self, on_seek: Box<dyn FnMut(f64)>) -> Self {
        self.on_seek = Some(on_seek);
        self
    }

    /// Point the wrapper at a new audio source, or at nothing.
    ///
    /// Any existing engine is destroyed before a new one is constructed,
    /// so two live engines never coexist for this container. Readiness
    /// resets until the new engine reports `Ready`. A factory failure
    /// leaves the wrapper in the placeholder state.
    pub fn set_source(&mut self, source: Option<&str>) -> Result<()> {
        self.destroy_engine();
        self.source = None;

        let Some(url) = source else {
            return Ok(());
        };

        match (self.factory)(url) {
            Ok(engine) => {
                self.engine = Some(engine);
                self.source = Some(url.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Mirror the parent-owned `isPlaying` value into the engine.
    ///
    /// No-op until the engine has reported ready. Raises the
    /// self-triggered guard for [`GUARD_WINDOW_MS`] so the echo of this
    /// very call is not forwarded back to the parent. `play()` failures
    /// (autoplay-style refusals) are swallowed.
    pub fn set_playing(&mut self, playing: bool, now: Instant) {
        if !self.is_ready {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        self.guard_until = Some(now + Duration::from_millis(GUARD_WINDOW_MS));
        if playing {
            let _ = engine.play();
        } else {
            engine.pause();
        }
    }

    /// Drain and dispatch engine events. Called once per frame.
    pub fn pump_events(&mut self, now: Instant) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let events = engine.poll_events();
        for event in events {
            match event {
                EngineEvent::Ready => {
                    self.is_ready = true;
                }
                EngineEvent::Play | EngineEvent::Pause => {
                    if !self.guard_active(now) {
                        (self.on_play_pause)();
                    }
                }
                EngineEvent::Finish => {
                    // Rewind first so the next play starts from zero,
                    // then tell the parent playback has stopped.
                    if let Some(engine) = self.engine.as_mut() {
                        engine.seek_to(0.0);
                    }
                    if !self.guard_active(now) {
                        match self.on_finish.as_mut() {
                            Some(cb) => cb(),
                            None => (self.on_play_pause)(),
                        }
                    }
                }
                EngineEvent::Seek(fraction) => {
                    let duration = self
                        .engine
                        .as_ref()
                        .map(|e| e.duration_secs())
                        .unwrap_or(0.0);
                    if duration > 0.0 {
                        if let Some(cb) = self.on_seek.as_mut() {
                            cb(fraction * duration);
                        }
                    }
                }
            }
        }
    }

    /// Forward a surface interaction (the CLI's seek keys stand in for a
    /// click on the rendered waveform) straight to the engine, which
    /// will echo a `Seek` event back through `pump_events`.
    pub fn seek_fraction(&mut self, fraction: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.seek_to(fraction);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn duration_secs(&self) -> f64 {
        self.engine
            .as_ref()
            .map(|e| e.duration_secs())
            .unwrap_or(0.0)
    }

    fn guard_active(&self, now: Instant) -> bool {
        self.guard_until.map(|until| now < until).unwrap_or(false)
    }

    fn destroy_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        self.is_ready = false;
        self.guard_until = None;
    }
}

impl Drop for PlaybackWaveform {
    fn drop(&mut self) {
        self.destroy_engine();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Shared journal of everything mock engines and callbacks did, so
    /// ordering across objects can be asserted.
    type Journal = Rc<RefCell<Vec<String>>>;

    struct MockEngine {
        id: &'static str,
        journal: Journal,
        queued: Rc<RefCell<VecDeque<EngineEvent>>>,
        destroyed: bool,
        fail_play: bool,
    }

    impl TransportEngine for MockEngine {
        fn play(&mut self) -> Result<()> {
            self.journal.borrow_mut().push(format!("{}:play", self.id));
            if self.fail_play {
                anyhow::bail!("autoplay refused");
            }
            Ok(())
        }
        fn pause(&mut self) {
            self.journal.borrow_mut().push(format!("{}:pause", self.id));
        }
        fn seek_to(&mut self, fraction: f64) {
            self.journal
                .borrow_mut()
                .push(format!("{}:seek({fraction})", self.id));
        }
        fn duration_secs(&self) -> f64 {
            10.0
        }
        fn poll_events(&mut self) -> Vec<EngineEvent> {
            if self.destroyed {
                return Vec::new();
            }
            self.queued.borrow_mut().drain(..).collect()
        }
        fn destroy(&mut self) {
            if !self.destroyed {
                self.destroyed = true;
                self.journal
                    .borrow_mut()
                    .push(format!("{}:destroy", self.id));
            }
        }
    }

    struct Harness {
        journal: Journal,
        events: Rc<RefCell<VecDeque<EngineEvent>>>,
        toggles: Rc<RefCell<u32>>,
        finishes: Rc<RefCell<u32>>,
        seeks: Rc<RefCell<Vec<f64>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                journal: Rc::new(RefCell::new(Vec::new())),
                events: Rc::new(RefCell::new(VecDeque::new())),
                toggles: Rc::new(RefCell::new(0)),
                finishes: Rc::new(RefCell::new(0)),
                seeks: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn wrapper(&self, with_finish: bool, fail_play: bool) -> PlaybackWaveform {
            let journal = self.journal.clone();
            let events = self.events.clone();
            let factory: EngineFactory = Box::new(move |url| {
                journal.borrow_mut().push(format!("construct:{url}"));
                let id: &'static str = if url.contains('b') { "b" } else { "a" };
                Ok(Box::new(MockEngine {
                    id,
                    journal: journal.clone(),
                    queued: events.clone(),
                    destroyed: false,
                    fail_play,
                }))
            });
            let toggles = self.toggles.clone();
            let journal = self.journal.clone();
            let mut w = PlaybackWaveform::new(
                factory,
                Box::new(move || {
                    *toggles.borrow_mut() += 1;
                    journal.borrow_mut().push("cb:play_pause".to_string());
                }),
            );
            if with_finish {
                let finishes = self.finishes.clone();
                let journal = self.journal.clone();
                w = w.with_on_finish(Box::new(move || {
                    *finishes.borrow_mut() += 1;
                    journal.borrow_mut().push("cb:finish".to_string());
                }));
            }
            let seeks = self.seeks.clone();
            w.with_on_seek(Box::new(move |t| seeks.borrow_mut().push(t)))
        }

        fn queue(&self, event: EngineEvent) {
            self.events.borrow_mut().push_back(event);
        }

        fn ready(&self, w: &mut PlaybackWaveform, now: Instant) {
            self.queue(EngineEvent::Ready);
            w.pump_events(now);
            assert!(w.is_ready());
        }
    }

    #[test]
    fn test_no_source_means_no_engine() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(None).unwrap();
        assert!(!w.has_source());
        assert!(!w.is_ready());
        assert!(h.journal.borrow().is_empty(), "no engine constructed");
    }

    #[test]
    fn test_engine_constructed_once_and_becomes_ready() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        assert!(!w.is_ready(), "loading until the engine reports ready");
        h.ready(&mut w, Instant::now());
        let constructs = h
            .journal
            .borrow()
            .iter()
            .filter(|l| l.starts_with("construct"))
            .count();
        assert_eq!(constructs, 1);
    }

    #[test]
    fn test_guarded_echo_is_swallowed() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        let t0 = Instant::now();
        h.ready(&mut w, t0);

        // Parent flips isPlaying; the engine echoes Play within the guard.
        w.set_playing(true, t0);
        h.queue(EngineEvent::Play);
        w.pump_events(t0 + Duration::from_millis(GUARD_WINDOW_MS / 2));
        assert_eq!(*h.toggles.borrow(), 0, "echo must not re-toggle parent");
    }

    #[test]
    fn test_engine_originated_event_outside_guard_is_forwarded() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        let t0 = Instant::now();
        h.ready(&mut w, t0);

        w.set_playing(true, t0);
        // Guard has lapsed; a pause originating inside the engine must
        // reach the parent.
        h.queue(EngineEvent::Pause);
        w.pump_events(t0 + Duration::from_millis(GUARD_WINDOW_MS + 1));
        assert_eq!(*h.toggles.borrow(), 1);
    }

    #[test]
    fn test_finish_rewinds_before_callback() {
        let h = Harness::new();
        let mut w = h.wrapper(true, false);
        w.set_source(Some("take-a.wav")).unwrap();
        let t0 = Instant::now();
        h.ready(&mut w, t0);

        h.queue(EngineEvent::Finish);
        w.pump_events(t0 + Duration::from_millis(500));
        assert_eq!(*h.finishes.borrow(), 1);
        assert_eq!(*h.toggles.borrow(), 0, "on_finish takes precedence");

        let journal = h.journal.borrow();
        let seek_idx = journal.iter().position(|l| l == "a:seek(0)").unwrap();
        let cb_idx = journal.iter().position(|l| l == "cb:finish").unwrap();
        assert!(seek_idx < cb_idx, "rewind must precede the callback");
    }

    #[test]
    fn test_finish_without_handler_falls_back_to_play_pause() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        let t0 = Instant::now();
        h.ready(&mut w, t0);

        h.queue(EngineEvent::Finish);
        w.pump_events(t0 + Duration::from_millis(500));
        assert_eq!(*h.toggles.borrow(), 1);
    }

    #[test]
    fn test_source_switch_destroys_old_engine_first() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        w.set_source(Some("take-b.wav")).unwrap();

        let journal = h.journal.borrow();
        let destroy_a = journal.iter().position(|l| l == "a:destroy").unwrap();
        let construct_b = journal
            .iter()
            .position(|l| l == "construct:take-b.wav")
            .unwrap();
        assert!(
            destroy_a < construct_b,
            "old engine must die before the new one exists: {journal:?}"
        );
    }

    #[test]
    fn test_source_switch_resets_readiness() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        h.ready(&mut w, Instant::now());
        w.set_source(Some("take-b.wav")).unwrap();
        assert!(!w.is_ready());
    }

    #[test]
    fn test_clearing_source_destroys_engine() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        w.set_source(None).unwrap();
        assert!(h.journal.borrow().iter().any(|l| l == "a:destroy"));
        assert!(!w.has_source());
        // And destroying again via drop stays a no-op.
        drop(w);
        let destroys = h
            .journal
            .borrow()
            .iter()
            .filter(|l| l.ends_with(":destroy"))
            .count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn test_failed_play_is_swallowed() {
        let h = Harness::new();
        let mut w = h.wrapper(false, true);
        w.set_source(Some("take-a.wav")).unwrap();
        let t0 = Instant::now();
        h.ready(&mut w, t0);
        // Must not panic or surface the error anywhere.
        w.set_playing(true, t0);
        assert!(h.journal.borrow().iter().any(|l| l == "a:play"));
    }

    #[test]
    fn test_set_playing_before_ready_is_noop() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        w.set_playing(true, Instant::now());
        assert!(!h.journal.borrow().iter().any(|l| l == "a:play"));
    }

    #[test]
    fn test_seek_event_forwards_absolute_time() {
        let h = Harness::new();
        let mut w = h.wrapper(false, false);
        w.set_source(Some("take-a.wav")).unwrap();
        let t0 = Instant::now();
        h.ready(&mut w, t0);

        h.queue(EngineEvent::Seek(0.25));
        w.pump_events(t0);
        // Mock duration is 10s, so fraction 0.25 becomes 2.5s absolute.
        assert_eq!(h.seeks.borrow().as_slice(), &[2.5]);
    }
}
