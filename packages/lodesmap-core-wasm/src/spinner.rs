//! Progress bar shown while a query runs.
//!
//! Width updates are debounced through numbered tickets: the view schedules a
//! `flush(ticket)` and only the newest ticket is applied. Hiding is a two
//! step animation (expand to full width, then fade) driven by transition-end
//! events, so removal waits for the browser to actually finish drawing.
//! Steps that would not change anything on screen fire no transition-end, so
//! they are skipped: a bar that was never revealed is detached at once, and
//! a bar already at full width goes straight to the fade.

/// DOM side of the spinner.
pub trait SpinnerView {
    fn attach(&self);
    fn detach(&self);
    fn is_attached(&self) -> bool;
    /// Horizontal scale in `0.0..=1.0`.
    fn set_scale(&self, scale: f64);
    fn set_fading(&self, fading: bool);
    /// Arrange for `Spinner::flush(ticket)` to run after `delay_ms`.
    fn schedule_flush(&self, ticket: u64, delay_ms: i32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpinnerPhase {
    Hidden,
    Visible,
    /// Growing to full width before the fade.
    Expanding,
    FadingOut,
}

pub struct Spinner<V: SpinnerView> {
    view: V,
    phase: SpinnerPhase,
    hiding: bool,
    pending_scale: f64,
    /// Width applied by the last flush since `show`. `None` until the bar is revealed.
    drawn_scale: Option<f64>,
    ticket: u64,
    min_progress: f64,
    debounce_ms: i32,
    reveal_ms: i32,
}

impl<V: SpinnerView> Spinner<V> {
    pub fn new(view: V, min_progress: f64, debounce_ms: i32, reveal_ms: i32) -> Self {
        Spinner {
            view,
            phase: SpinnerPhase::Hidden,
            hiding: false,
            pending_scale: 0.0,
            drawn_scale: None,
            ticket: 0,
            min_progress,
            debounce_ms,
            reveal_ms,
        }
    }

    pub fn phase(&self) -> SpinnerPhase {
        self.phase
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn show(&mut self) {
        self.hiding = false;
        self.phase = SpinnerPhase::Visible;
        self.view.attach();
        self.view.set_fading(false);
        self.view.set_scale(0.0);
        self.drawn_scale = None;
        self.pending_scale = self.min_progress / 100.0;
        self.ticket += 1;
        self.view.schedule_flush(self.ticket, self.reveal_ms);
    }

    /// Requests a width of `percentage`, never below the minimum.
    pub fn update_progress(&mut self, percentage: f64) {
        if self.hiding {
            return;
        }
        let progress = percentage.max(self.min_progress).min(100.0);
        self.pending_scale = progress / 100.0;
        self.ticket += 1;
        self.view.schedule_flush(self.ticket, self.debounce_ms);
    }

    /// Applies the pending width if `ticket` is still the newest request.
    pub fn flush(&mut self, ticket: u64) {
        if ticket != self.ticket || self.hiding || self.phase != SpinnerPhase::Visible {
            return;
        }
        self.view.set_scale(self.pending_scale);
        self.drawn_scale = Some(self.pending_scale);
    }

    pub fn hide(&mut self) {
        if self.hiding {
            return;
        }
        self.hiding = true;
        if !self.view.is_attached() {
            self.phase = SpinnerPhase::Hidden;
            return;
        }
        match self.drawn_scale {
            None => {
                self.phase = SpinnerPhase::Hidden;
                self.view.detach();
            }
            Some(scale) if scale >= 1.0 => {
                self.phase = SpinnerPhase::FadingOut;
                self.view.set_fading(true);
            }
            Some(_) => {
                self.phase = SpinnerPhase::Expanding;
                self.view.set_scale(1.0);
            }
        }
    }

    /// Called with the CSS property whose transition just ended.
    pub fn on_transition_end(&mut self, property: &str) {
        match (self.phase, property) {
            (SpinnerPhase::Expanding, "transform") => {
                self.phase = SpinnerPhase::FadingOut;
                self.view.set_fading(true);
            }
            (SpinnerPhase::FadingOut, "opacity") => {
                self.phase = SpinnerPhase::Hidden;
                self.view.detach();
            }
            _ => {}
        }
    }
}
