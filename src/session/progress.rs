/// Receives coarse encode progress as a whole percentage in `0..=100`.
///
/// Called synchronously from the encode loop, so implementations must not block for long. The
/// reporter does not check ordering; [`ProgressTracker`] is what keeps calls non-decreasing.
pub trait ProgressReporter: Send {
    fn report(&mut self, percent: u8);
}

impl<F> ProgressReporter for F
where
    F: FnMut(u8) + Send,
{
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Reporter that drops every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Forwards to a reporter while holding `last_reported_percent`, so a run never goes backwards.
pub struct ProgressTracker<'a> {
    reporter: &'a mut dyn ProgressReporter,
    last_reported_percent: Option<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(reporter: &'a mut dyn ProgressReporter) -> Self {
        Self {
            reporter,
            last_reported_percent: None,
        }
    }

    /// Forward `percent` (clamped to 100) unless it is below the last forwarded value.
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if let Some(last) = self.last_reported_percent
            && percent < last
        {
            return;
        }
        self.last_reported_percent = Some(percent);
        self.reporter.report(percent);
    }

    /// `floor(done / total * 100)` for frames written so far.
    pub fn report_frames(&mut self, done: u64, total: u64) {
        self.report(frame_percent(done, total));
    }

    pub fn last_reported_percent(&self) -> Option<u8> {
        self.last_reported_percent
    }
}

/// Integer `floor(done * 100 / total)`, saturating at 100.
pub fn frame_percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (u128::from(done) * 100) / u128::from(total);
    pct.min(100) as u8
}
