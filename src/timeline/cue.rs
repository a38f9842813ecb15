use crate::config::RowLayout;
use crate::foundation::error::{CueError, CueResult};
use crate::timeline::rows::RawRow;

/// A timed event: a label anchored to a start offset on the presentation timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Cue {
    start_secs: f64,
    label: String,
}

impl Cue {
    /// Create a cue; `start_secs` must be finite and `>= 0`.
    pub fn new(start_secs: f64, label: impl Into<String>) -> CueResult<Self> {
        if !start_secs.is_finite() || start_secs < 0.0 {
            return Err(CueError::validation(format!(
                "cue start must be finite and >= 0, got {start_secs}"
            )));
        }
        Ok(Self {
            // -0.0 would otherwise sort ahead of 0.0.
            start_secs: start_secs + 0.0,
            label: label.into(),
        })
    }

    pub fn start_secs(&self) -> f64 {
        self.start_secs
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Answer to "what comes next?" at some time point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NextCue<'a> {
    /// A real cue that starts strictly after the query time.
    Cue(&'a Cue),
    /// Past the last cue. Behaves like a cue starting at the query time, so the remaining time
    /// stays at zero for the rest of the run.
    End { at_secs: f64 },
}

impl<'a> NextCue<'a> {
    pub fn start_secs(&self) -> f64 {
        match self {
            Self::Cue(c) => c.start_secs(),
            Self::End { at_secs } => *at_secs,
        }
    }

    /// The cue label, or `end_marker` for the terminal entry.
    pub fn label_or<'b>(&self, end_marker: &'b str) -> &'b str
    where
        'a: 'b,
    {
        match *self {
            Self::Cue(c) => c.label(),
            Self::End { .. } => end_marker,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End { .. })
    }
}

/// Ordered events searchable by start time.
///
/// Implementations must keep cues sorted ascending by start with a stable tie-break, and resolve
/// duplicate starts the same way [`CueTimeline`] does: the later input row is current, the
/// earlier input row is next.
pub trait CueLookup: Send + Sync {
    /// All cues in ascending start order.
    fn cues(&self) -> &[Cue];

    /// The most recently started cue at `t`, or `None` before the first cue (including any
    /// negative `t`).
    fn current_cue(&self, t: f64) -> Option<&Cue>;

    /// The first cue starting strictly after `t`.
    fn next_cue(&self, t: f64) -> NextCue<'_>;

    /// Seconds until the next cue, never negative.
    fn time_to_next(&self, t: f64) -> f64 {
        (self.next_cue(t).start_secs() - t).max(0.0)
    }

    /// Start of the earliest cue.
    fn first_start_secs(&self) -> f64 {
        self.cues().first().map_or(0.0, Cue::start_secs)
    }
}

/// Validated, non-empty, time-ordered cue list. Read-only after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct CueTimeline {
    cues: Vec<Cue>,
}

impl CueTimeline {
    /// Build from already-validated cues. Equal starts keep their input order.
    pub fn from_cues(mut cues: Vec<Cue>) -> CueResult<Self> {
        if cues.is_empty() {
            return Err(CueError::EmptyTimeline);
        }
        cues.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));
        Ok(Self { cues })
    }

    /// Build from raw table rows.
    ///
    /// Rows whose seconds cell is not numeric, whose label is blank, or whose start would be
    /// negative are dropped. A non-numeric minutes cell counts as `0`.
    #[tracing::instrument(skip(rows), fields(rows = rows.len()))]
    pub fn build(rows: &[RawRow], layout: RowLayout) -> CueResult<Self> {
        let mut cues = Vec::new();
        let mut dropped = 0usize;
        for fields in layout.project(rows) {
            let Some(seconds) = fields.seconds.as_number() else {
                dropped += 1;
                continue;
            };
            let minutes = fields.minutes.as_number().unwrap_or(0.0);
            let Some(label) = fields.label.as_label() else {
                dropped += 1;
                continue;
            };
            match Cue::new(minutes * 60.0 + seconds, label) {
                Ok(cue) => cues.push(cue),
                Err(_) => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::warn!(dropped, kept = cues.len(), "filtered unusable cue rows");
        }
        let timeline = Self::from_cues(cues)?;
        tracing::info!(cues = timeline.len(), "built cue timeline");
        Ok(timeline)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Always `false`; construction rejects empty timelines.
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.cues.iter()
    }

    /// Number of cues that have started at or before `t`.
    fn started_count(&self, t: f64) -> usize {
        self.cues.partition_point(|c| c.start_secs <= t)
    }
}

impl CueLookup for CueTimeline {
    fn cues(&self) -> &[Cue] {
        &self.cues
    }

    fn current_cue(&self, t: f64) -> Option<&Cue> {
        if t < 0.0 {
            return None;
        }
        self.started_count(t)
            .checked_sub(1)
            .and_then(|i| self.cues.get(i))
    }

    fn next_cue(&self, t: f64) -> NextCue<'_> {
        match self.cues.get(self.started_count(t)) {
            Some(cue) => NextCue::Cue(cue),
            None => NextCue::End { at_secs: t },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/cue.rs"]
mod tests;
