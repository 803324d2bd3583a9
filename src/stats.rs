use std::time::{Duration, Instant};

const WINDOW_FRAMES: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub fps: f32,
    pub avg_render_ms: f32,
    /// Frames since the previous report that received new desktop content.
    pub captured: u32,
    pub frames: u32,
}

/// Rolling render/total frame time over the most recent frames.
pub struct FrameStats {
    frame_times: Vec<(f32, f32)>,
    last_frame: Instant,
    last_report: Instant,
    report_interval: Duration,
    error_count: u32,
    last_error_log: Option<Instant>,
    captured_since_report: u32,
    frames_since_report: u32,
}

impl FrameStats {
    pub fn new(report_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            frame_times: Vec::with_capacity(WINDOW_FRAMES + 1),
            last_frame: now,
            last_report: now,
            report_interval,
            error_count: 0,
            last_error_log: None,
            captured_since_report: 0,
            frames_since_report: 0,
        }
    }

    pub fn last_frame(&self) -> Instant {
        self.last_frame
    }

    pub fn record(&mut self, render_time_ms: f32, now: Instant) {
        let total_ms = now.duration_since(self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;
        self.push(render_time_ms, total_ms);
    }

    fn push(&mut self, render_ms: f32, total_ms: f32) {
        self.frame_times.push((render_ms, total_ms));
        if self.frame_times.len() > WINDOW_FRAMES {
            self.frame_times.drain(0..self.frame_times.len() - WINDOW_FRAMES);
        }
    }

    /// (fps, average render time in ms)
    pub fn averages(&self) -> Option<(f32, f32)> {
        if self.frame_times.is_empty() {
            return None;
        }
        let (sum_render, sum_total) = self
            .frame_times
            .iter()
            .fold((0.0f32, 0.0f32), |(r, t), &(render, total)| (r + render, t + total));
        let n = self.frame_times.len() as f32;
        let avg_total = sum_total / n;
        let fps = if avg_total > 0.0 { 1000.0 / avg_total } else { 0.0 };
        Some((fps, sum_render / n))
    }

    pub fn record_capture(&mut self, captured: bool) {
        self.frames_since_report += 1;
        if captured {
            self.captured_since_report += 1;
        }
    }

    /// Averages to report, at most once per interval.
    pub fn due_report(&mut self, now: Instant) -> Option<FrameReport> {
        if now.duration_since(self.last_report) < self.report_interval {
            return None;
        }
        self.last_report = now;
        let captured = std::mem::take(&mut self.captured_since_report);
        let frames = std::mem::take(&mut self.frames_since_report);
        self.averages().map(|(fps, avg_render_ms)| FrameReport {
            fps,
            avg_render_ms,
            captured,
            frames,
        })
    }

    /// Counts an error and says whether it should be logged (max once per second).
    pub fn note_error(&mut self, now: Instant) -> bool {
        self.error_count += 1;
        match self.last_error_log {
            Some(last) if now.duration_since(last) < Duration::from_secs(1) => false,
            _ => {
                self.last_error_log = Some(now);
                true
            }
        }
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_cover_only_the_last_sixty_frames() {
        let mut stats = FrameStats::new(Duration::from_secs(5));
        for _ in 0..30 {
            stats.push(100.0, 100.0);
        }
        for _ in 0..60 {
            stats.push(2.0, 10.0);
        }
        let (fps, render) = stats.averages().unwrap();
        assert!((fps - 100.0).abs() < 1e-3);
        assert!((render - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_stats_have_no_average() {
        let stats = FrameStats::new(Duration::from_secs(5));
        assert!(stats.averages().is_none());
    }

    #[test]
    fn error_logging_is_rate_limited() {
        let mut stats = FrameStats::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(stats.note_error(t0));
        assert!(!stats.note_error(t0 + Duration::from_millis(200)));
        assert!(!stats.note_error(t0 + Duration::from_millis(900)));
        assert!(stats.note_error(t0 + Duration::from_millis(1100)));
        assert_eq!(stats.error_count(), 4);
    }

    #[test]
    fn report_waits_for_interval() {
        let mut stats = FrameStats::new(Duration::from_secs(5));
        let t0 = stats.last_frame();
        stats.record(1.0, t0 + Duration::from_millis(16));
        assert!(stats.due_report(t0 + Duration::from_secs(1)).is_none());
        assert!(stats.due_report(t0 + Duration::from_secs(6)).is_some());
    }

    #[test]
    fn report_counts_captured_frames_since_last_report() {
        let mut stats = FrameStats::new(Duration::from_secs(5));
        let t0 = stats.last_frame();
        stats.record(1.0, t0 + Duration::from_millis(16));
        for captured in [true, false, false, true, true] {
            stats.record_capture(captured);
        }

        let report = stats.due_report(t0 + Duration::from_secs(6)).unwrap();
        assert_eq!((report.captured, report.frames), (3, 5));

        stats.record_capture(false);
        let report = stats.due_report(t0 + Duration::from_secs(12)).unwrap();
        assert_eq!((report.captured, report.frames), (0, 1));
    }
}
