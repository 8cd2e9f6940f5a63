use std::fmt;
use std::time::Instant;

/// Wall-clock stopwatch.
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Stopwatch {
        Stopwatch {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn restart(&mut self) {
        self.started = Instant::now();
    }
}

/// Cpu time of the calling thread, for worker self-accounting.
pub struct CpuTimer {
    started: cpu_time::ThreadTime,
}

impl CpuTimer {
    pub fn start() -> CpuTimer {
        CpuTimer {
            started: cpu_time::ThreadTime::now(),
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Wall-clock account of the pipeline's sequential stages.
pub struct StageLog {
    watch: Stopwatch,
    stages: Vec<(String, f64)>,
}

impl StageLog {
    pub fn new() -> StageLog {
        StageLog {
            watch: Stopwatch::start(),
            stages: Vec::new(),
        }
    }

    /// Closes the running stage under the given name and starts the
    /// next one.
    pub fn stage(&mut self, name: &str) {
        self.stages.push((String::from(name), self.watch.elapsed()));
        self.watch.restart();
    }
}

impl fmt::Display for StageLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut total = 0.0;
        for (name, secs) in &self.stages {
            writeln!(f, "{:>12}  {:8.2}s", name, secs)?;
            total += secs;
        }
        write!(f, "{:>12}  {:8.2}s", "total", total)
    }
}

/// What each worker hands back at shutdown: cpu time spent plus
/// stage-specific extras (counters, collected errors).
pub struct Timings<O> {
    pub timings: Vec<(String, f64)>,
    pub others: Vec<(String, O)>,
}

impl<O> Timings<O> {
    pub fn new() -> Timings<O> {
        Timings {
            timings: Vec::new(),
            others: Vec::new(),
        }
    }

    pub fn add(&mut self, name: &str, tm: f64) {
        self.timings.push((String::from(name), tm));
    }

    pub fn add_other(&mut self, name: &str, other: O) {
        self.others.push((String::from(name), other));
    }

    pub fn combine(&mut self, mut other: Timings<O>) {
        self.timings.extend(std::mem::take(&mut other.timings));
        self.others.extend(std::mem::take(&mut other.others));
    }
}

impl<O> fmt::Display for Timings<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timings[")?;
        for (i, (n, t)) in self.timings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:0.1}s", n, t)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_log_accumulates() {
        let mut log = StageLog::new();
        log.stage("first");
        log.stage("second");

        let rendered = log.to_string();
        assert!(rendered.contains("first"));
        assert!(rendered.contains("second"));
        assert!(rendered.ends_with("s"));
    }

    #[test]
    fn test_timings_combine() {
        let mut a: Timings<i64> = Timings::new();
        a.add("x", 1.0);
        a.add_other("x", 5);

        let mut b = Timings::new();
        b.add("y", 2.0);
        a.combine(b);

        assert_eq!(a.timings.len(), 2);
        assert_eq!(a.others.len(), 1);
    }
}
