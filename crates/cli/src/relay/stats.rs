//! Run report printed when the relay exits.

use std::fmt::Write as _;
use std::time::Duration;

use dispatcher::MetricsSnapshot;
use session::SessionReport;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Wall time including link setup and teardown
    pub duration: Duration,

    /// None when the link was never established
    pub session: Option<SessionReport>,

    /// Final counters per sink, in dispatch order
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

impl RelayStats {
    /// The stop reason, when the session ended because of a failure
    pub fn failure(&self) -> Option<String> {
        let report = self.session.as_ref()?;
        if !report.failed() {
            return None;
        }
        report.stop_reason.as_ref().map(ToString::to_string)
    }

    /// Frames received per second of session time
    pub fn receive_rate(&self) -> f64 {
        match &self.session {
            Some(report) if report.duration.as_secs_f64() > 0.0 => {
                report.frames_received as f64 / report.duration.as_secs_f64()
            }
            _ => 0.0,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_summary(&mut out);
        out
    }

    pub fn print_summary(&self) {
        println!("{}", self.render());
    }

    fn write_summary(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out)?;
        writeln!(out, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(out, "║                      Relay Statistics                        ║")?;
        writeln!(out, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(out)?;

        let Some(report) = &self.session else {
            writeln!(out, "📊 Overview")?;
            writeln!(out, "   ├─ Duration: {:.2}s", self.duration.as_secs_f64())?;
            writeln!(out, "   └─ Link never established")?;
            return self.write_sinks(out);
        };

        let reason = report
            .stop_reason
            .as_ref()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);

        writeln!(out, "📊 Overview")?;
        writeln!(out, "   ├─ Duration: {:.2}s", report.duration.as_secs_f64())?;
        writeln!(out, "   └─ Stop reason: {reason}")?;

        writeln!(out, "\n📤 Outbound")?;
        writeln!(out, "   ├─ Frames sent: {}", report.frames_sent)?;
        writeln!(out, "   ├─ Bytes sent: {}", report.bytes_sent)?;
        writeln!(out, "   ├─ Chunks written: {}", report.chunks_sent)?;
        writeln!(out, "   ├─ Heartbeats: {}", report.heartbeats)?;
        writeln!(out, "   ├─ Still queued: {}", report.unsent)?;
        writeln!(out, "   └─ Write latency (ms): {}", report.write_latency_ms)?;

        writeln!(out, "\n📥 Inbound")?;
        writeln!(out, "   ├─ Frames received: {}", report.frames_received)?;
        writeln!(out, "   ├─ Receive rate: {:.2}/s", self.receive_rate())?;
        writeln!(out, "   ├─ Frames decoded: {}", report.frames_decoded)?;
        writeln!(out, "   ├─ Parse errors: {}", report.parse_errors)?;
        writeln!(out, "   ├─ Bytes discarded: {}", report.bytes_discarded)?;
        writeln!(out, "   ├─ Resyncs: {}", report.resyncs)?;
        writeln!(out, "   └─ Logs routed: {}", report.logs_routed)?;

        let router = &report.router;
        writeln!(out, "\n🧭 Router")?;
        writeln!(out, "   ├─ Unclassified: {}", router.unclassified)?;
        writeln!(out, "   ├─ Malformed sensor logs: {}", router.malformed_sensor)?;
        writeln!(out, "   ├─ Control commands: {}", router.commands)?;
        writeln!(out, "   └─ Forwarded to uplink: {}", router.forwarded)?;

        self.write_sinks(out)
    }

    fn write_sinks(&self, out: &mut String) -> std::fmt::Result {
        if self.sinks.is_empty() {
            return Ok(());
        }
        writeln!(out, "\n🗄  Sinks ({})", self.sinks.len())?;
        for (i, (name, metrics)) in self.sinks.iter().enumerate() {
            let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
            writeln!(out, "   {prefix} {name}: {metrics}")?;
        }
        Ok(())
    }
}
