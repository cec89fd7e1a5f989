use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tenki_core::{Severity, UiStatus, View, WidgetState};

/// Prints status changes, and the weather panels whenever they are replaced.
#[derive(Debug, Default)]
pub struct TerminalView {
    last_status: Mutex<Option<UiStatus>>,
    printed_revision: AtomicU64,
}

impl View for TerminalView {
    fn render(&self, state: &WidgetState) {
        {
            let mut last = self.last_status.lock();
            if state.status.is_some() && *last != state.status {
                if let Some(status) = &state.status {
                    println!("{} {}", tag(status.severity), status.message);
                }
                *last = state.status.clone();
            }
        }

        let printed = self.printed_revision.swap(state.weather_revision, Ordering::SeqCst);
        if state.weather_revision > printed {
            print!("{}", weather_block(state));
        }
    }
}

fn tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "[i]",
        Severity::Success => "[✓]",
        Severity::Warning => "[!]",
        Severity::Error => "[x]",
    }
}

fn weather_block(state: &WidgetState) -> String {
    let mut out = String::new();

    if let Some(current) = &state.current {
        out.push_str(&format!("\n  {}\n", current.place));
        out.push_str(&format!("  気温：{}℃  天気：{}\n", current.temperature, current.description));
        out.push_str(&format!("  風速：{} km/h\n", current.wind_speed));
        out.push_str(&format!("  観測時刻：{}\n", current.observed_at));
    }

    if !state.forecast.is_empty() {
        out.push_str("\n  予報\n");
        for day in &state.forecast {
            out.push_str(&format!(
                "  {}  {}  最高 {}℃ / 最低 {}℃\n",
                day.date, day.description, day.max_temp, day.min_temp
            ));
        }
    }

    out.push('\n');
    out
}
