//! Sizes, durations and the build summary table.

use std::time::Duration;

use console::Term;
use owo_colors::OwoColorize;
use sheaf_bundler::{ArtifactKind, BuildSnapshot};

use super::colors_enabled;

/// Human-readable byte count.
///
/// ```
/// use sheaf_cli::ui::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Emitted scripts and styles with their sizes. Source maps are left out.
pub fn print_build_summary(snapshot: &BuildSnapshot) {
    let width = (Term::stderr().size().1 as usize).clamp(20, 80);
    let rule = "─".repeat(width);
    let color = colors_enabled();

    if color {
        eprintln!("\n{}", "Build Summary".bold().underline());
    } else {
        eprintln!("\nBuild Summary");
    }
    eprintln!("{rule}");

    let mut total = 0;
    for artifact in &snapshot.artifacts {
        if artifact.kind == ArtifactKind::SourceMap {
            continue;
        }
        total += artifact.size();
        let size = format_size(artifact.size());
        if color {
            eprintln!(
                "  {} {} {}",
                "▸".blue(),
                artifact.file_name.bright_white().bold(),
                size.dimmed()
            );
        } else {
            eprintln!("  ▸ {} {size}", artifact.file_name);
        }
    }

    eprintln!("{rule}");
    let chunks = snapshot.chunks.len();
    let time = format_duration(snapshot.duration);
    if color {
        eprintln!(
            "  {} {} in {} chunks, {}",
            "Total:".bold(),
            format_size(total).green(),
            chunks,
            time.green()
        );
    } else {
        eprintln!("  Total: {} in {chunks} chunks, {time}", format_size(total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_pick_the_largest_whole_unit() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(3_000_000), "2.86 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn durations_switch_units() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }
}
