//! Backup filename derivation
//!
//! Every successfully parsed submission is archived under a descriptive
//! filename built from its metadata. The name must be filesystem-safe,
//! unique across rapid retries, and bounded in length.

use std::sync::atomic::{AtomicI64, Ordering};

/// Hard ceiling on generated filename length, in characters. Longer
/// names make `open()` fail on some filesystems.
const MAX_FILENAME_CHARS: usize = 250;

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Strictly monotonic microsecond timestamp. Two calls always return
/// different values, even within the same microsecond.
fn next_timestamp() -> i64 {
    let now = chrono::Utc::now().timestamp_micros();
    let mut last = LAST_STAMP.load(Ordering::SeqCst);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_STAMP.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Replace every run of characters outside `[\w~-]` (Unicode-aware)
/// with a single `-`.
fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut in_run = false;
    for c in segment.chars() {
        if c.is_alphanumeric() || matches!(c, '_' | '-' | '~') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

/// Derive the descriptive backup filename for a submission.
///
/// Structure submissions (original base name `Project`) are not scoped
/// to a particular build, so the subproject/site/build/stamp segments
/// are omitted for them. Over-long names are shortened from the middle
/// so both the leading project name and the trailing extension survive.
pub fn encode_backup_filename(
    project_name: &str,
    subproject_name: &str,
    build_name: &str,
    site_name: &str,
    stamp: &str,
    filename_with_ext: &str,
) -> String {
    let (base, ext) = match filename_with_ext.rsplit_once('.') {
        Some((base, ext)) => (base.to_string(), format!(".{ext}")),
        None => (filename_with_ext.to_string(), ".".to_string()),
    };

    let mut filename = format!("{}_", escape_segment(project_name));
    if base != "Project" {
        filename.push_str(&format!(
            "{}_{}_{}_{}_",
            escape_segment(subproject_name),
            escape_segment(site_name),
            escape_segment(build_name),
            stamp
        ));
    }
    filename.push_str(&format!("{}_{}{}", next_timestamp(), base, ext));

    let char_count = filename.chars().count();
    if char_count > MAX_FILENAME_CHARS {
        let keep_front = MAX_FILENAME_CHARS / 2;
        let remove = char_count - MAX_FILENAME_CHARS;
        filename = filename
            .chars()
            .take(keep_front)
            .chain(filename.chars().skip(keep_front + remove))
            .collect();
    }

    filename
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_runs_of_unsafe_characters() {
        assert_eq!(escape_segment("Linux c++ (gcc 13)"), "Linux-c-gcc-13-");
        assert_eq!(escape_segment("nightly_x86-64~rc"), "nightly_x86-64~rc");
        assert_eq!(escape_segment("üñïçôdé ok"), "üñïçôdé-ok");
    }

    #[test]
    fn build_scoped_name_contains_all_segments() {
        let name = encode_backup_filename(
            "VTK",
            "Rendering",
            "nightly-gcc",
            "dash1.kitware",
            "20260807-0100-Nightly",
            "Build.xml",
        );
        assert!(name.starts_with("VTK_Rendering_dash1-kitware_nightly-gcc_20260807-0100-Nightly_"));
        assert!(name.ends_with("_Build.xml"));
    }

    #[test]
    fn project_structure_name_omits_build_segments() {
        let name = encode_backup_filename(
            "VTK",
            "Rendering",
            "nightly-gcc",
            "dash1.kitware",
            "20260807-0100-Nightly",
            "Project.xml",
        );
        assert!(name.starts_with("VTK_"));
        assert!(!name.contains("nightly-gcc"));
        assert!(!name.contains("dash1"));
        assert!(!name.contains("Rendering"));
        assert!(!name.contains("20260807"));
        assert!(name.ends_with("_Project.xml"));
    }

    #[test]
    fn output_never_exceeds_ceiling_and_keeps_extension() {
        let long = "x".repeat(400);
        let name = encode_backup_filename(&long, &long, &long, &long, "stamp", "Test.xml");
        assert!(name.chars().count() <= MAX_FILENAME_CHARS);
        assert!(name.ends_with(".xml"));
        assert!(name.starts_with("xxxx"));
    }

    #[test]
    fn rapid_calls_never_collide() {
        let a = encode_backup_filename("P", "", "b", "s", "st", "Build.xml");
        let b = encode_backup_filename("P", "", "b", "s", "st", "Build.xml");
        assert_ne!(a, b);
    }

    #[test]
    fn timestamps_are_strictly_increasing() {
        let mut last = next_timestamp();
        for _ in 0..1000 {
            let next = next_timestamp();
            assert!(next > last);
            last = next;
        }
    }
}
