// sftpdrop Utils
//
// Formatting helpers for listings and transfer summaries
// - permission_str : unix mode bits → "drwxr-xr-x"
// - mtime_str      : unix timestamp → ls -la style date (UTC)
// - fmt_size       : bytes → 1.2MB style

use chrono::{DateTime, Duration, Utc};

/// unix mode bits → "drwxr-xr-x"
pub fn permission_str(p: u32) -> String {
    let file_type = match p & 0o170000 {
        0o040000 => 'd',  // S_IFDIR
        0o120000 => 'l',  // S_IFLNK
        0o060000 => 'b',  // S_IFBLK
        0o020000 => 'c',  // S_IFCHR
        0o010000 => 'p',  // S_IFIFO
        0o140000 => 's',  // S_IFSOCK
        _        => '-',
    };

    const RWX: [char; 3] = ['r', 'w', 'x'];

    let mut s = String::with_capacity(10);
    s.push(file_type);
    for shift in (0..9).rev() {
        let ch = RWX[2 - shift % 3];
        s.push(if p & (1 << shift) != 0 { ch } else { '-' });
    }
    s
}

/// ls -la style date relative to `now`
///
/// - within the last 6 months: "Jun 22 15:30"
/// - older (or in the future): "Jun 22  2025"
pub fn mtime_str(ts: u64, now: DateTime<Utc>) -> String {
    let Some(dt) = DateTime::from_timestamp(ts as i64, 0) else {
        return "?".to_string();
    };

    let recent = dt > now - Duration::days(180) && dt <= now;
    if recent {
        dt.format("%b %e %H:%M").to_string()
    } else {
        dt.format("%b %e  %Y").to_string()
    }
}

/// bytes → human readable size
pub fn fmt_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB      { format!("{:.1}GB", bytes as f64 / GB as f64) }
    else if bytes >= MB { format!("{:.1}MB", bytes as f64 / MB as f64) }
    else if bytes >= KB { format!("{:.1}KB", bytes as f64 / KB as f64) }
    else                { format!("{}B",     bytes) }
}
