/// Render a human-friendly transfer speed string.
#[must_use]
pub fn format_speed(bytes_per_sec: f32) -> String {
    const KIB: f32 = 1024.0;
    const MIB: f32 = KIB * 1024.0;

    if bytes_per_sec < KIB {
        format!("{bytes_per_sec:.0} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / MIB)
    }
}

/// Compute a completed fraction as a percentage clamped to `0..=100`.
#[must_use]
pub fn progress_percent(done: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => ((done as f64 / total as f64) * 100.0).min(100.0) as f32,
        _ => 0.0,
    }
}

/// Drop a leading UTF-8 byte order mark, as Windows editors like to write one.
#[must_use]
pub fn strip_bom(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw)
}

/// Last non-empty path segment of a URL, percent-decoded and without query,
/// fragment or `;` parameters. Relative inputs are split on either separator.
#[must_use]
pub fn file_name_from_url(url: &str) -> Option<String> {
    let segment = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_owned)?,
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or(url);
            path.rsplit(['/', '\\']).next()?.to_owned()
        }
    };

    let segment = segment.split(';').next().unwrap_or(&segment);
    let decoded = urlencoding::decode(segment)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_owned());
    let name = decoded.trim();
    (!name.is_empty()).then(|| name.to_owned())
}
