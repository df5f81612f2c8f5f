use std::path::Path;

const SIZE_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Artifact size in binary units, e.g. `1.5 KiB`, `42 B`, `2.00 TiB`.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let precision = if unit == 1 { 1 } else { 2 };
    format!("{:.*} {}", precision, value, SIZE_UNITS[unit])
}

/// `count` followed by `noun`, pluralised with a trailing `s`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Path as the user most likely typed it: relative to the working directory
/// when it lives below it, `~/...` when under the home directory.
pub fn format_path(path: &Path) -> String {
    if path.is_absolute() {
        if let Ok(cwd) = std::env::current_dir() {
            if let Ok(rel) = path.strip_prefix(&cwd) {
                if !rel.as_os_str().is_empty() {
                    return rel.display().to_string();
                }
            }
        }
        if let Some(home) = dirs::home_dir() {
            if let Ok(rel) = path.strip_prefix(&home) {
                return Path::new("~").join(rel).display().to_string();
            }
        }
    }
    path.display().to_string()
}

/// Elapsed time of a run; staging is usually sub-second
pub fn format_duration(secs: f64) -> String {
    match secs {
        s if s < 0.001 => "<1ms".to_string(),
        s if s < 1.0 => format!("{}ms", (s * 1000.0).round() as u64),
        s if s < 60.0 => format!("{:.2}s", s),
        s => format!("{}m {:02}s", (s / 60.0) as u64, (s % 60.0) as u64),
    }
}

/// Shorten `name` to at most `max` characters by cutting out its middle, so
/// the extension of an artifact name stays visible.
pub fn elide_middle(name: &str, max: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max {
        return name.to_string();
    }
    if max < 3 {
        return chars[chars.len() - max..].iter().collect();
    }
    let keep = max - 1;
    let tail = keep / 2;
    let head = keep - tail;
    let mut out: String = chars[..head].iter().collect();
    out.push('…');
    out.extend(&chars[chars.len() - tail..]);
    out
}
